// Frame log - JSONL stream of per-tick draw instructions
// Consumed by the external map renderer that produces the movie frames

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::instructions::DrawInstruction;
use crate::scheduler::{ScheduleError, Tick};

/// Errors that can occur while rendering ticks
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),
}

/// Consumer of scheduler ticks
pub trait Renderer {
    /// Handle one grid instant; called in ascending time order
    fn render_tick(&mut self, tick: &Tick) -> Result<(), RenderError>;

    /// Flush any buffered output after the last tick
    fn finish(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// One line of the frame log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameEntry {
    pub tick: usize,
    pub instant: NaiveDateTime,

    /// Date annotation for the frame (`YYYY-MM-DD`)
    pub date: String,

    /// True when the renderer should capture a video frame after applying this tick
    pub grab_frame: bool,

    pub instructions: Vec<DrawInstruction>,
}

impl FrameEntry {
    /// Serialize to JSON line (with newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Renderer that writes every tick to a JSONL file
pub struct FrameLog {
    file_path: PathBuf,
    writer: BufWriter<File>,
    ticks_per_frame: usize,
    frames_grabbed: usize,
}

impl FrameLog {
    /// Create (or truncate) the log; a frame is grabbed every `ticks_per_frame` ticks
    pub fn create(file_path: PathBuf, ticks_per_frame: usize) -> Result<Self, RenderError> {
        let file = File::create(&file_path)?;
        Ok(FrameLog {
            file_path,
            writer: BufWriter::new(file),
            ticks_per_frame: ticks_per_frame.max(1),
            frames_grabbed: 0,
        })
    }

    /// Get the frame log path
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn frames_grabbed(&self) -> usize {
        self.frames_grabbed
    }
}

impl Renderer for FrameLog {
    fn render_tick(&mut self, tick: &Tick) -> Result<(), RenderError> {
        let grab_frame = tick.index % self.ticks_per_frame == 0;
        let entry = FrameEntry {
            tick: tick.index,
            instant: tick.instant,
            date: tick.date_label(),
            grab_frame,
            instructions: tick.instructions.clone(),
        };
        self.writer.write_all(entry.to_json_line()?.as_bytes())?;
        if grab_frame {
            self.frames_grabbed += 1;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), RenderError> {
        self.writer.flush()?;
        log::info!(
            "Wrote {} frames to {}",
            self.frames_grabbed,
            self.file_path.display()
        );
        Ok(())
    }
}

/// Read frame entries from a JSONL file
pub fn read_frame_log(path: &Path) -> Result<Vec<FrameEntry>, RenderError> {
    let contents = std::fs::read_to_string(path)?;
    let mut entries = Vec::new();

    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(line)?);
    }

    Ok(entries)
}
