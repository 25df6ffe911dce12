// Pipeline driver - Dataset in, frame log, score, sound and movie out
// Stages run in order and the first failure ends the run

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use super::artifacts::{hash_existing, ArtifactHash, ArtifactPaths};
use super::config::{ConfigError, PipelineConfig, RendererCommand};
use crate::lifecycle::{DegenerateRangeError, IntensityRange};
use crate::process::{run_tool, ExternalToolError, ToolCommand};
use crate::render::{animate, FrameLog, RenderError};
use crate::scheduler::{RunSummary, Scheduler};
use crate::score::{write_score_file, ScoreError, ScoreSummary};
use crate::tracks::{DatabaseError, Field, ParseError, TrackDatabase};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Intensity range error: {0}")]
    DegenerateRange(#[from] DegenerateRangeError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Score error: {0}")]
    Score(#[from] ScoreError),

    #[error("External tool error: {0}")]
    Tool(#[from] ExternalToolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the in-process stages produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageSummary {
    pub schedule: RunSummary,
    pub frames_grabbed: usize,
    pub score: ScoreSummary,
}

/// Result of a full pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub base_name: String,
    pub cyclones: usize,
    pub records: usize,
    /// Storms starting in each year
    pub annual_frequency: BTreeMap<i32, usize>,
    /// Storms whose wind ever exceeds the catastrophic threshold
    pub catastrophic: Vec<String>,
    pub stages: StageSummary,
    pub muxed: bool,
    pub artifacts: Vec<ArtifactHash>,
}

/// Color range for the animation, widened by the comparison dataset if configured
pub fn wind_range(database: &TrackDatabase, config: &PipelineConfig) -> Result<IntensityRange, PipelineError> {
    let mut range = IntensityRange::from_database(database, Field::MaxWind)?;
    if let Some(path) = &config.comparison_dataset {
        let comparison = TrackDatabase::load(path)?;
        range = range.union(IntensityRange::from_database(&comparison, Field::MaxWind)?);
    }
    range.validate()?;
    log::info!("Wind range {:.1}..{:.1}", range.min, range.max);
    Ok(range)
}

/// Write the frame log and the score for a loaded dataset
pub fn write_outputs(
    database: &TrackDatabase,
    config: &PipelineConfig,
    paths: &ArtifactPaths,
) -> Result<StageSummary, PipelineError> {
    let range = wind_range(database, config)?;
    let scheduler = Scheduler::new(database, range, config.schedule_settings()?);

    let mut frame_log = FrameLog::create(paths.frame_log.clone(), config.ticks_per_frame())?;
    let schedule = animate(&scheduler, &mut frame_log)?;

    let header = config.score_header(paths.sound.display().to_string());
    let score = write_score_file(&paths.score, &header, &scheduler, &config.score_settings())?;

    Ok(StageSummary {
        schedule,
        frames_grabbed: frame_log.frames_grabbed(),
        score,
    })
}

/// Run the full pipeline for `<data_dir>/<base_name>.txt`
pub fn run(base_name: &str, config: &PipelineConfig) -> Result<PipelineReport, PipelineError> {
    config.validate()?;
    let paths = ArtifactPaths::new(&config.output_dir, base_name);
    paths.prepare()?;

    let database = TrackDatabase::load(&config.dataset_path(base_name))?;
    let annual_frequency = database.annual_frequency();
    for (year, count) in &annual_frequency {
        log::debug!("{}: {} storms", year, count);
    }
    let catastrophic: Vec<String> = database
        .iter()
        .filter(|series| series.is_catastrophic())
        .map(|series| series.id().to_string())
        .collect();
    if !catastrophic.is_empty() {
        log::info!("Catastrophic storms: {}", catastrophic.join(", "));
    }

    let stages = write_outputs(&database, config, &paths)?;

    run_tool(&ToolCommand::new(&config.tools.cmix).stdin_from(&paths.score))?;

    if let Some(renderer) = &config.tools.renderer {
        run_tool(&renderer_command(renderer, &paths.frame_log, &paths.movie))?;
    }

    let muxed = if paths.movie.exists() {
        run_tool(&mux_command(&config.tools.ffmpeg, &paths))?;
        true
    } else {
        log::warn!(
            "{} not found; skipping the sound track mux",
            paths.movie.display()
        );
        false
    };

    let artifacts = hash_existing(&paths)?;

    Ok(PipelineReport {
        base_name: base_name.to_string(),
        cyclones: database.len(),
        records: database.record_count(),
        annual_frequency,
        catastrophic,
        stages,
        muxed,
        artifacts,
    })
}

fn renderer_command(renderer: &RendererCommand, frame_log: &Path, movie: &Path) -> ToolCommand {
    let frames = frame_log.display().to_string();
    let movie = movie.display().to_string();
    let mut command = ToolCommand::new(&renderer.program).args(
        renderer
            .args
            .iter()
            .map(|arg| arg.replace("{frames}", &frames).replace("{movie}", &movie)),
    );
    command.inputs.push(frame_log.to_path_buf());
    command
}

/// `ffmpeg -i movie -i sound -c:v copy -c:a aac -strict experimental out`
fn mux_command(ffmpeg: &str, paths: &ArtifactPaths) -> ToolCommand {
    ToolCommand::new(ffmpeg)
        .arg("-y")
        .arg("-i")
        .input(&paths.movie)
        .arg("-i")
        .input(&paths.sound)
        .args(["-c:v", "copy", "-c:a", "aac", "-strict", "experimental"])
        .arg(paths.movie_with_sound.display().to_string())
}
