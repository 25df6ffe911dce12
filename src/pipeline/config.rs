// Pipeline configuration - Dataset locations, timing, mapping and tool names
// Read from JSON; every key is optional and falls back to its default

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::lifecycle::LifecycleSettings;
use crate::scheduler::ScheduleSettings;
use crate::score::{default_layer_bands, LayerBand, ScoreHeader, ScoreSettings};
use crate::tracks::Field;

/// Config file looked up in the working directory
pub const CONFIG_FILE: &str = "hurricanes.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("time_step_hours must be positive, got {0}")]
    InvalidStep(i64),

    #[error("{name} must be a positive number, got {value}")]
    InvalidRate { name: &'static str, value: f64 },

    #[error("fade_increment must be in (0, 1], got {0}")]
    InvalidFadeIncrement(f64),
}

/// External command that turns the frame log into a movie
///
/// `{frames}` and `{movie}` in the arguments are replaced with the frame
/// log and movie paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendererCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub cmix: String,
    pub ffmpeg: String,
    pub renderer: Option<RendererCommand>,
}

impl Default for ToolSettings {
    fn default() -> Self {
        ToolSettings {
            cmix: "CMIX".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            renderer: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding `<base>.txt` track files
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,

    /// Second dataset whose intensities widen the color range
    pub comparison_dataset: Option<PathBuf>,

    pub field: Field,
    pub time_step_hours: i64,

    /// Grid ticks per video frame
    pub sample_rate: f64,
    pub fps: f64,

    pub fade_increment: f64,
    pub line_width: f64,

    pub pitch_scale: f64,
    pub pitch_shift: f64,
    pub layer_bands: Vec<LayerBand>,

    pub audio_sample_rate: u32,
    pub audio_channels: u32,
    pub pan: f64,

    pub tools: ToolSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            data_dir: PathBuf::from("data/atl_models"),
            output_dir: PathBuf::from("."),
            comparison_dataset: None,
            field: Field::MaxWind,
            time_step_hours: 6,
            sample_rate: 10.0,
            fps: 600.0,
            fade_increment: 0.005,
            line_width: 9.0,
            pitch_scale: 0.04,
            pitch_shift: 2.2,
            layer_bands: default_layer_bands(),
            audio_sample_rate: 44100,
            audio_channels: 2,
            pan: 0.5,
            tools: ToolSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a JSON config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` when it exists, otherwise use defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            log::info!("Loading config from {}", path.display());
            Self::load(path)
        } else {
            log::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_step_hours <= 0 {
            return Err(ConfigError::InvalidStep(self.time_step_hours));
        }
        for (name, value) in [("sample_rate", self.sample_rate), ("fps", self.fps)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidRate { name, value });
            }
        }
        if !LifecycleSettings::is_valid_fade_increment(self.fade_increment) {
            return Err(ConfigError::InvalidFadeIncrement(self.fade_increment));
        }
        Ok(())
    }

    /// Track file for a dataset base name
    pub fn dataset_path(&self, base_name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.txt", base_name))
    }

    pub fn schedule_settings(&self) -> Result<ScheduleSettings, ConfigError> {
        let step = match TimeDelta::try_hours(self.time_step_hours) {
            Some(step) if step > TimeDelta::zero() => step,
            _ => return Err(ConfigError::InvalidStep(self.time_step_hours)),
        };
        Ok(ScheduleSettings {
            step,
            lifecycle: LifecycleSettings {
                fade_increment: self.fade_increment,
                line_width: self.line_width,
            },
        })
    }

    pub fn score_settings(&self) -> ScoreSettings {
        ScoreSettings {
            sample_rate: self.sample_rate,
            fps: self.fps,
            field: self.field,
            pitch_scale: self.pitch_scale,
            pitch_shift: self.pitch_shift,
            pan: self.pan,
            layer_bands: self.layer_bands.clone(),
        }
    }

    pub fn score_header(&self, output_file: impl Into<String>) -> ScoreHeader {
        ScoreHeader {
            audio_sample_rate: self.audio_sample_rate,
            channels: self.audio_channels,
            output_file: output_file.into(),
        }
    }

    /// Grid ticks between grabbed video frames
    pub fn ticks_per_frame(&self) -> usize {
        (self.sample_rate.round() as usize).max(1)
    }
}
