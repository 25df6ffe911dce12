// Pipeline execution module
// Orchestrates the full track-file-to-movie pipeline

pub mod artifacts;
pub mod config;
pub mod driver;

pub use artifacts::{hash_existing, hash_file, ArtifactHash, ArtifactPaths};
pub use config::{ConfigError, PipelineConfig, RendererCommand, ToolSettings, CONFIG_FILE};
pub use driver::{run, wind_range, write_outputs, PipelineError, PipelineReport, StageSummary};
