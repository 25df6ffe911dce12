// Hurricanes - Storm track animation and sonification
// Module declarations

pub mod lifecycle;
pub mod pipeline;
pub mod process;
pub mod render;
pub mod scheduler;
pub mod score;
pub mod tracks;

pub use pipeline::{run, PipelineConfig, PipelineError, PipelineReport};
pub use scheduler::Scheduler;
pub use tracks::TrackDatabase;
