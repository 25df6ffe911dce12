// Render module - Draw instructions and the renderer side of the pipeline
// The map itself is drawn by an external renderer reading the frame log

pub mod animate;
pub mod frame_log;
pub mod instructions;

// Re-export main types
pub use animate::animate;
pub use frame_log::{read_frame_log, FrameEntry, FrameLog, RenderError, Renderer};
pub use instructions::DrawInstruction;
