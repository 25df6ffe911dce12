// Process module - External tool invocation

pub mod tool;

pub use tool::{run_tool, ExternalToolError, ToolCommand};
