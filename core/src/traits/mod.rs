pub mod backend;
pub mod tool;

pub use backend::RenderBackend;
pub use tool::{Tool, ToolResult, ToolSpec};
