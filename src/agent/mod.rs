//! Tool-calling answer loop.
//!
//! The model is offered the course tools on its first call. If it asks for
//! any, they run once through the [`ToolRegistry`] and the model is called a
//! second time, without tools, to write the answer.

mod registry;
mod runner;
mod tools;

pub use registry::ToolRegistry;
pub use runner::{RunOutcome, Runner, ToolCallRecord};
pub use tools::{OutlineTool, SearchTool, Tool, ToolOutput, OUTLINE_TOOL, SEARCH_TOOL};
