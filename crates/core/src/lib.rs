//! Tool dispatch layer for the live relay.
//!
//! Handlers implement [`tool::ToolHandler`] and are registered once at startup
//! in a [`registry::ToolRegistry`]. The registry is read-only afterwards and is
//! shared by every session through a [`dispatcher::ToolDispatcher`].

pub mod dispatcher;
pub mod error;
pub mod registry;
pub mod tool;
pub mod tools;

pub use dispatcher::ToolDispatcher;
pub use error::ToolError;
pub use registry::ToolRegistry;
pub use tool::{ToolCall, ToolHandler, ToolOutcome, ToolResult};
