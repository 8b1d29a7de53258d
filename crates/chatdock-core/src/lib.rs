//! chatdock-core — the pieces of a chat session the local gateway exposes
//!
//! Holds the session client boundary (how a title reaches the remote
//! conversation) and the tool registry the MCP layer serves from.

pub mod session;
pub mod tools;

pub use session::{ChannelSessionClient, SessionClient, SessionMessage};
pub use tools::change_title::{ChangeTitleTool, TitleChange};
pub use tools::{ToolDefinition, ToolHandler, ToolOutput, ToolRegistry};
