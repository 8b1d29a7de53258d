//! MCP gateway for chatdock
//!
//! Serves the session tools over a short-lived loopback HTTP endpoint that an
//! agent host connects to as an MCP server.

pub mod adapter;
pub mod error;
pub mod gateway;
mod listener;
pub mod protocol;
pub mod transport;

pub use adapter::McpToolAdapter;
pub use error::GatewayError;
pub use gateway::{GatewayConfig, GatewayHandle, TitleGateway, start_title_gateway};
pub use transport::HttpTransport;
