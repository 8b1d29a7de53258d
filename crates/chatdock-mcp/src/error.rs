//! Gateway error type

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to bind loopback listener: {0}")]
    Bind(#[source] std::io::Error),

    #[error("gateway server failed: {0}")]
    Serve(#[source] std::io::Error),

    #[error("gateway task ended abnormally: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("failed to serialize MCP response: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to build HTTP response: {0}")]
    Http(#[from] axum::http::Error),
}
