//! Session client boundary — how messages reach the remote conversation

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

/// A conversation event delivered to the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SessionMessage {
    /// Human-readable label for the current conversation leaf
    Summary {
        summary: String,
        #[serde(rename = "leafUuid")]
        leaf_uuid: Uuid,
    },
}

impl SessionMessage {
    /// Build a summary message with a freshly generated leaf id
    pub fn summary(text: impl Into<String>) -> Self {
        Self::Summary {
            summary: text.into(),
            leaf_uuid: Uuid::new_v4(),
        }
    }
}

/// Client connected to a remote chat session
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Identifier of the session, used for diagnostics
    fn session_id(&self) -> &str;

    /// Deliver a message to the session. Returns once delivery completed or failed.
    async fn send_session_message(&self, message: SessionMessage) -> Result<()>;
}

/// Session client that forwards every message into a channel
pub struct ChannelSessionClient {
    session_id: String,
    tx: mpsc::UnboundedSender<SessionMessage>,
}

impl ChannelSessionClient {
    /// Create a client and the receiving end of its message channel
    pub fn new(session_id: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<SessionMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = Self {
            session_id: session_id.into(),
            tx,
        };
        (client, rx)
    }
}

#[async_trait]
impl SessionClient for ChannelSessionClient {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn send_session_message(&self, message: SessionMessage) -> Result<()> {
        debug!("Session {} <- {:?}", self.session_id, message);
        self.tx
            .send(message)
            .map_err(|_| anyhow!("Session {} is closed", self.session_id))
    }
}
