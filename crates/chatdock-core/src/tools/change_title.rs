//! `change_title` tool — renames the current chat session

use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use super::{ToolHandler, ToolOutput, json_schema};
use crate::session::{SessionClient, SessionMessage};

pub const TOOL_NAME: &str = "change_title";

const FALLBACK_HOSTNAME: &str = "localhost";

/// Outcome of delivering a new title to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleChange {
    pub success: bool,
    pub error: Option<String>,
}

impl TitleChange {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            error: (!error.is_empty()).then_some(error),
        }
    }
}

/// Title as shown in the session list, prefixed with the machine it runs on
pub fn display_title(hostname: &str, title: &str) -> String {
    format!("[{}] {}", hostname, title)
}

/// Hostname of this machine, read at call time
pub fn local_hostname() -> String {
    match hostname::get() {
        Ok(name) => match name.into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!("Hostname {:?} is not valid UTF-8, using {}", raw, FALLBACK_HOSTNAME);
                FALLBACK_HOSTNAME.to_string()
            }
        },
        Err(e) => {
            warn!("Could not read hostname ({}), using {}", e, FALLBACK_HOSTNAME);
            FALLBACK_HOSTNAME.to_string()
        }
    }
}

/// Send the new title to the session as a summary message
///
/// Waits for the delivery to finish. Delivery errors are captured in the
/// returned [`TitleChange`] rather than propagated.
pub async fn send_title(client: &dyn SessionClient, title: &str) -> TitleChange {
    let summary = display_title(&local_hostname(), title);
    match client
        .send_session_message(SessionMessage::summary(summary.clone()))
        .await
    {
        Ok(()) => {
            info!("Session {} title changed to {:?}", client.session_id(), summary);
            TitleChange::ok()
        }
        Err(e) => {
            warn!("Session {} title change failed: {}", client.session_id(), e);
            TitleChange::failed(e.to_string())
        }
    }
}

/// Map a title change outcome to the text the calling agent sees
pub fn title_change_output(title: &str, change: &TitleChange) -> ToolOutput {
    if change.success {
        ToolOutput::text(format!("Successfully changed chat title to: \"{}\"", title))
    } else {
        let reason = change.error.as_deref().unwrap_or("Unknown error");
        ToolOutput::error(format!("Failed to change chat title: {}", reason))
    }
}

/// Tool: change the title of the chat session behind `client`
pub struct ChangeTitleTool {
    client: Arc<dyn SessionClient>,
}

impl ChangeTitleTool {
    pub fn new(client: Arc<dyn SessionClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for ChangeTitleTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Change the title of the current chat session."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "title": {
                    "type": "string",
                    "description": "The new title for the chat session"
                }
            }),
            vec!["title"],
        )
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        let title = input
            .get("title")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing 'title' parameter"))?;

        let change = send_title(self.client.as_ref(), title).await;
        Ok(title_change_output(title, &change))
    }
}
