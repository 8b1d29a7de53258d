//! Local tool gateway — a loopback MCP endpoint scoped to one chat session
//!
//! The gateway binds an ephemeral port on 127.0.0.1 and answers every HTTP
//! request with a registry, adapter and transport built just for that
//! request. Nothing protocol-related outlives a request; the only long-lived
//! pieces are the listener and the borrowed session client.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use axum::serve::Listener;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, Span, error, info, info_span};

use chatdock_core::session::SessionClient;
use chatdock_core::tools::ToolRegistry;
use chatdock_core::tools::change_title::ChangeTitleTool;

use crate::adapter::McpToolAdapter;
use crate::error::GatewayError;
use crate::listener::{ClosableListener, ListenerCloser};
use crate::transport::HttpTransport;

/// Settings reported to MCP clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server_name: String,
    pub server_version: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server_name: "chatdock".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Builds the tool registry for one request
type RegistryFactory = Arc<dyn Fn() -> ToolRegistry + Send + Sync>;

/// Registry holding the session tools for `client`
pub fn title_registry(client: Arc<dyn SessionClient>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ChangeTitleTool::new(client)));
    registry
}

struct GatewayState {
    registry_factory: RegistryFactory,
    config: GatewayConfig,
    span: Span,
}

/// A gateway that has not started listening yet
pub struct TitleGateway {
    client: Arc<dyn SessionClient>,
    config: GatewayConfig,
    span: Option<Span>,
}

impl TitleGateway {
    pub fn new(client: Arc<dyn SessionClient>) -> Self {
        Self {
            client,
            config: GatewayConfig::default(),
            span: None,
        }
    }

    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Span every gateway log line is recorded under.
    /// Defaults to `title_gateway` tagged with the session id.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Bind the loopback listener and start serving
    ///
    /// Returns once the listener is bound. Bind failures are returned as-is.
    pub async fn start(self) -> Result<GatewayHandle, GatewayError> {
        let span = self.span.unwrap_or_else(|| {
            info_span!("title_gateway", session_id = %self.client.session_id())
        });

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .map_err(GatewayError::Bind)?;
        let (listener, closer) = ClosableListener::new(listener).map_err(GatewayError::Bind)?;
        let local_addr = listener.local_addr().map_err(GatewayError::Bind)?;

        let client = self.client;
        let registry_factory: RegistryFactory = Arc::new(move || title_registry(client.clone()));
        let tool_names = registry_factory().names();

        let state = Arc::new(GatewayState {
            registry_factory,
            config: self.config,
            span: span.clone(),
        });
        let app = Router::new()
            .fallback(handle_request)
            .with_state(state)
            .layer(TraceLayer::new_for_http());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(
            async move {
                let result = axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        // A dropped handle stops the gateway as well
                        let _ = shutdown_rx.await;
                    })
                    .await;
                match &result {
                    Ok(()) => info!("Title gateway stopped"),
                    Err(e) => error!("Title gateway failed: {}", e),
                }
                result
            }
            .instrument(span.clone()),
        );

        let url = format!("http://{}", local_addr);
        info!(parent: &span, "Title gateway listening on {} (tools: {:?})", url, tool_names);

        Ok(GatewayHandle {
            url,
            local_addr,
            tool_names,
            closer,
            shutdown: shutdown_tx,
            task,
        })
    }
}

/// Start a gateway for `client` with default settings
pub async fn start_title_gateway(client: Arc<dyn SessionClient>) -> Result<GatewayHandle, GatewayError> {
    TitleGateway::new(client).start().await
}

/// A listening gateway. Stopping consumes the handle; dropping it stops too.
pub struct GatewayHandle {
    url: String,
    local_addr: SocketAddr,
    tool_names: Vec<String>,
    closer: ListenerCloser,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

impl GatewayHandle {
    /// Base URL, `http://127.0.0.1:<port>`
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Names of the tools the gateway serves
    pub fn tool_names(&self) -> &[String] {
        &self.tool_names
    }

    /// Close the listener. The port is free when this returns; in-flight
    /// requests run to completion.
    pub fn stop(self) {
        self.closer.close();
        let _ = self.shutdown.send(());
    }

    /// Close the listener and wait until the server has finished
    pub async fn shutdown(self) -> Result<(), GatewayError> {
        self.closer.close();
        let _ = self.shutdown.send(());
        self.task.await?.map_err(GatewayError::Serve)
    }
}


async fn handle_request(
    State(state): State<Arc<GatewayState>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let span = state.span.clone();
    async move {
        // Fresh registry, adapter and transport for every request
        let registry = (state.registry_factory)();
        let adapter = McpToolAdapter::new(registry)
            .with_server_info(&state.config.server_name, &state.config.server_version);
        let transport = HttpTransport::new(adapter);

        into_http_response(transport.handle(method, &headers, body).await)
    }
    .instrument(span)
    .await
}

/// Infrastructure failures get a bare 500 with no JSON-RPC body
fn into_http_response(result: Result<Response, GatewayError>) -> Response {
    match result {
        Ok(response) => response,
        Err(e) => {
            error!("MCP request failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
