//! MCP over HTTP POST — one transport per HTTP request
//!
//! Each POST body carries one JSON-RPC message or a batch of them; the
//! answers go back as a JSON body on the same response. The gateway keeps no
//! protocol session, so there is nothing to stream on GET and nothing to end
//! on DELETE.

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::response::Response;
use serde_json::Value;
use tracing::{debug, warn};

use crate::adapter::McpToolAdapter;
use crate::error::GatewayError;
use crate::protocol::*;

const JSON: &str = "application/json";

/// Translates a single HTTP request into MCP messages and back
pub struct HttpTransport {
    adapter: McpToolAdapter,
}

impl HttpTransport {
    pub fn new(adapter: McpToolAdapter) -> Self {
        Self { adapter }
    }

    /// Consume the request and produce its response
    pub async fn handle(
        self,
        method: Method,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Response, GatewayError> {
        if method != Method::POST {
            debug!("MCP HTTP {} rejected", method);
            return Ok(Response::builder()
                .status(StatusCode::METHOD_NOT_ALLOWED)
                .header(header::ALLOW, HeaderValue::from_static("POST"))
                .body(Body::empty())?);
        }

        if !accepts_json(headers) {
            return rpc_error_response(
                StatusCode::NOT_ACCEPTABLE,
                INVALID_REQUEST,
                "Client must accept application/json",
            );
        }

        if !is_json_content(headers) {
            return rpc_error_response(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                INVALID_REQUEST,
                "Content-Type must be application/json",
            );
        }

        debug!(
            "MCP received: {}",
            truncate(&String::from_utf8_lossy(&body), 200)
        );

        let payload: Value = match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => {
                warn!("Invalid JSON-RPC payload: {}", e);
                return rpc_error_response(
                    StatusCode::BAD_REQUEST,
                    PARSE_ERROR,
                    &format!("Parse error: {}", e),
                );
            }
        };

        let (messages, is_batch) = match payload {
            Value::Array(items) if items.is_empty() => {
                return rpc_error_response(
                    StatusCode::BAD_REQUEST,
                    INVALID_REQUEST,
                    "Empty batch",
                );
            }
            Value::Array(items) => (items, true),
            other => (vec![other], false),
        };

        let mut requests = Vec::with_capacity(messages.len());
        for message in messages {
            match serde_json::from_value::<JsonRpcRequest>(message) {
                Ok(req) if req.jsonrpc == JSONRPC_VERSION => requests.push(req),
                Ok(req) => {
                    return rpc_error_response(
                        StatusCode::BAD_REQUEST,
                        INVALID_REQUEST,
                        &format!("Unsupported jsonrpc version: {}", req.jsonrpc),
                    );
                }
                Err(e) => {
                    return rpc_error_response(
                        StatusCode::BAD_REQUEST,
                        INVALID_REQUEST,
                        &format!("Invalid JSON-RPC message: {}", e),
                    );
                }
            }
        }

        let mut responses = Vec::new();
        for request in requests {
            if let Some(response) = self.adapter.handle_request(request).await? {
                responses.push(response);
            }
        }

        if responses.is_empty() {
            return Ok(Response::builder()
                .status(StatusCode::ACCEPTED)
                .body(Body::empty())?);
        }

        let json = if is_batch {
            serde_json::to_vec(&responses)?
        } else {
            serde_json::to_vec(&responses[0])?
        };
        debug!("MCP sending: {}", truncate(&String::from_utf8_lossy(&json), 200));

        Ok(Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, JSON)
            .body(Body::from(json))?)
    }
}

/// Missing Accept means anything goes
fn accepts_json(headers: &HeaderMap) -> bool {
    let Some(accept) = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) else {
        return true;
    };
    accept.split(',').any(|part| {
        let media = part.split(';').next().unwrap_or("").trim();
        media == JSON || media == "application/*" || media == "*/*"
    })
}

fn is_json_content(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or("").trim().eq_ignore_ascii_case(JSON))
        .unwrap_or(false)
}

fn rpc_error_response(status: StatusCode, code: i64, message: &str) -> Result<Response, GatewayError> {
    let body = serde_json::to_vec(&JsonRpcResponse::error(Value::Null, code, message.to_string()))?;
    Ok(Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, JSON)
        .body(Body::from(body))?)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
