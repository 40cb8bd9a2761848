//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! newline-delimited JSON-RPC 2.0 calls to the command handlers. A
//! connection that calls `subscribe_events` also receives bus events as
//! `event` notifications until it calls `unsubscribe_events`.

use std::path::PathBuf;
use std::sync::Arc;

use secdrop_store::{DropError, PublicFailure};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::events::Event;
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self {
            code: -32700,
            message: "PARSE_ERROR".to_string(),
            data: None,
        }
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self {
            code: -32600,
            message: "INVALID_REQUEST".to_string(),
            data: None,
        }
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: "METHOD_NOT_FOUND".to_string(),
            data: Some(serde_json::json!({"method": method})),
        }
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self {
            code: -32602,
            message: "INVALID_PARAMS".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self {
            code: -32603,
            message: "INTERNAL_ERROR".to_string(),
            data: Some(serde_json::json!({"detail": detail})),
        }
    }

    /// Drop missing, expired or already viewed (-32030).
    ///
    /// One code for all three so callers cannot tell which tokens exist.
    pub fn drop_unavailable() -> Self {
        Self {
            code: -32030,
            message: "DROP_UNAVAILABLE".to_string(),
            data: None,
        }
    }

    /// Missing or wrong shared secret (-32031).
    pub fn unauthorized() -> Self {
        Self {
            code: -32031,
            message: "UNAUTHORIZED".to_string(),
            data: None,
        }
    }

    /// Storage failure (-32032).
    pub fn storage_unavailable() -> Self {
        Self {
            code: -32032,
            message: "STORAGE_UNAVAILABLE".to_string(),
            data: None,
        }
    }
}

impl From<DropError> for RpcError {
    fn from(err: DropError) -> Self {
        match err.public() {
            PublicFailure::Invalid(detail) => RpcError::invalid_params(&detail),
            PublicFailure::Unavailable => RpcError::drop_unavailable(),
            PublicFailure::Storage => RpcError::storage_unavailable(),
        }
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// JSON-RPC notification carrying a bus event to a subscribed connection.
#[derive(Debug, Serialize)]
pub struct RpcNotification {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Always "event".
    pub method: String,
    pub params: Event,
}

impl RpcNotification {
    fn event(event: Event) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: "event".to_string(),
            params: event,
        }
    }
}

/// Event forwarding for one connection, set up by `subscribe_events`.
struct Subscription {
    rx: broadcast::Receiver<Event>,
    /// Event type prefix; `None` forwards everything.
    filter: Option<String>,
}

/// Subscription requests are answered by the connection, not the dispatcher.
enum SubscriptionRequest {
    Subscribe {
        id: serde_json::Value,
        filter: Option<String>,
    },
    Unsubscribe {
        id: serde_json::Value,
    },
}

impl SubscriptionRequest {
    fn parse(line: &str) -> Option<Self> {
        let request: RpcRequest = serde_json::from_str(line).ok()?;
        if request.jsonrpc != "2.0" {
            return None;
        }
        match request.method.as_str() {
            "subscribe_events" => Some(Self::Subscribe {
                filter: request
                    .params
                    .get("filter")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string),
                id: request.id,
            }),
            "unsubscribe_events" => Some(Self::Unsubscribe { id: request.id }),
            _ => None,
        }
    }

    fn apply(self, state: &DaemonState, subscription: &mut Option<Subscription>) -> RpcResponse {
        match self {
            Self::Subscribe { id, filter } => {
                let result = serde_json::json!({
                    "subscribed": true,
                    "filter": &filter,
                    "sequence": state.event_bus.sequence(),
                });
                *subscription = Some(Subscription {
                    rx: state.event_bus.subscribe(),
                    filter,
                });
                RpcResponse::success(id, result)
            }
            Self::Unsubscribe { id } => {
                let was_subscribed = subscription.take().is_some();
                RpcResponse::success(id, serde_json::json!({"unsubscribed": was_subscribed}))
            }
        }
    }
}

/// Wait for the next event the subscription accepts.
///
/// Pends forever without a subscription. Returns `None` once the bus closes.
async fn next_event(subscription: &mut Option<Subscription>) -> Option<Event> {
    let Some(sub) = subscription.as_mut() else {
        return std::future::pending().await;
    };
    loop {
        match sub.rx.recv().await {
            Ok(event) if event.matches(sub.filter.as_deref()) => return Some(event),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event subscriber lagging"),
            Err(RecvError::Closed) => return None,
        }
    }
}

async fn write_message<W, T>(writer: &mut W, message: &T) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut json = serde_json::to_string(message)?;
    json.push('\n');
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Handle a single client connection.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut subscription: Option<Subscription> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break; // EOF
                };
                if line.trim().is_empty() {
                    continue;
                }
                let response = match SubscriptionRequest::parse(&line) {
                    Some(request) => request.apply(&state, &mut subscription),
                    None => handle_line(&state, &line).await,
                };
                write_message(&mut writer, &response).await?;
            }
            event = next_event(&mut subscription) => match event {
                Some(event) => {
                    write_message(&mut writer, &RpcNotification::event(event)).await?;
                }
                None => subscription = None,
            },
        }
    }

    Ok(())
}

/// Parse one request line and dispatch it.
pub async fn handle_line(state: &Arc<DaemonState>, line: &str) -> RpcResponse {
    let value = match serde_json::from_str::<serde_json::Value>(line) {
        Ok(value) => value,
        Err(_) => return RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
    };
    let id = value.get("id").cloned().unwrap_or(serde_json::Value::Null);
    match serde_json::from_value::<RpcRequest>(value) {
        Ok(request) if request.jsonrpc == "2.0" => dispatch_request(state.clone(), request).await,
        _ => RpcResponse::error(id, RpcError::invalid_request()),
    }
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    let method = request.method.as_str();

    debug!("Dispatching RPC method: {}", method);

    let result = match method {
        // Drop lifecycle
        "create_drop" => commands::drops::create_drop(&state, &request.params).await,
        "reveal_drop" => commands::drops::reveal_drop(&state, &request.params).await,
        "record_decryption" => commands::drops::record_decryption(&state, &request.params).await,
        "redact_drop" => commands::drops::redact_drop(&state, &request.params).await,
        "verify_redacted" => commands::drops::verify_redacted(&state, &request.params).await,

        // Expiry sweep
        "run_sweep" => commands::sweep::run_sweep(&state, &request.params).await,
        "get_sweep_stats" => commands::sweep::get_sweep_stats(&state, &request.params).await,

        // Diagnostics
        "get_server_info" => commands::diagnostics::get_server_info(&state).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}
