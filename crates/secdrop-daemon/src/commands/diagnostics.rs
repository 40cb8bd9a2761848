//! Diagnostics command handlers.

use std::sync::Arc;

use chrono::SecondsFormat;
use serde_json::Value;

use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Process start time and current time.
pub async fn get_server_info(state: &Arc<DaemonState>) -> Result {
    Ok(serde_json::json!({
        "serverStartTime": state.started_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        "currentTime": state.clock.now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "version": env!("CARGO_PKG_VERSION"),
        "revealMode": state.config.drops.reveal_mode.as_str(),
    }))
}
