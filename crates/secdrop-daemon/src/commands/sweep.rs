//! Expiry sweep command handlers.
//!
//! Both methods require the configured shared secret. With no secret
//! configured they are refused outright.

use std::sync::Arc;

use serde_json::Value;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

fn authorize(state: &DaemonState, params: &Value) -> std::result::Result<(), RpcError> {
    let Some(expected) = state.config.sweep_secret() else {
        warn!("Sweep request refused: no shared secret configured");
        return Err(RpcError::unauthorized());
    };
    let presented = params.get("secret").and_then(|v| v.as_str()).unwrap_or("");
    if bool::from(presented.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        warn!("Sweep request refused: bad secret");
        Err(RpcError::unauthorized())
    }
}

/// Redact all expired drops.
pub async fn run_sweep(state: &Arc<DaemonState>, params: &Value) -> Result {
    authorize(state, params)?;
    let report = state.sweeper.run().await?;
    serde_json::to_value(&report).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Counts by cleanup state.
pub async fn get_sweep_stats(state: &Arc<DaemonState>, params: &Value) -> Result {
    authorize(state, params)?;
    let stats = state.sweeper.stats().await?;
    serde_json::to_value(&stats).map_err(|e| RpcError::internal_error(&e.to_string()))
}
