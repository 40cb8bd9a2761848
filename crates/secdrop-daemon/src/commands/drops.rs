//! Drop lifecycle command handlers.

use std::sync::Arc;

use secdrop_store::RedactionCheck;
use secdrop_types::drop::GeoInfo;
use serde_json::Value;

use crate::config::RevealMode;
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

fn url_hash(params: &Value) -> std::result::Result<&str, RpcError> {
    params
        .get("urlHash")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("urlHash required"))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result {
    serde_json::to_value(value).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Store a ciphertext and return its share link.
pub async fn create_drop(state: &Arc<DaemonState>, params: &Value) -> Result {
    let ciphertext = params
        .get("ciphertext")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("ciphertext required"))?;

    let ttl_days = match params.get("ttlDays") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            v.as_u64()
                .and_then(|d| u32::try_from(d).ok())
                .filter(|d| *d > 0)
                .ok_or_else(|| RpcError::invalid_params("ttlDays must be a positive integer"))?,
        ),
    };

    let created = state.drops.create(ciphertext, ttl_days).await?;
    let secure_url = state.config.secure_url(created.url_hash.as_str());

    let mut value = to_json(&created)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("secureUrl".to_string(), Value::String(secure_url));
    }
    Ok(value)
}

/// Hand out the ciphertext, in the configured reveal mode.
pub async fn reveal_drop(state: &Arc<DaemonState>, params: &Value) -> Result {
    let hash = url_hash(params)?;
    let revealed = match state.config.drops.reveal_mode {
        RevealMode::TwoPhase => state.drops.reveal(hash).await?,
        RevealMode::Claim => state.drops.claim(hash).await?,
    };
    to_json(&revealed)
}

/// Stamp the first decryption with optional location.
pub async fn record_decryption(state: &Arc<DaemonState>, params: &Value) -> Result {
    let hash = url_hash(params)?;
    let geo = match params.get("geoData") {
        None | Some(Value::Null) => None,
        Some(v) => Some(
            serde_json::from_value::<GeoInfo>(v.clone())
                .map_err(|e| RpcError::invalid_params(&format!("geoData: {e}")))?,
        ),
    };

    let stamp = state.recorder.record_decryption(hash, geo.as_ref()).await?;
    to_json(&stamp)
}

/// Redact and confirm.
pub async fn redact_drop(state: &Arc<DaemonState>, params: &Value) -> Result {
    let hash = url_hash(params)?;
    let (decrypted_at, confirmed) = match state.drops.redact_and_verify(hash).await? {
        RedactionCheck::Confirmed(status) => (status.decrypted_at, true),
        RedactionCheck::Unconfirmed { decrypted_at } => (decrypted_at, false),
    };
    Ok(serde_json::json!({
        "decryptedAt": decrypted_at,
        "confirmed": confirmed,
    }))
}

pub async fn verify_redacted(state: &Arc<DaemonState>, params: &Value) -> Result {
    let hash = url_hash(params)?;
    let status = state.probe.verify_redacted(hash).await?;
    to_json(&status)
}
