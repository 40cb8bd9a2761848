//! Expiry sweep reports and aggregate counts.

use serde::{Deserialize, Serialize};

/// Outcome of a single sweep run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Number of rows redacted by this run.
    pub count: u64,
    /// Store ids of the redacted rows.
    pub cleared_ids: Vec<i64>,
}

/// Read-only aggregate counts over all drops.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "camelCase")]
pub struct SweepStats {
    /// Expired and still holding ciphertext.
    pub pending_cleanup: u64,
    /// Expired and already redacted.
    pub already_cleaned: u64,
    /// Not yet expired.
    pub active: u64,
    pub total: u64,
}
