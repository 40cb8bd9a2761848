//! Structured events emitted by store components.
//!
//! Events carry only a truncated hash prefix, never a full token, ciphertext
//! or passphrase.

use serde::{Deserialize, Serialize};

/// Which component produced an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    DropStore,
    AccessRecorder,
    ExpirySweeper,
    VerificationProbe,
}

/// The operation that was attempted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Reveal,
    Claim,
    RecordDecryption,
    Redact,
    VerifyRedacted,
    Sweep,
    Stats,
}

/// How the operation ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    /// Idempotent write that changed nothing (e.g. a repeated decryption stamp).
    Unchanged,
    Rejected,
    NotFound,
    Expired,
    AlreadyViewed,
    StorageFailure,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Ok | Outcome::Unchanged)
    }
}

/// One observed store operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
pub struct DropEvent {
    pub component: Component,
    pub operation: Operation,
    /// First characters of the token, if the operation was keyed by one.
    pub hash_prefix: Option<String>,
    pub outcome: Outcome,
    pub latency_ms: u64,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Reveal => "reveal",
            Operation::Claim => "claim",
            Operation::RecordDecryption => "record_decryption",
            Operation::Redact => "redact",
            Operation::VerifyRedacted => "verify_redacted",
            Operation::Sweep => "sweep",
            Operation::Stats => "stats",
        }
    }
}
