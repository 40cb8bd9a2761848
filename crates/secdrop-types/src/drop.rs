//! Shapes returned by drop operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UrlHash;

/// Result of creating a drop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "camelCase")]
pub struct CreatedDrop {
    pub id: i64,
    pub url_hash: UrlHash,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Ciphertext handed to a recipient by a reveal or claim.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "camelCase")]
pub struct RevealedDrop {
    pub ciphertext: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub access_count: u64,
}

// Keeps ciphertext out of `{:?}` output.
impl std::fmt::Debug for RevealedDrop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevealedDrop")
            .field("ciphertext_len", &self.ciphertext.len())
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .field("access_count", &self.access_count)
            .finish()
    }
}

/// Coarse access location reported alongside a decryption.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
pub struct GeoInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl GeoInfo {
    pub fn is_empty(&self) -> bool {
        self.ip.is_none() && self.city.is_none() && self.country.is_none()
    }
}

/// Outcome of recording a decryption or redacting a drop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "camelCase")]
pub struct DecryptionStamp {
    pub decrypted_at: Option<DateTime<Utc>>,
}

/// Read-only redaction check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[serde(rename_all = "camelCase")]
pub struct RedactionStatus {
    pub is_cleared: bool,
    pub decrypted_at: Option<DateTime<Utc>>,
}
