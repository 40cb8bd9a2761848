//! Capability token for addressing a drop.
//!
//! A `UrlHash` can only be obtained through [`UrlHash::parse`], so holding one
//! means the structural check (32 lowercase hex characters) already passed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{LOG_PREFIX_LEN, URL_HASH_LEN};

/// Why a candidate token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlHashError {
    #[error("url hash must be {URL_HASH_LEN} characters, got {0}")]
    WrongLength(usize),

    #[error("url hash must contain only lowercase hex characters")]
    NotLowercaseHex,
}

/// A validated 32-character lowercase hex capability token.
#[derive(Clone, PartialEq, Eq, Hash, ts_rs::TS)]
pub struct UrlHash(String);

impl UrlHash {
    /// Validate and wrap a raw token.
    pub fn parse(raw: &str) -> Result<Self, UrlHashError> {
        if raw.len() != URL_HASH_LEN {
            return Err(UrlHashError::WrongLength(raw.len()));
        }
        if !raw.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(UrlHashError::NotLowercaseHex);
        }
        Ok(Self(raw.to_string()))
    }

    /// The full token. Never log this.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Truncated form that is safe to put in logs and events.
    pub fn prefix(&self) -> &str {
        &self.0[..LOG_PREFIX_LEN]
    }
}

impl FromStr for UrlHash {
    type Err = UrlHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for UrlHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Debug output is truncated so tokens cannot leak through `{:?}` in logs.
impl fmt::Debug for UrlHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UrlHash({}…)", self.prefix())
    }
}

impl Serialize for UrlHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UrlHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
