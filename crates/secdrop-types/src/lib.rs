//! # secdrop-types
//!
//! Shared domain types used across the SecDrop workspace.
//!
//! Every type that crosses the daemon's JSON-RPC boundary derives
//! `ts_rs::TS` so the browser client can consume generated bindings.

pub mod drop;
pub mod events;
pub mod sweep;
pub mod url_hash;

pub use url_hash::{UrlHash, UrlHashError};

/// Default time-to-live for a new drop, in days.
pub const DEFAULT_TTL_DAYS: u32 = 7;

/// Length of a capability token in hex characters (128 bits).
pub const URL_HASH_LEN: usize = 32;

/// Number of token characters that may appear in logs and events.
pub const LOG_PREFIX_LEN: usize = 8;
