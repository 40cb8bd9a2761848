//! Capability token generation.
//!
//! `token = hex(SHA-256(ciphertext | iso_timestamp | hex(random_128)))[..32]`
//!
//! The 128-bit random component is what makes tokens unguessable and
//! collision resistant; ciphertext and timestamp only add domain spread.

use chrono::{DateTime, SecondsFormat, Utc};
use secdrop_types::{UrlHash, URL_HASH_LEN};
use sha2::{Digest, Sha256};

use crate::{CryptoError, Result};

/// Bytes of fresh randomness mixed into every token. Must stay >= 16.
pub const TOKEN_ENTROPY_BYTES: usize = 16;

/// Generate a fresh capability token for a ciphertext created at `timestamp`.
pub fn generate_hash(ciphertext: &str, timestamp: DateTime<Utc>) -> Result<UrlHash> {
    let mut entropy = [0u8; TOKEN_ENTROPY_BYTES];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut entropy);
    hash_with_entropy(ciphertext, timestamp, &entropy)
}

/// Token derivation with explicit entropy.
pub fn hash_with_entropy(
    ciphertext: &str,
    timestamp: DateTime<Utc>,
    entropy: &[u8; TOKEN_ENTROPY_BYTES],
) -> Result<UrlHash> {
    let mut hasher = Sha256::new();
    hasher.update(ciphertext.as_bytes());
    hasher.update(b"|");
    hasher.update(
        timestamp
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .as_bytes(),
    );
    hasher.update(b"|");
    hasher.update(hex::encode(entropy).as_bytes());
    let digest = hex::encode(hasher.finalize());

    UrlHash::parse(&digest[..URL_HASH_LEN]).map_err(|e| CryptoError::Encoding(e.to_string()))
}
