//! # secdrop-crypto
//!
//! Cryptographic primitives for SecDrop.
//!
//! The suite is fixed; there is no algorithm negotiation.
//!
//! ## Modules
//!
//! - [`kdf`] — PBKDF2-HMAC-SHA-256 passphrase key derivation
//! - [`aes256gcm`] — AES-256-GCM AEAD encryption
//! - [`codec`] — client-side `nonce:salt:ciphertext` wire format
//! - [`address`] — SHA-256 capability token generation
//!
//! The codec runs only in the sending and receiving clients. No server-side
//! component accepts a plaintext or a passphrase.

pub mod address;
pub mod aes256gcm;
pub mod codec;
pub mod kdf;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// An underlying primitive failed while producing output.
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// Decryption failed.
    ///
    /// Deliberately carries no detail: a wrong passphrase, a corrupted
    /// ciphertext and a malformed wire string all produce this same value.
    #[error("decryption failed")]
    Decryption,
}

pub type Result<T> = std::result::Result<T, CryptoError>;
