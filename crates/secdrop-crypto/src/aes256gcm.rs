//! AES-256-GCM AEAD encryption.
//!
//! Used by the codec to seal drop plaintext under a passphrase-derived key.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};

use crate::{CryptoError, Result};

/// Nonce size for AES-GCM (96 bits = 12 bytes).
pub const NONCE_SIZE: usize = 12;

/// Key size for AES-256 (256 bits = 32 bytes).
pub const KEY_SIZE: usize = 32;

/// Authentication tag size (128 bits = 16 bytes).
pub const TAG_SIZE: usize = 16;

/// Encrypt data with AES-256-GCM.
///
/// Returns the ciphertext with the 16-byte tag appended. The nonce must never
/// be reused with the same key.
pub fn encrypt(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| CryptoError::Encoding(e.to_string()))
}

/// Decrypt data with AES-256-GCM, verifying the tag.
pub fn decrypt(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decryption)
}

/// Generate a random nonce.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut nonce);
    nonce
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = [0x42u8; KEY_SIZE];
        let nonce = [0x01u8; NONCE_SIZE];

        let ciphertext = encrypt(&key, &nonce, b"Hello, SecDrop!").expect("encrypt");
        let decrypted = decrypt(&key, &nonce, &ciphertext).expect("decrypt");
        assert_eq!(decrypted, b"Hello, SecDrop!");
    }

    #[test]
    fn test_ciphertext_has_tag() {
        let ciphertext =
            encrypt(&[0x42u8; KEY_SIZE], &[0x01u8; NONCE_SIZE], b"test").expect("encrypt");
        assert_eq!(ciphertext.len(), 4 + TAG_SIZE);
    }

    #[test]
    fn test_wrong_key_fails() {
        let nonce = [0x01u8; NONCE_SIZE];
        let ciphertext = encrypt(&[0x01u8; KEY_SIZE], &nonce, b"test").expect("encrypt");
        assert!(matches!(
            decrypt(&[0x02u8; KEY_SIZE], &nonce, &ciphertext),
            Err(CryptoError::Decryption)
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = [0x01u8; KEY_SIZE];
        let nonce = [0x01u8; NONCE_SIZE];
        let mut ciphertext = encrypt(&key, &nonce, b"test").expect("encrypt");
        if let Some(byte) = ciphertext.first_mut() {
            *byte ^= 0xFF;
        }
        assert!(decrypt(&key, &nonce, &ciphertext).is_err());
    }

    #[test]
    fn test_empty_plaintext() {
        let key = [0x42u8; KEY_SIZE];
        let nonce = [0x01u8; NONCE_SIZE];
        let ciphertext = encrypt(&key, &nonce, b"").expect("encrypt");
        assert_eq!(ciphertext.len(), TAG_SIZE);
        assert!(decrypt(&key, &nonce, &ciphertext).expect("decrypt").is_empty());
    }

    #[test]
    fn test_generate_nonce() {
        assert_ne!(generate_nonce(), generate_nonce());
    }
}
