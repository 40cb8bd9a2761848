//! Client-side drop encryption codec.
//!
//! Wire format: `base64(nonce):base64(salt):base64(ciphertext || tag)` using
//! the standard base64 alphabet with padding, so a browser client using
//! WebCrypto and `btoa` produces byte-identical output.
//!
//! Key: PBKDF2-HMAC-SHA-256, 100,000 iterations, 16-byte salt.
//! Cipher: AES-256-GCM, 12-byte nonce.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use zeroize::{Zeroize, Zeroizing};

use crate::aes256gcm::{self, NONCE_SIZE, TAG_SIZE};
use crate::kdf::{self, SALT_SIZE};
use crate::{CryptoError, Result};

/// Field separator in the wire format.
pub const SEPARATOR: char = ':';

/// A parsed wire-format blob.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedMessage {
    pub nonce: [u8; NONCE_SIZE],
    pub salt: [u8; SALT_SIZE],
    /// Ciphertext with the GCM tag appended.
    pub ciphertext: Vec<u8>,
}

impl SealedMessage {
    /// Parse a wire string.
    ///
    /// Every failure maps to [`CryptoError::Decryption`] so parsing cannot be
    /// used to tell a malformed blob from a wrong passphrase.
    pub fn parse(wire: &str) -> Result<Self> {
        let mut parts = wire.split(SEPARATOR);
        let (Some(nonce), Some(salt), Some(body), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CryptoError::Decryption);
        };

        let nonce: [u8; NONCE_SIZE] = decode_field(nonce)?
            .try_into()
            .map_err(|_| CryptoError::Decryption)?;
        let salt: [u8; SALT_SIZE] = decode_field(salt)?
            .try_into()
            .map_err(|_| CryptoError::Decryption)?;
        let ciphertext = decode_field(body)?;
        if ciphertext.len() < TAG_SIZE {
            return Err(CryptoError::Decryption);
        }

        Ok(Self {
            nonce,
            salt,
            ciphertext,
        })
    }
}

impl fmt::Display for SealedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            STANDARD.encode(self.nonce),
            STANDARD.encode(self.salt),
            STANDARD.encode(&self.ciphertext)
        )
    }
}

impl fmt::Debug for SealedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedMessage")
            .field("ciphertext_len", &self.ciphertext.len())
            .finish_non_exhaustive()
    }
}

fn decode_field(field: &str) -> Result<Vec<u8>> {
    STANDARD.decode(field).map_err(|_| CryptoError::Decryption)
}

/// Encrypt `plaintext` under `passphrase` with a fresh salt and nonce.
pub fn encrypt(plaintext: &str, passphrase: &str) -> Result<String> {
    encrypt_with_parts(
        plaintext,
        passphrase,
        kdf::generate_salt(),
        aes256gcm::generate_nonce(),
    )
}

/// Encrypt with caller-supplied salt and nonce.
///
/// Only for producing reproducible test vectors; real callers use [`encrypt`].
pub fn encrypt_with_parts(
    plaintext: &str,
    passphrase: &str,
    salt: [u8; SALT_SIZE],
    nonce: [u8; NONCE_SIZE],
) -> Result<String> {
    let key = kdf::derive_key(passphrase.as_bytes(), &salt);
    let ciphertext = aes256gcm::encrypt(&key, &nonce, plaintext.as_bytes())?;
    Ok(SealedMessage {
        nonce,
        salt,
        ciphertext,
    }
    .to_string())
}

/// Decrypt a wire string with `passphrase`.
///
/// Wrong passphrase, tampering, malformed input and non-UTF-8 plaintext are
/// all reported as the same [`CryptoError::Decryption`].
pub fn decrypt(wire: &str, passphrase: &str) -> Result<Zeroizing<String>> {
    let sealed = SealedMessage::parse(wire)?;
    let key = kdf::derive_key(passphrase.as_bytes(), &sealed.salt);
    let plaintext = aes256gcm::decrypt(&key, &sealed.nonce, &sealed.ciphertext)?;
    match String::from_utf8(plaintext) {
        Ok(text) => Ok(Zeroizing::new(text)),
        Err(e) => {
            e.into_bytes().zeroize();
            Err(CryptoError::Decryption)
        }
    }
}

/// Cheap syntactic check: three non-empty colon-separated base64-alphabet
/// segments. Does not decode or verify anything.
pub fn is_valid_format(s: &str) -> bool {
    let parts: Vec<&str> = s.split(SEPARATOR).collect();
    parts.len() == 3
        && parts.iter().all(|part| {
            !part.is_empty()
                && part
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let wire = encrypt("meet me at the usual place", "hunter2").expect("encrypt");
        let plain = decrypt(&wire, "hunter2").expect("decrypt");
        assert_eq!(plain.as_str(), "meet me at the usual place");
    }

    #[test]
    fn test_roundtrip_unicode_and_empty() {
        for text in ["", "ünïcødé 🔐 текст", "line1\nline2:with:colons"] {
            let wire = encrypt(text, "pässwörd").expect("encrypt");
            assert_eq!(decrypt(&wire, "pässwörd").expect("decrypt").as_str(), text);
        }
    }

    #[test]
    fn test_wrong_passphrase_fails_generically() {
        let wire = encrypt("secret", "right").expect("encrypt");
        assert!(matches!(decrypt(&wire, "wrong"), Err(CryptoError::Decryption)));
    }

    #[test]
    fn test_corrupted_ciphertext_fails_generically() {
        let wire = encrypt("secret", "pw").expect("encrypt");
        let mut sealed = SealedMessage::parse(&wire).expect("parse");
        if let Some(byte) = sealed.ciphertext.last_mut() {
            *byte ^= 0x01;
        }
        let corrupted = sealed.to_string();
        let wrong_key = decrypt(&wire, "other").expect_err("wrong key");
        let tampered = decrypt(&corrupted, "pw").expect_err("tampered");
        assert_eq!(wrong_key.to_string(), tampered.to_string());
    }

    #[test]
    fn test_malformed_wire_fails_generically() {
        for wire in [
            "",
            "AAAA:BBBB",
            "AAAA:BBBB:CCCC:DDDD",
            "not base64!:AAAA:AAAA",
            "AAAA:BBBB:CCCC",
        ] {
            assert!(matches!(decrypt(wire, "pw"), Err(CryptoError::Decryption)), "{wire}");
        }
    }

    #[test]
    fn test_fresh_randomness_per_call() {
        let a = encrypt("same", "same").expect("encrypt");
        let b = encrypt("same", "same").expect("encrypt");
        assert_ne!(a, b);

        let sa = SealedMessage::parse(&a).expect("parse");
        let sb = SealedMessage::parse(&b).expect("parse");
        assert_ne!(sa.nonce, sb.nonce);
        assert_ne!(sa.salt, sb.salt);
    }

    #[test]
    fn test_wire_layout() {
        let wire = encrypt_with_parts("abc", "pw", [2u8; SALT_SIZE], [1u8; NONCE_SIZE])
            .expect("encrypt");
        let parts: Vec<&str> = wire.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], STANDARD.encode([1u8; NONCE_SIZE]));
        assert_eq!(parts[1], STANDARD.encode([2u8; SALT_SIZE]));
        assert_eq!(STANDARD.decode(parts[2]).expect("b64").len(), 3 + TAG_SIZE);
        assert!(is_valid_format(&wire));
    }

    #[test]
    fn test_deterministic_with_parts() {
        let a = encrypt_with_parts("abc", "pw", [9u8; SALT_SIZE], [8u8; NONCE_SIZE]).expect("a");
        let b = encrypt_with_parts("abc", "pw", [9u8; SALT_SIZE], [8u8; NONCE_SIZE]).expect("b");
        assert_eq!(a, b);
    }

    #[test]
    fn test_is_valid_format() {
        assert!(is_valid_format("AAAA:BBBB:CCCC"));
        assert!(is_valid_format("ab+/:cd==:ef09"));
        assert!(!is_valid_format("AAAA:BBBB"));
        assert!(!is_valid_format("AAAA:BBBB:CCCC:DDDD"));
        assert!(!is_valid_format("AAAA::CCCC"));
        assert!(!is_valid_format("AA-A:BBBB:CCCC"));
        assert!(!is_valid_format("plain text"));
    }
}
