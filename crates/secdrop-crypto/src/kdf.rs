//! PBKDF2-HMAC-SHA-256 passphrase key derivation.

use sha2::Sha256;
use zeroize::Zeroizing;

/// PBKDF2 iteration count used by the codec.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Salt size in bytes.
pub const SALT_SIZE: usize = 16;

/// Derived key size in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// Derive a 256-bit key from a passphrase with the codec's iteration count.
pub fn derive_key(passphrase: &[u8], salt: &[u8; SALT_SIZE]) -> Zeroizing<[u8; KEY_SIZE]> {
    derive_key_with_iterations(passphrase, salt, PBKDF2_ITERATIONS)
}

/// Derive a key with a caller-chosen iteration count.
pub fn derive_key_with_iterations(
    passphrase: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Zeroizing<[u8; KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase, salt, iterations, &mut key[..]);
    key
}

/// Generate a random salt.
pub fn generate_salt() -> [u8; SALT_SIZE] {
    let mut salt = [0u8; SALT_SIZE];
    rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_rfc7914_vector() {
        // RFC 7914 section 11, PBKDF2-HMAC-SHA256 with c = 1
        let key = derive_key_with_iterations(b"passwd", b"salt", 1);
        assert_eq!(
            *key,
            hex!("55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc")
        );
    }

    #[test]
    fn test_derive_deterministic() {
        let salt = [7u8; SALT_SIZE];
        let k1 = derive_key_with_iterations(b"passphrase", &salt, 1000);
        let k2 = derive_key_with_iterations(b"passphrase", &salt, 1000);
        assert_eq!(*k1, *k2);
    }

    #[test]
    fn test_different_salts_differ() {
        let k1 = derive_key_with_iterations(b"passphrase", &[1u8; SALT_SIZE], 1000);
        let k2 = derive_key_with_iterations(b"passphrase", &[2u8; SALT_SIZE], 1000);
        assert_ne!(*k1, *k2);
    }

    #[test]
    fn test_iteration_count_matters() {
        let salt = [3u8; SALT_SIZE];
        let k1 = derive_key_with_iterations(b"pw", &salt, 1000);
        let k2 = derive_key_with_iterations(b"pw", &salt, 1001);
        assert_ne!(*k1, *k2);
    }

    #[test]
    fn test_generate_salt() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
