//! Test vector generator for SecDrop.
//!
//! Generates `test_vectors.json` with deterministic codec, key derivation and
//! token vectors. A browser client checks its WebCrypto implementation
//! against this file.
//!
//! Usage:
//!   secdrop-testvec              # Generate test_vectors.json
//!   secdrop-testvec --verify     # Verify test vectors match expected values

use std::collections::BTreeMap;

use anyhow::Context;
use chrono::{TimeZone, Utc};
use secdrop_crypto::{address, codec, kdf};
use secdrop_types::UrlHash;
use serde::{Deserialize, Serialize};

const VECTORS_PATH: &str = "tests/fixtures/test_vectors.json";

const PASSPHRASE: &str = "correct horse battery staple";
const PLAINTEXT: &str = "The vault code is 4921. Burn after reading.";
const SALT: [u8; kdf::SALT_SIZE] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
];
const NONCE: [u8; 12] = [
    0xa0, 0xa1, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6, 0xa7, 0xa8, 0xa9, 0xaa, 0xab,
];

#[derive(Serialize, Deserialize)]
struct TestVectors {
    version: String,
    generated_by: String,
    vectors: BTreeMap<String, TestVector>,
}

#[derive(Serialize, Deserialize)]
struct TestVector {
    description: String,
    inputs: BTreeMap<String, String>,
    outputs: BTreeMap<String, String>,
}

fn generate_kdf_vectors() -> BTreeMap<String, TestVector> {
    let mut vectors = BTreeMap::new();

    let key = kdf::derive_key(PASSPHRASE.as_bytes(), &SALT);
    vectors.insert(
        "pbkdf2_sha256_100k".to_string(),
        TestVector {
            description: "PBKDF2-HMAC-SHA-256, 100000 iterations, 32-byte output".to_string(),
            inputs: BTreeMap::from([
                ("passphrase".to_string(), PASSPHRASE.to_string()),
                ("salt".to_string(), hex::encode(SALT)),
                ("iterations".to_string(), kdf::PBKDF2_ITERATIONS.to_string()),
            ]),
            outputs: BTreeMap::from([("key".to_string(), hex::encode(*key))]),
        },
    );

    vectors
}

fn generate_codec_vectors() -> anyhow::Result<BTreeMap<String, TestVector>> {
    let mut vectors = BTreeMap::new();

    let cases = [
        ("codec_ascii", PLAINTEXT),
        ("codec_unicode", "Schlüssel: 🔑 ключ"),
        ("codec_empty_plaintext", ""),
    ];

    for (name, plaintext) in cases {
        let wire = codec::encrypt_with_parts(plaintext, PASSPHRASE, SALT, NONCE)
            .with_context(|| format!("encrypt {name}"))?;
        let roundtrip =
            codec::decrypt(&wire, PASSPHRASE).with_context(|| format!("decrypt {name}"))?;
        vectors.insert(
            name.to_string(),
            TestVector {
                description: "base64(nonce):base64(salt):base64(AES-256-GCM(ciphertext||tag))"
                    .to_string(),
                inputs: BTreeMap::from([
                    ("plaintext".to_string(), plaintext.to_string()),
                    ("passphrase".to_string(), PASSPHRASE.to_string()),
                    ("salt".to_string(), hex::encode(SALT)),
                    ("nonce".to_string(), hex::encode(NONCE)),
                ]),
                outputs: BTreeMap::from([
                    ("wire".to_string(), wire),
                    ("decrypted".to_string(), roundtrip.to_string()),
                ]),
            },
        );
    }

    Ok(vectors)
}

fn generate_format_vectors() -> BTreeMap<String, TestVector> {
    let mut vectors = BTreeMap::new();

    let cases = [
        ("format_valid", "AAAA:BBBB:CCCC"),
        ("format_two_segments", "AAAA:BBBB"),
        ("format_empty_segment", "AAAA::CCCC"),
        ("format_bad_alphabet", "AAAA:BB-B:CCCC"),
    ];
    for (name, candidate) in cases {
        vectors.insert(
            name.to_string(),
            TestVector {
                description: "is_valid_format: three non-empty [A-Za-z0-9+/=] segments".to_string(),
                inputs: BTreeMap::from([("candidate".to_string(), candidate.to_string())]),
                outputs: BTreeMap::from([(
                    "valid".to_string(),
                    codec::is_valid_format(candidate).to_string(),
                )]),
            },
        );
    }

    vectors
}

fn generate_token_vectors() -> anyhow::Result<BTreeMap<String, TestVector>> {
    let mut vectors = BTreeMap::new();

    let timestamp = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .context("fixed timestamp")?;
    let entropy: [u8; address::TOKEN_ENTROPY_BYTES] = SALT;
    let token = address::hash_with_entropy("AAAA:BBBB:CCCC", timestamp, &entropy)?;
    vectors.insert(
        "token_derivation".to_string(),
        TestVector {
            description: "hex(SHA-256(ciphertext|iso_millis|hex(entropy)))[..32]".to_string(),
            inputs: BTreeMap::from([
                ("ciphertext".to_string(), "AAAA:BBBB:CCCC".to_string()),
                ("timestamp".to_string(), "2024-01-01T00:00:00.000Z".to_string()),
                ("entropy".to_string(), hex::encode(entropy)),
            ]),
            outputs: BTreeMap::from([("url_hash".to_string(), token.to_string())]),
        },
    );

    let candidates = [
        ("token_valid", "0123456789abcdef0123456789abcdef"),
        ("token_uppercase", "0123456789ABCDEF0123456789ABCDEF"),
        ("token_short", "0123456789abcdef"),
        ("token_non_hex", "0123456789abcdef0123456789abcdeg"),
    ];
    for (name, candidate) in candidates {
        vectors.insert(
            name.to_string(),
            TestVector {
                description: "token validation: exactly 32 chars of [0-9a-f]".to_string(),
                inputs: BTreeMap::from([("candidate".to_string(), candidate.to_string())]),
                outputs: BTreeMap::from([(
                    "valid".to_string(),
                    UrlHash::parse(candidate).is_ok().to_string(),
                )]),
            },
        );
    }

    Ok(vectors)
}

fn generate_all_vectors() -> anyhow::Result<TestVectors> {
    let mut all_vectors = BTreeMap::new();

    all_vectors.extend(generate_kdf_vectors());
    all_vectors.extend(generate_codec_vectors()?);
    all_vectors.extend(generate_format_vectors());
    all_vectors.extend(generate_token_vectors()?);

    Ok(TestVectors {
        version: "1.0".to_string(),
        generated_by: "secdrop-testvec".to_string(),
        vectors: all_vectors,
    })
}

/// Check stored vectors against a fresh generation, and that every stored
/// codec wire string still decrypts to its plaintext.
fn verify_vectors(vectors: &TestVectors) -> anyhow::Result<bool> {
    let regenerated = generate_all_vectors()?;
    let mut all_pass = true;

    for (name, expected) in &vectors.vectors {
        let Some(actual) = regenerated.vectors.get(name) else {
            eprintln!("MISSING: {name}");
            all_pass = false;
            continue;
        };
        if actual.outputs != expected.outputs {
            eprintln!("FAIL: {name}");
            eprintln!("  expected: {:?}", expected.outputs);
            eprintln!("  actual:   {:?}", actual.outputs);
            all_pass = false;
            continue;
        }
        if let (Some(wire), Some(plaintext), Some(passphrase)) = (
            expected.outputs.get("wire"),
            expected.inputs.get("plaintext"),
            expected.inputs.get("passphrase"),
        ) {
            match codec::decrypt(wire, passphrase) {
                Ok(decrypted) if decrypted.as_str() == plaintext => {}
                _ => {
                    eprintln!("FAIL: {name} (stored wire does not decrypt)");
                    all_pass = false;
                    continue;
                }
            }
        }
        eprintln!("PASS: {name}");
    }

    Ok(all_pass)
}

fn write_vectors(vectors: &TestVectors) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(vectors)?;
    if let Some(parent) = std::path::Path::new(VECTORS_PATH).parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(VECTORS_PATH, json).with_context(|| format!("write {VECTORS_PATH}"))?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let vectors = if args.iter().any(|a| a == "--verify") {
        // Verify mode: load existing vectors and check
        match std::fs::read_to_string(VECTORS_PATH) {
            Ok(content) => {
                let vectors: TestVectors =
                    serde_json::from_str(&content).context("parse test vectors")?;
                if verify_vectors(&vectors)? {
                    eprintln!("All test vectors verified successfully.");
                    return Ok(());
                }
                eprintln!("Test vector verification FAILED.");
                std::process::exit(1);
            }
            Err(_) => {
                eprintln!("No existing test vectors found at {VECTORS_PATH}. Generating...");
                generate_all_vectors()?
            }
        }
    } else {
        generate_all_vectors()?
    };

    write_vectors(&vectors)?;
    eprintln!("Generated {} test vectors to {VECTORS_PATH}", vectors.vectors.len());

    // Self-verify
    if verify_vectors(&vectors)? {
        eprintln!("Self-verification passed.");
        Ok(())
    } else {
        eprintln!("Self-verification FAILED.");
        std::process::exit(1);
    }
}
