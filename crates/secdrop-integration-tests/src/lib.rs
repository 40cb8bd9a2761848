//! Integration test crate for SecDrop.
//!
//! This crate has no library code. It only contains integration tests that
//! exercise end-to-end drop flows across the workspace crates, from client
//! encryption through storage, expiry and redaction checks.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p secdrop-integration-tests
//! ```
