//! # secdrop-store
//!
//! The one-time drop lifecycle on top of `secdrop-db`.
//!
//! ## Components
//!
//! - [`DropStore`] — create, reveal, claim, redact
//! - [`AccessRecorder`] — first-write-wins decryption stamp and location
//! - [`ExpirySweeper`] — batch redaction of expired drops, cleanup stats
//! - [`VerificationProbe`] — read-only redaction check
//!
//! All components share one explicitly constructed [`StoreContext`]. Every
//! public operation takes the raw token, validates it before touching storage,
//! and reports exactly one [`secdrop_types::events::DropEvent`] to the
//! context's [`Observer`].

pub mod clock;
pub mod context;
pub mod observer;
pub mod probe;
pub mod recorder;
pub mod retry;
pub mod store;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::StoreContext;
pub use observer::{FanoutObserver, NoopObserver, Observer, RecordingObserver, TracingObserver};
pub use probe::VerificationProbe;
pub use recorder::{AccessRecorder, GeoPolicy};
pub use retry::RetryPolicy;
pub use store::{DropStore, RedactionCheck};
pub use sweeper::ExpirySweeper;

use secdrop_db::DbError;
use secdrop_types::events::Outcome;
use secdrop_types::UrlHashError;

/// Errors returned by store operations.
#[derive(Debug, thiserror::Error)]
pub enum DropError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("drop not found")]
    NotFound,

    #[error("drop expired")]
    Expired,

    #[error("drop already viewed")]
    AlreadyViewed,

    #[error("storage error: {message}")]
    Storage {
        message: String,
        /// Busy or locked database; the same statement may succeed later.
        transient: bool,
    },
}

pub type Result<T> = std::result::Result<T, DropError>;

/// What a caller outside the trust boundary is allowed to learn about a failure.
///
/// Missing, expired and already viewed drops are indistinguishable here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicFailure {
    Invalid(String),
    Unavailable,
    Storage,
}

impl DropError {
    /// A storage failure that retrying will not fix.
    pub fn storage(message: impl Into<String>) -> Self {
        DropError::Storage {
            message: message.into(),
            transient: false,
        }
    }

    /// Whether an idempotent operation may be re-issued after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DropError::Storage { transient: true, .. })
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            DropError::Validation(_) => Outcome::Rejected,
            DropError::NotFound => Outcome::NotFound,
            DropError::Expired => Outcome::Expired,
            DropError::AlreadyViewed => Outcome::AlreadyViewed,
            DropError::Storage { .. } => Outcome::StorageFailure,
        }
    }

    pub fn public(&self) -> PublicFailure {
        match self {
            DropError::Validation(msg) => PublicFailure::Invalid(msg.clone()),
            DropError::NotFound | DropError::Expired | DropError::AlreadyViewed => {
                PublicFailure::Unavailable
            }
            DropError::Storage { .. } => PublicFailure::Storage,
        }
    }
}

impl From<DbError> for DropError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(_) => DropError::NotFound,
            other => DropError::Storage {
                transient: other.is_transient(),
                message: other.to_string(),
            },
        }
    }
}

impl From<UrlHashError> for DropError {
    fn from(err: UrlHashError) -> Self {
        DropError::Validation(err.to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn busy() -> DbError {
        DbError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        ))
    }

    #[test]
    fn test_unavailable_collapses() {
        for err in [DropError::NotFound, DropError::Expired, DropError::AlreadyViewed] {
            assert_eq!(err.public(), PublicFailure::Unavailable);
        }
        assert_eq!(DropError::storage("disk").public(), PublicFailure::Storage);
    }

    #[test]
    fn test_only_transient_storage_is_retryable() {
        assert!(DropError::from(busy()).is_retryable());
        assert!(!DropError::storage("disk").is_retryable());
        assert!(!DropError::NotFound.is_retryable());
        assert!(!DropError::Validation("bad".into()).is_retryable());
    }

    #[test]
    fn test_db_error_mapping() {
        assert!(matches!(
            DropError::from(DbError::NotFound("drop".into())),
            DropError::NotFound
        ));
        assert!(matches!(
            DropError::from(DbError::Constraint("x".into())),
            DropError::Storage { transient: false, .. }
        ));
        assert!(matches!(
            DropError::from(DbError::Migration("newer schema".into())),
            DropError::Storage { transient: false, .. }
        ));
        assert!(matches!(
            DropError::from(busy()),
            DropError::Storage { transient: true, .. }
        ));
    }
}
