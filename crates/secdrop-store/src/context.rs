//! Shared handles for store components.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use secdrop_types::events::{Component, DropEvent, Operation, Outcome};
use secdrop_types::UrlHash;
use tokio::sync::Mutex;

use crate::{Clock, DropError, Observer, Result, RetryPolicy, SystemClock, TracingObserver};

/// Storage handle, clock, event sink and retry policy.
///
/// Built once at startup and cloned into each component. The connection lock
/// is taken for one statement (or one claim transaction) at a time.
#[derive(Clone)]
pub struct StoreContext {
    db: Arc<Mutex<Connection>>,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn Observer>,
    retry: RetryPolicy,
}

impl StoreContext {
    pub fn new(conn: Connection) -> Self {
        Self::from_shared(Arc::new(Mutex::new(conn)))
    }

    pub fn from_shared(db: Arc<Mutex<Connection>>) -> Self {
        Self {
            db,
            clock: Arc::new(SystemClock),
            observer: Arc::new(TracingObserver),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn db(&self) -> &Arc<Mutex<Connection>> {
        &self.db
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Current time, truncated to the second the database stores.
    pub fn now(&self) -> DateTime<Utc> {
        let now = self.clock.now();
        from_unix(now.timestamp()).unwrap_or(now)
    }

    /// Run one storage call under the connection lock.
    pub(crate) async fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> secdrop_db::Result<T>,
    ) -> secdrop_db::Result<T> {
        let conn = self.db.lock().await;
        f(&conn)
    }

    /// Validate a raw token, reporting a rejection event if it is malformed.
    pub(crate) fn parse_hash(
        &self,
        component: Component,
        operation: Operation,
        raw: &str,
        started: Instant,
    ) -> Result<UrlHash> {
        UrlHash::parse(raw).map_err(|e| {
            self.emit(component, operation, None, Outcome::Rejected, started);
            DropError::from(e)
        })
    }

    /// Report a finished operation, deriving the outcome from its result.
    pub(crate) fn finish<T>(
        &self,
        component: Component,
        operation: Operation,
        hash: Option<&UrlHash>,
        started: Instant,
        result: &Result<T>,
    ) {
        let outcome = match result {
            Ok(_) => Outcome::Ok,
            Err(e) => e.outcome(),
        };
        self.emit(component, operation, hash, outcome, started);
    }

    pub(crate) fn emit(
        &self,
        component: Component,
        operation: Operation,
        hash: Option<&UrlHash>,
        outcome: Outcome,
        started: Instant,
    ) {
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.observer.observe(&DropEvent {
            component,
            operation,
            hash_prefix: hash.map(|h| h.prefix().to_string()),
            outcome,
            latency_ms,
        });
    }
}

/// Convert stored epoch seconds to a timestamp.
pub(crate) fn from_unix(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| DropError::storage(format!("timestamp out of range: {secs}")))
}
