//! Bulk expiry queries.

use rusqlite::Connection;

use crate::{DbError, Result};

/// Counts for the sweep statistics snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepCounts {
    /// Expired, ciphertext still present.
    pub pending_cleanup: u64,
    /// Expired, ciphertext already cleared.
    pub already_cleaned: u64,
    /// Not yet expired. Includes live drops that were viewed and redacted.
    pub active: u64,
    pub total: u64,
}

/// Redact every drop whose deadline is strictly before `now`.
///
/// The redacted rows are marked accessed, and any missing decryption stamp is
/// filled with `now`. Already redacted rows are left alone. Returns the ids
/// that changed, in ascending order.
pub fn redact_expired(conn: &Connection, now: i64) -> Result<Vec<i64>> {
    let mut stmt = conn.prepare(
        "UPDATE drops
         SET ciphertext = '',
             accessed = 1,
             decrypted_at = COALESCE(decrypted_at, ?1)
         WHERE expires_at < ?1 AND ciphertext <> ''
         RETURNING id",
    )?;
    let mut ids = stmt
        .query_map([now], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(DbError::classify)?;
    ids.sort_unstable();
    Ok(ids)
}

/// Read-only counts of drops by cleanup state.
pub fn stats(conn: &Connection, now: i64) -> Result<SweepCounts> {
    let counts = conn.query_row(
        "SELECT
             COALESCE(SUM(CASE WHEN expires_at < ?1 AND ciphertext <> '' THEN 1 ELSE 0 END), 0),
             COALESCE(SUM(CASE WHEN expires_at < ?1 AND ciphertext = '' THEN 1 ELSE 0 END), 0),
             COALESCE(SUM(CASE WHEN expires_at >= ?1 THEN 1 ELSE 0 END), 0),
             COUNT(*)
         FROM drops",
        [now],
        |row| {
            Ok(SweepCounts {
                pending_cleanup: row.get::<_, i64>(0)?.unsigned_abs(),
                already_cleaned: row.get::<_, i64>(1)?.unsigned_abs(),
                active: row.get::<_, i64>(2)?.unsigned_abs(),
                total: row.get::<_, i64>(3)?.unsigned_abs(),
            })
        },
    )?;
    Ok(counts)
}
