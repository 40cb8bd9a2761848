//! Drop row queries.
//!
//! Each public function is a single atomic statement, except [`claim`] which
//! runs one `BEGIN IMMEDIATE` transaction. Callers must not hold a connection
//! across several of these calls to "extend" atomicity.

use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior};

use crate::{DbError, Result};

const DROP_COLUMNS: &str = "id, url_hash, ciphertext, created_at, expires_at, accessed,
     access_count, decrypted_at, access_ip, access_city, access_country";

/// A raw drop row.
#[derive(Clone, PartialEq, Eq)]
pub struct DropRow {
    pub id: i64,
    pub url_hash: String,
    pub ciphertext: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub accessed: bool,
    pub access_count: i64,
    pub decrypted_at: Option<i64>,
    pub access_ip: Option<String>,
    pub access_city: Option<String>,
    pub access_country: Option<String>,
}

impl std::fmt::Debug for DropRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropRow")
            .field("id", &self.id)
            .field("ciphertext_len", &self.ciphertext.len())
            .field("expires_at", &self.expires_at)
            .field("access_count", &self.access_count)
            .field("decrypted_at", &self.decrypted_at)
            .finish_non_exhaustive()
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<DropRow> {
    Ok(DropRow {
        id: row.get(0)?,
        url_hash: row.get(1)?,
        ciphertext: row.get(2)?,
        created_at: row.get(3)?,
        expires_at: row.get(4)?,
        accessed: row.get(5)?,
        access_count: row.get(6)?,
        decrypted_at: row.get(7)?,
        access_ip: row.get(8)?,
        access_city: row.get(9)?,
        access_country: row.get(10)?,
    })
}

/// Outcome of a reveal or claim attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealOutcome {
    /// Ciphertext handed out. The row reflects the post-update counters.
    Revealed(DropRow),
    /// Past its deadline; the row has now been redacted.
    Expired,
    /// Ciphertext was already empty.
    AlreadyViewed,
    NotFound,
}

/// Coarse location stored with the first decryption stamp.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoColumns<'a> {
    pub ip: Option<&'a str>,
    pub city: Option<&'a str>,
    pub country: Option<&'a str>,
}

/// Result of a decryption stamp attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecryptionRecord {
    pub decrypted_at: i64,
    /// False when an earlier stamp was already present and kept.
    pub newly_recorded: bool,
}

/// Insert a new drop, returning its id.
///
/// A duplicate `url_hash` yields [`DbError::Constraint`].
pub fn insert(
    conn: &Connection,
    url_hash: &str,
    ciphertext: &str,
    created_at: i64,
    expires_at: i64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO drops (url_hash, ciphertext, created_at, expires_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![url_hash, ciphertext, created_at, expires_at],
    )
    .map_err(DbError::classify)?;
    Ok(conn.last_insert_rowid())
}

/// Fetch a drop by token without touching it.
pub fn get(conn: &Connection, url_hash: &str) -> Result<DropRow> {
    conn.query_row(
        &format!("SELECT {DROP_COLUMNS} FROM drops WHERE url_hash = ?1"),
        [url_hash],
        map_row,
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound("drop".to_string()))
}

/// Count a reveal attempt and hand out the ciphertext if it is still live.
///
/// One conditional update: the attempt is always counted, and if `now` is past
/// the deadline the ciphertext is cleared in the same statement. The
/// ciphertext is not cleared on a successful reveal; see [`claim`].
pub fn reveal(conn: &Connection, url_hash: &str, now: i64) -> Result<RevealOutcome> {
    let row = conn
        .query_row(
            &format!(
                "UPDATE drops
                 SET access_count = access_count + 1,
                     accessed = 1,
                     ciphertext = CASE WHEN ?2 > expires_at THEN '' ELSE ciphertext END
                 WHERE url_hash = ?1
                 RETURNING {DROP_COLUMNS}"
            ),
            rusqlite::params![url_hash, now],
            map_row,
        )
        .optional()
        .map_err(DbError::classify)?;

    Ok(match row {
        None => RevealOutcome::NotFound,
        Some(row) if now > row.expires_at => RevealOutcome::Expired,
        Some(row) if row.ciphertext.is_empty() => RevealOutcome::AlreadyViewed,
        Some(row) => RevealOutcome::Revealed(row),
    })
}

/// Reveal and redact in one write transaction.
///
/// The returned row carries the ciphertext as it was before the redaction.
/// Of any number of concurrent claims on one token, at most one sees it.
pub fn claim(conn: &Connection, url_hash: &str, now: i64) -> Result<RevealOutcome> {
    let tx = rusqlite::Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let before = tx
        .query_row(
            &format!("SELECT {DROP_COLUMNS} FROM drops WHERE url_hash = ?1"),
            [url_hash],
            map_row,
        )
        .optional()?;

    let outcome = match before {
        None => RevealOutcome::NotFound,
        Some(mut row) => {
            tx.execute(
                "UPDATE drops
                 SET ciphertext = '', accessed = 1, access_count = access_count + 1
                 WHERE url_hash = ?1",
                [url_hash],
            )
            .map_err(DbError::classify)?;
            row.accessed = true;
            row.access_count += 1;

            if now > row.expires_at {
                RevealOutcome::Expired
            } else if row.ciphertext.is_empty() {
                RevealOutcome::AlreadyViewed
            } else {
                RevealOutcome::Revealed(row)
            }
        }
    };

    tx.commit()?;
    Ok(outcome)
}

/// Stamp the first decryption time and location; later calls keep the first.
pub fn record_decryption(
    conn: &Connection,
    url_hash: &str,
    now: i64,
    geo: GeoColumns<'_>,
) -> Result<DecryptionRecord> {
    let stamped: Option<i64> = conn
        .query_row(
            "UPDATE drops
             SET decrypted_at = ?2, access_ip = ?3, access_city = ?4, access_country = ?5
             WHERE url_hash = ?1 AND decrypted_at IS NULL
             RETURNING decrypted_at",
            rusqlite::params![url_hash, now, geo.ip, geo.city, geo.country],
            |row| row.get(0),
        )
        .optional()
        .map_err(DbError::classify)?;

    if let Some(decrypted_at) = stamped {
        return Ok(DecryptionRecord {
            decrypted_at,
            newly_recorded: true,
        });
    }

    // Either the drop is unknown or an earlier stamp won. Stamps are
    // write-once, so a non-null value read here can no longer change.
    let existing: Option<Option<i64>> = conn
        .query_row(
            "SELECT decrypted_at FROM drops WHERE url_hash = ?1",
            [url_hash],
            |row| row.get(0),
        )
        .optional()?;

    match existing {
        None => Err(DbError::NotFound("drop".to_string())),
        Some(Some(decrypted_at)) => Ok(DecryptionRecord {
            decrypted_at,
            newly_recorded: false,
        }),
        Some(None) => Err(DbError::Constraint(
            "decryption stamp missing after conditional update".to_string(),
        )),
    }
}

/// Clear the ciphertext. Idempotent; returns the decryption stamp, if any.
pub fn redact(conn: &Connection, url_hash: &str) -> Result<Option<i64>> {
    conn.query_row(
        "UPDATE drops SET ciphertext = '' WHERE url_hash = ?1 RETURNING decrypted_at",
        [url_hash],
        |row| row.get::<_, Option<i64>>(0),
    )
    .optional()
    .map_err(DbError::classify)?
    .ok_or_else(|| DbError::NotFound("drop".to_string()))
}

/// Read-only: whether the ciphertext is empty, and the decryption stamp.
pub fn redaction_status(conn: &Connection, url_hash: &str) -> Result<(bool, Option<i64>)> {
    conn.query_row(
        "SELECT ciphertext = '', decrypted_at FROM drops WHERE url_hash = ?1",
        [url_hash],
        |row| Ok((row.get::<_, bool>(0)?, row.get::<_, Option<i64>>(1)?)),
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound("drop".to_string()))
}
