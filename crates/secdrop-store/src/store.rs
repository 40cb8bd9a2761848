//! Drop creation, reveal, claim and redaction.

use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use secdrop_crypto::address;
use secdrop_db::queries::drops::{self, DropRow, RevealOutcome};
use secdrop_db::DbError;
use secdrop_types::drop::{CreatedDrop, DecryptionStamp, RedactionStatus, RevealedDrop};
use secdrop_types::events::{Component, Operation};
use secdrop_types::{UrlHash, DEFAULT_TTL_DAYS};
use tracing::{debug, warn};

use crate::context::from_unix;
use crate::{DropError, Result, StoreContext, VerificationProbe};

/// Token generations attempted before a create gives up on collisions.
const MAX_CREATE_ATTEMPTS: u32 = 3;

/// Result of [`DropStore::redact_and_verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedactionCheck {
    /// The probe saw the ciphertext cleared.
    Confirmed(RedactionStatus),
    /// Redaction was issued but the probe never observed it.
    Unconfirmed {
        decrypted_at: Option<DateTime<Utc>>,
    },
}

impl RedactionCheck {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, RedactionCheck::Confirmed(_))
    }
}

#[derive(Clone)]
pub struct DropStore {
    ctx: StoreContext,
    probe: VerificationProbe,
    default_ttl_days: u32,
}

impl DropStore {
    pub fn new(ctx: StoreContext) -> Self {
        Self {
            probe: VerificationProbe::new(ctx.clone()),
            ctx,
            default_ttl_days: DEFAULT_TTL_DAYS,
        }
    }

    /// TTL applied when a create does not name one. Zero keeps the current value.
    pub fn with_default_ttl(mut self, days: u32) -> Self {
        if days > 0 {
            self.default_ttl_days = days;
        }
        self
    }

    pub fn default_ttl_days(&self) -> u32 {
        self.default_ttl_days
    }

    /// Store a new ciphertext and issue its token.
    pub async fn create(&self, ciphertext: &str, ttl_days: Option<u32>) -> Result<CreatedDrop> {
        let started = Instant::now();
        let result = self.create_inner(ciphertext, ttl_days).await;
        let hash = result.as_ref().ok().map(|c| &c.url_hash);
        self.ctx
            .finish(Component::DropStore, Operation::Create, hash, started, &result);
        result
    }

    async fn create_inner(&self, ciphertext: &str, ttl_days: Option<u32>) -> Result<CreatedDrop> {
        if ciphertext.is_empty() {
            return Err(DropError::Validation("ciphertext must not be empty".into()));
        }
        let ttl = ttl_days.unwrap_or(self.default_ttl_days);
        if ttl == 0 {
            return Err(DropError::Validation("ttlDays must be a positive integer".into()));
        }

        let created_at = self.ctx.now();
        let expires_at = created_at
            .checked_add_signed(Duration::days(i64::from(ttl)))
            .ok_or_else(|| DropError::Validation(format!("ttlDays out of range: {ttl}")))?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let url_hash = address::generate_hash(ciphertext, created_at)
                .map_err(|e| DropError::storage(e.to_string()))?;
            let inserted = self
                .ctx
                .with_conn(|conn| {
                    drops::insert(
                        conn,
                        url_hash.as_str(),
                        ciphertext,
                        created_at.timestamp(),
                        expires_at.timestamp(),
                    )
                })
                .await;

            match inserted {
                Ok(id) => {
                    return Ok(CreatedDrop {
                        id,
                        url_hash,
                        created_at,
                        expires_at,
                    })
                }
                Err(DbError::Constraint(reason)) if attempt < MAX_CREATE_ATTEMPTS => {
                    debug!(
                        hash = %url_hash.prefix(),
                        attempt,
                        "token collision, regenerating: {reason}"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Count a reveal attempt and return the ciphertext if still live.
    ///
    /// The ciphertext stays in place until [`redact`](Self::redact), so a
    /// second reveal in between still sees it. Use [`claim`](Self::claim)
    /// for strict single delivery.
    pub async fn reveal(&self, raw_hash: &str) -> Result<RevealedDrop> {
        let started = Instant::now();
        let hash = self
            .ctx
            .parse_hash(Component::DropStore, Operation::Reveal, raw_hash, started)?;
        let now = self.ctx.now().timestamp();
        let result = match self
            .ctx
            .with_conn(|conn| drops::reveal(conn, hash.as_str(), now))
            .await
        {
            Ok(outcome) => revealed(outcome),
            Err(e) => Err(e.into()),
        };
        self.ctx
            .finish(Component::DropStore, Operation::Reveal, Some(&hash), started, &result);
        result
    }

    /// Reveal and redact atomically. At most one caller ever gets the ciphertext.
    pub async fn claim(&self, raw_hash: &str) -> Result<RevealedDrop> {
        let started = Instant::now();
        let hash = self
            .ctx
            .parse_hash(Component::DropStore, Operation::Claim, raw_hash, started)?;
        let now = self.ctx.now().timestamp();
        let result = match self
            .ctx
            .with_conn(|conn| drops::claim(conn, hash.as_str(), now))
            .await
        {
            Ok(outcome) => revealed(outcome),
            Err(e) => Err(e.into()),
        };
        self.ctx
            .finish(Component::DropStore, Operation::Claim, Some(&hash), started, &result);
        result
    }

    /// Clear the ciphertext. Safe to repeat.
    pub async fn redact(&self, raw_hash: &str) -> Result<DecryptionStamp> {
        let started = Instant::now();
        let hash = self
            .ctx
            .parse_hash(Component::DropStore, Operation::Redact, raw_hash, started)?;
        let result = self.redact_parsed(&hash).await;
        self.ctx
            .finish(Component::DropStore, Operation::Redact, Some(&hash), started, &result);
        result
    }

    async fn redact_parsed(&self, hash: &UrlHash) -> Result<DecryptionStamp> {
        let decrypted_at = self
            .ctx
            .retry()
            .run("redact", || async {
                Ok(self
                    .ctx
                    .with_conn(|conn| drops::redact(conn, hash.as_str()))
                    .await?)
            })
            .await?;
        Ok(DecryptionStamp {
            decrypted_at: decrypted_at.map(from_unix).transpose()?,
        })
    }

    /// Redact, then confirm with the probe, re-issuing the redaction while
    /// the retry budget allows.
    pub async fn redact_and_verify(&self, raw_hash: &str) -> Result<RedactionCheck> {
        let stamp = self.redact(raw_hash).await?;
        let hash = UrlHash::parse(raw_hash)?;

        for attempt in 1..=self.ctx.retry().attempts() {
            let status = self.probe.verify_redacted(raw_hash).await?;
            if status.is_cleared {
                return Ok(RedactionCheck::Confirmed(status));
            }
            warn!(
                hash = %hash.prefix(),
                attempt,
                "redaction not visible yet, re-issuing"
            );
            self.redact(raw_hash).await?;
        }

        warn!(hash = %hash.prefix(), "redaction could not be confirmed");
        Ok(RedactionCheck::Unconfirmed {
            decrypted_at: stamp.decrypted_at,
        })
    }
}

fn revealed(outcome: RevealOutcome) -> Result<RevealedDrop> {
    match outcome {
        RevealOutcome::Revealed(row) => to_revealed(row),
        RevealOutcome::Expired => Err(DropError::Expired),
        RevealOutcome::AlreadyViewed => Err(DropError::AlreadyViewed),
        RevealOutcome::NotFound => Err(DropError::NotFound),
    }
}

fn to_revealed(row: DropRow) -> Result<RevealedDrop> {
    Ok(RevealedDrop {
        created_at: from_unix(row.created_at)?,
        expires_at: from_unix(row.expires_at)?,
        access_count: row.access_count.unsigned_abs(),
        ciphertext: row.ciphertext,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{harness, t0};
    use crate::AccessRecorder;
    use chrono::TimeZone;
    use secdrop_types::events::Outcome;

    const UNKNOWN: &str = "ffffffffffffffffffffffffffffffff";

    #[tokio::test]
    async fn test_create_defaults_to_seven_days() {
        let h = harness();
        let store = DropStore::new(h.ctx.clone());
        let created = store.create("AAAA:BBBB:CCCC", None).await.expect("create");

        assert_eq!(created.created_at, t0());
        assert_eq!(
            created.expires_at,
            Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).single().expect("date")
        );
        assert_eq!(created.url_hash.as_str().len(), 32);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let h = harness();
        let store = DropStore::new(h.ctx.clone());
        assert!(matches!(
            store.create("", Some(7)).await,
            Err(DropError::Validation(_))
        ));
        assert!(matches!(
            store.create("a:b:c", Some(0)).await,
            Err(DropError::Validation(_))
        ));
        assert!(matches!(
            store.create("a:b:c", Some(u32::MAX)).await,
            Err(DropError::Validation(_))
        ));
        assert!(h.events.events().iter().all(|e| e.outcome == Outcome::Rejected));
    }

    #[tokio::test]
    async fn test_configured_default_ttl() {
        let h = harness();
        let store = DropStore::new(h.ctx.clone()).with_default_ttl(2);
        let created = store.create("a:b:c", None).await.expect("create");
        assert_eq!(created.expires_at, t0() + Duration::days(2));
    }

    #[tokio::test]
    async fn test_full_two_phase_flow() {
        let h = harness();
        let store = DropStore::new(h.ctx.clone());
        let created = store.create("AAAA:BBBB:CCCC", Some(7)).await.expect("create");
        let hash = created.url_hash.as_str();

        h.clock
            .set(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).single().expect("date"));
        let revealed = store.reveal(hash).await.expect("reveal");
        assert_eq!(revealed.ciphertext, "AAAA:BBBB:CCCC");
        assert_eq!(revealed.access_count, 1);

        store.redact(hash).await.expect("redact");
        assert!(matches!(store.reveal(hash).await, Err(DropError::AlreadyViewed)));

        let check = store.redact_and_verify(hash).await.expect("verify");
        assert!(check.is_confirmed());
    }

    #[tokio::test]
    async fn test_reveal_expired_redacts() {
        let h = harness();
        let store = DropStore::new(h.ctx.clone());
        let created = store.create("a:b:c", Some(1)).await.expect("create");

        h.clock.advance(Duration::hours(25));
        assert!(matches!(
            store.reveal(created.url_hash.as_str()).await,
            Err(DropError::Expired)
        ));

        let status = VerificationProbe::new(h.ctx.clone())
            .verify_redacted(created.url_hash.as_str())
            .await
            .expect("probe");
        assert!(status.is_cleared);
    }

    #[tokio::test]
    async fn test_reveal_unknown_and_malformed() {
        let h = harness();
        let store = DropStore::new(h.ctx.clone());
        assert!(matches!(store.reveal(UNKNOWN).await, Err(DropError::NotFound)));
        assert!(matches!(
            store.reveal("../../etc/passwd").await,
            Err(DropError::Validation(_))
        ));
        assert!(matches!(store.redact(UNKNOWN).await, Err(DropError::NotFound)));
    }

    #[tokio::test]
    async fn test_claim_delivers_once() {
        let h = harness();
        let store = DropStore::new(h.ctx.clone());
        let created = store.create("a:b:c", None).await.expect("create");
        let hash = created.url_hash.as_str();

        let first = store.claim(hash).await.expect("claim");
        assert_eq!(first.ciphertext, "a:b:c");
        assert!(matches!(store.claim(hash).await, Err(DropError::AlreadyViewed)));
        assert!(matches!(store.reveal(hash).await, Err(DropError::AlreadyViewed)));
    }

    #[tokio::test]
    async fn test_redact_returns_decryption_stamp() {
        let h = harness();
        let store = DropStore::new(h.ctx.clone());
        let recorder = AccessRecorder::new(h.ctx.clone());
        let created = store.create("a:b:c", None).await.expect("create");
        let hash = created.url_hash.as_str();

        store.reveal(hash).await.expect("reveal");
        h.clock.advance(Duration::seconds(30));
        let stamp = recorder.record_decryption(hash, None).await.expect("record");

        let redacted = store.redact(hash).await.expect("redact");
        assert_eq!(redacted.decrypted_at, stamp.decrypted_at);
        assert_eq!(redacted.decrypted_at, Some(t0() + Duration::seconds(30)));
    }

    #[tokio::test]
    async fn test_each_operation_emits_one_event() {
        let h = harness();
        let store = DropStore::new(h.ctx.clone());
        let created = store.create("a:b:c", None).await.expect("create");
        let hash = created.url_hash.as_str();
        store.reveal(hash).await.expect("reveal");
        store.redact(hash).await.expect("redact");
        let _ = store.reveal(hash).await;

        let events = h.events.events();
        let ops: Vec<_> = events.iter().map(|e| (e.operation, e.outcome)).collect();
        assert_eq!(
            ops,
            vec![
                (Operation::Create, Outcome::Ok),
                (Operation::Reveal, Outcome::Ok),
                (Operation::Redact, Outcome::Ok),
                (Operation::Reveal, Outcome::AlreadyViewed),
            ]
        );
        for event in &events {
            assert_eq!(event.component, Component::DropStore);
            assert_eq!(event.hash_prefix.as_deref(), Some(created.url_hash.prefix()));
        }
    }
}
