//! Integration test: one drop from sender to burned record.
//!
//! 1. Sender encrypts a message client-side and stores the wire string
//! 2. Recipient reveals, decrypts locally and records the decryption
//! 3. The drop is redacted and the redaction is confirmed
//! 4. Every later access is refused the same way as a missing token
//!
//! This test uses only the library crates (secdrop-crypto, secdrop-db,
//! secdrop-store, secdrop-types) without requiring a running daemon.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use secdrop_crypto::codec;
use secdrop_store::{
    AccessRecorder, DropError, DropStore, ExpirySweeper, GeoPolicy, ManualClock, PublicFailure,
    RecordingObserver, RetryPolicy, StoreContext, VerificationProbe,
};
use secdrop_types::drop::GeoInfo;
use secdrop_types::events::{Operation, Outcome};

const PASSPHRASE: &str = "correct horse battery staple";
const MESSAGE: &str = "The vault code is 4921. Burn after reading.";

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("fixed date")
}

struct World {
    clock: Arc<ManualClock>,
    events: Arc<RecordingObserver>,
    drops: DropStore,
    recorder: AccessRecorder,
    sweeper: ExpirySweeper,
    probe: VerificationProbe,
}

fn world(policy: GeoPolicy) -> World {
    let clock = Arc::new(ManualClock::new(t0()));
    let events = Arc::new(RecordingObserver::new());
    let ctx = StoreContext::new(secdrop_db::open_memory().expect("open db"))
        .with_clock(clock.clone())
        .with_observer(events.clone())
        .with_retry(RetryPolicy::immediate(3));
    World {
        clock,
        events,
        drops: DropStore::new(ctx.clone()),
        recorder: AccessRecorder::new(ctx.clone()).with_policy(policy),
        sweeper: ExpirySweeper::new(ctx.clone()),
        probe: VerificationProbe::new(ctx),
    }
}

#[tokio::test]
async fn sender_to_burned_record() {
    let w = world(GeoPolicy::Full);

    // =========================================================
    // Step 1: Encrypt client-side and store only the wire string
    // =========================================================
    let wire = codec::encrypt(MESSAGE, PASSPHRASE).expect("encrypt");
    assert!(codec::is_valid_format(&wire));
    assert!(!wire.contains(MESSAGE));

    let created = w.drops.create(&wire, None).await.expect("create");
    assert_eq!(created.created_at, t0());
    assert_eq!(created.expires_at, t0() + Duration::days(7));
    assert_eq!(created.url_hash.as_str().len(), 32);

    // =========================================================
    // Step 2: Reveal and decrypt
    // =========================================================
    w.clock.advance(Duration::hours(3));
    let revealed = w.drops.reveal(created.url_hash.as_str()).await.expect("reveal");
    assert_eq!(revealed.ciphertext, wire);
    assert_eq!(revealed.access_count, 1);

    let plaintext = codec::decrypt(&revealed.ciphertext, PASSPHRASE).expect("decrypt");
    assert_eq!(plaintext.as_str(), MESSAGE);
    assert!(codec::decrypt(&revealed.ciphertext, "wrong passphrase").is_err());

    // =========================================================
    // Step 3: Record the decryption, then redact and confirm
    // =========================================================
    let geo = GeoInfo {
        ip: Some("203.0.113.5".to_string()),
        city: Some("Oslo".to_string()),
        country: Some("NO".to_string()),
    };
    let stamp = w
        .recorder
        .record_decryption(created.url_hash.as_str(), Some(&geo))
        .await
        .expect("record");
    assert_eq!(stamp.decrypted_at, Some(t0() + Duration::hours(3)));

    w.clock.advance(Duration::minutes(5));
    let again = w
        .recorder
        .record_decryption(created.url_hash.as_str(), None)
        .await
        .expect("record again");
    assert_eq!(again.decrypted_at, stamp.decrypted_at, "first write wins");

    let check = w
        .drops
        .redact_and_verify(created.url_hash.as_str())
        .await
        .expect("redact");
    assert!(check.is_confirmed());

    let status = w
        .probe
        .verify_redacted(created.url_hash.as_str())
        .await
        .expect("verify");
    assert!(status.is_cleared);
    assert_eq!(status.decrypted_at, stamp.decrypted_at);

    // =========================================================
    // Step 4: The burned drop looks like it never existed
    // =========================================================
    let burned = w
        .drops
        .reveal(created.url_hash.as_str())
        .await
        .expect_err("burned");
    let missing = w
        .drops
        .reveal("ffffffffffffffffffffffffffffffff")
        .await
        .expect_err("missing");
    assert_eq!(burned.public(), PublicFailure::Unavailable);
    assert_eq!(burned.public(), missing.public());

    // Nothing left for the sweeper.
    let report = w.sweeper.run().await.expect("sweep");
    assert_eq!(report.count, 0);

    let ops: Vec<Operation> = w.events.events().iter().map(|e| e.operation).collect();
    assert_eq!(ops.first(), Some(&Operation::Create));
    assert!(ops.contains(&Operation::RecordDecryption));
    assert!(ops.contains(&Operation::VerifyRedacted));
}

#[tokio::test]
async fn unread_drop_expires_after_one_day() {
    let w = world(GeoPolicy::default());

    let wire = codec::encrypt(MESSAGE, PASSPHRASE).expect("encrypt");
    let created = w.drops.create(&wire, Some(1)).await.expect("create");
    assert_eq!(created.expires_at, t0() + Duration::days(1));

    // Still live right at the deadline.
    w.clock.set(created.expires_at);
    let stats = w.sweeper.stats().await.expect("stats");
    assert_eq!(stats.active, 1);
    assert_eq!(stats.pending_cleanup, 0);

    w.clock.set(t0() + Duration::hours(25));
    let stats = w.sweeper.stats().await.expect("stats");
    assert_eq!(stats.pending_cleanup, 1);
    assert_eq!(stats.active, 0);

    let err = w
        .drops
        .reveal(created.url_hash.as_str())
        .await
        .expect_err("expired");
    assert!(matches!(err, DropError::Expired));
    assert_eq!(err.public(), PublicFailure::Unavailable);
    assert_eq!(
        w.events.last().map(|e| e.outcome),
        Some(Outcome::Expired)
    );

    // The expired reveal already cleared the ciphertext.
    let status = w
        .probe
        .verify_redacted(created.url_hash.as_str())
        .await
        .expect("verify");
    assert!(status.is_cleared);
    assert_eq!(status.decrypted_at, None);

    let stats = w.sweeper.stats().await.expect("stats");
    assert_eq!(stats.pending_cleanup, 0);
    assert_eq!(stats.already_cleaned, 1);
    assert_eq!(stats.total, 1);
}

#[tokio::test]
async fn coarse_policy_drops_ip() {
    let w = world(GeoPolicy::Coarse);
    let created = w.drops.create("AAAA:BBBB:CCCC", None).await.expect("create");
    w.drops.reveal(created.url_hash.as_str()).await.expect("reveal");

    let geo = GeoInfo {
        ip: Some("203.0.113.5".to_string()),
        city: Some("Oslo".to_string()),
        country: Some("NO".to_string()),
    };
    assert_eq!(GeoPolicy::Coarse.apply(Some(&geo)).ip, None);

    let stamp = w
        .recorder
        .record_decryption(created.url_hash.as_str(), Some(&geo))
        .await
        .expect("record");
    assert_eq!(stamp.decrypted_at, Some(t0()));
}

#[tokio::test]
async fn malformed_tokens_never_reach_storage() {
    let w = world(GeoPolicy::default());
    for raw in ["", "ABCDEF", "0123456789ABCDEF0123456789ABCDEF", "../../etc/passwd"] {
        let err = w.drops.reveal(raw).await.expect_err("rejected");
        assert!(matches!(err, DropError::Validation(_)), "token {raw:?}");
        assert_eq!(w.events.last().map(|e| e.outcome), Some(Outcome::Rejected));
    }
    let stats = w.sweeper.stats().await.expect("stats");
    assert_eq!(stats.total, 0);
}
