//! In-process expiry sweep trigger.
//!
//! Optional: external schedulers can call `run_sweep` instead. Both paths
//! run the same idempotent update, so overlapping triggers are harmless.

use std::time::Duration;

use secdrop_store::ExpirySweeper;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Spawn a task that sweeps every `interval` until a shutdown signal arrives.
///
/// Sweep failures are logged and the loop keeps going.
pub fn spawn_sweep_loop(
    sweeper: ExpirySweeper,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval_secs = interval.as_secs(), "Scheduled expiry sweep enabled");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match sweeper.run().await {
                        Ok(report) if report.count > 0 => {
                            info!("Scheduled sweep: redacted {} expired drops", report.count);
                        }
                        Ok(_) => debug!("Scheduled sweep: no expired drops"),
                        Err(e) => error!("Scheduled sweep error: {}", e),
                    }
                }
                _ = shutdown_rx.recv() => {
                    debug!("Scheduled sweep stopping");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeZone;
    use secdrop_store::{DropStore, ManualClock, NoopObserver, StoreContext};

    #[tokio::test]
    async fn test_loop_sweeps_and_stops() {
        let start = chrono::Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .expect("date");
        let clock = Arc::new(ManualClock::new(start));
        let ctx = StoreContext::new(secdrop_db::open_memory().expect("db"))
            .with_clock(clock.clone())
            .with_observer(Arc::new(NoopObserver));
        let store = DropStore::new(ctx.clone());
        let created = store.create("a:b:c", Some(1)).await.expect("create");
        clock.advance(chrono::Duration::days(2));

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = spawn_sweep_loop(
            ExpirySweeper::new(ctx.clone()),
            Duration::from_millis(10),
            shutdown_rx,
        );

        // The first tick fires immediately
        let mut cleared = false;
        for _ in 0..100 {
            let status = secdrop_store::VerificationProbe::new(ctx.clone())
                .verify_redacted(created.url_hash.as_str())
                .await
                .expect("probe");
            if status.is_cleared {
                cleared = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(cleared, "scheduled sweep should redact the expired drop");

        shutdown_tx.send(()).expect("signal shutdown");
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("loop stops")
            .expect("join");
    }
}
