//! Batch redaction of expired drops.

use std::time::Instant;

use secdrop_db::queries::sweep;
use secdrop_types::events::{Component, Operation, Outcome};
use secdrop_types::sweep::{SweepReport, SweepStats};
use tracing::info;

use crate::{Result, StoreContext};

#[derive(Clone)]
pub struct ExpirySweeper {
    ctx: StoreContext,
}

impl ExpirySweeper {
    pub fn new(ctx: StoreContext) -> Self {
        Self { ctx }
    }

    /// Redact every drop past its deadline that still holds ciphertext.
    ///
    /// A single set-based update, so overlapping runs never redact or count
    /// the same row twice.
    pub async fn run(&self) -> Result<SweepReport> {
        let started = Instant::now();
        let now = self.ctx.now().timestamp();
        let result = self
            .ctx
            .retry()
            .run("sweep", || async {
                Ok(self
                    .ctx
                    .with_conn(|conn| sweep::redact_expired(conn, now))
                    .await?)
            })
            .await
            .map(|cleared_ids| SweepReport {
                count: cleared_ids.len() as u64,
                cleared_ids,
            });

        let outcome = match &result {
            Ok(report) if report.count == 0 => Outcome::Unchanged,
            Ok(_) => Outcome::Ok,
            Err(e) => e.outcome(),
        };
        if let Ok(report) = &result {
            if report.count > 0 {
                info!(count = report.count, "expired drops redacted");
            }
        }
        self.ctx.emit(
            Component::ExpirySweeper,
            Operation::Sweep,
            None,
            outcome,
            started,
        );
        result
    }

    /// Counts by cleanup state. Read-only.
    pub async fn stats(&self) -> Result<SweepStats> {
        let started = Instant::now();
        let now = self.ctx.now().timestamp();
        let result = self
            .ctx
            .retry()
            .run("sweep_stats", || async {
                Ok(self
                    .ctx
                    .with_conn(|conn| sweep::stats(conn, now))
                    .await?)
            })
            .await
            .map(|c| SweepStats {
                pending_cleanup: c.pending_cleanup,
                already_cleaned: c.already_cleaned,
                active: c.active,
                total: c.total,
            });
        self.ctx
            .finish(Component::ExpirySweeper, Operation::Stats, None, started, &result);
        result
    }
}
