//! Read-only redaction check.

use std::time::Instant;

use secdrop_db::queries::drops;
use secdrop_types::drop::RedactionStatus;
use secdrop_types::events::{Component, Operation};

use crate::context::from_unix;
use crate::{DropError, Result, StoreContext};

#[derive(Clone)]
pub struct VerificationProbe {
    ctx: StoreContext,
}

impl VerificationProbe {
    pub fn new(ctx: StoreContext) -> Self {
        Self { ctx }
    }

    /// Report whether the drop's ciphertext is gone. Never writes.
    pub async fn verify_redacted(&self, raw_hash: &str) -> Result<RedactionStatus> {
        let started = Instant::now();
        let hash = self.ctx.parse_hash(
            Component::VerificationProbe,
            Operation::VerifyRedacted,
            raw_hash,
            started,
        )?;

        let result: Result<RedactionStatus> = async {
            let (is_cleared, decrypted_at) = self
                .ctx
                .retry()
                .run("verify_redacted", || async {
                    Ok(self
                        .ctx
                        .with_conn(|conn| drops::redaction_status(conn, hash.as_str()))
                        .await?)
                })
                .await?;
            Ok::<_, DropError>(RedactionStatus {
                is_cleared,
                decrypted_at: decrypted_at.map(from_unix).transpose()?,
            })
        }
        .await;

        self.ctx.finish(
            Component::VerificationProbe,
            Operation::VerifyRedacted,
            Some(&hash),
            started,
            &result,
        );
        result
    }
}
