//! First-access logging.

use std::time::Instant;

use secdrop_db::queries::drops::{self, GeoColumns};
use secdrop_types::drop::{DecryptionStamp, GeoInfo};
use secdrop_types::events::{Component, Operation, Outcome};

use crate::context::from_unix;
use crate::{Result, StoreContext};

/// How much of the reported location is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GeoPolicy {
    /// IP, city and country.
    Full,
    /// City and country only.
    #[default]
    Coarse,
    /// Nothing.
    Off,
}

impl GeoPolicy {
    /// Filter a reported location. Blank fields are dropped.
    pub fn apply(self, geo: Option<&GeoInfo>) -> GeoInfo {
        let Some(geo) = geo else {
            return GeoInfo::default();
        };
        let keep = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        match self {
            GeoPolicy::Full => GeoInfo {
                ip: keep(&geo.ip),
                city: keep(&geo.city),
                country: keep(&geo.country),
            },
            GeoPolicy::Coarse => GeoInfo {
                ip: None,
                city: keep(&geo.city),
                country: keep(&geo.country),
            },
            GeoPolicy::Off => GeoInfo::default(),
        }
    }
}

#[derive(Clone)]
pub struct AccessRecorder {
    ctx: StoreContext,
    policy: GeoPolicy,
}

impl AccessRecorder {
    pub fn new(ctx: StoreContext) -> Self {
        Self {
            ctx,
            policy: GeoPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: GeoPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Stamp the first decryption. Later calls return the original stamp and
    /// leave the stored location untouched.
    pub async fn record_decryption(
        &self,
        raw_hash: &str,
        geo: Option<&GeoInfo>,
    ) -> Result<DecryptionStamp> {
        let started = Instant::now();
        let hash = self.ctx.parse_hash(
            Component::AccessRecorder,
            Operation::RecordDecryption,
            raw_hash,
            started,
        )?;
        let geo = self.policy.apply(geo);
        let now = self.ctx.now().timestamp();

        let record = self
            .ctx
            .with_conn(|conn| {
                drops::record_decryption(
                    conn,
                    hash.as_str(),
                    now,
                    GeoColumns {
                        ip: geo.ip.as_deref(),
                        city: geo.city.as_deref(),
                        country: geo.country.as_deref(),
                    },
                )
            })
            .await;

        let (result, outcome) = match record {
            Ok(record) => {
                let outcome = if record.newly_recorded {
                    Outcome::Ok
                } else {
                    Outcome::Unchanged
                };
                let stamp = from_unix(record.decrypted_at).map(|at| DecryptionStamp {
                    decrypted_at: Some(at),
                });
                (stamp, outcome)
            }
            Err(e) => {
                let err = crate::DropError::from(e);
                let outcome = err.outcome();
                (Err(err), outcome)
            }
        };

        self.ctx.emit(
            Component::AccessRecorder,
            Operation::RecordDecryption,
            Some(&hash),
            outcome,
            started,
        );
        result
    }
}
