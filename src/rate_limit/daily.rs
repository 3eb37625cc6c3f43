// src/rate_limit/daily.rs
// Per-user daily quota, keyed by "user:day" (spec.md §4.C1). Fail-open: if the
// backing store is unreachable, admission is granted and nothing is recorded.

use chrono::{Duration, TimeZone, Utc};
use tracing::warn;

use super::Admission;
use crate::kv::KvStore;

pub struct DailyQuota {
    kv: KvStore,
    pub limit: u32,
}

impl DailyQuota {
    pub fn new(kv: KvStore, limit: u32) -> Self {
        Self { kv, limit }
    }

    pub async fn check_and_increment(&self, user_id: &str) -> Admission {
        let now = Utc::now();
        let day = now.format("%Y-%m-%d");
        let key = format!("ratelimit:daily:{}:{}", user_id, day);

        let tomorrow_midnight = (now + Duration::days(1))
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let reset_time = Utc.from_utc_datetime(&tomorrow_midnight).timestamp();

        match self.kv.incr_if_below(&key, self.limit as i64, reset_time).await {
            Ok(state) => {
                if state.incremented {
                    Admission {
                        allowed: true,
                        remaining: self.limit - state.count as u32,
                        reset_time,
                    }
                } else {
                    Admission {
                        allowed: false,
                        remaining: 0,
                        reset_time,
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "daily quota store unreachable, failing open");
                Admission {
                    allowed: true,
                    remaining: self.limit,
                    reset_time,
                }
            }
        }
    }
}
