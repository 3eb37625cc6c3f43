// src/rate_limit/global.rs
// Global sliding window, keyed by "global:floor(now/window)" (spec.md §4.C1).
// Fail-open on backend errors, same as the daily quota.

use tracing::warn;

use super::Admission;
use crate::kv::KvStore;

pub struct GlobalWindow {
    kv: KvStore,
    pub max_requests: u32,
    window_ms: u64,
}

impl GlobalWindow {
    pub fn new(kv: KvStore, max_requests: u32, window_ms: u64) -> Self {
        Self {
            kv,
            max_requests,
            window_ms,
        }
    }

    pub async fn check_and_increment(&self) -> Admission {
        let now_ms = chrono::Utc::now().timestamp_millis() as u64;
        let bucket = now_ms / self.window_ms.max(1);
        let key = format!("ratelimit:global:{}", bucket);
        let window_end_ms = (bucket + 1) * self.window_ms;
        let reset_time = (window_end_ms / 1000) as i64;

        match self.kv.incr_if_below(&key, self.max_requests as i64, reset_time).await {
            Ok(state) => {
                if state.incremented {
                    Admission {
                        allowed: true,
                        remaining: self.max_requests - state.count as u32,
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
                warn!(error = %e, "global rate limit store unreachable, failing open");
                Admission {
                    allowed: true,
                    remaining: self.max_requests,
                    reset_time,
                }
            }
        }
    }

    /// Bounded wait-and-retry helper used by callers that want to block for a
    /// short while instead of immediately surfacing a 429 (spec.md §4.C1).
    pub async fn check_with_retries(&self, max_retries: u32) -> Admission {
        let mut attempt = 0;
        loop {
            let admission = self.check_and_increment().await;
            if admission.allowed || attempt >= max_retries {
                return admission;
            }
            let now = chrono::Utc::now().timestamp();
            let wait_secs = (admission.reset_time - now).max(0).min(5) as u64;
            tokio::time::sleep(std::time::Duration::from_secs(wait_secs)).await;
            attempt += 1;
        }
    }
}
