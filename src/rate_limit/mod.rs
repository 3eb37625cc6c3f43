// src/rate_limit/mod.rs
// Two independent limiters composed serially at request admission (spec.md §4.C1).

pub mod daily;
pub mod global;

use std::collections::HashSet;

use crate::config::RateLimitConfig;
use crate::error::AppError;
use crate::kv::KvStore;

pub use daily::DailyQuota;
pub use global::GlobalWindow;

#[derive(Debug, Clone)]
pub struct Admission {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_time: i64,
}

pub struct RateLimiter {
    daily: DailyQuota,
    global: GlobalWindow,
    admin_user_ids: HashSet<String>,
}

impl RateLimiter {
    pub fn new(kv: KvStore, config: &RateLimitConfig) -> Self {
        Self {
            daily: DailyQuota::new(kv.clone(), config.daily_request_limit),
            global: GlobalWindow::new(kv, config.global_rate_max, config.global_rate_window_ms),
            admin_user_ids: config.admin_user_ids.clone(),
        }
    }

    /// Admits a request or returns a typed 429 (spec.md §4.C11 ADMIT state).
    pub async fn admit(&self, user_id: &str) -> Result<(), AppError> {
        if self.admin_user_ids.contains(user_id) {
            return Ok(());
        }

        let daily = self.daily.check_and_increment(user_id).await;
        if !daily.allowed {
            return Err(AppError::AdmissionDenied {
                reset_time: daily.reset_time,
                remaining: daily.remaining,
                limit: self.daily.limit,
            });
        }

        let global = self.global.check_and_increment().await;
        if !global.allowed {
            return Err(AppError::AdmissionDenied {
                reset_time: global.reset_time,
                remaining: global.remaining,
                limit: self.global.max_requests,
            });
        }

        Ok(())
    }
}
