// Integration tests for request admission (spec.md §8 scenario 3: rate-limit
// deny) plus the law that a denial stays stable once the quota is exhausted.

use std::collections::HashSet;

use research_agent::config::RateLimitConfig;
use research_agent::error::AppError;
use research_agent::kv::test_support::InMemoryKv;
use research_agent::kv::KvBackend;
use research_agent::rate_limit::RateLimiter;

fn config(daily_limit: u32) -> RateLimitConfig {
    RateLimitConfig {
        daily_request_limit: daily_limit,
        global_rate_max: 1_000,
        global_rate_window_ms: 60_000,
        admin_user_ids: HashSet::new(),
    }
}

#[tokio::test]
async fn deny_after_daily_limit_reports_remaining_and_reset_time() {
    let limiter = RateLimiter::new(InMemoryKv::new(), &config(2));

    assert!(limiter.admit("user-1").await.is_ok());
    assert!(limiter.admit("user-1").await.is_ok());

    match limiter.admit("user-1").await {
        Err(AppError::AdmissionDenied { remaining, limit, reset_time }) => {
            assert_eq!(remaining, 0);
            assert_eq!(limit, 2);
            assert!(reset_time > 0);
        }
        other => panic!("expected AdmissionDenied, got {other:?}"),
    }
}

#[tokio::test]
async fn denial_leaves_the_underlying_counter_unchanged() {
    let kv = InMemoryKv::new();
    let limiter = RateLimiter::new(kv.clone(), &config(1));
    let day = chrono::Utc::now().format("%Y-%m-%d");
    let counter_key = format!("ratelimit:daily:user-2:{day}");

    assert!(limiter.admit("user-2").await.is_ok());
    let count_after_admit = kv.get(&counter_key).await.unwrap();

    for _ in 0..5 {
        match limiter.admit("user-2").await {
            Err(AppError::AdmissionDenied { remaining, limit, .. }) => {
                assert_eq!(remaining, 0, "a denied user never sees a positive remaining count");
                assert_eq!(limit, 1);
            }
            other => panic!("expected AdmissionDenied on every repeated attempt, got {other:?}"),
        }
        assert_eq!(
            kv.get(&counter_key).await.unwrap(),
            count_after_admit,
            "a 429 must not increment the counter (spec.md §8 admission idempotence law)"
        );
    }
}

#[tokio::test]
async fn quotas_are_tracked_independently_per_user() {
    let limiter = RateLimiter::new(InMemoryKv::new(), &config(1));

    assert!(limiter.admit("user-a").await.is_ok());
    assert!(limiter.admit("user-a").await.is_err());

    assert!(limiter.admit("user-b").await.is_ok(), "a different user's quota is untouched");
}

#[tokio::test]
async fn admin_user_ids_bypass_the_quota_entirely() {
    let mut cfg = config(1);
    cfg.admin_user_ids.insert("root".to_string());
    let limiter = RateLimiter::new(InMemoryKv::new(), &cfg);

    for _ in 0..10 {
        assert!(limiter.admit("root").await.is_ok());
    }
}
