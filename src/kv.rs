// src/kv.rs
// Key-value store capability backing the rate limiter, result cache, and
// resumable-stream registry (spec.md §4.C1/C2/C12). A trait so tests can
// swap in an in-memory double instead of a live Redis server, mirroring the
// pack's pattern of putting a recording/replaying double behind the same
// interface as the real adapter.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

/// Outcome of a conditional counter increment (spec.md §8 admission
/// idempotence law: a denied request must leave the counter unchanged).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterState {
    pub count: i64,
    pub incremented: bool,
}

#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: i64) -> anyhow::Result<()>;
    /// Atomically increments `key` only if its current value is below
    /// `limit`; a denied call returns the unchanged count with
    /// `incremented: false`. Only the increment that takes the count from
    /// zero to one sets an absolute expiry at `expire_at_unix`.
    async fn incr_if_below(&self, key: &str, limit: i64, expire_at_unix: i64) -> anyhow::Result<CounterState>;
    async fn publish(&self, channel: &str, message: &str) -> anyhow::Result<()>;
}

pub type KvStore = std::sync::Arc<dyn KvBackend>;

/// Reads the counter, and only if it's below `limit` does it `INCR` (and, on
/// the increment from zero, `EXPIREAT`). Runs as one Lua script so the
/// read-check-increment is atomic against concurrent admits for the same key.
const INCR_IF_BELOW_SCRIPT: &str = r#"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
if current < tonumber(ARGV[1]) then
    local new = redis.call('INCR', KEYS[1])
    if new == 1 then
        redis.call('EXPIREAT', KEYS[1], ARGV[2])
    end
    return {new, 1}
else
    return {current, 0}
end
"#;

#[derive(Clone)]
pub struct RedisKv {
    conn: ConnectionManager,
}

impl RedisKv {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvBackend for RedisKv {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: i64) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let ttl = ttl_seconds.max(1) as u64;
        conn.set_ex::<_, _, ()>(key, value, ttl).await?;
        Ok(())
    }

    async fn incr_if_below(&self, key: &str, limit: i64, expire_at_unix: i64) -> anyhow::Result<CounterState> {
        let mut conn = self.conn.clone();
        let (count, incremented): (i64, i64) = Script::new(INCR_IF_BELOW_SCRIPT)
            .key(key)
            .arg(limit)
            .arg(expire_at_unix)
            .invoke_async(&mut conn)
            .await?;
        Ok(CounterState {
            count,
            incremented: incremented == 1,
        })
    }

    async fn publish(&self, channel: &str, message: &str) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.publish(channel, message).await?;
        Ok(())
    }
}

/// In-process doubles for `KvBackend`, used by unit tests and the
/// integration-test harness (spec.md §8: "a fake Redis ... so cache/rate-limit
/// laws are testable without a live server").
pub mod test_support {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory stand-in for Redis used by unit/integration tests.
    #[derive(Default)]
    pub struct InMemoryKv {
        entries: Mutex<HashMap<String, String>>,
    }

    impl InMemoryKv {
        pub fn new() -> std::sync::Arc<Self> {
            std::sync::Arc::new(Self::default())
        }
    }

    #[async_trait]
    impl KvBackend for InMemoryKv {
        async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn set_ex(&self, key: &str, value: &str, _ttl_seconds: i64) -> anyhow::Result<()> {
            self.entries.lock().unwrap().insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn incr_if_below(&self, key: &str, limit: i64, _expire_at_unix: i64) -> anyhow::Result<CounterState> {
            let mut entries = self.entries.lock().unwrap();
            let current = entries.get(key).and_then(|v| v.parse::<i64>().ok()).unwrap_or(0);
            if current < limit {
                let count = current + 1;
                entries.insert(key.to_string(), count.to_string());
                Ok(CounterState { count, incremented: true })
            } else {
                Ok(CounterState { count: current, incremented: false })
            }
        }

        async fn publish(&self, _channel: &str, _message: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    /// Always errors, to exercise fail-open paths.
    #[derive(Default)]
    pub struct UnreachableKv;

    #[async_trait]
    impl KvBackend for UnreachableKv {
        async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("kv store unreachable")
        }
        async fn set_ex(&self, _key: &str, _value: &str, _ttl_seconds: i64) -> anyhow::Result<()> {
            anyhow::bail!("kv store unreachable")
        }
        async fn incr_if_below(&self, _key: &str, _limit: i64, _expire_at_unix: i64) -> anyhow::Result<CounterState> {
            anyhow::bail!("kv store unreachable")
        }
        async fn publish(&self, _channel: &str, _message: &str) -> anyhow::Result<()> {
            anyhow::bail!("kv store unreachable")
        }
    }
}
