// src/cache/mod.rs
// Content-addressed TTL cache fronting idempotent-by-input calls (spec.md §4.C2).
//
// Key = "prefix:sha256(canonical_json(args))". Canonical serialization relies
// on serde's derive walking struct fields in declaration order (never hashmap
// iteration order), so identical call sites hash identically across restarts.
// Errors from the backing store disable caching for that call (fail-open);
// concurrent misses on the same key race and the last writer wins.

use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::kv::KvStore;

#[derive(Clone)]
pub struct ResultCache {
    kv: KvStore,
    ttl_seconds: i64,
    enabled: bool,
}

impl ResultCache {
    pub fn new(kv: KvStore, ttl_seconds: i64, enabled: bool) -> Self {
        Self {
            kv,
            ttl_seconds,
            enabled,
        }
    }

    pub fn key<A: Serialize>(prefix: &str, args: &A) -> String {
        let json = serde_json::to_string(args).expect("cache args must serialize");
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{}:{:x}", prefix, hasher.finalize())
    }

    /// Returns the cached value if present; `None` on miss or any cache failure.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.enabled {
            return None;
        }
        match self.kv.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(error = %e, "cache value failed to decode, treating as miss");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "cache backend unreachable, failing open");
                None
            }
        }
    }

    pub async fn put<T: Serialize>(&self, key: &str, value: &T) {
        if !self.enabled {
            return;
        }
        let Ok(raw) = serde_json::to_string(value) else {
            return;
        };
        if let Err(e) = self.kv.set_ex(key, &raw, self.ttl_seconds).await {
            warn!(error = %e, "cache write failed, continuing uncached");
        }
    }

    /// Cache-or-compute: on miss, invokes `f` and writes through.
    pub async fn get_or_compute<T, F, Fut>(&self, prefix: &str, args: &impl Serialize, f: F) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = anyhow::Result<T>>,
    {
        let key = Self::key(prefix, args);
        if let Some(hit) = self.get::<T>(&key).await {
            return Ok(hit);
        }
        let value = f().await?;
        self.put(&key, &value).await;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize)]
    struct ArgsA {
        a: i32,
        b: String,
    }

    #[derive(Serialize)]
    struct ArgsB {
        b: String,
        a: i32,
    }

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Val(String);

    #[test]
    fn key_is_sensitive_to_property_order() {
        let k1 = ResultCache::key("p", &ArgsA { a: 1, b: "x".into() });
        let k2 = ResultCache::key("p", &ArgsB { b: "x".into(), a: 1 });
        assert_ne!(k1, k2, "field declaration order is part of the canonical form");
    }

    #[test]
    fn key_distinguishes_string_and_number() {
        let k1 = ResultCache::key("p", &"1");
        let k2 = ResultCache::key("p", &1);
        assert_ne!(k1, k2);
    }

    #[test]
    fn key_is_stable_for_identical_input() {
        let k1 = ResultCache::key("p", &ArgsA { a: 1, b: "x".into() });
        let k2 = ResultCache::key("p", &ArgsA { a: 1, b: "x".into() });
        assert_eq!(k1, k2);
    }
}
