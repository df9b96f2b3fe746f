//! Short-lived cache for derived tally aggregates.
//!
//! Entries are disposable views of the store. They may be stale by up to
//! their TTL and must never feed an admission decision.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rocket::tokio::sync::Mutex;

use crate::model::common::{CacheKeyDigest, HexDigest};

/// A cached value of whatever type the accessor produced.
pub type Cached = Arc<dyn Any + Send + Sync>;

/// Injected cache dependency of the tally aggregator.
#[rocket::async_trait]
pub trait ResultCache: Send + Sync {
    /// The live entry under `key`, if any.
    async fn get(&self, key: &str) -> Option<Cached>;

    async fn set(&self, key: String, value: Cached, ttl: Duration);

    /// Drop every entry.
    async fn invalidate_all(&self);
}

/// Derive a cache key from an accessor name and its arguments.
pub fn cache_key(operation: &str, args: &[&dyn Display]) -> String {
    let mut parts = vec![operation.to_string()];
    parts.extend(args.iter().map(|arg| arg.to_string()));
    format!("tally_{}", CacheKeyDigest::hex(parts.join("|").as_bytes()))
}

struct Entry {
    value: Cached,
    expires_at: DateTime<Utc>,
}

/// In-process [`ResultCache`] with per-entry expiry.
#[derive(Default)]
pub struct TtlCache {
    entries: Mutex<HashMap<String, Entry>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl ResultCache for TtlCache {
    async fn get(&self, key: &str) -> Option<Cached> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if Utc::now() < entry.expires_at => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: String, value: Cached, ttl: Duration) {
        let expires_at = Utc::now() + ttl;
        self.entries
            .lock()
            .await
            .insert(key, Entry { value, expires_at });
    }

    async fn invalidate_all(&self) {
        self.entries.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_deterministic_and_argument_sensitive() {
        let a = cache_key("live_results", &[&1]);
        assert_eq!(a, cache_key("live_results", &[&1]));
        assert_ne!(a, cache_key("live_results", &[&2]));
        assert_ne!(a, cache_key("statistics", &[&1]));
        assert_ne!(
            cache_key("position_results", &[&1, &23]),
            cache_key("position_results", &[&12, &3])
        );
        assert!(a.starts_with("tally_"));
        assert_eq!(a.len(), "tally_".len() + CacheKeyDigest::HEX_LEN);
    }

    #[backend_test]
    async fn hit_until_invalidated() {
        let cache = TtlCache::new();
        cache
            .set("k".to_string(), Arc::new(7u64), Duration::seconds(30))
            .await;
        let hit = cache.get("k").await.unwrap();
        assert_eq!(hit.downcast_ref::<u64>(), Some(&7));

        cache.invalidate_all().await;
        assert!(cache.get("k").await.is_none());
    }

    #[backend_test]
    async fn expired_entries_miss() {
        let cache = TtlCache::new();
        cache
            .set("k".to_string(), Arc::new(7u64), Duration::zero())
            .await;
        assert!(cache.get("k").await.is_none());
    }
}
