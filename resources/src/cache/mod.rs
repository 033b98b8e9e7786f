use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use parking_lot::Mutex;

/// A keyed store whose entries expire `ttl` after their last read, evicted by
/// a background sweep rather than on every access. Each entry tracks its own
/// expiry independently of the map so that a read on one key never blocks a
/// write to another.
pub struct TtlCache<V> {
    entries: DashMap<String, CacheItem<V>>,
    ttl: Duration,
}

struct CacheItem<V> {
    value: V,
    expires_at: Mutex<Instant>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Returns a clone of the stored value and renews its expiry, or `None`
    /// if the key is absent or already expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let item = self.entries.get(key)?;
        let mut expires_at = item.expires_at.lock();
        if Instant::now() >= *expires_at {
            return None;
        }
        *expires_at = Instant::now() + self.ttl;
        Some(item.value.clone())
    }

    pub fn insert(&self, key: String, value: V) {
        self.entries.insert(
            key,
            CacheItem {
                value,
                expires_at: Mutex::new(Instant::now() + self.ttl),
            },
        );
    }

    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Drops every entry whose expiry has already passed. Intended to be
    /// driven by a periodic background task rather than called on the hot
    /// path.
    pub fn sweep(&self) {
        self.entries
            .retain(|_, item| Instant::now() < *item.expires_at.lock());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> TtlCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Spawns a background task that calls `sweep` every `period` until the
    /// cache is dropped.
    pub fn spawn_sweeper(self: Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                self.sweep();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_renews_expiry_and_returns_value() {
        let cache = TtlCache::new(Duration::from_millis(50));
        cache.insert("a".to_string(), 1);
        assert_eq!(cache.get("a"), Some(1));
    }

    #[test]
    fn get_returns_none_once_expired() {
        let cache = TtlCache::new(Duration::from_millis(1));
        cache.insert("a".to_string(), 1);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn sweep_evicts_only_expired_entries() {
        let cache = TtlCache::new(Duration::from_millis(1));
        cache.insert("stale".to_string(), 1);
        cache.insert("fresh".to_string(), 2);
        std::thread::sleep(Duration::from_millis(20));
        // renew "fresh" just before sweeping
        assert_eq!(cache.get("fresh"), Some(2));
        cache.sweep();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("fresh"), Some(2));
    }
}
