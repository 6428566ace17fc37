use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;

/// Upper bound on any entry's lifetime. Remote documents choose their own TTL.
pub const MAX_ENTRY_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Map size at which inserts first sweep out expired entries.
const MIN_SWEEP_THRESHOLD: usize = 256;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

#[derive(Debug)]
struct Entries<V> {
    map: HashMap<String, CacheEntry<V>>,
    sweep_at: usize,
}

impl<V> Entries<V> {
    /// Drops expired entries once the map reaches `sweep_at`, then moves the
    /// threshold to twice the live size so sweeps stay amortized.
    fn sweep_if_due(&mut self, now: Instant) {
        if self.map.len() < self.sweep_at {
            return;
        }
        let removed = sweep(&mut self.map, now);
        if removed > 0 {
            log::debug!("cache sweep removed {} expired entries", removed);
        }
        self.sweep_at = (self.map.len() * 2).max(MIN_SWEEP_THRESHOLD);
    }
}

fn sweep<V>(map: &mut HashMap<String, CacheEntry<V>>, now: Instant) -> usize {
    let before = map.len();
    map.retain(|_, e| e.expires_at > now);
    before - map.len()
}

/// Process-local map whose entries expire after a per-entry TTL.
///
/// Expiry is measured on tokio's clock so paused-time tests can advance it.
/// Entries are never refreshed by reads. TTLs are capped at [`MAX_ENTRY_TTL`],
/// and inserts periodically sweep expired entries so the map stays bounded
/// by its live contents.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: RwLock<Entries<V>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Entries {
                map: HashMap::new(),
                sweep_at: MIN_SWEEP_THRESHOLD,
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.map.get(key) {
                Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.map.get(key).is_some_and(|e| e.expires_at <= now) {
            entries.map.remove(key);
        }
        None
    }

    pub fn insert(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let now = Instant::now();
        let entry = CacheEntry {
            value,
            expires_at: now + ttl.min(MAX_ENTRY_TTL),
        };
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.sweep_if_due(now);
        entries.map.insert(key.into(), entry);
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.map.remove(key).map(|e| e.value)
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.map.clear();
        entries.sweep_at = MIN_SWEEP_THRESHOLD;
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.map.values().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = TtlCache::new();
        cache.insert("agent://a.example.com", 1u32, Duration::from_secs(60));

        assert_eq!(cache.get("agent://a.example.com"), Some(1));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get("agent://a.example.com"), Some(1));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("agent://a.example.com"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_do_not_extend_expiry() {
        let cache = TtlCache::new();
        cache.insert("k", "v".to_string(), Duration::from_secs(10));

        for _ in 0..9 {
            tokio::time::advance(Duration::from_secs(1)).await;
            assert!(cache.get("k").is_some());
        }

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get("k").is_none());
    }

    fn raw_len<V>(cache: &TtlCache<V>) -> usize {
        cache.entries.read().unwrap().map.len()
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_swept_on_insert() {
        let cache = TtlCache::new();
        for i in 0..1000 {
            cache.insert(format!("agent://a{}.example.com", i), i, Duration::from_secs(1));
        }
        cache.insert("long", 0, Duration::from_secs(100));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.len(), 1);
        assert_eq!(raw_len(&cache), 1001);

        // Growth past the sweep threshold drops the expired thousand.
        for i in 0..100 {
            cache.insert(format!("fresh{}", i), i, Duration::from_secs(100));
        }
        assert_eq!(raw_len(&cache), 101);
        assert_eq!(cache.len(), 101);
        assert_eq!(cache.get("long"), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_map_stays_bounded_under_churn() {
        let cache = TtlCache::new();
        for i in 0..10_000 {
            cache.insert(format!("k{}", i), i, Duration::from_secs(1));
            tokio::time::advance(Duration::from_millis(10)).await;
        }
        // About 100 entries are live at any moment.
        assert!(raw_len(&cache) < 2 * MIN_SWEEP_THRESHOLD);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_is_capped() {
        let cache = TtlCache::new();
        cache.insert("forever", 1u8, Duration::MAX);
        cache.insert("secs", 2u8, Duration::from_secs(u64::MAX));
        assert_eq!(cache.get("forever"), Some(1));

        tokio::time::advance(MAX_ENTRY_TTL + Duration::from_secs(1)).await;
        assert!(cache.get("forever").is_none());
        assert!(cache.get("secs").is_none());
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let cache = TtlCache::new();
        cache.insert("a", 1u8, Duration::from_secs(60));
        cache.insert("b", 2u8, Duration::from_secs(60));

        assert_eq!(cache.remove("a"), Some(1));
        assert_eq!(cache.remove("a"), None);

        cache.clear();
        assert!(cache.is_empty());
    }
}
