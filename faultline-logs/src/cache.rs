use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::debug;

use faultline_protocol::logs::LogPage;

struct CacheSlot {
    page: LogPage,
    stored_at: Instant,
}

/// In-process TTL cache for computed listing responses.
///
/// Entries expire a fixed duration after insertion and are evicted
/// lazily on lookup; any write to the log store clears the whole map.
/// Capacity is unbounded: the key space is the set of distinct
/// normalized queries, and every entry dies by TTL or invalidation.
///
/// Clones share the same underlying map, so the executor and the
/// ingestion path can each hold a handle to one cache instance.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Arc<RwLock<HashMap<String, CacheSlot>>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Returns the cached page for `key` if present and not expired.
    pub fn get(&self, key: &str) -> Option<LogPage> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(slot) if slot.stored_at.elapsed() < self.ttl => {
                    return Some(slot.page.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: evict under the write lock. Re-check in case a
        // concurrent `set` replaced the slot in between.
        let mut entries = self.entries.write();
        if let Some(slot) = entries.get(key) {
            if slot.stored_at.elapsed() < self.ttl {
                return Some(slot.page.clone());
            }
            entries.remove(key);
            debug!(key, "evicted expired cache entry");
        }
        None
    }

    /// Inserts or replaces the entry, resetting its TTL.
    pub fn set(&self, key: &str, page: LogPage) {
        let mut entries = self.entries.write();
        entries.insert(
            key.to_string(),
            CacheSlot {
                page,
                stored_at: Instant::now(),
            },
        );
    }

    /// Removes a single entry immediately.
    pub fn invalidate(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Removes every entry immediately.
    pub fn invalidate_all(&self) {
        let mut entries = self.entries.write();
        let dropped = entries.len();
        entries.clear();
        if dropped > 0 {
            debug!(dropped, "invalidated response cache");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use faultline_protocol::logs::Pagination;

    fn empty_page() -> LogPage {
        LogPage {
            data: Vec::new(),
            pagination: Pagination::compute(1, 20, 0),
            cached: false,
        }
    }

    #[test]
    fn returns_entry_before_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set("a", empty_page());
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn expires_entries_after_ttl() {
        let cache = ResponseCache::new(Duration::from_millis(20));
        cache.set("a", empty_page());
        std::thread::sleep(Duration::from_millis(40));
        assert!(cache.get("a").is_none());
        // The expired slot was evicted, not just hidden.
        assert!(cache.is_empty());
    }

    #[test]
    fn set_resets_ttl() {
        let cache = ResponseCache::new(Duration::from_millis(50));
        cache.set("a", empty_page());
        std::thread::sleep(Duration::from_millis(30));
        cache.set("a", empty_page());
        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.get("a").is_some());
    }

    #[test]
    fn invalidate_all_clears_every_entry() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.set("a", empty_page());
        cache.set("b", empty_page());
        cache.invalidate_all();
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn concurrent_readers_and_writers() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        let mut handles = Vec::new();

        for worker in 0..4 {
            let cache = cache.clone();
            handles.push(std::thread::spawn(move || {
                for round in 0..100 {
                    let key = format!("key-{}", (worker + round) % 8);
                    cache.set(&key, empty_page());
                    // A get racing a set sees a whole page or nothing.
                    if let Some(page) = cache.get(&key) {
                        assert_eq!(page.pagination.total_logs, 0);
                    }
                    if round % 25 == 0 {
                        cache.invalidate_all();
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().expect("worker panicked");
        }
    }
}
