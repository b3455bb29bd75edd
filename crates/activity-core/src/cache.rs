use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;

/// Memoised lookups (channel names, DM counterparts) shared by concurrent
/// fetch tasks.
///
/// Each key owns a [`OnceCell`], so concurrent callers asking for the same
/// key wait on a single computation instead of issuing duplicate lookups.
/// The map lock is only held to find or create the cell, never across an
/// await.
pub struct LookupCache<K, V> {
    cells: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> Default for LookupCache<K, V> {
    fn default() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> LookupCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for `key`, computing it with `compute` on first use.
    ///
    /// `compute` must not fail: lookups that can fail resolve to a fallback
    /// value inside `compute`.
    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = {
            let mut cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(cells.entry(key).or_default())
        };
        cell.get_or_init(compute).await.clone()
    }

    /// Value for `key` if it has already been computed.
    pub fn get(&self, key: &K) -> Option<V> {
        let cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
        cells.get(key).and_then(|cell| cell.get().cloned())
    }

    pub fn len(&self) -> usize {
        let cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
        cells.values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn computes_once_per_key() {
        let cache: LookupCache<String, String> = LookupCache::new();
        let calls = AtomicUsize::new(0);

        let compute = |name: &'static str| {
            let calls = &calls;
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                name.to_uppercase()
            }
        };

        assert_eq!(cache.get_or_compute("c1".into(), compute("general")).await, "GENERAL");
        assert_eq!(cache.get_or_compute("c1".into(), compute("ignored")).await, "GENERAL");
        assert_eq!(cache.get_or_compute("c2".into(), compute("random")).await, "RANDOM");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"c1".to_string()), Some("GENERAL".to_string()));
        assert_eq!(cache.get(&"missing".to_string()), None);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_lookup() {
        let cache: Arc<LookupCache<&'static str, u32>> = Arc::new(LookupCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let lookup = |cache: Arc<LookupCache<&'static str, u32>>, calls: Arc<AtomicUsize>| async move {
            cache
                .get_or_compute("D123", || async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    calls.fetch_add(1, Ordering::SeqCst);
                    42
                })
                .await
        };

        let (a, b, c) = tokio::join!(
            lookup(Arc::clone(&cache), Arc::clone(&calls)),
            lookup(Arc::clone(&cache), Arc::clone(&calls)),
            lookup(Arc::clone(&cache), Arc::clone(&calls)),
        );
        assert_eq!((a, b, c), (42, 42, 42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_until_computed() {
        let cache: LookupCache<u8, u8> = LookupCache::new();
        assert!(cache.is_empty());
        cache.get_or_compute(1, || async { 2 }).await;
        assert!(!cache.is_empty());
    }
}
