//! Encode result cache
//!
//! Rendering is the expensive part of encoding and the result only depends on
//! the markup, so results are memoized per fragment. Keys are SHA-256 digests
//! of the raw markup; values are shared `Arc`s so hits never copy units.

use crate::unit::FlatSlide;
use log::{debug, warn};
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub type CacheKey = [u8; 32];

/// Fingerprint of a fragment, used as its cache key.
pub fn fingerprint(markup: &str) -> CacheKey {
    let digest = Sha256::digest(markup.as_bytes());
    let mut key = [0u8; 32];
    key.copy_from_slice(&digest);
    key
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Bounded LRU of encode results, shared by every encode on a `Flattener`.
#[derive(Debug)]
pub struct EncodeCache {
    entries: Mutex<LruCache<CacheKey, Arc<FlatSlide>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for EncodeCache {
    fn default() -> Self {
        Self::new(crate::DEFAULT_CACHE_CAPACITY)
    }
}

impl EncodeCache {
    /// A cache holding at most `capacity` slides; `0` means unbounded.
    pub fn new(capacity: usize) -> Self {
        let entries = match NonZeroUsize::new(capacity) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            entries: Mutex::new(entries),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Lock the entries. A panic elsewhere while holding the lock cannot leave
    /// the LRU half-updated, so a poisoned lock is recovered.
    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, Arc<FlatSlide>>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("encode cache lock was poisoned, recovering its entries");
            self.entries.clear_poison();
            poisoned.into_inner()
        })
    }

    pub fn get(&self, markup: &str) -> Option<Arc<FlatSlide>> {
        let key = fingerprint(markup);
        let found = self.lock().get(&key).cloned();
        match &found {
            Some(_) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("encode cache hit {}", hex::encode(&key[..6]));
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
            }
        }
        found
    }

    /// Store a result; an existing entry for the same markup is replaced.
    pub fn insert(&self, markup: &str, slide: Arc<FlatSlide>) {
        let key = fingerprint(markup);
        if let Some((evicted, _)) = self.lock().push(key, slide) {
            if evicted != key {
                debug!("encode cache evicted {}", hex::encode(&evicted[..6]));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide(width: f64) -> Arc<FlatSlide> {
        Arc::new(FlatSlide {
            width: Some(width),
            ..Default::default()
        })
    }

    #[test]
    fn fingerprints_differ_per_markup() {
        assert_eq!(fingerprint("<p>a</p>"), fingerprint("<p>a</p>"));
        assert_ne!(fingerprint("<p>a</p>"), fingerprint("<p>b</p>"));
    }

    #[test]
    fn hits_return_the_same_allocation() {
        let cache = EncodeCache::new(4);
        let stored = slide(1.0);
        cache.insert("<p>a</p>", Arc::clone(&stored));
        let hit = cache.get("<p>a</p>").unwrap();
        assert!(Arc::ptr_eq(&stored, &hit));
        assert!(cache.get("<p>b</p>").is_none());
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let cache = EncodeCache::new(2);
        cache.insert("a", slide(1.0));
        cache.insert("b", slide(2.0));
        cache.get("a");
        cache.insert("c", slide(3.0));
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn zero_capacity_is_unbounded() {
        let cache = EncodeCache::new(0);
        for i in 0..300 {
            cache.insert(&format!("<p>{}</p>", i), slide(i as f64));
        }
        assert_eq!(cache.len(), 300);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn poisoned_lock_keeps_serving_entries() {
        let cache = Arc::new(EncodeCache::new(4));
        cache.insert("<p>a</p>", slide(1.0));
        let holder = Arc::clone(&cache);
        let _ = std::thread::spawn(move || {
            let _guard = holder.entries.lock().unwrap();
            panic!("panicked while holding the cache lock");
        })
        .join();
        assert!(cache.entries.is_poisoned());

        assert_eq!(cache.get("<p>a</p>").and_then(|s| s.width), Some(1.0));
        cache.insert("<p>b</p>", slide(2.0));
        assert_eq!(cache.len(), 2);
        assert!(!cache.entries.is_poisoned());
    }
}
