//! Bounded, thread-safe parse cache for media range headers.

use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use super::range::{MediaParseError, MediaRangeSet};

/// Default number of distinct header values kept
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that had to parse
    pub misses: u64,
    /// Entries currently held
    pub len: usize,
    /// Maximum entries held
    pub capacity: usize,
}

/// LRU cache of parsed header values keyed by the exact header string
///
/// Parsing happens outside the lock. Two threads racing on the same new key
/// both parse and both insert; the values are identical so the duplicate
/// work is the only cost. Parse failures are never cached.
pub struct MediaRangeCache {
    entries: Mutex<LruCache<Box<str>, Arc<MediaRangeSet>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MediaRangeCache {
    /// Create a cache holding at most `capacity` header values (minimum 1)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the parsed set for `header`, parsing and caching on a miss
    ///
    /// # Errors
    ///
    /// Returns the parse error for a malformed header value.
    pub fn get_or_parse(&self, header: &str) -> Result<Arc<MediaRangeSet>, MediaParseError> {
        if header.trim().is_empty() {
            return Ok(MediaRangeSet::any());
        }

        if let Some(set) = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(header)
        {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(set));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let parsed = Arc::new(MediaRangeSet::parse(header)?);
        debug!(header = %header, ranges = parsed.len(), "Parsed media range header");

        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(Box::from(header), Arc::clone(&parsed));
        Ok(parsed)
    }

    /// Drop every cached entry
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: entries.len(),
            capacity: entries.cap().get(),
        }
    }
}

impl Default for MediaRangeCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for MediaRangeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaRangeCache")
            .field("stats", &self.stats())
            .finish()
    }
}
