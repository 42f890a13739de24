//! LRU cache of decompressed blocks
//!
//! Owns a fixed set of scratch buffers. Each buffer is either spare or holds
//! the decompressed bytes of one compressed logical block.

use super::allocator::BlockBuffer;
use super::block::LogId;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Bounded pool of decompressed block buffers, most recently used first
#[derive(Debug)]
pub struct RawCache {
    entries: LruCache<LogId, BlockBuffer>,
    spare: Vec<BlockBuffer>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl RawCache {
    /// Build a cache over `buffers`; returns `None` when there are none
    pub fn with_buffers(buffers: Vec<BlockBuffer>) -> Option<Self> {
        let capacity = NonZeroUsize::new(buffers.len())?;
        Some(Self {
            entries: LruCache::new(capacity),
            spare: buffers,
            hits: 0,
            misses: 0,
            evictions: 0,
        })
    }

    /// Promote `id` to most recently used; false on a miss
    pub fn touch(&mut self, id: LogId) -> bool {
        if self.entries.get(&id).is_some() {
            self.hits += 1;
            true
        } else {
            self.misses += 1;
            false
        }
    }

    /// Take a buffer to decompress into
    ///
    /// Spare buffers go first; otherwise the least recently used entry is
    /// evicted and its former owner returned alongside the buffer.
    pub fn claim(&mut self) -> Option<(BlockBuffer, Option<LogId>)> {
        if let Some(buffer) = self.spare.pop() {
            return Some((buffer, None));
        }
        let (evicted, buffer) = self.entries.pop_lru()?;
        self.evictions += 1;
        Some((buffer, Some(evicted)))
    }

    /// Cache `buffer` as the decompressed copy of `id`
    pub fn install(&mut self, id: LogId, buffer: BlockBuffer) {
        if let Some((_, displaced)) = self.entries.push(id, buffer) {
            self.spare.push(displaced);
        }
    }

    /// Return a claimed buffer without caching anything in it
    pub fn restore(&mut self, buffer: BlockBuffer) {
        self.spare.push(buffer);
    }

    /// Cached bytes of `id`, without touching recency
    pub fn peek(&self, id: LogId) -> Option<&BlockBuffer> {
        self.entries.peek(&id)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: LogId) -> bool {
        self.entries.contains(&id)
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Buffers owned by the cache, cached or spare
    #[cfg(test)]
    pub(crate) fn buffer_count(&self) -> usize {
        self.entries.len() + self.spare.len()
    }

    /// Cached block ids, most recently used first
    pub fn lru_order(&self) -> Vec<LogId> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            capacity: self.capacity(),
            resident: self.entries.len(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub capacity: usize,
    pub resident: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memfile::allocator::HeapAllocator;
    use crate::memfile::block::ArenaId;

    fn cache(buffers: usize) -> RawCache {
        let heap = HeapAllocator::shared();
        let buffers = (0..buffers)
            .map(|_| BlockBuffer::allocate(&heap, 64, "raw").unwrap())
            .collect();
        RawCache::with_buffers(buffers).unwrap()
    }

    fn fill(cache: &mut RawCache, id: LogId) -> Option<LogId> {
        let (mut buffer, evicted) = cache.claim().unwrap();
        buffer[0] = id.index() as u8;
        cache.install(id, buffer);
        evicted
    }

    #[test]
    fn test_empty_cache_is_refused() {
        assert!(RawCache::with_buffers(Vec::new()).is_none());
    }

    #[test]
    fn test_cache_eviction() {
        let mut cache = cache(2);
        let ids: Vec<LogId> = (0..3).map(LogId::from_index).collect();

        assert_eq!(fill(&mut cache, ids[0]), None);
        assert_eq!(fill(&mut cache, ids[1]), None);
        // ids[0] is least recently used
        assert_eq!(fill(&mut cache, ids[2]), Some(ids[0]));

        assert!(!cache.contains(ids[0]));
        assert_eq!(cache.peek(ids[2]).map(|b| b[0]), Some(2));
        assert_eq!(cache.lru_order(), vec![ids[2], ids[1]]);
        assert_eq!(cache.stats().evictions, 1);
        assert_eq!(cache.buffer_count(), 2);
    }

    #[test]
    fn test_touch_promotes() {
        let mut cache = cache(2);
        let a = LogId::from_index(0);
        let b = LogId::from_index(1);
        fill(&mut cache, a);
        fill(&mut cache, b);

        assert!(cache.touch(a));
        assert_eq!(cache.lru_order(), vec![a, b]);
        assert_eq!(fill(&mut cache, LogId::from_index(2)), Some(b));

        assert!(!cache.touch(b));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.resident, 2);
        assert_eq!(stats.capacity, 2);
    }

    #[test]
    fn test_restore_returns_buffer() {
        let mut cache = cache(1);
        let (buffer, _) = cache.claim().unwrap();
        assert!(cache.claim().is_none());

        cache.restore(buffer);
        assert_eq!(cache.buffer_count(), 1);
        assert!(cache.lru_order().is_empty());
    }
}
