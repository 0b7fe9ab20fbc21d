//! In-memory LRU image cache bounded by pixel footprint.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, info, trace};

use crate::domain::entities::CipherFingerprint;
use crate::domain::ports::ImageCachePort;

/// Default byte budget for decoded images (32 MiB).
pub const DEFAULT_CACHE_BYTES: usize = 32 * 1024 * 1024;

/// Returns the in-memory size of a decoded image in bytes.
#[must_use]
pub fn image_footprint(image: &image::DynamicImage) -> usize {
    let pixels = u64::from(image.width()) * u64::from(image.height());
    let bytes = pixels * u64::from(image.color().bytes_per_pixel());
    usize::try_from(bytes).unwrap_or(usize::MAX)
}

struct CacheState {
    entries: LruCache<CipherFingerprint, Arc<image::DynamicImage>>,
    bytes: usize,
    generation: u64,
}

impl CacheState {
    fn insert(
        &mut self,
        fingerprint: CipherFingerprint,
        image: Arc<image::DynamicImage>,
        max_bytes: usize,
    ) {
        let size = image_footprint(&image);
        if size > max_bytes {
            if let Some(old) = self.entries.pop(&fingerprint) {
                self.bytes -= image_footprint(&old);
            }
            debug!(
                fingerprint = %fingerprint,
                size,
                max_bytes,
                "Image exceeds cache budget, not storing"
            );
            return;
        }

        if let Some(old) = self.entries.put(fingerprint, image) {
            self.bytes -= image_footprint(&old);
        }
        self.bytes += size;

        while self.bytes > max_bytes {
            let Some((evicted, old)) = self.entries.pop_lru() else {
                break;
            };
            self.bytes -= image_footprint(&old);
            trace!(fingerprint = %evicted, "Evicted image from memory cache");
        }
    }
}

/// In-memory LRU cache for decoded attachment images.
///
/// Eviction is driven by the summed pixel footprint, so a cache of large
/// images evicts sooner than one of thumbnails. Thread-safe.
pub struct MemoryImageCache {
    state: Mutex<CacheState>,
    max_bytes: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryImageCache {
    /// Creates a new cache with the given byte budget.
    #[must_use]
    pub fn new(max_bytes: usize) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::unbounded(),
                bytes: 0,
                generation: 0,
            }),
            max_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a new cache with the default budget.
    #[must_use]
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CACHE_BYTES)
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let state = self.state.lock();
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: state.entries.len(),
            bytes: state.bytes,
            max_bytes: self.max_bytes,
        }
    }

    /// Peeks at an image without promoting it in the LRU.
    pub fn peek(&self, fingerprint: &CipherFingerprint) -> Option<Arc<image::DynamicImage>> {
        self.state.lock().entries.peek(fingerprint).cloned()
    }

    /// Returns the bytes currently held.
    #[must_use]
    pub fn bytes(&self) -> usize {
        self.state.lock().bytes
    }
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl std::fmt::Debug for MemoryImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImageCache")
            .field("max_bytes", &self.max_bytes)
            .finish_non_exhaustive()
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub size: usize,
    /// Bytes of decoded pixels held.
    pub bytes: usize,
    /// Configured byte budget.
    pub max_bytes: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images, {}/{} bytes, {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.bytes, self.max_bytes, self.hit_rate, self.hits, self.misses
        )
    }
}

impl ImageCachePort for MemoryImageCache {
    fn get(&self, fingerprint: &CipherFingerprint) -> Option<Arc<image::DynamicImage>> {
        let mut state = self.state.lock();
        if let Some(img) = state.entries.get(fingerprint) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(fingerprint = %fingerprint, "Memory cache hit");
            Some(img.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(fingerprint = %fingerprint, "Memory cache miss");
            None
        }
    }

    fn put(&self, fingerprint: CipherFingerprint, image: Arc<image::DynamicImage>) {
        debug!(fingerprint = %fingerprint, "Storing image in memory cache");
        self.state.lock().insert(fingerprint, image, self.max_bytes);
    }

    fn put_if_current(
        &self,
        fingerprint: CipherFingerprint,
        image: Arc<image::DynamicImage>,
        generation: u64,
    ) -> bool {
        let mut state = self.state.lock();
        if state.generation != generation {
            debug!(
                fingerprint = %fingerprint,
                stale = generation,
                current = state.generation,
                "Rejected image from before cache purge"
            );
            return false;
        }
        debug!(fingerprint = %fingerprint, "Storing image in memory cache");
        state.insert(fingerprint, image, self.max_bytes);
        true
    }

    fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        let count = state.entries.len();
        state.entries.clear();
        state.bytes = 0;
        state.generation += 1;
        info!(count, generation = state.generation, "Cleared memory image cache");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(width: u32, height: u32) -> Arc<image::DynamicImage> {
        Arc::new(image::DynamicImage::new_rgb8(width, height))
    }

    #[test]
    fn test_footprint_counts_channels() {
        assert_eq!(image_footprint(&image::DynamicImage::new_rgb8(10, 10)), 300);
        assert_eq!(image_footprint(&image::DynamicImage::new_rgba8(10, 10)), 400);
    }

    #[test]
    fn test_cache_put_and_get() {
        let cache = MemoryImageCache::new(1024 * 1024);
        let fp = CipherFingerprint::new("test1");

        cache.put(fp.clone(), rgb(100, 100));
        let retrieved = cache.get(&fp);

        assert!(retrieved.is_some_and(|img| img.width() == 100));
    }

    #[test]
    fn test_cache_miss() {
        let cache = MemoryImageCache::new(1024);
        assert!(cache.get(&CipherFingerprint::new("nonexistent")).is_none());
    }

    #[test]
    fn test_eviction_by_bytes() {
        // Each 10x10 RGB image is 300 bytes; budget fits two.
        let cache = MemoryImageCache::new(600);

        let fp1 = CipherFingerprint::new("test1");
        let fp2 = CipherFingerprint::new("test2");
        let fp3 = CipherFingerprint::new("test3");

        cache.put(fp1.clone(), rgb(10, 10));
        cache.put(fp2.clone(), rgb(10, 10));
        cache.put(fp3.clone(), rgb(10, 10));

        assert!(cache.get(&fp1).is_none());
        assert!(cache.get(&fp2).is_some());
        assert!(cache.get(&fp3).is_some());
        assert_eq!(cache.bytes(), 600);
    }

    #[test]
    fn test_large_images_evict_sooner() {
        let cache = MemoryImageCache::new(30_000);

        cache.put(CipherFingerprint::new("small1"), rgb(10, 10));
        cache.put(CipherFingerprint::new("small2"), rgb(10, 10));
        assert_eq!(cache.len(), 2);

        cache.put(CipherFingerprint::new("big"), rgb(100, 100));
        assert_eq!(cache.len(), 1);
        assert!(cache.peek(&CipherFingerprint::new("big")).is_some());
    }

    #[test]
    fn test_get_refreshes_recency() {
        let cache = MemoryImageCache::new(600);
        let fp1 = CipherFingerprint::new("test1");
        let fp2 = CipherFingerprint::new("test2");

        cache.put(fp1.clone(), rgb(10, 10));
        cache.put(fp2.clone(), rgb(10, 10));
        let _ = cache.get(&fp1);
        cache.put(CipherFingerprint::new("test3"), rgb(10, 10));

        assert!(cache.peek(&fp1).is_some());
        assert!(cache.peek(&fp2).is_none());
    }

    #[test]
    fn test_replace_updates_bytes() {
        let cache = MemoryImageCache::new(10_000);
        let fp = CipherFingerprint::new("test1");

        cache.put(fp.clone(), rgb(10, 10));
        cache.put(fp.clone(), rgb(20, 10));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.bytes(), 600);
    }

    #[test]
    fn test_oversized_image_not_stored() {
        let cache = MemoryImageCache::new(100);
        cache.put(CipherFingerprint::new("huge"), rgb(10, 10));
        assert!(cache.is_empty());
        assert_eq!(cache.bytes(), 0);
    }

    #[test]
    fn test_cache_stats() {
        let cache = MemoryImageCache::new(10_000);
        let fp = CipherFingerprint::new("test1");

        cache.put(fp.clone(), rgb(10, 10));
        let _ = cache.get(&fp);
        let _ = cache.get(&CipherFingerprint::new("missing"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.bytes, 300);
    }

    #[test]
    fn test_peek_does_not_promote() {
        let cache = MemoryImageCache::new(600);

        let fp1 = CipherFingerprint::new("test1");
        let fp2 = CipherFingerprint::new("test2");

        cache.put(fp1.clone(), rgb(10, 10));
        cache.put(fp2.clone(), rgb(10, 10));
        let _ = cache.peek(&fp1);
        cache.put(CipherFingerprint::new("test3"), rgb(10, 10));

        assert!(cache.peek(&fp1).is_none());
    }

    #[test]
    fn test_clear_removes_everything() {
        let cache = MemoryImageCache::new(10_000);
        let fp = CipherFingerprint::new("test1");
        cache.put(fp.clone(), rgb(10, 10));

        cache.clear();

        assert!(cache.get(&fp).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.bytes(), 0);
    }

    #[test]
    fn test_put_from_before_clear_is_rejected() {
        let cache = MemoryImageCache::new(10_000);
        let observed = cache.generation();
        cache.clear();

        let fp = CipherFingerprint::new("late");
        assert!(!cache.put_if_current(fp.clone(), rgb(10, 10), observed));
        assert!(cache.get(&fp).is_none());

        assert!(cache.put_if_current(fp.clone(), rgb(10, 10), cache.generation()));
        assert!(cache.get(&fp).is_some());
    }

    #[test]
    fn test_concurrent_put_and_clear() {
        let cache = Arc::new(MemoryImageCache::new(1024 * 1024));
        let writers: Vec<_> = (0..4)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        cache.put(CipherFingerprint::new(format!("{t}-{i}")), rgb(4, 4));
                    }
                })
            })
            .collect();
        for _ in 0..10 {
            cache.clear();
        }
        for w in writers {
            w.join().expect("writer thread panicked");
        }

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.bytes(), 0);
    }
}
