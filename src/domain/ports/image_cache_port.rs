//! Port definition for the decoded-image memory cache.

use std::sync::Arc;

use crate::domain::entities::CipherFingerprint;

/// Bounded store of materialized bitmaps keyed by ciphertext fingerprint.
///
/// Implementations must be thread-safe and serialize mutations internally.
pub trait ImageCachePort: Send + Sync {
    /// Returns the cached image, counting as an access.
    /// Returns None on a miss.
    fn get(&self, fingerprint: &CipherFingerprint) -> Option<Arc<image::DynamicImage>>;

    /// Inserts an image or refreshes its recency.
    fn put(&self, fingerprint: CipherFingerprint, image: Arc<image::DynamicImage>);

    /// Inserts only if no clear has happened since `generation` was observed.
    ///
    /// Returns true if the image was stored.
    fn put_if_current(
        &self,
        fingerprint: CipherFingerprint,
        image: Arc<image::DynamicImage>,
        generation: u64,
    ) -> bool;

    /// Returns the current clear generation.
    fn generation(&self) -> u64;

    /// Returns the current number of cached images.
    fn len(&self) -> usize;

    /// Returns true if the cache is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evicts everything and advances the generation.
    fn clear(&self);
}
