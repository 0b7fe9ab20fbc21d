//! Image handling infrastructure.
//!
//! This module provides:
//! - Memory caching with byte-budgeted LRU eviction
//! - Plaintext decoding and downsampling

pub mod materializer;
pub mod memory_cache;

pub use materializer::{SampledImageMaterializer, sampled_dimensions};
pub use memory_cache::{CacheStats, DEFAULT_CACHE_BYTES, MemoryImageCache, image_footprint};
