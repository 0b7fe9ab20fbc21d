//! Infrastructure layer with adapters behind the domain ports.

/// Application configuration.
pub mod config;
/// Key storage and attachment decryption.
pub mod crypto;
/// Image caching and materialization.
pub mod image;
/// Ciphertext transport.
pub mod network;

pub use config::{AppConfig, CliArgs, ConfigError, LogLevel, StorageManager, TransportConfig};
pub use crypto::{AesGcmDecryptor, CiphertextEncoding, KeyRing};
pub use self::image::{CacheStats, MemoryImageCache, SampledImageMaterializer};
pub use network::HttpContentFetcher;
