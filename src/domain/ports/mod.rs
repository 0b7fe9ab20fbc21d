mod content_fetcher_port;
mod decryptor_port;
mod image_cache_port;
mod image_consumer_port;
mod image_materializer_port;

pub use content_fetcher_port::ContentFetcherPort;
pub use decryptor_port::DecryptorPort;
pub use image_cache_port::ImageCachePort;
pub use image_consumer_port::ImageConsumer;
pub use image_materializer_port::ImageMaterializerPort;
