//! Network adapters.

pub mod http_fetcher;

pub use http_fetcher::{DEFAULT_TIMEOUT_SECS, HttpContentFetcher};
