//! Port definition for ciphertext retrieval.

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::entities::ContentLocator;
use crate::domain::errors::FetchError;

/// Retrieves raw ciphertext for a locator.
///
/// Timeouts and session handling belong to the implementation.
#[async_trait]
pub trait ContentFetcherPort: Send + Sync {
    /// Fetches the ciphertext bytes stored at `locator`.
    async fn fetch(&self, locator: &ContentLocator) -> Result<Bytes, FetchError>;
}
