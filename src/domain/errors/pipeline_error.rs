//! Attachment pipeline error types.

use thiserror::Error;

/// Failure to retrieve ciphertext.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum FetchError {
    #[error("content not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),
}

/// Failure to decrypt ciphertext.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum DecryptError {
    #[error("unknown key: {0}")]
    UnknownKey(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("invalid iv: {0}")]
    InvalidIv(String),

    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    #[error("authentication failed")]
    AuthenticationFailed,
}

/// Failure to decode plaintext into a bitmap.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum DecodeError {
    #[error("unsupported image data: {0}")]
    Unsupported(String),

    #[error("decode task failed: {0}")]
    TaskFailed(String),
}

/// Outcome taxonomy at the pipeline boundary.
///
/// Every variant degrades to "no image" for the affected consumer.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum PipelineError {
    #[error("content unavailable: {0}")]
    FetchUnavailable(#[from] FetchError),

    #[error("decrypt failure: {0}")]
    DecryptFailure(#[from] DecryptError),

    #[error("decode failure: {0}")]
    DecodeFailure(#[from] DecodeError),

    #[error("request cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Returns true if the request was cancelled rather than failed.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
