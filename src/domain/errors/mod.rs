//! Domain error types.

mod pipeline_error;

pub use pipeline_error::{DecodeError, DecryptError, FetchError, PipelineError};
