//! Presentation layer with attachment consumers.

/// File-backed consumer used by the binary.
pub mod sink;

pub use sink::{FileSinkConsumer, SinkError, SinkStatus};
