mod file_sink;

pub use file_sink::{FileSinkConsumer, SinkError, SinkStatus};
