//! Headless consumer that renders the bound attachment to a file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::binding::BindingSlot;
use crate::domain::ports::ImageConsumer;

/// Errors from writing the rendered attachment.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Nothing has been bound yet.
    #[error("no image bound to {0}")]
    NothingBound(PathBuf),
    /// The image could not be encoded or written.
    #[error("failed to write image: {0}")]
    Write(#[from] image::ImageError),
}

/// What the sink currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkStatus {
    /// Nothing requested yet.
    Empty,
    /// Waiting, with the reserved height.
    Placeholder(u32),
    /// Showing a bitmap.
    #[allow(missing_docs)]
    Ready { width: u32, height: u32 },
}

/// Consumer that keeps the bound bitmap and writes it to `output` on demand.
pub struct FileSinkConsumer {
    output: PathBuf,
    slot: BindingSlot,
    image: Mutex<Option<Arc<image::DynamicImage>>>,
    status: Mutex<SinkStatus>,
    last_transition: Mutex<Option<Duration>>,
}

impl FileSinkConsumer {
    /// Creates a sink that writes to `output`.
    #[must_use]
    pub fn new(output: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            output: output.into(),
            slot: BindingSlot::new(),
            image: Mutex::new(None),
            status: Mutex::new(SinkStatus::Empty),
            last_transition: Mutex::new(None),
        })
    }

    /// Returns the output path.
    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Returns what the sink currently shows.
    #[must_use]
    pub fn status(&self) -> SinkStatus {
        self.status.lock().clone()
    }

    /// Returns the bound bitmap, if any.
    #[must_use]
    pub fn image(&self) -> Option<Arc<image::DynamicImage>> {
        self.image.lock().clone()
    }

    /// Duration of the last entry transition, if one was played.
    #[must_use]
    pub fn last_transition(&self) -> Option<Duration> {
        *self.last_transition.lock()
    }

    /// Writes the bound bitmap. The format follows the output extension.
    ///
    /// # Errors
    /// Returns error if nothing is bound or the file cannot be written.
    pub fn save(&self) -> Result<&Path, SinkError> {
        let image = self
            .image()
            .ok_or_else(|| SinkError::NothingBound(self.output.clone()))?;
        image.save(&self.output)?;
        info!(
            path = %self.output.display(),
            width = image.width(),
            height = image.height(),
            "Attachment written"
        );
        Ok(&self.output)
    }
}

impl ImageConsumer for FileSinkConsumer {
    fn binding(&self) -> &BindingSlot {
        &self.slot
    }

    fn set_image(&self, image: Arc<image::DynamicImage>) {
        *self.status.lock() = SinkStatus::Ready {
            width: image.width(),
            height: image.height(),
        };
        *self.image.lock() = Some(image);
    }

    fn clear_transient_state(&self) {
        *self.last_transition.lock() = None;
    }

    fn play_entry_transition(&self, duration: Duration) {
        debug!(ms = duration.as_millis(), "Entry transition");
        *self.last_transition.lock() = Some(duration);
    }

    fn show_placeholder(&self, height: u32) {
        *self.image.lock() = None;
        *self.status.lock() = SinkStatus::Placeholder(height);
    }
}

impl std::fmt::Debug for FileSinkConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSinkConsumer")
            .field("output", &self.output)
            .field("status", &*self.status.lock())
            .field("phase", &self.slot.phase())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_without_image_fails() {
        let dir = tempdir().unwrap();
        let sink = FileSinkConsumer::new(dir.path().join("out.png"));
        assert!(matches!(sink.save(), Err(SinkError::NothingBound(_))));
    }

    #[test]
    fn test_placeholder_then_image() {
        let dir = tempdir().unwrap();
        let sink = FileSinkConsumer::new(dir.path().join("out.png"));

        sink.show_placeholder(200);
        assert_eq!(sink.status(), SinkStatus::Placeholder(200));

        sink.play_entry_transition(Duration::from_millis(1000));
        sink.set_image(Arc::new(image::DynamicImage::new_rgb8(30, 20)));
        assert_eq!(
            sink.status(),
            SinkStatus::Ready {
                width: 30,
                height: 20
            }
        );
        assert_eq!(sink.last_transition(), Some(Duration::from_millis(1000)));

        sink.clear_transient_state();
        assert_eq!(sink.last_transition(), None);
    }

    #[test]
    fn test_save_writes_png() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.png");
        let sink = FileSinkConsumer::new(&path);
        sink.set_image(Arc::new(image::DynamicImage::new_rgb8(12, 8)));

        sink.save().unwrap();

        let written = image::open(&path).unwrap();
        assert_eq!((written.width(), written.height()), (12, 8));
    }

    #[test]
    fn test_placeholder_drops_previous_image() {
        let dir = tempdir().unwrap();
        let sink = FileSinkConsumer::new(dir.path().join("out.png"));
        sink.set_image(Arc::new(image::DynamicImage::new_rgb8(4, 4)));

        sink.show_placeholder(50);
        assert!(sink.image().is_none());
    }
}
