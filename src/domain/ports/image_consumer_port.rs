//! Port definition for UI consumers that display attachments.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::binding::BindingSlot;

/// A view that can display one attachment at a time.
///
/// The pipeline only holds consumers weakly. All methods are invoked from
/// the delivery context or the caller of `request`. Apart from
/// `binding` and `show_placeholder`, methods may run while the slot returned
/// by `binding` is locked, so they must not access it.
pub trait ImageConsumer: Send + Sync {
    /// The consumer's binding slot.
    fn binding(&self) -> &BindingSlot;

    /// Displays a bitmap.
    fn set_image(&self, image: Arc<image::DynamicImage>);

    /// Stops any running animation or transition.
    fn clear_transient_state(&self);

    /// Starts the entry transition for a freshly delivered bitmap.
    fn play_entry_transition(&self, duration: Duration);

    /// Shows an empty placeholder reserving `height` pixels.
    fn show_placeholder(&self, height: u32);
}
