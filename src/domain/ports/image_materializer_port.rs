//! Port definition for turning plaintext into a displayable bitmap.

use crate::domain::errors::DecodeError;

/// Decodes plaintext image bytes, downsampled to a target height.
///
/// Must be deterministic: the same bytes and height yield the same dimensions.
#[cfg_attr(test, mockall::automock)]
pub trait ImageMaterializerPort: Send + Sync {
    /// Decodes `plaintext` for display at `target_height` pixels.
    fn decode(
        &self,
        plaintext: &[u8],
        target_height: u32,
    ) -> Result<image::DynamicImage, DecodeError>;
}
