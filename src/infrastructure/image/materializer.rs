//! Decodes plaintext image bytes into display-sized bitmaps.

use image::imageops::FilterType;
use tracing::trace;

use crate::domain::errors::DecodeError;
use crate::domain::ports::ImageMaterializerPort;

/// Decodes with the `image` crate and downsamples to the target height.
///
/// Images taller than the target are scaled to exactly the target height,
/// keeping aspect ratio. Smaller images are never upscaled.
#[derive(Debug, Clone, Copy)]
pub struct SampledImageMaterializer {
    filter: FilterType,
}

impl SampledImageMaterializer {
    /// Creates a materializer using a triangle filter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }

    /// Overrides the resampling filter.
    #[must_use]
    pub const fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }
}

impl Default for SampledImageMaterializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes the output dimensions for a source image and target height.
#[must_use]
pub fn sampled_dimensions(width: u32, height: u32, target_height: u32) -> (u32, u32) {
    if target_height == 0 || height <= target_height {
        return (width, height);
    }
    let scaled = u64::from(width) * u64::from(target_height) / u64::from(height);
    let scaled = u32::try_from(scaled).unwrap_or(u32::MAX).max(1);
    (scaled, target_height)
}

impl ImageMaterializerPort for SampledImageMaterializer {
    fn decode(
        &self,
        plaintext: &[u8],
        target_height: u32,
    ) -> Result<image::DynamicImage, DecodeError> {
        let img = image::load_from_memory(plaintext)
            .map_err(|e| DecodeError::Unsupported(e.to_string()))?;

        let (width, height) = sampled_dimensions(img.width(), img.height(), target_height);
        if (width, height) == (img.width(), img.height()) {
            return Ok(img);
        }

        trace!(
            from_width = img.width(),
            from_height = img.height(),
            width,
            height,
            "Downsampling image"
        );
        Ok(img.resize_exact(width, height, self.filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::new_rgb8(width, height);
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png)
            .expect("encode png");
        out.into_inner()
    }

    #[test_case(800, 400, 200, (400, 200) ; "halves_tall_image")]
    #[test_case(300, 150, 200, (300, 150) ; "keeps_short_image")]
    #[test_case(300, 200, 200, (300, 200) ; "keeps_exact_height")]
    #[test_case(1, 1000, 200, (1, 200) ; "never_zero_width")]
    #[test_case(640, 480, 0, (640, 480) ; "zero_target_keeps_size")]
    fn test_sampled_dimensions(width: u32, height: u32, target: u32, expected: (u32, u32)) {
        assert_eq!(sampled_dimensions(width, height, target), expected);
    }

    #[test]
    fn test_decode_downsamples_to_target() {
        let materializer = SampledImageMaterializer::new();
        let img = materializer.decode(&png(600, 400), 200).expect("decode");
        assert_eq!((img.width(), img.height()), (300, 200));
    }

    #[test]
    fn test_decode_is_deterministic() {
        let materializer = SampledImageMaterializer::new();
        let bytes = png(513, 777);
        let a = materializer.decode(&bytes, 200).expect("decode");
        let b = materializer.decode(&bytes, 200).expect("decode");
        assert_eq!((a.width(), a.height()), (b.width(), b.height()));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let materializer = SampledImageMaterializer::new();
        let result = materializer.decode(b"definitely not an image", 200);
        assert!(matches!(result, Err(DecodeError::Unsupported(_))));
    }
}
