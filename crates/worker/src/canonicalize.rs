//! Filesystem input canonicalizer.
//!
//! Inputs are expected to arrive already cropped/resized by the upload
//! step. This collaborator only reads the file, sniffs the header for its
//! format and dimensions, and rejects anything the generation service
//! should not receive. It never decodes or rewrites pixels.

use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use backdrop_core::asset::{AssetRef, CanonicalAsset, CanonicalMode};
use backdrop_pipeline::collaborators::{Canonicalizer, ConversionError};
use image::{ImageFormat, ImageReader};

/// Longest accepted edge, in pixels.
pub const DEFAULT_MAX_EDGE: u32 = 4096;

/// Formats the generation service accepts.
const SUPPORTED_FORMATS: &[ImageFormat] = &[ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::WebP];

/// Reads inputs from local paths given as [`AssetRef`]s.
pub struct FsCanonicalizer {
    max_edge: u32,
}

impl FsCanonicalizer {
    pub fn new(max_edge: u32) -> Self {
        Self { max_edge }
    }
}

impl Default for FsCanonicalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EDGE)
    }
}

#[async_trait]
impl Canonicalizer for FsCanonicalizer {
    async fn canonicalize(
        &self,
        input: &AssetRef,
        mode: CanonicalMode,
    ) -> Result<CanonicalAsset, ConversionError> {
        let path = Path::new(input.as_str());
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| ConversionError(format!("cannot read {}: {e}", path.display())))?;

        let (format, width, height) = sniff(&data)?;
        validate_shape(width, height, mode, self.max_edge)?;

        tracing::debug!(
            input = %input,
            format = ?format,
            width,
            height,
            "Input canonicalized",
        );
        Ok(CanonicalAsset::new(format.to_mime_type(), data))
    }
}

/// Detect the format and dimensions from the header.
fn sniff(data: &[u8]) -> Result<(ImageFormat, u32, u32), ConversionError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ConversionError(format!("cannot inspect image: {e}")))?;

    let format = reader
        .format()
        .filter(|f| SUPPORTED_FORMATS.contains(f))
        .ok_or_else(|| ConversionError("unsupported image format".to_string()))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ConversionError(format!("cannot read image dimensions: {e}")))?;

    Ok((format, width, height))
}

fn validate_shape(
    width: u32,
    height: u32,
    mode: CanonicalMode,
    max_edge: u32,
) -> Result<(), ConversionError> {
    if width == 0 || height == 0 {
        return Err(ConversionError("image has no pixels".to_string()));
    }
    if width.max(height) > max_edge {
        return Err(ConversionError(format!(
            "image is {width}x{height}, larger than {max_edge}px on its longest edge"
        )));
    }
    if mode == CanonicalMode::Square && width != height {
        return Err(ConversionError(format!(
            "square mode expects a square image, got {width}x{height}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserve_mode_accepts_any_aspect_ratio() {
        assert!(validate_shape(1024, 768, CanonicalMode::Preserve, DEFAULT_MAX_EDGE).is_ok());
    }

    #[test]
    fn square_mode_rejects_rectangles() {
        let err = validate_shape(1024, 768, CanonicalMode::Square, DEFAULT_MAX_EDGE).unwrap_err();
        assert_eq!(err.0, "square mode expects a square image, got 1024x768");
    }

    #[test]
    fn oversized_images_are_rejected() {
        assert!(validate_shape(5000, 5000, CanonicalMode::Square, DEFAULT_MAX_EDGE).is_err());
        assert!(validate_shape(4096, 4096, CanonicalMode::Square, DEFAULT_MAX_EDGE).is_ok());
    }

    #[test]
    fn garbage_bytes_are_unsupported() {
        let err = sniff(b"definitely not an image").unwrap_err();
        assert_eq!(err.0, "unsupported image format");
    }
}
