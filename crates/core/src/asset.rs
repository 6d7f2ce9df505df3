//! Image payloads and opaque asset handles.
//!
//! [`ImageAsset`] is the in-memory form exchanged with the generation
//! service: a canonicalized input going in, a generated image coming out.
//! [`AssetRef`] is the opaque handle a host uses to locate a source file
//! or a stored output; the pipeline never interprets it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// AssetRef
// ---------------------------------------------------------------------------

/// Opaque handle to an asset owned by a host collaborator (a file path,
/// an object-store key, an in-memory slot...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AssetRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ---------------------------------------------------------------------------
// ImageAsset
// ---------------------------------------------------------------------------

/// Raw image bytes plus their MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// A source image after canonicalization, ready for submission.
pub type CanonicalAsset = ImageAsset;

/// An image produced by the generation service.
pub type GeneratedAsset = ImageAsset;

impl ImageAsset {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// File extension conventionally used for this asset's MIME type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            _ => "png",
        }
    }
}

// Byte payloads can be megabytes; keep debug output readable.
impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// CanonicalMode
// ---------------------------------------------------------------------------

/// How a raw upload is normalized before submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalMode {
    /// Center-crop to a square of the canonical edge length.
    #[default]
    Square,
    /// Keep the source aspect ratio.
    Preserve,
}

impl CanonicalMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "square",
            Self::Preserve => "preserve",
        }
    }
}

impl fmt::Display for CanonicalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "square" | "crop" => Ok(Self::Square),
            "preserve" | "original" => Ok(Self::Preserve),
            other => Err(CoreError::Validation(format!(
                "Unknown canonical mode: '{other}'. Valid modes: square, preserve"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
