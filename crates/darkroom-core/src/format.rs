//! The closed set of raster formats darkroom reads and writes.

use std::fmt;
use std::path::Path;

use image::ImageFormat;
use serde::{Deserialize, Serialize};

/// Supported image formats. Anything else is rejected at decode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    Bmp,
    Tiff,
    WebP,
}

impl ImageKind {
    /// Parse a user-supplied format name (`png`, `jpg`, `jpeg`, `bmp`,
    /// `tif`, `tiff`, `webp`). Case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Some(ImageKind::Png),
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "bmp" => Some(ImageKind::Bmp),
            "tif" | "tiff" => Some(ImageKind::Tiff),
            "webp" => Some(ImageKind::WebP),
            _ => None,
        }
    }

    /// Detect the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::parse)
    }

    /// Canonical file extension used when deriving destination paths.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Bmp => "bmp",
            ImageKind::Tiff => "tiff",
            ImageKind::WebP => "webp",
        }
    }

    /// The `image` crate format used for encoding.
    pub fn to_image_format(&self) -> ImageFormat {
        match self {
            ImageKind::Png => ImageFormat::Png,
            ImageKind::Jpeg => ImageFormat::Jpeg,
            ImageKind::Bmp => ImageFormat::Bmp,
            ImageKind::Tiff => ImageFormat::Tiff,
            ImageKind::WebP => ImageFormat::WebP,
        }
    }

    /// Whether the container can store an alpha channel.
    ///
    /// JPEG and BMP output is flattened to opaque RGB before encoding.
    pub fn supports_alpha(&self) -> bool {
        !matches!(self, ImageKind::Jpeg | ImageKind::Bmp)
    }

    /// Whether the container can store 16-bit channels.
    pub fn supports_deep_color(&self) -> bool {
        matches!(self, ImageKind::Png | ImageKind::Tiff)
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageKind::Png => "PNG",
            ImageKind::Jpeg => "JPEG",
            ImageKind::Bmp => "BMP",
            ImageKind::Tiff => "TIFF",
            ImageKind::WebP => "WebP",
        };
        write!(f, "{}", name)
    }
}

/// Check whether a path carries one of the supported image extensions.
pub fn is_supported_extension(path: &Path) -> bool {
    ImageKind::from_path(path).is_some()
}
