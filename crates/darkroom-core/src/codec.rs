//! Decoding and encoding of raster files, with validation and timeouts.
//!
//! Decode order: file-size ceiling, magic-byte sniff, header-only dimension
//! check, then full pixel decode under a timeout. Encoding downgrades color
//! depth deterministically when the target container cannot represent it and
//! reports each downgrade as a non-fatal warning.

use std::fmt;
use std::io::{BufWriter, Cursor};
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageReader};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use crate::config::{Config, LimitsConfig};
use crate::error::JobError;
use crate::format::ImageKind;
use crate::job::EncodeWarning;

/// A decoded image, exclusively owned by the worker processing it.
#[derive(Debug, Clone)]
pub struct Raster {
    /// Pixel data
    pub image: DynamicImage,

    /// Format the source file decoded from
    pub source_format: ImageKind,

    /// Target container for encoding; conversion stages rewrite this
    pub output_format: ImageKind,

    /// JPEG quality override requested by a conversion stage
    pub jpeg_quality: Option<u8>,
}

impl Raster {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Behavior when a destination path already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Write over the existing file
    Overwrite,
    /// Leave the existing file alone and end the job as skipped
    Skip,
    /// Probe `stem_1.ext`, `stem_2.ext`, ... and take the first free path
    Rename,
}

impl CollisionPolicy {
    /// Parse a policy name. Case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "overwrite" => Some(CollisionPolicy::Overwrite),
            "skip" => Some(CollisionPolicy::Skip),
            "rename" => Some(CollisionPolicy::Rename),
            _ => None,
        }
    }
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionPolicy::Overwrite => write!(f, "overwrite"),
            CollisionPolicy::Skip => write!(f, "skip"),
            CollisionPolicy::Rename => write!(f, "rename"),
        }
    }
}

/// Where a write should land after consulting the collision policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationPlan {
    /// Encode to this path
    Write(PathBuf),
    /// Destination exists and the policy says leave it alone
    SkipExisting,
}

/// Apply the collision policy to a destination path.
pub fn plan_destination(dest: &Path, policy: CollisionPolicy) -> DestinationPlan {
    if !dest.exists() {
        return DestinationPlan::Write(dest.to_path_buf());
    }
    match policy {
        CollisionPolicy::Overwrite => DestinationPlan::Write(dest.to_path_buf()),
        CollisionPolicy::Skip => DestinationPlan::SkipExisting,
        CollisionPolicy::Rename => {
            let stem = dest
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "output".to_string());
            let ext = dest.extension().map(|e| e.to_string_lossy().into_owned());
            let parent = dest.parent().unwrap_or_else(|| Path::new("."));

            let mut counter = 1u32;
            loop {
                let name = match &ext {
                    Some(ext) => format!("{}_{}.{}", stem, counter, ext),
                    None => format!("{}_{}", stem, counter),
                };
                let candidate = parent.join(name);
                if !candidate.exists() {
                    return DestinationPlan::Write(candidate);
                }
                counter += 1;
            }
        }
    }
}

/// Codec with configurable limits and timeout.
pub struct ImageCodec {
    limits: LimitsConfig,
    jpeg_quality: u8,
}

impl ImageCodec {
    /// Create a codec from configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            limits: config.limits.clone(),
            jpeg_quality: config.output.jpeg_quality,
        }
    }

    /// Decode an image file into a raster, with validation and timeout.
    pub async fn decode(&self, path: &Path) -> Result<Raster, JobError> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| JobError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if metadata.len() > max_bytes {
            return Err(JobError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: metadata.len() / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        let bytes = tokio::fs::read(path).await.map_err(|e| JobError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let path_owned = path.to_path_buf();
        let max_dimension = self.limits.max_image_dimension;
        let timeout_duration = Duration::from_millis(self.limits.decode_timeout_ms);

        let decode_result = timeout(timeout_duration, async {
            tokio::task::spawn_blocking(move || {
                Self::decode_bytes(&bytes, &path_owned, max_dimension)
            })
            .await
        })
        .await;

        match decode_result {
            Ok(Ok(Ok(raster))) => Ok(raster),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(e)) => Err(JobError::Processing {
                stage: "decode",
                message: format!("Task join error: {}", e),
            }),
            Err(_) => Err(JobError::Processing {
                stage: "decode",
                message: format!(
                    "Decoding {} timed out after {}ms",
                    path.display(),
                    self.limits.decode_timeout_ms
                ),
            }),
        }
    }

    /// Synchronous decode from bytes (runs in spawn_blocking).
    fn decode_bytes(bytes: &[u8], path: &Path, max_dimension: u32) -> Result<Raster, JobError> {
        let kind = match sniff_header(bytes) {
            Sniff::Kind(kind) => kind,
            Sniff::Foreign(name) => {
                return Err(JobError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    detail: format!("{} is outside the supported set", name),
                })
            }
            Sniff::Unknown => {
                return Err(JobError::UnsupportedFormat {
                    path: path.to_path_buf(),
                    detail: "unrecognized header".to_string(),
                })
            }
        };

        // Header-only dimension probe before committing to a full decode
        let mut reader = ImageReader::new(Cursor::new(bytes));
        reader.set_format(kind.to_image_format());
        let (width, height) = reader.into_dimensions().map_err(|e| JobError::CorruptFile {
            path: path.to_path_buf(),
            message: format!("cannot read image header: {}", e),
        })?;

        if width > max_dimension || height > max_dimension {
            return Err(JobError::ImageTooLarge {
                path: path.to_path_buf(),
                width,
                height,
                max_dim: max_dimension,
            });
        }

        let image = image::load_from_memory_with_format(bytes, kind.to_image_format()).map_err(
            |e| JobError::CorruptFile {
                path: path.to_path_buf(),
                message: e.to_string(),
            },
        )?;

        Ok(Raster {
            image,
            source_format: kind,
            output_format: kind,
            jpeg_quality: None,
        })
    }

    /// Encode a raster to its output format at the given path.
    ///
    /// Returns the non-fatal downgrade warnings applied while encoding.
    pub async fn encode(&self, raster: Raster, dest: PathBuf) -> Result<Vec<EncodeWarning>, JobError> {
        let quality = raster.jpeg_quality.unwrap_or(self.jpeg_quality);
        let format = raster.output_format;
        let image = raster.image;
        let path_owned = dest.clone();

        let encode_result = tokio::task::spawn_blocking(move || {
            Self::encode_sync(image, format, quality, &path_owned)
        })
        .await;

        match encode_result {
            Ok(Ok(warnings)) => Ok(warnings),
            Ok(Err(e)) => Err(e),
            Err(e) => Err(JobError::Processing {
                stage: "encode",
                message: format!("Task join error: {}", e),
            }),
        }
    }

    /// Synchronous encode (runs in spawn_blocking).
    fn encode_sync(
        image: DynamicImage,
        format: ImageKind,
        quality: u8,
        path: &Path,
    ) -> Result<Vec<EncodeWarning>, JobError> {
        let (image, warnings) = prepare_for_format(image, format);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| JobError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            }
        }

        match format {
            ImageKind::Jpeg => {
                let file = std::fs::File::create(path).map_err(|e| JobError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                let mut encoder = JpegEncoder::new_with_quality(BufWriter::new(file), quality);
                encoder
                    .encode_image(&image)
                    .map_err(|e| map_encode_error(e, path))?;
            }
            _ => {
                image
                    .save_with_format(path, format.to_image_format())
                    .map_err(|e| map_encode_error(e, path))?;
            }
        }

        Ok(warnings)
    }
}

fn map_encode_error(error: image::ImageError, path: &Path) -> JobError {
    match error {
        image::ImageError::IoError(e) => JobError::Io {
            path: path.to_path_buf(),
            source: e,
        },
        other => JobError::Processing {
            stage: "encode",
            message: other.to_string(),
        },
    }
}

/// Convert the buffer so the target container can represent it, recording
/// each lossy downgrade.
fn prepare_for_format(
    image: DynamicImage,
    format: ImageKind,
) -> (DynamicImage, Vec<EncodeWarning>) {
    let mut warnings = Vec::new();
    let mut image = image;

    if !format.supports_deep_color() && is_deep(&image) {
        image = match image {
            DynamicImage::ImageLuma16(_) => DynamicImage::ImageLuma8(image.to_luma8()),
            DynamicImage::ImageLumaA16(_) => DynamicImage::ImageLumaA8(image.to_luma_alpha8()),
            DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgb32F(_) => {
                DynamicImage::ImageRgb8(image.to_rgb8())
            }
            _ => DynamicImage::ImageRgba8(image.to_rgba8()),
        };
        warnings.push(EncodeWarning::BitDepthNarrowed);
    }

    if !format.supports_alpha() && image.color().has_alpha() {
        image = match image {
            DynamicImage::ImageLumaA8(_) => DynamicImage::ImageLuma8(image.to_luma8()),
            DynamicImage::ImageLumaA16(_) => DynamicImage::ImageLuma16(image.to_luma16()),
            DynamicImage::ImageRgba16(_) => DynamicImage::ImageRgb16(image.to_rgb16()),
            _ => DynamicImage::ImageRgb8(image.to_rgb8()),
        };
        warnings.push(EncodeWarning::AlphaFlattened);
    }

    // The BMP and WebP encoders only accept RGB-family buffers
    if matches!(format, ImageKind::Bmp | ImageKind::WebP) {
        image = match image {
            DynamicImage::ImageLuma8(_) => DynamicImage::ImageRgb8(image.to_rgb8()),
            DynamicImage::ImageLumaA8(_) => DynamicImage::ImageRgba8(image.to_rgba8()),
            other => other,
        };
    }

    (image, warnings)
}

fn is_deep(image: &DynamicImage) -> bool {
    matches!(
        image,
        DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_)
            | DynamicImage::ImageRgb16(_)
            | DynamicImage::ImageRgba16(_)
            | DynamicImage::ImageRgb32F(_)
            | DynamicImage::ImageRgba32F(_)
    )
}

enum Sniff {
    /// A member of the supported format set
    Kind(ImageKind),
    /// A recognizable image container outside the supported set
    Foreign(&'static str),
    /// Not a known image header
    Unknown,
}

/// Identify the container from the file's first bytes.
fn sniff_header(bytes: &[u8]) -> Sniff {
    if bytes.len() < 4 {
        return Sniff::Unknown;
    }

    // JPEG: FF D8 FF
    if bytes[0] == 0xFF && bytes[1] == 0xD8 && bytes[2] == 0xFF {
        return Sniff::Kind(ImageKind::Jpeg);
    }

    // PNG: 89 50 4E 47
    if bytes[0] == 0x89 && bytes[1] == b'P' && bytes[2] == b'N' && bytes[3] == b'G' {
        return Sniff::Kind(ImageKind::Png);
    }

    // WebP: RIFF....WEBP
    if bytes[0] == b'R' && bytes[1] == b'I' && bytes[2] == b'F' && bytes[3] == b'F' {
        if bytes.len() >= 12
            && bytes[8] == b'W'
            && bytes[9] == b'E'
            && bytes[10] == b'B'
            && bytes[11] == b'P'
        {
            return Sniff::Kind(ImageKind::WebP);
        }
        return Sniff::Foreign("riff");
    }

    // BMP: BM
    if bytes[0] == b'B' && bytes[1] == b'M' {
        return Sniff::Kind(ImageKind::Bmp);
    }

    // TIFF: II (little-endian) or MM (big-endian) followed by version 42
    let is_tiff_le = bytes[0] == b'I' && bytes[1] == b'I' && bytes[2] == 0x2A && bytes[3] == 0x00;
    let is_tiff_be = bytes[0] == b'M' && bytes[1] == b'M' && bytes[2] == 0x00 && bytes[3] == 0x2A;
    if is_tiff_le || is_tiff_be {
        return Sniff::Kind(ImageKind::Tiff);
    }

    // GIF: GIF8
    if bytes[0] == b'G' && bytes[1] == b'I' && bytes[2] == b'F' && bytes[3] == b'8' {
        return Sniff::Foreign("gif");
    }

    // HEIC/HEIF/AVIF: ftyp box at offset 4
    if bytes.len() >= 12
        && bytes[4] == b'f'
        && bytes[5] == b't'
        && bytes[6] == b'y'
        && bytes[7] == b'p'
    {
        return Sniff::Foreign("heif/avif");
    }

    Sniff::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn test_config() -> Config {
        Config::default()
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([120, 80, 40]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_sniff_known_formats() {
        assert!(matches!(
            sniff_header(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Sniff::Kind(ImageKind::Jpeg)
        ));
        assert!(matches!(
            sniff_header(&[0x89, b'P', b'N', b'G']),
            Sniff::Kind(ImageKind::Png)
        ));
        assert!(matches!(
            sniff_header(b"RIFF\x00\x00\x00\x00WEBP"),
            Sniff::Kind(ImageKind::WebP)
        ));
        assert!(matches!(
            sniff_header(&[b'I', b'I', 0x2A, 0x00]),
            Sniff::Kind(ImageKind::Tiff)
        ));
        assert!(matches!(
            sniff_header(&[b'M', b'M', 0x00, 0x2A]),
            Sniff::Kind(ImageKind::Tiff)
        ));
    }

    #[test]
    fn test_sniff_foreign_and_unknown() {
        assert!(matches!(sniff_header(b"GIF89a"), Sniff::Foreign("gif")));
        assert!(matches!(sniff_header(&[0u8; 12]), Sniff::Unknown));
        assert!(matches!(sniff_header(&[b'I', b'I', 0, 0]), Sniff::Unknown));
        assert!(matches!(sniff_header(b"ab"), Sniff::Unknown));
    }

    #[test]
    fn test_decode_rejects_oversized_header() {
        let bytes = png_bytes(64, 64);
        let err = ImageCodec::decode_bytes(&bytes, Path::new("big.png"), 32).unwrap_err();
        assert!(matches!(err, JobError::ImageTooLarge { width: 64, .. }));
    }

    #[test]
    fn test_decode_corrupt_container() {
        // Valid PNG magic followed by garbage
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&[0xAB; 32]);
        let err = ImageCodec::decode_bytes(&bytes, Path::new("bad.png"), 10000).unwrap_err();
        assert!(matches!(err, JobError::CorruptFile { .. }));
    }

    #[test]
    fn test_decode_unsupported_format() {
        let err =
            ImageCodec::decode_bytes(b"GIF89a trailer", Path::new("anim.gif"), 10000).unwrap_err();
        match err {
            JobError::UnsupportedFormat { detail, .. } => assert!(detail.contains("gif")),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_ignores_misleading_extension() {
        // PNG bytes behind a .jpg name decode as PNG
        let bytes = png_bytes(8, 8);
        let raster = ImageCodec::decode_bytes(&bytes, Path::new("misnamed.jpg"), 10000).unwrap();
        assert_eq!(raster.source_format, ImageKind::Png);
        assert_eq!(raster.output_format, ImageKind::Png);
    }

    #[test]
    fn test_prepare_flattens_alpha_for_jpeg() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 128]));
        let (prepared, warnings) =
            prepare_for_format(DynamicImage::ImageRgba8(img), ImageKind::Jpeg);
        assert!(!prepared.color().has_alpha());
        assert_eq!(warnings, vec![EncodeWarning::AlphaFlattened]);
    }

    #[test]
    fn test_prepare_narrows_deep_channels() {
        let img = image::ImageBuffer::<Rgb<u16>, Vec<u16>>::from_pixel(4, 4, Rgb([65535, 0, 0]));
        let (prepared, warnings) =
            prepare_for_format(DynamicImage::ImageRgb16(img), ImageKind::WebP);
        assert!(matches!(prepared, DynamicImage::ImageRgb8(_)));
        assert_eq!(warnings, vec![EncodeWarning::BitDepthNarrowed]);
    }

    #[test]
    fn test_prepare_lossless_target_untouched() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 128]));
        let (prepared, warnings) =
            prepare_for_format(DynamicImage::ImageRgba8(img), ImageKind::Png);
        assert!(matches!(prepared, DynamicImage::ImageRgba8(_)));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_plan_destination_rename_probes_counter_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("photo.png");
        std::fs::write(&dest, b"first").unwrap();
        std::fs::write(dir.path().join("photo_1.png"), b"second").unwrap();

        let plan = plan_destination(&dest, CollisionPolicy::Rename);
        assert_eq!(
            plan,
            DestinationPlan::Write(dir.path().join("photo_2.png"))
        );
    }

    #[test]
    fn test_plan_destination_skip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("photo.png");
        std::fs::write(&dest, b"existing").unwrap();

        assert_eq!(
            plan_destination(&dest, CollisionPolicy::Skip),
            DestinationPlan::SkipExisting
        );
        assert_eq!(
            plan_destination(&dest, CollisionPolicy::Overwrite),
            DestinationPlan::Write(dest.clone())
        );

        // No collision at all: every policy writes in place
        let fresh = dir.path().join("fresh.png");
        assert_eq!(
            plan_destination(&fresh, CollisionPolicy::Skip),
            DestinationPlan::Write(fresh.clone())
        );
    }

    #[tokio::test]
    async fn test_decode_missing_file_is_io_error() {
        let codec = ImageCodec::new(&test_config());
        let err = codec.decode(Path::new("/nonexistent/missing.png")).await;
        assert!(matches!(err, Err(JobError::Io { .. })));
    }

    #[tokio::test]
    async fn test_encode_decode_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let codec = ImageCodec::new(&test_config());

        let img = RgbImage::from_fn(16, 16, |x, y| Rgb([x as u8 * 10, y as u8 * 10, 0]));
        let raster = Raster {
            image: DynamicImage::ImageRgb8(img.clone()),
            source_format: ImageKind::Png,
            output_format: ImageKind::Png,
            jpeg_quality: None,
        };

        let dest = dir.path().join("out.png");
        let warnings = codec.encode(raster, dest.clone()).await.unwrap();
        assert!(warnings.is_empty());

        let decoded = codec.decode(&dest).await.unwrap();
        assert_eq!(decoded.source_format, ImageKind::Png);
        assert_eq!(decoded.image.to_rgb8().as_raw(), img.as_raw());
    }

    #[tokio::test]
    async fn test_encode_jpeg_flattens_alpha_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let codec = ImageCodec::new(&test_config());

        let img = RgbaImage::from_pixel(8, 8, Rgba([200, 100, 50, 255]));
        let raster = Raster {
            image: DynamicImage::ImageRgba8(img),
            source_format: ImageKind::Png,
            output_format: ImageKind::Jpeg,
            jpeg_quality: None,
        };

        let dest = dir.path().join("out.jpg");
        let warnings = codec.encode(raster, dest.clone()).await.unwrap();
        assert_eq!(warnings, vec![EncodeWarning::AlphaFlattened]);

        let decoded = codec.decode(&dest).await.unwrap();
        assert_eq!(decoded.source_format, ImageKind::Jpeg);
        assert_eq!(decoded.width(), 8);
    }
}
