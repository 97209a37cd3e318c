//! Brightness, contrast and sharpen adjustments.
//!
//! Sub-steps run in a fixed order (brightness, then contrast, then sharpen)
//! so repeated runs over the same input produce identical bytes. A sub-step
//! at its identity value is skipped outright rather than applied with a
//! neutral argument.

use image::{imageops, DynamicImage, ImageBuffer, Pixel};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::codec::Raster;
use crate::error::JobError;

/// Additive brightness bounds, in 8-bit channel units.
const BRIGHTNESS_RANGE: std::ops::RangeInclusive<i32> = -255..=255;
/// Contrast factor bounds; 1.0 is identity.
const CONTRAST_RANGE: std::ops::RangeInclusive<f32> = 0.0..=4.0;
/// Unsharp-mask sigma bounds; 0.0 is identity.
const SHARPEN_RANGE: std::ops::RangeInclusive<f32> = 0.0..=10.0;

/// Parameters for the enhancement stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceParams {
    /// Added to each color channel, -255..=255
    pub brightness: i32,

    /// Scales distance from the channel midpoint, 0.0..=4.0
    pub contrast: f32,

    /// Unsharp-mask sigma, 0.0..=10.0
    pub sharpen: f32,
}

impl Default for EnhanceParams {
    fn default() -> Self {
        Self {
            brightness: 0,
            contrast: 1.0,
            sharpen: 0.0,
        }
    }
}

impl EnhanceParams {
    pub(crate) fn validate(&self) -> Result<(), JobError> {
        if !BRIGHTNESS_RANGE.contains(&self.brightness) {
            return Err(JobError::InvalidParameters {
                stage: "enhance",
                message: format!(
                    "brightness must be between -255 and 255, got {}",
                    self.brightness
                ),
            });
        }
        if !CONTRAST_RANGE.contains(&self.contrast) {
            return Err(JobError::InvalidParameters {
                stage: "enhance",
                message: format!("contrast must be between 0.0 and 4.0, got {}", self.contrast),
            });
        }
        if !SHARPEN_RANGE.contains(&self.sharpen) {
            return Err(JobError::InvalidParameters {
                stage: "enhance",
                message: format!("sharpen must be between 0.0 and 10.0, got {}", self.sharpen),
            });
        }
        Ok(())
    }

    /// True when every adjustment is at its neutral value.
    pub fn is_identity(&self) -> bool {
        self.brightness == 0 && self.contrast == 1.0 && self.sharpen == 0.0
    }

    pub(crate) fn apply(&self, mut raster: Raster) -> Result<Raster, JobError> {
        self.validate()?;
        if self.is_identity() {
            trace!("all enhancement parameters at identity, leaving pixels untouched");
            return Ok(raster);
        }

        raster.image = match raster.image {
            DynamicImage::ImageLuma8(buf) => DynamicImage::ImageLuma8(self.enhance_buffer(buf)),
            DynamicImage::ImageLumaA8(buf) => DynamicImage::ImageLumaA8(self.enhance_buffer(buf)),
            DynamicImage::ImageRgb8(buf) => DynamicImage::ImageRgb8(self.enhance_buffer(buf)),
            DynamicImage::ImageRgba8(buf) => DynamicImage::ImageRgba8(self.enhance_buffer(buf)),
            other => {
                // Adjustments are defined over 8-bit channels
                debug!("narrowing deep buffer to 8-bit for enhancement");
                if other.color().has_alpha() {
                    DynamicImage::ImageRgba8(self.enhance_buffer(other.to_rgba8()))
                } else {
                    DynamicImage::ImageRgb8(self.enhance_buffer(other.to_rgb8()))
                }
            }
        };
        Ok(raster)
    }

    fn enhance_buffer<P>(&self, mut buffer: ImageBuffer<P, Vec<u8>>) -> ImageBuffer<P, Vec<u8>>
    where
        P: Pixel<Subpixel = u8> + 'static,
    {
        if self.brightness != 0 {
            let delta = self.brightness;
            for pixel in buffer.pixels_mut() {
                pixel.apply_with_alpha(
                    |channel| (i32::from(channel) + delta).clamp(0, 255) as u8,
                    |alpha| alpha,
                );
            }
        }

        if (self.contrast - 1.0).abs() > f32::EPSILON {
            let factor = self.contrast;
            for pixel in buffer.pixels_mut() {
                pixel.apply_with_alpha(
                    |channel| {
                        let scaled = (f32::from(channel) - 128.0) * factor + 128.0;
                        scaled.round().clamp(0.0, 255.0) as u8
                    },
                    |alpha| alpha,
                );
            }
        }

        if self.sharpen > 0.0 {
            buffer = imageops::unsharpen(&buffer, self.sharpen, 0);
        }

        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ImageKind;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn raster_from(image: DynamicImage) -> Raster {
        Raster {
            image,
            source_format: ImageKind::Png,
            output_format: ImageKind::Png,
            jpeg_quality: None,
        }
    }

    #[test]
    fn test_identity_leaves_pixels_untouched() {
        let img = RgbImage::from_fn(8, 8, |x, y| Rgb([x as u8, y as u8, 77]));
        let input = raster_from(DynamicImage::ImageRgb8(img.clone()));

        let output = EnhanceParams::default().apply(input).unwrap();
        assert_eq!(output.image.to_rgb8().as_raw(), img.as_raw());
    }

    #[test]
    fn test_brightness_shifts_and_clamps() {
        let img = RgbImage::from_pixel(2, 2, Rgb([100, 250, 5]));
        let params = EnhanceParams {
            brightness: 10,
            ..EnhanceParams::default()
        };

        let output = params
            .apply(raster_from(DynamicImage::ImageRgb8(img)))
            .unwrap();
        assert_eq!(output.image.to_rgb8().get_pixel(0, 0), &Rgb([110, 255, 15]));

        let img = RgbImage::from_pixel(2, 2, Rgb([100, 5, 200]));
        let params = EnhanceParams {
            brightness: -10,
            ..EnhanceParams::default()
        };
        let output = params
            .apply(raster_from(DynamicImage::ImageRgb8(img)))
            .unwrap();
        assert_eq!(output.image.to_rgb8().get_pixel(0, 0), &Rgb([90, 0, 190]));
    }

    #[test]
    fn test_brightness_preserves_alpha() {
        let img = RgbaImage::from_pixel(2, 2, Rgba([100, 100, 100, 42]));
        let params = EnhanceParams {
            brightness: 50,
            ..EnhanceParams::default()
        };

        let output = params
            .apply(raster_from(DynamicImage::ImageRgba8(img)))
            .unwrap();
        assert_eq!(
            output.image.to_rgba8().get_pixel(0, 0),
            &Rgba([150, 150, 150, 42])
        );
    }

    #[test]
    fn test_contrast_scales_around_midpoint() {
        let img = RgbImage::from_pixel(2, 2, Rgb([100, 200, 128]));
        let params = EnhanceParams {
            contrast: 2.0,
            ..EnhanceParams::default()
        };

        let output = params
            .apply(raster_from(DynamicImage::ImageRgb8(img)))
            .unwrap();
        // (100-128)*2+128 = 72, (200-128)*2+128 = 272 -> 255, midpoint stays
        assert_eq!(output.image.to_rgb8().get_pixel(0, 0), &Rgb([72, 255, 128]));
    }

    #[test]
    fn test_brightness_applies_before_contrast() {
        let img = RgbImage::from_pixel(1, 1, Rgb([100, 100, 100]));
        let params = EnhanceParams {
            brightness: 28,
            contrast: 2.0,
            sharpen: 0.0,
        };

        let output = params
            .apply(raster_from(DynamicImage::ImageRgb8(img)))
            .unwrap();
        // 100+28 = 128 lands on the midpoint, so contrast leaves it alone.
        // Contrast first would give (100-128)*2+128+28 = 100 instead.
        assert_eq!(
            output.image.to_rgb8().get_pixel(0, 0),
            &Rgb([128, 128, 128])
        );
    }

    #[test]
    fn test_sharpen_changes_edge_pixels() {
        let img = RgbImage::from_fn(16, 16, |x, _| {
            if x < 8 {
                Rgb([40, 40, 40])
            } else {
                Rgb([220, 220, 220])
            }
        });
        let params = EnhanceParams {
            sharpen: 2.0,
            ..EnhanceParams::default()
        };

        let output = params
            .apply(raster_from(DynamicImage::ImageRgb8(img.clone())))
            .unwrap();
        let sharpened = output.image.to_rgb8();
        assert_eq!(sharpened.dimensions(), (16, 16));
        assert_ne!(sharpened.as_raw(), img.as_raw());
    }

    #[test]
    fn test_out_of_range_parameters_fail_fast() {
        let cases = [
            EnhanceParams {
                brightness: 300,
                ..EnhanceParams::default()
            },
            EnhanceParams {
                contrast: 4.5,
                ..EnhanceParams::default()
            },
            EnhanceParams {
                contrast: f32::NAN,
                ..EnhanceParams::default()
            },
            EnhanceParams {
                sharpen: -0.1,
                ..EnhanceParams::default()
            },
            EnhanceParams {
                sharpen: 11.0,
                ..EnhanceParams::default()
            },
        ];

        for params in cases {
            let img = RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]));
            let err = params
                .apply(raster_from(DynamicImage::ImageRgb8(img)))
                .unwrap_err();
            assert!(
                matches!(err, JobError::InvalidParameters { stage: "enhance", .. }),
                "expected InvalidParameters, got {err:?}"
            );
        }
    }
}
