//! Watermark removal by region reconstruction.
//!
//! The fill is an iterative boundary diffusion: pixels inside the target
//! region relax toward the average of their neighbors while a surrounding
//! ring of known pixels stays fixed, so reconstructed content is borrowed
//! strictly from outside the region. Pixels outside the region are never
//! written.
//!
//! The region comes either from the caller or from a sliding-window scan
//! that ranks compact high-contrast areas by a weighted confidence score.

use image::{DynamicImage, ImageBuffer, Pixel, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::Raster;
use crate::error::JobError;

/// Relaxation passes per pixel of the longer region side.
const PASSES_PER_PIXEL: u32 = 4;
/// Upper bound on relaxation passes for very large regions.
const MAX_PASSES: u32 = 400;

/// Smallest detection window side.
const MIN_WINDOW: u32 = 16;
/// Largest detection window side.
const MAX_WINDOW: u32 = 256;
/// Window side as a fraction of the image's shorter side.
const WINDOW_DIVISOR: u32 = 6;
/// Weight of the edge-density score in the confidence ensemble.
const GRADIENT_WEIGHT: f32 = 0.6;
/// Weight of the local-variance score in the confidence ensemble.
const VARIANCE_WEIGHT: f32 = 0.4;
/// A window this many times busier than the image average scores full marks.
const RATIO_SCALE: f32 = 3.0;
/// Candidates below this confidence are rejected.
const CONFIDENCE_FLOOR: f32 = 0.35;

/// Rectangle in pixel coordinates, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// One past the rightmost column.
    fn right(&self) -> u32 {
        self.x + self.width
    }

    /// One past the bottom row.
    fn bottom(&self) -> u32 {
        self.y + self.height
    }

    fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    fn intersects(&self, other: &Region) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// How the fill rectangle is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkRegion {
    /// Scan the raster for a compact high-contrast region
    Auto,
    /// Caller-supplied rectangle
    Rect(Region),
}

/// Parameters for the watermark-removal stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkParams {
    pub region: WatermarkRegion,

    /// Thickness of the known ring the fill borrows from, 1..=20
    pub inpaint_radius: u32,
}

impl Default for WatermarkParams {
    fn default() -> Self {
        Self {
            region: WatermarkRegion::Auto,
            inpaint_radius: 3,
        }
    }
}

impl WatermarkParams {
    pub(crate) fn validate(&self) -> Result<(), JobError> {
        if !(1..=20).contains(&self.inpaint_radius) {
            return Err(JobError::InvalidParameters {
                stage: "remove_watermark",
                message: format!(
                    "inpaint_radius must be between 1 and 20, got {}",
                    self.inpaint_radius
                ),
            });
        }
        if let WatermarkRegion::Rect(region) = &self.region {
            if region.width == 0 || region.height == 0 {
                return Err(JobError::InvalidParameters {
                    stage: "remove_watermark",
                    message: "region must have a nonzero extent".to_string(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn apply(&self, mut raster: Raster) -> Result<Raster, JobError> {
        self.validate()?;

        let img_w = raster.width();
        let img_h = raster.height();

        let region = match self.region {
            WatermarkRegion::Rect(region) => {
                if region.right() > img_w || region.bottom() > img_h {
                    return Err(JobError::RegionOutOfBounds {
                        x: region.x,
                        y: region.y,
                        width: region.width,
                        height: region.height,
                        raster_width: img_w,
                        raster_height: img_h,
                    });
                }
                region
            }
            WatermarkRegion::Auto => match detect_region(&raster.image) {
                Some((region, confidence)) => {
                    debug!(
                        x = region.x,
                        y = region.y,
                        width = region.width,
                        height = region.height,
                        confidence,
                        "detected watermark candidate"
                    );
                    region
                }
                None => {
                    return Err(JobError::Processing {
                        stage: "remove_watermark",
                        message: "no region above the detection confidence floor; \
                                  pass an explicit rectangle"
                            .to_string(),
                    })
                }
            },
        };

        if region.width == img_w && region.height == img_h {
            return Err(JobError::Processing {
                stage: "remove_watermark",
                message: "region covers the entire image, leaving no pixels to borrow from"
                    .to_string(),
            });
        }

        let radius = self.inpaint_radius;
        raster.image = match raster.image {
            DynamicImage::ImageLuma8(mut buf) => {
                fill_region(&mut buf, region, radius);
                DynamicImage::ImageLuma8(buf)
            }
            DynamicImage::ImageLumaA8(mut buf) => {
                fill_region(&mut buf, region, radius);
                DynamicImage::ImageLumaA8(buf)
            }
            DynamicImage::ImageRgb8(mut buf) => {
                fill_region(&mut buf, region, radius);
                DynamicImage::ImageRgb8(buf)
            }
            DynamicImage::ImageRgba8(mut buf) => {
                fill_region(&mut buf, region, radius);
                DynamicImage::ImageRgba8(buf)
            }
            other => {
                debug!("narrowing deep buffer to 8-bit for region fill");
                if other.color().has_alpha() {
                    let mut buf = other.to_rgba8();
                    fill_region(&mut buf, region, radius);
                    DynamicImage::ImageRgba8(buf)
                } else {
                    let mut buf = other.to_rgb8();
                    fill_region(&mut buf, region, radius);
                    DynamicImage::ImageRgb8(buf)
                }
            }
        };

        Ok(raster)
    }
}

/// Relax the region toward its surroundings, channel by channel.
fn fill_region<P>(buffer: &mut ImageBuffer<P, Vec<u8>>, region: Region, radius: u32)
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let (img_w, img_h) = buffer.dimensions();

    // Working window: the region plus a ring of known pixels
    let win_x = region.x.saturating_sub(radius);
    let win_y = region.y.saturating_sub(radius);
    let win_right = (region.right() + radius).min(img_w);
    let win_bottom = (region.bottom() + radius).min(img_h);
    let win_w = (win_right - win_x) as usize;
    let win_h = (win_bottom - win_y) as usize;

    let channels = P::CHANNEL_COUNT as usize;
    let mut planes = vec![vec![0.0_f32; win_w * win_h]; channels];
    let mut unknown = vec![false; win_w * win_h];

    for wy in 0..win_h {
        for wx in 0..win_w {
            let ix = win_x + wx as u32;
            let iy = win_y + wy as u32;
            let pixel = buffer.get_pixel(ix, iy);
            let idx = wy * win_w + wx;
            for (c, plane) in planes.iter_mut().enumerate() {
                plane[idx] = f32::from(pixel.channels()[c]);
            }
            unknown[idx] = region.contains(ix, iy);
        }
    }

    // Start every unknown pixel at the mean of the known ring
    let mut known_count = 0usize;
    let mut sums = vec![0.0_f32; channels];
    for idx in 0..win_w * win_h {
        if !unknown[idx] {
            known_count += 1;
            for (c, plane) in planes.iter().enumerate() {
                sums[c] += plane[idx];
            }
        }
    }
    if known_count == 0 {
        // Whole-image regions are rejected before reaching the fill
        return;
    }
    for (c, plane) in planes.iter_mut().enumerate() {
        let mean = sums[c] / known_count as f32;
        for (idx, value) in plane.iter_mut().enumerate() {
            if unknown[idx] {
                *value = mean;
            }
        }
    }

    let longer_side = region.width.max(region.height);
    let passes = (longer_side * PASSES_PER_PIXEL).min(MAX_PASSES);

    let mut scratch = vec![0.0_f32; win_w * win_h];
    for plane in planes.iter_mut() {
        for _ in 0..passes {
            for wy in 0..win_h {
                for wx in 0..win_w {
                    let idx = wy * win_w + wx;
                    if !unknown[idx] {
                        scratch[idx] = plane[idx];
                        continue;
                    }
                    let mut sum = 0.0_f32;
                    let mut count = 0u32;
                    if wx > 0 {
                        sum += plane[idx - 1];
                        count += 1;
                    }
                    if wx + 1 < win_w {
                        sum += plane[idx + 1];
                        count += 1;
                    }
                    if wy > 0 {
                        sum += plane[idx - win_w];
                        count += 1;
                    }
                    if wy + 1 < win_h {
                        sum += plane[idx + win_w];
                        count += 1;
                    }
                    scratch[idx] = if count > 0 { sum / count as f32 } else { plane[idx] };
                }
            }
            std::mem::swap(plane, &mut scratch);
        }
    }

    // Write back region pixels only
    for wy in 0..win_h {
        for wx in 0..win_w {
            let idx = wy * win_w + wx;
            if !unknown[idx] {
                continue;
            }
            let ix = win_x + wx as u32;
            let iy = win_y + wy as u32;
            let pixel = buffer.get_pixel_mut(ix, iy);
            for (c, plane) in planes.iter().enumerate() {
                pixel.channels_mut()[c] = plane[idx].round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// Scan the raster for the most watermark-like window.
///
/// Grayscale conversion, then per-window edge density (Sobel magnitude) and
/// local variance, each normalized against the whole-image average and
/// combined into a weighted confidence. Returns the best window and its
/// score, or `None` when no candidate clears the floor.
fn detect_region(image: &DynamicImage) -> Option<(Region, f32)> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width < MIN_WINDOW * 2 || height < MIN_WINDOW * 2 {
        return None;
    }

    let gray = to_grayscale(&rgb);
    let gradient = sobel_magnitude(&gray, width as usize, height as usize);

    let global_gradient = mean(&gradient);
    let global_stddev = stddev(&gray);

    let window = (width.min(height) / WINDOW_DIVISOR).clamp(MIN_WINDOW, MAX_WINDOW);
    let step = (window / 2).max(1);

    let mut best: Option<(Region, f32)> = None;
    for wy in scan_positions(height, window, step) {
        for wx in scan_positions(width, window, step) {
            let window_gray = window_values(&gray, width as usize, wx, wy, window);
            let window_gradient = window_values(&gradient, width as usize, wx, wy, window);

            let rel_gradient = mean(&window_gradient) / (global_gradient + f32::EPSILON);
            let rel_variance = stddev(&window_gray) / (global_stddev + f32::EPSILON);

            let confidence = GRADIENT_WEIGHT * (rel_gradient / RATIO_SCALE).clamp(0.0, 1.0)
                + VARIANCE_WEIGHT * (rel_variance / RATIO_SCALE).clamp(0.0, 1.0);

            if best.map_or(true, |(_, score)| confidence > score) {
                let region = Region {
                    x: wx,
                    y: wy,
                    width: window,
                    height: window,
                };
                best = Some((region, confidence));
            }
        }
    }

    best.filter(|(_, confidence)| *confidence >= CONFIDENCE_FLOOR)
}

/// Window start offsets covering `extent`, always including the far edge.
fn scan_positions(extent: u32, window: u32, step: u32) -> Vec<u32> {
    let mut positions = Vec::new();
    let mut pos = 0;
    while pos + window <= extent {
        positions.push(pos);
        pos += step;
    }
    let last = extent - window;
    if positions.last() != Some(&last) {
        positions.push(last);
    }
    positions
}

/// Luminance plane in `[0, 1]`, `0.299*R + 0.587*G + 0.114*B`.
fn to_grayscale(rgb: &RgbImage) -> Vec<f32> {
    let (width, height) = rgb.dimensions();
    let mut gray = Vec::with_capacity((width * height) as usize);
    for pixel in rgb.pixels() {
        let lum = 0.299 * f32::from(pixel[0])
            + 0.587 * f32::from(pixel[1])
            + 0.114 * f32::from(pixel[2]);
        gray.push(lum / 255.0);
    }
    gray
}

/// Sobel gradient magnitude over a 2D float plane. Border pixels stay 0.
fn sobel_magnitude(data: &[f32], width: usize, height: usize) -> Vec<f32> {
    let mut result = vec![0.0_f32; width * height];
    if width < 3 || height < 3 {
        return result;
    }

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let at = |dy: isize, dx: isize| -> f32 {
                let yy = (y as isize + dy) as usize;
                let xx = (x as isize + dx) as usize;
                data[yy * width + xx]
            };

            let gx = -at(-1, -1) + at(-1, 1) - 2.0 * at(0, -1) + 2.0 * at(0, 1) - at(1, -1)
                + at(1, 1);
            let gy = -at(-1, -1) - 2.0 * at(-1, 0) - at(-1, 1)
                + at(1, -1)
                + 2.0 * at(1, 0)
                + at(1, 1);

            result[y * width + x] = (gx * gx + gy * gy).sqrt();
        }
    }

    result
}

fn window_values(data: &[f32], width: usize, wx: u32, wy: u32, window: u32) -> Vec<f32> {
    let mut values = Vec::with_capacity((window * window) as usize);
    for dy in 0..window as usize {
        let row = (wy as usize + dy) * width + wx as usize;
        values.extend_from_slice(&data[row..row + window as usize]);
    }
    values
}

fn mean(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f32>() / data.len() as f32
}

fn stddev(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let n = data.len() as f32;
    let mean = data.iter().sum::<f32>() / n;
    let variance = data.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    variance.sqrt()
}
