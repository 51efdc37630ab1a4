//! Content cropping and border background re-detection.
//!
//! Finds the tight bounding box of solid pixels so downstream stages
//! only ever look at the artwork region. Crop bounds are only trusted
//! when they cover at least 5% of the image in each axis; anything
//! smaller is treated as "no content detected" and the full image
//! bounds are returned instead. A fail-safe, not an error.

use image::{Rgba, RgbaImage};

use crate::raster::{border_pixels, is_solid};

/// Minimum fraction of each axis the crop bounds must cover.
const MIN_CROP_FRACTION: f64 = 0.05;

/// Per-channel distance tolerance when clustering border colours.
const CLUSTER_TOLERANCE: u16 = 30;

/// Fraction of sampled border pixels a cluster must reach to count as
/// the background colour.
const CLUSTER_MAJORITY: f64 = 0.70;

/// Inclusive pixel bounds of the detected content region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBounds {
    /// Leftmost column containing content.
    pub min_x: u32,
    /// Topmost row containing content.
    pub min_y: u32,
    /// Rightmost column containing content (inclusive).
    pub max_x: u32,
    /// Bottommost row containing content (inclusive).
    pub max_y: u32,
}

impl CropBounds {
    /// Width of the bounds in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    /// Height of the bounds in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Bounds covering an entire image.
    #[must_use]
    pub const fn full(width: u32, height: u32) -> Self {
        Self {
            min_x: 0,
            min_y: 0,
            max_x: width.saturating_sub(1),
            max_y: height.saturating_sub(1),
        }
    }
}

/// Result of the crop stage.
#[derive(Debug, Clone)]
pub struct Crop {
    /// The cropped image.
    pub image: RgbaImage,
    /// Where the crop sits in the source image.
    pub bounds: CropBounds,
    /// Whether the bounds were tight content bounds (as opposed to the
    /// full-image fallback).
    pub content_detected: bool,
    /// Dominant border colour, when one cluster covers ≥70% of the
    /// sampled border ring.
    pub background_color: Option<[u8; 4]>,
}

/// Crop the image to its solid content, falling back to full bounds
/// when the detected region is implausibly small.
#[must_use]
pub fn crop_to_content(image: &RgbaImage, alpha_threshold: u8) -> Crop {
    let (width, height) = image.dimensions();
    let background_color = detect_border_color(image);

    let Some(bounds) = content_bounds(image, alpha_threshold) else {
        return Crop {
            image: image.clone(),
            bounds: CropBounds::full(width, height),
            content_detected: false,
            background_color,
        };
    };

    let wide_enough = f64::from(bounds.width()) >= f64::from(width) * MIN_CROP_FRACTION;
    let tall_enough = f64::from(bounds.height()) >= f64::from(height) * MIN_CROP_FRACTION;
    if !wide_enough || !tall_enough {
        return Crop {
            image: image.clone(),
            bounds: CropBounds::full(width, height),
            content_detected: false,
            background_color,
        };
    }

    let cropped = image::imageops::crop_imm(image, bounds.min_x, bounds.min_y, bounds.width(), bounds.height())
        .to_image();
    Crop {
        image: cropped,
        bounds,
        content_detected: true,
        background_color,
    }
}

/// Tight bounding box of pixels above the alpha threshold, or `None`
/// when the image has no solid pixel at all.
#[must_use]
pub fn content_bounds(image: &RgbaImage, alpha_threshold: u8) -> Option<CropBounds> {
    let mut bounds: Option<CropBounds> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if !is_solid(*pixel, alpha_threshold) {
            continue;
        }
        match &mut bounds {
            None => {
                bounds = Some(CropBounds {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                });
            }
            Some(b) => {
                b.min_x = b.min_x.min(x);
                b.min_y = b.min_y.min(y);
                b.max_x = b.max_x.max(x);
                b.max_y = b.max_y.max(y);
            }
        }
    }
    bounds
}

/// Sample the one-pixel border ring and cluster its colours; a cluster
/// only counts as the background when it holds a ≥70% majority, which
/// keeps photographic or multi-colour edges from misfiring.
#[must_use]
pub fn detect_border_color(image: &RgbaImage) -> Option<[u8; 4]> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let mut clusters: Vec<(Rgba<u8>, usize)> = Vec::new();
    let mut sampled = 0_usize;
    for (x, y) in border_pixels(width, height) {
        let pixel = *image.get_pixel(x, y);
        sampled += 1;
        match clusters.iter_mut().find(|(rep, _)| color_close(*rep, pixel)) {
            Some((_, count)) => *count += 1,
            None => clusters.push((pixel, 1)),
        }
    }

    let (rep, count) = clusters.into_iter().max_by_key(|(_, count)| *count)?;
    #[allow(clippy::cast_precision_loss)]
    if count as f64 >= sampled as f64 * CLUSTER_MAJORITY {
        Some(rep.0)
    } else {
        None
    }
}

/// Per-channel closeness check for border clustering. Transparent
/// pixels cluster together regardless of colour.
fn color_close(a: Rgba<u8>, b: Rgba<u8>) -> bool {
    if a.0[3] == 0 && b.0[3] == 0 {
        return true;
    }
    a.0.iter()
        .zip(b.0.iter())
        .all(|(&ca, &cb)| u16::from(ca.max(cb)) - u16::from(ca.min(cb)) <= CLUSTER_TOLERANCE)
}
