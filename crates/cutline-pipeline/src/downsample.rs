//! Working-resolution cap for oversized inputs.
//!
//! Inputs whose longest axis exceeds `max_dimension` are downsampled
//! before the raster stages run, and the finished contour is rescaled
//! back into the source pixel grid afterwards. Images already at or
//! below the cap pass through untouched.

use std::fmt;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Resampling filter used when downsampling.
///
/// Ordered from fastest/lowest-quality to slowest/highest-quality,
/// with a `None` variant to skip downsampling entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownsampleFilter {
    /// Disabled: skip downsampling regardless of image size.
    None,
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation: fast, decent quality.
    Triangle,
    /// Bicubic (Catmull-Rom): moderate speed, good quality.
    CatmullRom,
    /// Gaussian: moderate speed, smooth output.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest.
    Lanczos3,
}

impl Default for DownsampleFilter {
    fn default() -> Self {
        Self::Triangle
    }
}

impl DownsampleFilter {
    /// Convert to the `image` crate's `FilterType`.
    ///
    /// Returns `Option::None` for [`DownsampleFilter::None`] since
    /// there is no corresponding resampling filter.
    const fn to_image_filter(self) -> Option<image::imageops::FilterType> {
        match self {
            Self::None => Option::None,
            Self::Nearest => Some(image::imageops::FilterType::Nearest),
            Self::Triangle => Some(image::imageops::FilterType::Triangle),
            Self::CatmullRom => Some(image::imageops::FilterType::CatmullRom),
            Self::Gaussian => Some(image::imageops::FilterType::Gaussian),
            Self::Lanczos3 => Some(image::imageops::FilterType::Lanczos3),
        }
    }
}

impl fmt::Display for DownsampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

/// Ratio between the working resolution and the source resolution.
///
/// `to_source` maps working-space coordinates back into source pixels;
/// it is `1.0` when no downsampling was applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    /// Multiply working-space coordinates by this to get source pixels.
    pub to_source: f64,
}

impl Scale {
    /// Identity scale (no downsampling applied).
    pub const IDENTITY: Self = Self { to_source: 1.0 };
}

/// Downsample a decoded image so the longest axis is at most
/// `max_dimension` pixels, using the specified resampling filter.
///
/// Returns the (possibly unchanged) image and the scale mapping its
/// coordinates back to the source pixel grid.
#[must_use]
pub fn downsample(image: &RgbaImage, max_dimension: u32, filter: DownsampleFilter) -> (RgbaImage, Scale) {
    let Some(image_filter) = filter.to_image_filter() else {
        return (image.clone(), Scale::IDENTITY);
    };

    let (w, h) = image.dimensions();
    let long_axis = w.max(h);

    if long_axis <= max_dimension || max_dimension == 0 {
        return (image.clone(), Scale::IDENTITY);
    }

    let resized = image::DynamicImage::ImageRgba8(image.clone())
        .resize(max_dimension, max_dimension, image_filter)
        .into_rgba8();
    let to_source = f64::from(long_axis) / f64::from(resized.width().max(resized.height()));
    (resized, Scale { to_source })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgba;

    fn test_image(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([128, 128, 128, 255]))
    }

    #[test]
    fn default_filter_is_triangle() {
        assert_eq!(DownsampleFilter::default(), DownsampleFilter::Triangle);
    }

    #[test]
    fn no_downsample_when_already_small() {
        let img = test_image(100, 80);
        let (result, scale) = downsample(&img, 256, DownsampleFilter::Triangle);
        assert_eq!(scale, Scale::IDENTITY);
        assert_eq!(result.dimensions(), (100, 80));
    }

    #[test]
    fn no_downsample_when_exact_match() {
        let img = test_image(256, 200);
        let (_, scale) = downsample(&img, 256, DownsampleFilter::Triangle);
        assert_eq!(scale, Scale::IDENTITY);
    }

    #[test]
    fn downsample_landscape() {
        let img = test_image(1024, 768);
        let (result, scale) = downsample(&img, 256, DownsampleFilter::Triangle);
        assert_eq!(result.width(), 256);
        // Aspect ratio preserved: 768 * 256 / 1024 = 192
        assert_eq!(result.height(), 192);
        assert!((scale.to_source - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn downsample_portrait() {
        let img = test_image(600, 1200);
        let (result, scale) = downsample(&img, 256, DownsampleFilter::Triangle);
        assert_eq!(result.height(), 256);
        assert_eq!(result.width(), 128);
        assert!((scale.to_source - 1200.0 / 256.0).abs() < 1e-12);
    }

    #[test]
    fn none_filter_skips_even_large_image() {
        let img = test_image(1024, 768);
        let (result, scale) = downsample(&img, 256, DownsampleFilter::None);
        assert_eq!(scale, Scale::IDENTITY);
        assert_eq!(result.width(), 1024);
    }

    #[test]
    fn scale_round_trips_coordinates() {
        let img = test_image(800, 800);
        let (result, scale) = downsample(&img, 400, DownsampleFilter::Nearest);
        assert_eq!(result.width(), 400);
        let working_x = 200.0;
        assert!((working_x * scale.to_source - 400.0).abs() < f64::EPSILON);
    }
}
