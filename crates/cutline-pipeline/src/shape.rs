//! Heuristic silhouette shape classification.
//!
//! Scores the silhouette's edge pixels against an ideal ellipse and an
//! axis-aligned rectangle; a confident match lets the offset stage use
//! a closed-form contour instead of the general trace. False negatives
//! are always safe since the polygon pipeline still applies; false
//! positives are bounded by strict acceptance thresholds.

use std::f64::consts::FRAC_PI_4;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::crop::{CropBounds, content_bounds};
use crate::raster::{is_solid, neighbors4};

/// Normalized radial band an edge pixel must fall in to count as an
/// ellipse inlier.
const ELLIPSE_BAND: f64 = 0.08;
/// Minimum fraction of edge pixels inside the ellipse band.
const ELLIPSE_INLIER_FRACTION: f64 = 0.85;
/// Allowed deviation of the fill ratio from the ideal ellipse π/4.
const ELLIPSE_FILL_TOLERANCE: f64 = 0.08;
/// Maximum average radial deviation for an ellipse match.
const ELLIPSE_MAX_AVG_DEVIATION: f64 = 0.12;

/// Pixel distance to a bounding-box side for a rectangle inlier.
const RECT_BAND_PX: f64 = 2.0;
/// Minimum fraction of edge pixels near a bounding-box side.
const RECT_INLIER_FRACTION: f64 = 0.90;
/// Allowed deviation of the fill ratio from a full rectangle.
const RECT_FILL_TOLERANCE: f64 = 0.05;

/// Aspect-ratio window inside which a shape counts as equilateral
/// (circle rather than oval, square rather than rectangle).
const EQUILATERAL_ASPECT: (f64, f64) = (0.92, 1.08);

/// Minimum confidence for any non-irregular classification.
const CONFIDENCE_THRESHOLD: f64 = 0.88;

/// Classified silhouette shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Ellipse with near-equal axes.
    Circle,
    /// Ellipse with distinct axes.
    Oval,
    /// Axis-aligned rectangle with near-equal sides.
    Square,
    /// Axis-aligned rectangle.
    Rectangle,
    /// Anything that did not score confidently as the above.
    Irregular,
}

/// Result of shape detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeDetection {
    /// The classified shape.
    pub kind: ShapeKind,
    /// Classification confidence in `[0, 1]`. For `Irregular` this is
    /// the best rejected score.
    pub confidence: f64,
    /// Solid-content bounds the scores were computed against.
    pub bounds: CropBounds,
}

impl ShapeDetection {
    const fn irregular(confidence: f64, bounds: CropBounds) -> Self {
        Self {
            kind: ShapeKind::Irregular,
            confidence,
            bounds,
        }
    }
}

/// Classify the silhouette of `image` (pixels above `alpha_threshold`).
#[must_use]
pub fn detect_shape(image: &RgbaImage, alpha_threshold: u8) -> ShapeDetection {
    let empty = CropBounds::full(image.width(), image.height());
    let Some(bounds) = content_bounds(image, alpha_threshold) else {
        return ShapeDetection::irregular(0.0, empty);
    };

    let edges = edge_pixels(image, alpha_threshold);
    if edges.is_empty() {
        return ShapeDetection::irregular(0.0, bounds);
    }

    let bb_width = f64::from(bounds.width());
    let bb_height = f64::from(bounds.height());
    let solid = f64::from(solid_count_in(image, alpha_threshold, bounds));
    let fill_ratio = solid / (bb_width * bb_height);
    let aspect = bb_width / bb_height;
    let equilateral = aspect >= EQUILATERAL_ASPECT.0 && aspect <= EQUILATERAL_ASPECT.1;

    let ellipse = score_ellipse(&edges, bounds, fill_ratio);
    let rect = score_rectangle(&edges, bounds, fill_ratio);

    // Rectangle wins ties: a filled square also scores as a fat ellipse
    // far less often than the reverse.
    if rect >= CONFIDENCE_THRESHOLD && rect >= ellipse {
        let kind = if equilateral { ShapeKind::Square } else { ShapeKind::Rectangle };
        return ShapeDetection { kind, confidence: rect, bounds };
    }
    if ellipse >= CONFIDENCE_THRESHOLD {
        let kind = if equilateral { ShapeKind::Circle } else { ShapeKind::Oval };
        return ShapeDetection { kind, confidence: ellipse, bounds };
    }
    ShapeDetection::irregular(ellipse.max(rect), bounds)
}

/// Solid pixels whose 4-neighborhood contains transparency (pixels on
/// the image border count their missing neighbours as transparent).
fn edge_pixels(image: &RgbaImage, alpha_threshold: u8) -> Vec<(u32, u32)> {
    let (width, height) = image.dimensions();
    let mut edges = Vec::new();
    for (x, y, pixel) in image.enumerate_pixels() {
        if !is_solid(*pixel, alpha_threshold) {
            continue;
        }
        let mut in_bounds = 0;
        let mut solid_neighbors = 0;
        for (nx, ny) in neighbors4(x, y, width, height) {
            in_bounds += 1;
            if is_solid(*image.get_pixel(nx, ny), alpha_threshold) {
                solid_neighbors += 1;
            }
        }
        if solid_neighbors < 4 || in_bounds < 4 {
            edges.push((x, y));
        }
    }
    edges
}

fn solid_count_in(image: &RgbaImage, alpha_threshold: u8, bounds: CropBounds) -> u32 {
    let mut count = 0;
    for y in bounds.min_y..=bounds.max_y {
        for x in bounds.min_x..=bounds.max_x {
            if is_solid(*image.get_pixel(x, y), alpha_threshold) {
                count += 1;
            }
        }
    }
    count
}

/// Score the edge set against the ellipse inscribed in the bounds.
///
/// Zero unless all three acceptance gates pass; otherwise a product of
/// the inlier fraction and the (inverted) average deviation, so a clean
/// circle scores near 1.
fn score_ellipse(edges: &[(u32, u32)], bounds: CropBounds, fill_ratio: f64) -> f64 {
    let a = f64::from(bounds.width()) / 2.0;
    let b = f64::from(bounds.height()) / 2.0;
    if a < 1.0 || b < 1.0 {
        return 0.0;
    }
    let cx = f64::from(bounds.min_x) + a - 0.5;
    let cy = f64::from(bounds.min_y) + b - 0.5;

    let mut inliers = 0_usize;
    let mut total_deviation = 0.0;
    for &(x, y) in edges {
        let nx = (f64::from(x) - cx) / a;
        let ny = (f64::from(y) - cy) / b;
        let radius = nx.hypot(ny);
        let deviation = (radius - 1.0).abs();
        total_deviation += deviation;
        if deviation <= ELLIPSE_BAND {
            inliers += 1;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let inlier_fraction = inliers as f64 / edges.len() as f64;
    #[allow(clippy::cast_precision_loss)]
    let avg_deviation = total_deviation / edges.len() as f64;

    let fill_ok = (fill_ratio - FRAC_PI_4).abs() <= ELLIPSE_FILL_TOLERANCE;
    if inlier_fraction >= ELLIPSE_INLIER_FRACTION && fill_ok && avg_deviation < ELLIPSE_MAX_AVG_DEVIATION {
        (inlier_fraction * (1.0 - avg_deviation)).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Score the edge set against the bounding rectangle's sides.
fn score_rectangle(edges: &[(u32, u32)], bounds: CropBounds, fill_ratio: f64) -> f64 {
    let min_x = f64::from(bounds.min_x);
    let min_y = f64::from(bounds.min_y);
    let max_x = f64::from(bounds.max_x);
    let max_y = f64::from(bounds.max_y);

    let mut inliers = 0_usize;
    for &(x, y) in edges {
        let x = f64::from(x);
        let y = f64::from(y);
        let to_side = (x - min_x)
            .min(max_x - x)
            .min(y - min_y)
            .min(max_y - y);
        if to_side <= RECT_BAND_PX {
            inliers += 1;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let inlier_fraction = inliers as f64 / edges.len() as f64;
    let fill_error = (fill_ratio - 1.0).abs();

    if inlier_fraction >= RECT_INLIER_FRACTION && fill_error <= RECT_FILL_TOLERANCE {
        (inlier_fraction * (1.0 - fill_error)).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgba;

    const SOLID: Rgba<u8> = Rgba([40, 40, 200, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    fn disk(size: u32, rx: f64, ry: f64) -> RgbaImage {
        let c = f64::from(size) / 2.0 - 0.5;
        RgbaImage::from_fn(size, size, |x, y| {
            let dx = (f64::from(x) - c) / rx;
            let dy = (f64::from(y) - c) / ry;
            if dx.hypot(dy) <= 1.0 { SOLID } else { CLEAR }
        })
    }

    fn filled_rect(size: u32, w: u32, h: u32) -> RgbaImage {
        let x0 = (size - w) / 2;
        let y0 = (size - h) / 2;
        RgbaImage::from_fn(size, size, |x, y| {
            if x >= x0 && x < x0 + w && y >= y0 && y < y0 + h { SOLID } else { CLEAR }
        })
    }

    #[test]
    fn detects_circle() {
        let img = disk(120, 50.0, 50.0);
        let detection = detect_shape(&img, 10);
        assert_eq!(detection.kind, ShapeKind::Circle);
        assert!(detection.confidence >= CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn detects_oval() {
        let img = disk(160, 70.0, 40.0);
        let detection = detect_shape(&img, 10);
        assert_eq!(detection.kind, ShapeKind::Oval);
    }

    #[test]
    fn detects_square() {
        let img = filled_rect(100, 60, 60);
        let detection = detect_shape(&img, 10);
        assert_eq!(detection.kind, ShapeKind::Square);
        assert!(detection.confidence >= CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn detects_rectangle() {
        let img = filled_rect(120, 80, 40);
        let detection = detect_shape(&img, 10);
        assert_eq!(detection.kind, ShapeKind::Rectangle);
    }

    #[test]
    fn irregular_blob_is_rejected() {
        // An L-shape: fill ratio far from both ideals.
        let img = RgbaImage::from_fn(100, 100, |x, y| {
            let vertical = (20..40).contains(&x) && (20..80).contains(&y);
            let horizontal = (20..80).contains(&x) && (60..80).contains(&y);
            if vertical || horizontal { SOLID } else { CLEAR }
        });
        let detection = detect_shape(&img, 10);
        assert_eq!(detection.kind, ShapeKind::Irregular);
        assert!(detection.confidence < CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn empty_image_is_irregular_with_zero_confidence() {
        let img = RgbaImage::from_pixel(50, 50, CLEAR);
        let detection = detect_shape(&img, 10);
        assert_eq!(detection.kind, ShapeKind::Irregular);
        assert!(detection.confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn detection_reports_content_bounds() {
        let img = filled_rect(100, 60, 60);
        let detection = detect_shape(&img, 10);
        assert_eq!(detection.bounds.width(), 60);
        assert_eq!(detection.bounds.height(), 60);
    }
}
