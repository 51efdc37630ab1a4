//! Shared types for the cutline contour generation pipeline.

use serde::{Deserialize, Serialize};

use crate::downsample::DownsampleFilter;

/// Re-export `GrayImage` so downstream crates can reference binary
/// silhouette masks without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can reference the
/// decoded source raster without depending on `image` directly.
pub use image::RgbaImage;

/// A 2D point in pixel coordinates (or inch coordinates after an
/// explicit DPI conversion, never mixed within one array).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// An ordered ring of points forming an implicitly closed polygon
/// (the last point connects back to the first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon(Vec<Point>);

impl Polygon {
    /// Create a new polygon from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polygon has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all vertices.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polygon and returns the underlying vertex vector.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Signed area under the shoelace formula.
    ///
    /// Positive for counter-clockwise rings, negative for clockwise
    /// (in image coordinates with y growing downward, "clockwise"
    /// means the visually clockwise walk around the silhouette).
    #[must_use]
    pub fn signed_area(&self) -> f64 {
        let pts = &self.0;
        let n = pts.len();
        if n < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            sum += pts[i].x.mul_add(pts[j].y, -(pts[j].x * pts[i].y));
        }
        sum * 0.5
    }

    /// Whether the ring winds clockwise (negative signed area).
    #[must_use]
    pub fn is_clockwise(&self) -> bool {
        self.signed_area() < 0.0
    }

    /// Reverse the vertex order in place, flipping the winding.
    pub fn reverse(&mut self) {
        self.0.reverse();
    }

    /// Axis-aligned bounding box, or `None` for an empty polygon.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = self.0.first()?;
        let mut bb = BoundingBox {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for p in &self.0[1..] {
            bb.min_x = bb.min_x.min(p.x);
            bb.min_y = bb.min_y.min(p.y);
            bb.max_x = bb.max_x.max(p.x);
            bb.max_y = bb.max_y.max(p.y);
        }
        Some(bb)
    }

    /// Scale every vertex by a uniform factor about the origin.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self(
            self.0
                .iter()
                .map(|p| Point::new(p.x * factor, p.y * factor))
                .collect(),
        )
    }

    /// Translate every vertex by `(dx, dy)`.
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self(
            self.0
                .iter()
                .map(|p| Point::new(p.x + dx, p.y + dy))
                .collect(),
        )
    }
}

/// Axis-aligned bounding box in the same coordinate space as the
/// points it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Smallest x coordinate.
    pub min_x: f64,
    /// Smallest y coordinate.
    pub min_y: f64,
    /// Largest x coordinate.
    pub max_x: f64,
    /// Largest y coordinate.
    pub max_y: f64,
}

impl BoundingBox {
    /// Width of the box.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the box.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// How convex corners of the offset contour are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CornerStyle {
    /// Circular arcs centred on the original vertex (Minkowski disk sweep).
    #[default]
    Rounded,
    /// Mitred corners, falling back to a bevel past the miter limit.
    Sharp,
}

/// Pixels-per-inch derived from a raster's pixel width and its intended
/// physical width. Never a hardcoded constant once a target size is known.
#[must_use]
pub fn effective_dpi(raster_width_px: u32, target_width_inches: f64) -> f64 {
    f64::from(raster_width_px) / target_width_inches
}

/// Configuration for contour generation.
///
/// All parameters have sensible defaults for sticker/decal cutting.
/// Physical distances are inches; they are converted to pixels via the
/// [`effective_dpi`] derived from `target_width_inches` at run time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourConfig {
    /// Alpha value (0-255) above which a pixel counts as part of the
    /// silhouette. Low by default to catch semi-transparent edges.
    pub alpha_threshold: u8,

    /// Outward offset of the cut line from the silhouette, in inches.
    pub offset_inches: f64,

    /// Extra bleed recorded in the output for print compositing, in
    /// inches. Not applied geometrically by the pipeline.
    pub bleed_inches: f64,

    /// Intended physical width of the full raster, in inches.
    /// Determines the effective DPI for all inch→pixel conversions.
    pub target_width_inches: f64,

    /// Corner treatment for convex offset corners.
    pub corner_style: CornerStyle,

    /// Maximum gap, in pixels, across which disconnected silhouette
    /// fragments are merged into one outline ("auto-bridging").
    /// Zero disables bridging.
    pub merge_distance_px: u32,

    /// Whether fully enclosed transparent holes are filled so the cut
    /// line only follows external boundaries.
    pub fill_holes: bool,

    /// Whether to strip a border-connected near-white background before
    /// building the silhouette.
    pub remove_background: bool,

    /// Whiteness threshold (0-100) for background removal; mapped to a
    /// 0-255 channel threshold internally.
    pub whiteness_threshold: u8,

    /// Ramer-Douglas-Peucker simplification tolerance in pixels.
    pub simplify_tolerance: f64,

    /// Longest-edge cap in pixels; larger inputs are downsampled before
    /// processing and the contour rescaled back afterwards.
    pub max_dimension: u32,

    /// Resampling filter for the oversized-input downsample.
    pub downsample_filter: DownsampleFilter,
}

impl ContourConfig {
    /// Default silhouette alpha threshold (catches soft PNG edges).
    pub const DEFAULT_ALPHA_THRESHOLD: u8 = 10;
    /// Default cut-line offset in inches (standard sticker margin).
    pub const DEFAULT_OFFSET_INCHES: f64 = 0.125;
    /// Default physical width in inches.
    pub const DEFAULT_TARGET_WIDTH_INCHES: f64 = 3.0;
    /// Default auto-bridge merge distance in pixels.
    pub const DEFAULT_MERGE_DISTANCE_PX: u32 = 6;
    /// Default whiteness threshold (0-100 scale).
    pub const DEFAULT_WHITENESS_THRESHOLD: u8 = 90;
    /// Default RDP tolerance in pixels.
    pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 1.0;
    /// Default longest-edge processing cap in pixels.
    pub const DEFAULT_MAX_DIMENSION: u32 = 4000;
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            alpha_threshold: Self::DEFAULT_ALPHA_THRESHOLD,
            offset_inches: Self::DEFAULT_OFFSET_INCHES,
            bleed_inches: 0.0,
            target_width_inches: Self::DEFAULT_TARGET_WIDTH_INCHES,
            corner_style: CornerStyle::default(),
            merge_distance_px: Self::DEFAULT_MERGE_DISTANCE_PX,
            fill_holes: true,
            remove_background: false,
            whiteness_threshold: Self::DEFAULT_WHITENESS_THRESHOLD,
            simplify_tolerance: Self::DEFAULT_SIMPLIFY_TOLERANCE,
            max_dimension: Self::DEFAULT_MAX_DIMENSION,
            downsample_filter: DownsampleFilter::default(),
        }
    }
}

/// Final handoff record between the geometric core and export/compositing
/// collaborators.
///
/// Export code re-projects these points into its target coordinate
/// system (flip Y, page origin, inches→points); it must not re-derive
/// geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourData {
    /// Print-resolution contour polygon(s) in the pixel space of the
    /// original raster, offset so negative coordinates may appear when
    /// the cut line extends past the image edge.
    pub path: Vec<Polygon>,

    /// Working-resolution polygon(s) for on-screen preview.
    pub preview_path: Vec<Polygon>,

    /// Physical width of the cut area in inches (image + offset).
    pub width_inches: f64,

    /// Physical height of the cut area in inches.
    pub height_inches: f64,

    /// Horizontal distance in pixels from the contour bounding box
    /// origin to the raster origin, for re-aligning when compositing.
    pub image_offset_x: f64,

    /// Vertical distance in pixels from the contour bounding box origin
    /// to the raster origin.
    pub image_offset_y: f64,

    /// Pixels-per-inch used for every inch→pixel conversion.
    pub effective_dpi: f64,

    /// Bleed recorded for print compositing, in inches.
    pub bleed_inches: f64,

    /// Background fill colour behind the artwork (RGBA), if any.
    pub background_color: Option<[u8; 4]>,
}

/// Errors that can occur during contour generation.
///
/// Detection failures (background flood covering the whole image, crop
/// bounds too small, low shape confidence) are *not* errors; they fall
/// back to safe defaults and processing continues.
#[derive(Debug, thiserror::Error)]
pub enum ContourError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Pipeline configuration is invalid.
    #[error("invalid contour configuration: {0}")]
    InvalidConfig(String),

    /// The raster contains no pixels above the alpha threshold.
    #[error("no silhouette found in the image")]
    NoSilhouette,
}
