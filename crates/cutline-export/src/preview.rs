//! Raster preview rendering with `tiny-skia`.
//!
//! Composites the contour behind the source artwork: an optional
//! background fill inside the contour, the artwork on top, and the
//! contour stroked over everything. The contour is drawn from its
//! smoothed command stream so dense traced geometry reads as a clean
//! line rather than a pixel staircase.

use tiny_skia::{FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform};

use cutline_pipeline::{ContourData, Polygon, RgbaImage};

use crate::path::{PathCommand, smoothed_commands};

/// Preview appearance knobs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewStyle {
    /// Stroke colour of the cut line, straight (unpremultiplied) RGBA.
    pub stroke_color: [u8; 4],
    /// Stroke width in preview pixels.
    pub stroke_width: f32,
    /// Whether to fill the contour interior with the detected
    /// background colour before compositing the artwork.
    pub fill_background: bool,
}

impl Default for PreviewStyle {
    fn default() -> Self {
        Self {
            stroke_color: [220, 30, 60, 255],
            stroke_width: 2.0,
            fill_background: true,
        }
    }
}

/// Why a preview could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    /// The contour has no drawable geometry.
    #[error("contour has no drawable geometry")]
    EmptyContour,
    /// The preview canvas dimensions were rejected by the rasterizer.
    #[error("preview canvas of {width}x{height} px could not be allocated")]
    Canvas {
        /// Requested canvas width.
        width: u32,
        /// Requested canvas height.
        height: u32,
    },
}

/// Render a raster preview: contour fill, artwork, contour stroke.
///
/// `image` is the working-resolution artwork the preview paths refer to.
///
/// # Errors
///
/// [`ExportError::EmptyContour`] when the contour has no geometry to
/// size a canvas from, [`ExportError::Canvas`] when the rasterizer
/// rejects the canvas dimensions.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn render_preview(
    data: &ContourData,
    image: &RgbaImage,
    style: &PreviewStyle,
) -> Result<RgbaImage, ExportError> {
    let bounds = preview_bounds(&data.preview_path).ok_or(ExportError::EmptyContour)?;
    let margin = f64::from(style.stroke_width);
    let origin_x = bounds.0 - margin;
    let origin_y = bounds.1 - margin;
    let width = (bounds.2 - origin_x + margin).ceil().max(1.0) as u32;
    let height = (bounds.3 - origin_y + margin).ceil().max(1.0) as u32;

    let mut pixmap = Pixmap::new(width, height).ok_or(ExportError::Canvas { width, height })?;

    // Background fill inside the contour.
    if style.fill_background
        && let Some(color) = data.background_color
    {
        let mut paint = Paint::default();
        paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
        paint.anti_alias = true;
        for ring in &data.preview_path {
            if let Some(path) = ring_path(ring, origin_x, origin_y) {
                pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
            }
        }
    }

    // Artwork composited at its recorded offset.
    if let Some(artwork) = pixmap_from_rgba(image) {
        pixmap.draw_pixmap(
            (-origin_x) as i32,
            (-origin_y) as i32,
            artwork.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }

    // Cut line on top, round caps and joins.
    let stroke = Stroke {
        width: style.stroke_width,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        ..Stroke::default()
    };
    let mut paint = Paint::default();
    let [r, g, b, a] = style.stroke_color;
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    for ring in &data.preview_path {
        if let Some(path) = ring_path(ring, origin_x, origin_y) {
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }

    Ok(unpremultiply(&pixmap))
}

/// Joint bounding box of the preview rings as (min_x, min_y, max_x, max_y).
fn preview_bounds(paths: &[Polygon]) -> Option<(f64, f64, f64, f64)> {
    let mut boxes = paths.iter().filter_map(Polygon::bounding_box);
    let first = boxes.next()?;
    Some(boxes.fold(
        (first.min_x, first.min_y, first.max_x, first.max_y),
        |acc, bb| (acc.0.min(bb.min_x), acc.1.min(bb.min_y), acc.2.max(bb.max_x), acc.3.max(bb.max_y)),
    ))
}

/// Build a tiny-skia path from the ring's smoothed command stream,
/// shifted into canvas space.
#[allow(clippy::cast_possible_truncation)]
fn ring_path(ring: &Polygon, origin_x: f64, origin_y: f64) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for command in smoothed_commands(ring) {
        match command {
            PathCommand::MoveTo(p) => pb.move_to((p.x - origin_x) as f32, (p.y - origin_y) as f32),
            PathCommand::LineTo(p) => pb.line_to((p.x - origin_x) as f32, (p.y - origin_y) as f32),
            PathCommand::CurveTo(c1, c2, end) => pb.cubic_to(
                (c1.x - origin_x) as f32,
                (c1.y - origin_y) as f32,
                (c2.x - origin_x) as f32,
                (c2.y - origin_y) as f32,
                (end.x - origin_x) as f32,
                (end.y - origin_y) as f32,
            ),
            PathCommand::Close => pb.close(),
        }
    }
    pb.finish()
}

/// Straight-alpha `RgbaImage` to premultiplied tiny-skia pixmap.
fn pixmap_from_rgba(image: &RgbaImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height())?;
    let data = pixmap.data_mut();
    for (i, pixel) in image.pixels().enumerate() {
        let off = i * 4;
        let a = u16::from(pixel.0[3]);
        #[allow(clippy::cast_possible_truncation)]
        {
            data[off] = (u16::from(pixel.0[0]) * a / 255) as u8;
            data[off + 1] = (u16::from(pixel.0[1]) * a / 255) as u8;
            data[off + 2] = (u16::from(pixel.0[2]) * a / 255) as u8;
            data[off + 3] = pixel.0[3];
        }
    }
    Some(pixmap)
}

/// Premultiplied pixmap back to a straight-alpha `RgbaImage`.
#[allow(clippy::cast_possible_truncation)]
fn unpremultiply(pixmap: &Pixmap) -> RgbaImage {
    let data = pixmap.data();
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (i, pixel) in img.pixels_mut().enumerate() {
        let off = i * 4;
        let a = data[off + 3];
        if a == 0 {
            *pixel = image_rgba([0, 0, 0, 0]);
        } else {
            let r = (u16::from(data[off]) * 255 / u16::from(a)) as u8;
            let g = (u16::from(data[off + 1]) * 255 / u16::from(a)) as u8;
            let b = (u16::from(data[off + 2]) * 255 / u16::from(a)) as u8;
            *pixel = image_rgba([r, g, b, a]);
        }
    }
    img
}

fn image_rgba(channels: [u8; 4]) -> image::Rgba<u8> {
    image::Rgba(channels)
}
