//! Path command emission from contour polygons.
//!
//! A [`Polygon`] is an implicitly closed ring; exporters and renderers
//! want an explicit command stream instead. [`polygon_commands`] emits
//! straight line segments; [`smoothed_commands`] runs the ring through
//! a Catmull-Rom spline converted to cubic Béziers, which is what the
//! on-screen preview uses so dense traced geometry does not look
//! faceted at high zoom.

use cutline_pipeline::{Point, Polygon};

/// One step of an explicit path command stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    /// Start a new subpath at the point.
    MoveTo(Point),
    /// Straight segment to the point.
    LineTo(Point),
    /// Cubic Bézier segment (control, control, end).
    CurveTo(Point, Point, Point),
    /// Close the current subpath back to its `MoveTo`.
    Close,
}

/// Emit the ring as straight segments: `M`, `L`…, `Z`.
///
/// Rings with fewer than 2 points produce no commands.
#[must_use]
pub fn polygon_commands(polygon: &Polygon) -> Vec<PathCommand> {
    let points = polygon.points();
    if points.len() < 2 {
        return Vec::new();
    }
    let mut commands = Vec::with_capacity(points.len() + 1);
    commands.push(PathCommand::MoveTo(points[0]));
    for &p in &points[1..] {
        commands.push(PathCommand::LineTo(p));
    }
    commands.push(PathCommand::Close);
    commands
}

/// Emit the ring as a closed Catmull-Rom spline in cubic Bézier form.
///
/// Each ring edge becomes one `CurveTo` whose control points are
/// derived from the neighbouring vertices (standard Catmull-Rom to
/// Bézier conversion with tension 1/6). Rings with fewer than 3 points
/// fall back to straight segments.
#[must_use]
pub fn smoothed_commands(polygon: &Polygon) -> Vec<PathCommand> {
    let points = polygon.points();
    let n = points.len();
    if n < 3 {
        return polygon_commands(polygon);
    }

    let mut commands = Vec::with_capacity(n + 1);
    commands.push(PathCommand::MoveTo(points[0]));
    for i in 0..n {
        let p0 = points[(i + n - 1) % n];
        let p1 = points[i];
        let p2 = points[(i + 1) % n];
        let p3 = points[(i + 2) % n];

        let c1 = Point::new(p1.x + (p2.x - p0.x) / 6.0, p1.y + (p2.y - p0.y) / 6.0);
        let c2 = Point::new(p2.x - (p3.x - p1.x) / 6.0, p2.y - (p3.y - p1.y) / 6.0);
        commands.push(PathCommand::CurveTo(c1, c2, p2));
    }
    commands.push(PathCommand::Close);
    commands
}
