//! Polygon offsetting: Minkowski disk sweep and mitered parallel edges.
//!
//! Takes a simple clockwise ring and a signed offset distance (positive
//! = outward) and produces the offset ring. Each edge is translated
//! along its outward normal; consecutive offset edges are then joined
//! per corner: trimmed to their intersection where they overlap, and
//! bridged with an arc (rounded) or a miter/bevel (sharp) where a gap
//! opens. A self-intersection repair pass runs afterwards since
//! offsetting concave geometry can introduce new crossings.
//!
//! When the shape detector classified the silhouette, a closed-form
//! fast path replaces the general algorithm entirely.

use std::f64::consts::{FRAC_PI_2, TAU};

use crate::clean::{clean_polygon, dedup_points, normalize_winding, repair, segment_intersection};
use crate::crop::CropBounds;
use crate::shape::{ShapeDetection, ShapeKind};
use crate::types::{CornerStyle, Point, Polygon};

/// Arc resolution: segments per 90° of corner turn.
const ARC_SEGMENTS_PER_QUARTER: f64 = 8.0;

/// Miter length bound, as a multiple of the offset distance, past which
/// sharp corners fall back to a bevel.
const MITER_LIMIT: f64 = 2.0;

/// Offset a simple clockwise ring by `distance` pixels.
///
/// A zero distance returns the cleaned input unchanged. Rings with
/// fewer than 3 vertices are returned as-is.
#[must_use]
pub fn offset_polygon(polygon: &Polygon, distance: f64, corner_style: CornerStyle) -> Polygon {
    if polygon.len() < 3 {
        return polygon.clone();
    }
    if distance.abs() < f64::EPSILON {
        return clean_polygon(polygon);
    }

    let ring = dedup_points(polygon);
    let points = ring.points();
    let n = points.len();

    // Per-edge offset segments and unit normals.
    let mut edges = Vec::with_capacity(n);
    for i in 0..n {
        let p = points[i];
        let q = points[(i + 1) % n];
        let len = p.distance(q);
        if len < f64::EPSILON {
            continue;
        }
        let dir = Point::new((q.x - p.x) / len, (q.y - p.y) / len);
        // Outward for clockwise winding is the left normal.
        let normal = Point::new(-dir.y, dir.x);
        edges.push(OffsetEdge {
            start: Point::new(normal.x.mul_add(distance, p.x), normal.y.mul_add(distance, p.y)),
            end: Point::new(normal.x.mul_add(distance, q.x), normal.y.mul_add(distance, q.y)),
            dir,
            normal,
            vertex: q,
        });
    }
    if edges.len() < 3 {
        return polygon.clone();
    }

    let m = edges.len();
    let joins: Vec<Join> = (0..m)
        .map(|i| corner_join(&edges[i], &edges[(i + 1) % m], distance, corner_style))
        .collect();

    let mut out: Vec<Point> = Vec::with_capacity(m * 2);
    for i in 0..m {
        if !matches!(joins[(i + m - 1) % m], Join::Trim(_)) {
            out.push(edges[i].start);
        }
        match &joins[i] {
            Join::Trim(x) => out.push(*x),
            Join::Bridge(points) => {
                out.push(edges[i].end);
                out.extend_from_slice(points);
            }
        }
    }

    let raw = dedup_points(&Polygon::new(out));
    let repaired = repair(&raw).unwrap_or(raw);
    normalize_winding(repaired)
}

/// Offset every ring independently.
#[must_use]
pub fn offset_paths(polygons: &[Polygon], distance: f64, corner_style: CornerStyle) -> Vec<Polygon> {
    polygons
        .iter()
        .map(|p| offset_polygon(p, distance, corner_style))
        .collect()
}

struct OffsetEdge {
    start: Point,
    end: Point,
    dir: Point,
    normal: Point,
    /// Original ring vertex this edge ends at (the corner pivot).
    vertex: Point,
}

enum Join {
    /// Overlapping offset edges: replace both edge endpoints with the
    /// intersection point.
    Trim(Point),
    /// Gap between offset edges: intermediate points to insert between
    /// the edge end and the next edge start (empty = plain bevel).
    Bridge(Vec<Point>),
}

/// Decide how the offset images of two consecutive edges connect at
/// their shared vertex.
fn corner_join(edge: &OffsetEdge, next: &OffsetEdge, distance: f64, corner_style: CornerStyle) -> Join {
    let cross = edge.dir.x.mul_add(next.dir.y, -(edge.dir.y * next.dir.x));
    let dot = edge.dir.x.mul_add(next.dir.x, edge.dir.y * next.dir.y);

    // Near-collinear: the segments already meet.
    if cross.abs() < 1e-9 && dot > 0.0 {
        return Join::Bridge(Vec::new());
    }

    let gap_side = cross * distance < 0.0;
    if !gap_side {
        // The offset segments overlap; trim to their crossing when they
        // actually cross, otherwise leave the bevel for the repair pass.
        return segment_intersection(edge.start, edge.end, next.start, next.end)
            .map_or(Join::Bridge(Vec::new()), Join::Trim);
    }

    match corner_style {
        CornerStyle::Rounded => Join::Bridge(arc_points(edge, next, distance)),
        // The miter sits on both extended edge lines, so it replaces
        // the edge endpoints outright; past the limit the endpoints
        // stay and form the bevel.
        CornerStyle::Sharp => miter_point(edge, next, distance).map_or(Join::Bridge(Vec::new()), Join::Trim),
    }
}

/// Arc about the original vertex from this edge's normal direction to
/// the next edge's, at the offset radius.
///
/// The endpoints themselves are the edge end / next edge start and are
/// emitted by the caller; only interior samples are returned.
fn arc_points(edge: &OffsetEdge, next: &OffsetEdge, distance: f64) -> Vec<Point> {
    let from = edge.normal.y.atan2(edge.normal.x);
    let cross = edge.normal.x.mul_add(next.normal.y, -(edge.normal.y * next.normal.x));
    let dot = edge.normal.x.mul_add(next.normal.x, edge.normal.y * next.normal.y);
    let sweep = cross.atan2(dot);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let segments = ((sweep.abs() / FRAC_PI_2 * ARC_SEGMENTS_PER_QUARTER).ceil() as usize).max(1);
    let mut points = Vec::with_capacity(segments.saturating_sub(1));
    for step in 1..segments {
        #[allow(clippy::cast_precision_loss)]
        let angle = sweep.mul_add(step as f64 / segments as f64, from);
        points.push(Point::new(
            angle.cos().mul_add(distance, edge.vertex.x),
            angle.sin().mul_add(distance, edge.vertex.y),
        ));
    }
    points
}

/// Miter point from the extended offset edge lines, or `None` (bevel)
/// when the lines are parallel or the miter runs past the limit.
fn miter_point(edge: &OffsetEdge, next: &OffsetEdge, distance: f64) -> Option<Point> {
    let denom = edge.dir.x.mul_add(next.dir.y, -(edge.dir.y * next.dir.x));
    if denom.abs() < 1e-12 {
        return None;
    }
    let dx = next.start.x - edge.end.x;
    let dy = next.start.y - edge.end.y;
    let t = dx.mul_add(next.dir.y, -(dy * next.dir.x)) / denom;
    let miter = Point::new(edge.dir.x.mul_add(t, edge.end.x), edge.dir.y.mul_add(t, edge.end.y));
    if miter.distance(edge.vertex) > distance.abs() * MITER_LIMIT {
        None
    } else {
        Some(miter)
    }
}

/// Closed-form offset contour for a detected regular shape.
///
/// Returns `None` for [`ShapeKind::Irregular`]; the general algorithm
/// applies then. Output rings are clockwise (negative shoelace).
#[must_use]
pub fn offset_shape(detection: &ShapeDetection, distance: f64, corner_style: CornerStyle) -> Option<Polygon> {
    let bounds = detection.bounds;
    match detection.kind {
        ShapeKind::Circle | ShapeKind::Oval => Some(ellipse_ring(bounds, distance)),
        ShapeKind::Square | ShapeKind::Rectangle => Some(rectangle_ring(bounds, distance, corner_style)),
        ShapeKind::Irregular => None,
    }
}

/// Ellipse sampled at arc resolution, radii grown by `distance`.
fn ellipse_ring(bounds: CropBounds, distance: f64) -> Polygon {
    let a = f64::from(bounds.width()) / 2.0 + distance;
    let b = f64::from(bounds.height()) / 2.0 + distance;
    let cx = f64::from(bounds.min_x) + f64::from(bounds.width()) / 2.0 - 0.5;
    let cy = f64::from(bounds.min_y) + f64::from(bounds.height()) / 2.0 - 0.5;

    let segments = (ARC_SEGMENTS_PER_QUARTER * 4.0) as usize;
    let mut points = Vec::with_capacity(segments);
    for step in 0..segments {
        // Decreasing angle keeps the ring clockwise.
        #[allow(clippy::cast_precision_loss)]
        let angle = -TAU * step as f64 / segments as f64;
        points.push(Point::new(
            angle.cos().mul_add(a, cx),
            angle.sin().mul_add(b, cy),
        ));
    }
    Polygon::new(points)
}

/// Rectangle grown by `distance` on every side, with mitered or rounded
/// corners.
fn rectangle_ring(bounds: CropBounds, distance: f64, corner_style: CornerStyle) -> Polygon {
    let left = f64::from(bounds.min_x) - distance;
    let top = f64::from(bounds.min_y) - distance;
    let right = f64::from(bounds.max_x) + distance;
    let bottom = f64::from(bounds.max_y) + distance;

    match corner_style {
        CornerStyle::Sharp => normalize_winding(Polygon::new(vec![
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
        ])),
        CornerStyle::Rounded => {
            let r = distance.max(0.0);
            if r < f64::EPSILON {
                return rectangle_ring(bounds, distance, CornerStyle::Sharp);
            }
            // Corner pivots sit on the original bounds.
            let corners = [
                (f64::from(bounds.max_x), f64::from(bounds.min_y), -FRAC_PI_2),
                (f64::from(bounds.max_x), f64::from(bounds.max_y), 0.0),
                (f64::from(bounds.min_x), f64::from(bounds.max_y), FRAC_PI_2),
                (f64::from(bounds.min_x), f64::from(bounds.min_y), 2.0 * FRAC_PI_2),
            ];
            let segments = ARC_SEGMENTS_PER_QUARTER as usize;
            let mut points = Vec::new();
            for (cx, cy, start_angle) in corners {
                for step in 0..=segments {
                    #[allow(clippy::cast_precision_loss)]
                    let angle = FRAC_PI_2.mul_add(step as f64 / segments as f64, start_angle);
                    points.push(Point::new(
                        angle.cos().mul_add(r, cx),
                        angle.sin().mul_add(r, cy),
                    ));
                }
            }
            normalize_winding(dedup_points(&Polygon::new(points)))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clean::find_first_self_intersection;

    fn clockwise_rect(w: f64, h: f64) -> Polygon {
        normalize_winding(Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        ]))
    }

    #[test]
    fn sharp_rectangle_round_trip() {
        // W x H offset by d with sharp corners gives (W+2d) x (H+2d).
        let rect = clockwise_rect(40.0, 20.0);
        let offset = offset_polygon(&rect, 5.0, CornerStyle::Sharp);
        let bb = offset.bounding_box().unwrap();
        assert!((bb.width() - 50.0).abs() < 1e-9, "width {}", bb.width());
        assert!((bb.height() - 30.0).abs() < 1e-9, "height {}", bb.height());
        assert!((bb.min_x + 5.0).abs() < 1e-9);
        assert!((bb.min_y + 5.0).abs() < 1e-9);
        assert_eq!(offset.len(), 4);
    }

    #[test]
    fn rounded_rectangle_stays_inside_miter_box() {
        let rect = clockwise_rect(40.0, 20.0);
        let offset = offset_polygon(&rect, 5.0, CornerStyle::Rounded);
        let bb = offset.bounding_box().unwrap();
        assert!((bb.width() - 50.0).abs() < 1e-9);
        assert!((bb.height() - 30.0).abs() < 1e-9);
        // Arc corners: strictly more vertices than the sharp result,
        // and the corner diagonal stays at radius, not sqrt(2)*radius.
        assert!(offset.len() > 4);
        let corner_dist = offset
            .points()
            .iter()
            .map(|p| p.distance(Point::new(0.0, 0.0)))
            .fold(f64::INFINITY, f64::min);
        assert!(corner_dist <= 5.0 + 1e-9);
    }

    #[test]
    fn zero_offset_returns_cleaned_input() {
        let rect = clockwise_rect(10.0, 10.0);
        assert_eq!(offset_polygon(&rect, 0.0, CornerStyle::Rounded), rect);
    }

    #[test]
    fn offset_grows_area_monotonically() {
        let rect = clockwise_rect(10.0, 10.0);
        let base = rect.signed_area().abs();
        let grown = offset_polygon(&rect, 3.0, CornerStyle::Rounded).signed_area().abs();
        let grown_more = offset_polygon(&rect, 6.0, CornerStyle::Rounded).signed_area().abs();
        assert!(grown > base);
        assert!(grown_more > grown);
    }

    #[test]
    fn output_winding_is_clockwise() {
        let rect = clockwise_rect(10.0, 10.0);
        for style in [CornerStyle::Rounded, CornerStyle::Sharp] {
            let offset = offset_polygon(&rect, 4.0, style);
            assert!(offset.is_clockwise(), "{style:?} output must stay clockwise");
        }
    }

    #[test]
    fn concave_corner_is_trimmed_without_crossings() {
        // L-shape: one reflex corner.
        let ell = normalize_winding(Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(30.0, 0.0),
            Point::new(30.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 30.0),
            Point::new(0.0, 30.0),
        ]));
        let offset = offset_polygon(&ell, 3.0, CornerStyle::Rounded);
        assert!(offset.len() >= 6);
        assert!(find_first_self_intersection(offset.points()).is_none());
        assert!(offset.signed_area().abs() > ell.signed_area().abs());
    }

    #[test]
    fn inward_offset_shrinks() {
        let rect = clockwise_rect(20.0, 20.0);
        let shrunk = offset_polygon(&rect, -4.0, CornerStyle::Sharp);
        let bb = shrunk.bounding_box().unwrap();
        assert!((bb.width() - 12.0).abs() < 1e-9);
        assert!((bb.height() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn acute_sharp_corner_falls_back_to_bevel() {
        // 20° spike at the origin: miter would be ~5.7x the offset.
        let spike = normalize_winding(Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(50.0, 8.8),
            Point::new(50.0, -8.8),
        ]));
        let offset = offset_polygon(&spike, 4.0, CornerStyle::Sharp);
        let bb = offset.bounding_box().unwrap();
        // A full miter at the tip would push min_x past -20.
        assert!(bb.min_x > -14.0, "bevel should bound the tip: min_x {}", bb.min_x);
    }

    #[test]
    fn circle_fast_path_has_exact_radius() {
        let detection = ShapeDetection {
            kind: ShapeKind::Circle,
            confidence: 0.95,
            bounds: CropBounds { min_x: 0, min_y: 0, max_x: 99, max_y: 99 },
        };
        let ring = offset_shape(&detection, 10.0, CornerStyle::Rounded).unwrap();
        let center = Point::new(49.5, 49.5);
        for p in ring.points() {
            assert!(
                (p.distance(center) - 60.0).abs() < 1e-9,
                "every sample sits at radius r+d"
            );
        }
        assert!(ring.is_clockwise());
    }

    #[test]
    fn rectangle_fast_path_dimensions() {
        let detection = ShapeDetection {
            kind: ShapeKind::Rectangle,
            confidence: 0.95,
            bounds: CropBounds { min_x: 10, min_y: 10, max_x: 49, max_y: 29 },
        };
        let sharp = offset_shape(&detection, 5.0, CornerStyle::Sharp).unwrap();
        let bb = sharp.bounding_box().unwrap();
        assert!((bb.width() - 49.0).abs() < 1e-9);
        assert!((bb.height() - 29.0).abs() < 1e-9);
        assert!(sharp.is_clockwise());

        let rounded = offset_shape(&detection, 5.0, CornerStyle::Rounded).unwrap();
        assert!(rounded.len() > 4);
        assert!(rounded.is_clockwise());
    }

    #[test]
    fn irregular_shape_has_no_fast_path() {
        let detection = ShapeDetection {
            kind: ShapeKind::Irregular,
            confidence: 0.3,
            bounds: CropBounds::full(10, 10),
        };
        assert!(offset_shape(&detection, 5.0, CornerStyle::Rounded).is_none());
    }

    #[test]
    fn degenerate_ring_passes_through() {
        let segment = Polygon::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]);
        assert_eq!(offset_polygon(&segment, 5.0, CornerStyle::Rounded), segment);
    }
}
