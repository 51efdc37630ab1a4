//! Ramer-Douglas-Peucker simplification for closed rings.
//!
//! Drops vertices that lie within a pixel tolerance of the chord
//! between their surviving neighbors. Because the input is a closed
//! ring rather than an open polyline, the ring is split at two anchor
//! vertices (the first vertex and the vertex farthest from it) and each
//! half is simplified independently; otherwise the implicit closing
//! edge would never be considered a chord.

use crate::types::{Point, Polygon};

/// Simplify a closed ring with Ramer-Douglas-Peucker.
///
/// A tolerance of 0.0 preserves all points. Rings with fewer than 4
/// points are returned unchanged (nothing removable).
#[must_use = "returns the simplified polygon"]
pub fn simplify(polygon: &Polygon, tolerance: f64) -> Polygon {
    let points = polygon.points();
    if points.len() < 4 {
        return polygon.clone();
    }

    // Second anchor: vertex farthest from the first, so the two chords
    // cut the ring into halves of real geometric extent.
    let mut far_idx = 1;
    let mut far_dist = 0.0;
    for (i, p) in points.iter().enumerate().skip(1) {
        let d = points[0].distance_squared(*p);
        if d > far_dist {
            far_dist = d;
            far_idx = i;
        }
    }

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[far_idx] = true;

    rdp_recurse(points, 0, far_idx, tolerance, &mut kept);
    rdp_wrapped(points, far_idx, tolerance, &mut kept);

    let simplified: Vec<Point> = points
        .iter()
        .zip(&kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect();

    Polygon::new(simplified)
}

/// Simplify multiple rings, applying RDP to each independently.
#[must_use = "returns the simplified polygons"]
pub fn simplify_paths(polygons: &[Polygon], tolerance: f64) -> Vec<Polygon> {
    polygons.iter().map(|p| simplify(p, tolerance)).collect()
}

/// RDP over the ring half that wraps past the last index back to 0.
fn rdp_wrapped(points: &[Point], start: usize, tolerance: f64, kept: &mut [bool]) {
    let n = points.len();
    let span = n - start;
    if span < 2 {
        return;
    }
    let a = points[start];
    let b = points[0];

    let mut max_dist = 0.0;
    let mut max_idx = start;
    for i in (start + 1)..n {
        let d = perpendicular_distance(points[i], a, b);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_wrapped(points, max_idx, tolerance, kept);
    }
}

/// Recursive step of the Ramer-Douglas-Peucker algorithm.
///
/// Finds the point between `start` and `end` that is farthest from the
/// chord between them. If that distance exceeds `tolerance`, the point
/// is kept and both sub-segments are processed recursively.
fn rdp_recurse(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    if end <= start + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = start;

    for i in (start + 1)..end {
        let d = perpendicular_distance(points[i], points[start], points[end]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > tolerance {
        kept[max_idx] = true;
        rdp_recurse(points, start, max_idx, tolerance, kept);
        rdp_recurse(points, max_idx, end, tolerance, kept);
    }
}

/// Perpendicular distance from point `p` to the line defined by `a` and `b`.
///
/// Uses the formula: |cross(b-a, p-a)| / |b-a|.
/// When `a` and `b` coincide, returns the distance from `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        // a and b are the same point.
        return p.distance(a);
    }

    // |cross product| / |line length|
    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_rings_unchanged() {
        let triangle = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(2.0, 4.0),
        ]);
        assert_eq!(simplify(&triangle, 1.0), triangle);
        assert!(simplify(&Polygon::new(vec![]), 1.0).is_empty());
    }

    #[test]
    fn zero_tolerance_preserves_all_points() {
        let ring = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.1),
            Point::new(2.0, 0.0),
            Point::new(1.0, 3.0),
        ]);
        assert_eq!(simplify(&ring, 0.0).len(), 4);
    }

    #[test]
    fn collinear_edge_points_collapse() {
        // Square traced densely along its edges.
        let mut points = Vec::new();
        for x in 0..10 {
            points.push(Point::new(f64::from(x), 0.0));
        }
        for y in 0..10 {
            points.push(Point::new(9.0, f64::from(y)));
        }
        for x in (0..10).rev() {
            points.push(Point::new(f64::from(x), 9.0));
        }
        for y in (1..10).rev() {
            points.push(Point::new(0.0, f64::from(y)));
        }
        let simplified = simplify(&Polygon::new(points), 0.5);
        // Only the four corners carry information.
        assert!(simplified.len() <= 6, "got {} points", simplified.len());
        assert!(simplified.len() >= 4);
        for corner in [
            Point::new(0.0, 0.0),
            Point::new(9.0, 0.0),
            Point::new(9.0, 9.0),
            Point::new(0.0, 9.0),
        ] {
            assert!(
                simplified.points().iter().any(|p| p.distance(corner) < 1e-9),
                "corner {corner:?} missing"
            );
        }
    }

    #[test]
    fn zigzag_peaks_survive_small_tolerance() {
        let ring = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 5.0),
            Point::new(4.0, 0.0),
            Point::new(6.0, 5.0),
            Point::new(8.0, 0.0),
            Point::new(4.0, -6.0),
        ]);
        assert_eq!(simplify(&ring, 1.0).len(), 6);
    }

    #[test]
    fn simplify_is_idempotent() {
        let mut points = Vec::new();
        for i in 0..40 {
            let angle = f64::from(i) * std::f64::consts::TAU / 40.0;
            points.push(Point::new(angle.cos() * 20.0, angle.sin() * 20.0));
        }
        let once = simplify(&Polygon::new(points), 0.8);
        let twice = simplify(&once, 0.8);
        assert_eq!(once, twice);
    }

    #[test]
    fn simplify_paths_applies_to_each() {
        let dense_line_ring = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(3.0, 0.0),
            Point::new(1.5, 4.0),
        ]);
        let peaked = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 5.0),
            Point::new(2.0, 0.0),
            Point::new(1.0, -5.0),
        ]);
        let results = simplify_paths(&[dense_line_ring, peaked], 0.5);
        assert_eq!(results.len(), 2);
        assert!(results[0].len() < 5);
        assert_eq!(results[1].len(), 4);
    }

    #[test]
    fn perpendicular_distance_on_axis() {
        let d = perpendicular_distance(
            Point::new(1.0, 3.0),
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
        );
        assert!((d - 3.0).abs() < 1e-10);
    }

    #[test]
    fn perpendicular_distance_coincident_endpoints() {
        let d = perpendicular_distance(
            Point::new(3.0, 4.0),
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
        );
        assert!((d - 5.0).abs() < 1e-10);
    }
}
