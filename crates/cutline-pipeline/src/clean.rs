//! Polygon cleanup: self-intersection repair, spike removal, winding.
//!
//! Traced and offset rings can pinch into small spurious loops or grow
//! hairpin spikes from the pixel grid. Each pass here is idempotent and
//! safe to re-run; any pass that would leave fewer than 3 vertices
//! returns its input unchanged instead. Only [`repair`] reports
//! degeneracy to the caller, since offsetting needs to distinguish "no
//! crossings" from "nothing left".

use crate::types::{Point, Polygon};

/// Cosine of the turn angle past which a vertex counts as a hairpin
/// spike (140°).
const BACKTRACK_DOT: f64 = -0.766;

/// Upper bound on repair iterations independent of vertex count.
const MIN_REPAIR_ITERATIONS: usize = 16;

/// The polygon degenerated below 3 vertices while repairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("polygon degenerated below 3 vertices during self-intersection repair")]
pub struct DegenerateInput;

/// Run the full cleanup: duplicate removal, self-intersection repair,
/// backtrack removal, winding normalization.
///
/// Repair failures fall back to the pre-repair ring, so the result is
/// always a usable polygon.
#[must_use]
pub fn clean_polygon(polygon: &Polygon) -> Polygon {
    let deduped = dedup_points(polygon);
    let repaired = repair(&deduped).unwrap_or(deduped);
    let despiked = remove_backtracking(&repaired);
    normalize_winding(despiked)
}

/// Remove consecutive duplicate vertices (including the wraparound
/// pair). Falls back to the input if fewer than 3 vertices survive.
#[must_use]
pub fn dedup_points(polygon: &Polygon) -> Polygon {
    let points = polygon.points();
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last().is_none_or(|&last| last.distance_squared(p) > f64::EPSILON) {
            out.push(p);
        }
    }
    while out.len() > 1
        && out
            .first()
            .zip(out.last())
            .is_some_and(|(&a, &b)| a.distance_squared(b) <= f64::EPSILON)
    {
        out.pop();
    }
    if out.len() < 3 {
        return polygon.clone();
    }
    Polygon::new(out)
}

/// Excise self-intersections until the ring is simple.
///
/// Each crossing splits the ring into two loops at the intersection
/// point; the smaller loop (by absolute area) is replaced by the single
/// intersection point and the larger loop survives. Runs to a fixed
/// point with an iteration cap.
///
/// # Errors
///
/// Returns [`DegenerateInput`] when the input has fewer than 3 vertices
/// or repair would leave fewer than 3.
pub fn repair(polygon: &Polygon) -> Result<Polygon, DegenerateInput> {
    if polygon.len() < 3 {
        return Err(DegenerateInput);
    }
    let mut current = polygon.clone();
    let cap = current.len().max(MIN_REPAIR_ITERATIONS);
    for _ in 0..cap {
        let Some((i, j, crossing)) = find_first_self_intersection(current.points()) else {
            return Ok(current);
        };
        let points = current.points();
        let n = points.len();

        // Loop A: crossing, points (i+1..=j). Loop B: the remainder.
        let mut loop_a = vec![crossing];
        loop_a.extend_from_slice(&points[i + 1..=j]);
        let mut loop_b = vec![crossing];
        loop_b.extend_from_slice(&points[j + 1..n]);
        loop_b.extend_from_slice(&points[..=i]);

        let a = Polygon::new(loop_a);
        let b = Polygon::new(loop_b);
        let keep = if a.signed_area().abs() >= b.signed_area().abs() { a } else { b };
        if keep.len() < 3 {
            return Err(DegenerateInput);
        }
        current = dedup_points(&keep);
    }
    Ok(current)
}

/// First pair of non-adjacent edges that cross, with the crossing point.
///
/// Edges are `(k, k+1 mod n)`; adjacency (shared vertex) is excluded,
/// including the wraparound pair.
#[must_use]
pub fn find_first_self_intersection(points: &[Point]) -> Option<(usize, usize, Point)> {
    let n = points.len();
    if n < 4 {
        return None;
    }
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let crossing = segment_intersection(
                points[i],
                points[(i + 1) % n],
                points[j],
                points[(j + 1) % n],
            );
            if let Some(p) = crossing {
                return Some((i, j, p));
            }
        }
    }
    None
}

/// Proper intersection of segments `a1→a2` and `b1→b2`.
///
/// Endpoint touches are not reported; collinear overlap is ignored
/// (handled by duplicate/backtrack removal instead).
#[must_use]
pub fn segment_intersection(a1: Point, a2: Point, b1: Point, b2: Point) -> Option<Point> {
    let d1 = Point::new(a2.x - a1.x, a2.y - a1.y);
    let d2 = Point::new(b2.x - b1.x, b2.y - b1.y);
    let denom = d1.x.mul_add(d2.y, -(d1.y * d2.x));
    if denom.abs() < 1e-12 {
        return None;
    }
    let dx = b1.x - a1.x;
    let dy = b1.y - a1.y;
    let t = dx.mul_add(d2.y, -(dy * d2.x)) / denom;
    let u = dx.mul_add(d1.y, -(dy * d1.x)) / denom;
    const EPS: f64 = 1e-9;
    if t > EPS && t < 1.0 - EPS && u > EPS && u < 1.0 - EPS {
        Some(Point::new(d1.x.mul_add(t, a1.x), d1.y.mul_add(t, a1.y)))
    } else {
        None
    }
}

/// Drop hairpin-spike vertices whose turn angle exceeds 140°.
///
/// Sweeps repeatedly since removing a spike exposes its neighbors;
/// returns the pre-sweep ring whenever a sweep would leave fewer than
/// 3 vertices.
#[must_use]
pub fn remove_backtracking(polygon: &Polygon) -> Polygon {
    let mut current = dedup_points(polygon);
    loop {
        let points = current.points();
        let n = points.len();
        if n < 4 {
            return current;
        }
        let mut kept: Vec<Point> = Vec::with_capacity(n);
        for i in 0..n {
            let prev = points[(i + n - 1) % n];
            let here = points[i];
            let next = points[(i + 1) % n];
            if is_spike(prev, here, next) {
                continue;
            }
            kept.push(here);
        }
        if kept.len() == n {
            return current;
        }
        if kept.len() < 3 {
            return current;
        }
        current = Polygon::new(kept);
    }
}

fn is_spike(prev: Point, here: Point, next: Point) -> bool {
    let in_len = prev.distance(here);
    let out_len = here.distance(next);
    if in_len < f64::EPSILON || out_len < f64::EPSILON {
        return true;
    }
    let ix = (here.x - prev.x) / in_len;
    let iy = (here.y - prev.y) / in_len;
    let ox = (next.x - here.x) / out_len;
    let oy = (next.y - here.y) / out_len;
    ix.mul_add(ox, iy * oy) < BACKTRACK_DOT
}

/// Reverse the ring if needed so its shoelace area is negative
/// (clockwise), the orientation all offset math assumes.
#[must_use]
pub fn normalize_winding(mut polygon: Polygon) -> Polygon {
    if !polygon.is_clockwise() {
        polygon.reverse();
    }
    polygon
}
