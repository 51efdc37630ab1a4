//! Moore-neighbor boundary tracing.
//!
//! Turns a binary mask into one dense closed polygon per external
//! boundary. Solid pixels are grouped into 8-connected components; each
//! component is traced once, starting from its topmost-then-leftmost
//! edge pixel, so interior hole boundaries are never emitted.

use std::collections::VecDeque;

use image::GrayImage;

use crate::raster::neighbors4;
use crate::types::{Point, Polygon};

/// The 8 neighbor directions in clockwise order (image coordinates,
/// y growing downward), starting East.
const DIRECTIONS: [(i64, i64); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Trace every external boundary in the mask.
///
/// Returns one polygon per 8-connected solid component, each with one
/// vertex per traced edge pixel. Components smaller than 3 edge pixels
/// produce degenerate rings and are dropped.
#[must_use]
pub fn trace_boundaries(mask: &GrayImage) -> Vec<Polygon> {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let idx = |x: u32, y: u32| (y * width + x) as usize;
    let solid = |x: u32, y: u32| mask.get_pixel(x, y).0[0] != 0;

    // Edge pixels: solid with a transparent 4-neighbor or on the mask
    // border.
    let mut edge = vec![false; (width * height) as usize];
    for y in 0..height {
        for x in 0..width {
            if !solid(x, y) {
                continue;
            }
            let on_border = x == 0 || y == 0 || x == width - 1 || y == height - 1;
            let has_clear_neighbor = neighbors4(x, y, width, height).any(|(nx, ny)| !solid(nx, ny));
            if on_border || has_clear_neighbor {
                edge[idx(x, y)] = true;
            }
        }
    }

    let mut component = vec![0_u32; (width * height) as usize];
    let mut polygons = Vec::new();
    let mut next_component = 0_u32;

    for y in 0..height {
        for x in 0..width {
            if !solid(x, y) || component[idx(x, y)] != 0 {
                continue;
            }
            next_component += 1;
            let (start, edge_count) =
                label_component(mask, &mut component, next_component, (x, y));
            if let Some(polygon) = trace_one(mask, &edge, start, edge_count)
                && polygon.len() >= 3
            {
                polygons.push(polygon);
            }
        }
    }
    polygons
}

/// Flood-label one 8-connected solid component.
///
/// Returns its topmost-then-leftmost edge pixel and its edge pixel
/// count. The BFS visits pixels in scan order from the seed, which is
/// itself the component's topmost-leftmost solid pixel, so the seed is
/// always an edge pixel and is the trace start.
fn label_component(
    mask: &GrayImage,
    component: &mut [u32],
    label: u32,
    seed: (u32, u32),
) -> ((u32, u32), usize) {
    let (width, height) = mask.dimensions();
    let idx = |x: u32, y: u32| (y * width + x) as usize;
    let solid = |x: u32, y: u32| mask.get_pixel(x, y).0[0] != 0;

    let mut edge_count = 0_usize;
    let mut queue = VecDeque::new();
    component[idx(seed.0, seed.1)] = label;
    queue.push_back(seed);
    while let Some((x, y)) = queue.pop_front() {
        let on_border = x == 0 || y == 0 || x == width - 1 || y == height - 1;
        if on_border || neighbors4(x, y, width, height).any(|(nx, ny)| !solid(nx, ny)) {
            edge_count += 1;
        }
        for (dx, dy) in DIRECTIONS {
            let nx = i64::from(x) + dx;
            let ny = i64::from(y) + dy;
            if nx < 0 || ny < 0 {
                continue;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let (nx, ny) = (nx as u32, ny as u32);
            if nx < width && ny < height && solid(nx, ny) && component[idx(nx, ny)] == 0 {
                component[idx(nx, ny)] = label;
                queue.push_back((nx, ny));
            }
        }
    }
    (seed, edge_count)
}

/// Walk one boundary with Moore-neighbor tracing.
///
/// At each step the 8 neighbors are searched clockwise starting 90°
/// counter-clockwise of the incoming direction (`(prev + 5) % 8`), so
/// the walk hugs the boundary. Already-visited pixels are skipped to
/// avoid re-entrant loops on single-pixel bridges; the walk stops when
/// it returns to the start or exceeds `2 × edge_count` steps.
fn trace_one(
    mask: &GrayImage,
    edge: &[bool],
    start: (u32, u32),
    edge_count: usize,
) -> Option<Polygon> {
    let (width, height) = mask.dimensions();
    let idx = |x: u32, y: u32| (y * width + x) as usize;
    if !edge[idx(start.0, start.1)] {
        return None;
    }

    let mut visited = vec![false; (width * height) as usize];
    let mut points = vec![Point::new(f64::from(start.0), f64::from(start.1))];
    visited[idx(start.0, start.1)] = true;

    let mut current = start;
    // Nothing lies above the topmost-leftmost start, so beginning the
    // first search at West finds the boundary immediately.
    let mut prev_dir = 7_usize;
    let max_steps = edge_count.saturating_mul(2).max(8);

    for _ in 0..max_steps {
        let mut advanced = false;
        let search_start = (prev_dir + 5) % 8;
        for i in 0..8 {
            let dir = (search_start + i) % 8;
            let (dx, dy) = DIRECTIONS[dir];
            let nx = i64::from(current.0) + dx;
            let ny = i64::from(current.1) + dy;
            if nx < 0 || ny < 0 {
                continue;
            }
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let (nx, ny) = (nx as u32, ny as u32);
            if nx >= width || ny >= height || !edge[idx(nx, ny)] {
                continue;
            }
            if (nx, ny) == start {
                // Closed the loop.
                return Some(Polygon::new(points));
            }
            if visited[idx(nx, ny)] {
                continue;
            }
            visited[idx(nx, ny)] = true;
            points.push(Point::new(f64::from(nx), f64::from(ny)));
            current = (nx, ny);
            prev_dir = dir;
            advanced = true;
            break;
        }
        if !advanced {
            break;
        }
    }
    Some(Polygon::new(points))
}
