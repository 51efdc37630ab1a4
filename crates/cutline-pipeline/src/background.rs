//! Background removal: strip a border-connected near-white region.
//!
//! A multi-source BFS flood fill runs from every border pixel that
//! qualifies as background-like; only pixels reached by the flood are
//! removed, so background-coloured regions fully enclosed by artwork
//! survive. Two cleanup passes then eliminate anti-aliasing fringe so
//! the result has a hard alpha edge (every pixel fully opaque or fully
//! transparent).
//!
//! Failure policy: if what survives the flood spans less than 5% of
//! either axis (or nothing survives at all), the detection is treated
//! as failed and the input is returned unmodified. That is a silent
//! fallback, not an error. A small sticker on a large background is
//! fine; an image that is essentially all background is not.

use std::collections::VecDeque;

use image::{Rgba, RgbaImage};

use crate::raster::{ALPHA_MIDPOINT, FRINGE_BRIGHTNESS, border_pixels, brightness, min_channel, neighbors4, neighbors8};

/// Minimum fraction of each image axis the surviving content must span
/// for the removal to be trusted. Mirrors the crop sanity floor.
const MIN_CONTENT_FRACTION: f64 = 0.05;

/// Remove a border-connected near-white background, hard-edging the
/// result.
///
/// `whiteness_threshold` is on a 0-100 scale and is mapped to a 0-255
/// channel threshold. A pixel is background-like (traversable by the
/// flood) when its darkest colour channel is at least the mapped
/// threshold, or when it is already mostly transparent.
///
/// Returns the processed image and whether removal was actually applied
/// (`false` when the surviving content would span less than 5% of
/// either axis and the input was left untouched).
#[must_use]
pub fn remove_background(image: &RgbaImage, whiteness_threshold: u8) -> (RgbaImage, bool) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return (image.clone(), false);
    }

    let channel_threshold = map_whiteness(whiteness_threshold);
    let is_background_like = |p: Rgba<u8>| min_channel(p) >= channel_threshold || p.0[3] < ALPHA_MIDPOINT;

    let total = u64::from(width) * u64::from(height);
    let idx = |x: u32, y: u32| (y * width + x) as usize;

    // Multi-source BFS seeded from qualifying border pixels.
    let mut removed = vec![false; total as usize];
    let mut queue = VecDeque::new();
    for (x, y) in border_pixels(width, height) {
        if is_background_like(*image.get_pixel(x, y)) && !removed[idx(x, y)] {
            removed[idx(x, y)] = true;
            queue.push_back((x, y));
        }
    }
    while let Some((x, y)) = queue.pop_front() {
        for (nx, ny) in neighbors4(x, y, width, height) {
            if !removed[idx(nx, ny)] && is_background_like(*image.get_pixel(nx, ny)) {
                removed[idx(nx, ny)] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    if !survivors_span_enough(&removed, width, height) {
        // Removal would leave (next to) nothing: failed detection.
        return (image.clone(), false);
    }

    let mut out = image.clone();
    for y in 0..height {
        for x in 0..width {
            if removed[idx(x, y)] {
                let p = out.get_pixel_mut(x, y);
                p.0[3] = 0;
            }
        }
    }

    // Cleanup (a): snap surviving pixels that touch removed background.
    for y in 0..height {
        for x in 0..width {
            if removed[idx(x, y)] {
                continue;
            }
            let touches_removed = neighbors8(x, y, width, height).any(|(nx, ny)| removed[idx(nx, ny)]);
            if touches_removed {
                snap_fringe(out.get_pixel_mut(x, y));
            }
        }
    }

    // Cleanup (b): any remaining semi-transparent pixel adjacent to a
    // fully transparent one gets snapped too.
    let snapshot = out.clone();
    for y in 0..height {
        for x in 0..width {
            let alpha = snapshot.get_pixel(x, y).0[3];
            if alpha == 0 || alpha == 255 {
                continue;
            }
            let touches_clear =
                neighbors8(x, y, width, height).any(|(nx, ny)| snapshot.get_pixel(nx, ny).0[3] == 0);
            if touches_clear {
                snap_fringe(out.get_pixel_mut(x, y));
            }
        }
    }

    (out, true)
}

/// Whether the pixels the flood did not reach span at least the minimum
/// content fraction on both axes.
fn survivors_span_enough(removed: &[bool], width: u32, height: u32) -> bool {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    for y in 0..height {
        for x in 0..width {
            if !removed[(y * width + x) as usize] {
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
    }
    if min_x == u32::MAX {
        return false;
    }
    let span_x = f64::from(max_x - min_x + 1);
    let span_y = f64::from(max_y - min_y + 1);
    span_x >= f64::from(width) * MIN_CONTENT_FRACTION
        && span_y >= f64::from(height) * MIN_CONTENT_FRACTION
}

/// Map the 0-100 whiteness scale onto a 0-255 channel threshold.
fn map_whiteness(whiteness: u8) -> u8 {
    let clamped = u16::from(whiteness.min(100));
    #[allow(clippy::cast_possible_truncation)]
    let mapped = (clamped * 255 / 100) as u8;
    mapped
}

/// Snap a fringe pixel: bright residue becomes fully transparent,
/// everything else gets its alpha pushed to 0 or 255 about the midpoint.
fn snap_fringe(pixel: &mut Rgba<u8>) {
    if brightness(*pixel) > FRINGE_BRIGHTNESS {
        pixel.0[3] = 0;
    } else {
        pixel.0[3] = if pixel.0[3] >= ALPHA_MIDPOINT { 255 } else { 0 };
    }
}
