//! Pixel-level helpers shared by the raster stages.
//!
//! Everything here operates on `image::RgbaImage` buffers. The
//! silhouette-defining alpha test and the brightness heuristics used by
//! background removal live in one place so every stage agrees on what
//! "solid" and "near-white" mean.

use image::{Rgba, RgbaImage};

/// Alpha midpoint used when snapping semi-transparent pixels to fully
/// opaque or fully transparent.
pub const ALPHA_MIDPOINT: u8 = 128;

/// Brightness above which a fringe pixel next to removed background is
/// treated as background residue and made fully transparent.
pub const FRINGE_BRIGHTNESS: u8 = 220;

/// Whether a pixel counts as part of the silhouette.
#[must_use]
pub fn is_solid(pixel: Rgba<u8>, alpha_threshold: u8) -> bool {
    pixel.0[3] > alpha_threshold
}

/// Perceived brightness as the plain channel mean.
///
/// Good enough for the fringe heuristics; no luma weighting needed.
#[must_use]
pub fn brightness(pixel: Rgba<u8>) -> u8 {
    let sum = u16::from(pixel.0[0]) + u16::from(pixel.0[1]) + u16::from(pixel.0[2]);
    #[allow(clippy::cast_possible_truncation)]
    let mean = (sum / 3) as u8;
    mean
}

/// Minimum of the three colour channels.
///
/// A pixel is "near-white" when even its darkest channel is bright, so
/// the whiteness test uses the minimum rather than the mean.
#[must_use]
pub fn min_channel(pixel: Rgba<u8>) -> u8 {
    pixel.0[0].min(pixel.0[1]).min(pixel.0[2])
}

/// The 4-connected neighbours of `(x, y)` that lie inside the image.
pub fn neighbors4(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    let candidates = [
        (i64::from(x) - 1, i64::from(y)),
        (i64::from(x) + 1, i64::from(y)),
        (i64::from(x), i64::from(y) - 1),
        (i64::from(x), i64::from(y) + 1),
    ];
    candidates.into_iter().filter_map(move |(nx, ny)| {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        if nx >= 0 && ny >= 0 && (nx as u32) < width && (ny as u32) < height {
            Some((nx as u32, ny as u32))
        } else {
            None
        }
    })
}

/// The 8-connected neighbours of `(x, y)` that lie inside the image.
pub fn neighbors8(x: u32, y: u32, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    let x = i64::from(x);
    let y = i64::from(y);
    let candidates = [
        (x - 1, y - 1),
        (x, y - 1),
        (x + 1, y - 1),
        (x - 1, y),
        (x + 1, y),
        (x - 1, y + 1),
        (x, y + 1),
        (x + 1, y + 1),
    ];
    candidates.into_iter().filter_map(move |(nx, ny)| {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        if nx >= 0 && ny >= 0 && (nx as u32) < width && (ny as u32) < height {
            Some((nx as u32, ny as u32))
        } else {
            None
        }
    })
}

/// All pixel coordinates on the outermost one-pixel border of the image.
pub fn border_pixels(width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    let top = (0..width).map(move |x| (x, 0));
    let bottom = (0..width).filter_map(move |x| (height > 1).then_some((x, height - 1)));
    let left = (1..height.saturating_sub(1)).map(move |y| (0, y));
    let right =
        (1..height.saturating_sub(1)).filter_map(move |y| (width > 1).then_some((width - 1, y)));
    top.chain(bottom).chain(left).chain(right)
}

/// Count of pixels whose alpha exceeds the threshold.
#[must_use]
pub fn solid_pixel_count(image: &RgbaImage, alpha_threshold: u8) -> u64 {
    image
        .pixels()
        .filter(|p| is_solid(**p, alpha_threshold))
        .count() as u64
}
