//! Binary silhouette mask construction.
//!
//! Alpha channel → 0/255 `GrayImage`, with disk dilation and
//! border-seeded hole filling. Dilation pads the mask by the radius so
//! the grown silhouette never clips at the edge; hole filling marks the
//! exterior transparency from the borders and fills everything it did
//! not reach. Dilate-then-fill is also what produces auto-bridging:
//! fragments closer than the dilation diameter merge into one outline.

use std::collections::VecDeque;

use image::{GrayImage, Luma, RgbaImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;

use crate::raster::{border_pixels, is_solid, neighbors4};

const ON: Luma<u8> = Luma([255]);
const OFF: Luma<u8> = Luma([0]);

/// Build a 0/255 mask from the alpha channel.
#[must_use]
pub fn mask_from_alpha(image: &RgbaImage, alpha_threshold: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if is_solid(*image.get_pixel(x, y), alpha_threshold) {
            ON
        } else {
            OFF
        }
    })
}

/// Dilate the mask by a true disk of `radius` pixels.
///
/// The output is padded to `(width + 2r) × (height + 2r)` so growth at
/// the edges is never clipped; callers account for the `r`-pixel
/// coordinate shift. The L2 norm gives an isotropic euclidean disk, so
/// convex corners round evenly instead of squaring off.
#[must_use]
pub fn dilate_disk(mask: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    let (width, height) = mask.dimensions();
    let mut padded = GrayImage::from_pixel(width + 2 * radius, height + 2 * radius, OFF);
    image::imageops::replace(&mut padded, mask, i64::from(radius), i64::from(radius));
    // imageproc's structuring-element radius is u8; bridging radii are
    // a few pixels in practice, so larger requests clamp to the limit.
    dilate(&padded, Norm::L2, u8::try_from(radius).unwrap_or(u8::MAX))
}

/// Fill fully enclosed transparent regions.
///
/// Flood fills from every transparent border pixel through 4-connected
/// transparency; transparent pixels the flood never reaches are
/// interior holes and become solid.
#[must_use]
pub fn fill_holes(mask: &GrayImage) -> GrayImage {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return mask.clone();
    }
    let idx = |x: u32, y: u32| (y * width + x) as usize;

    let mut exterior = vec![false; (width * height) as usize];
    let mut queue = VecDeque::new();
    for (x, y) in border_pixels(width, height) {
        if mask.get_pixel(x, y).0[0] == 0 && !exterior[idx(x, y)] {
            exterior[idx(x, y)] = true;
            queue.push_back((x, y));
        }
    }
    while let Some((x, y)) = queue.pop_front() {
        for (nx, ny) in neighbors4(x, y, width, height) {
            if mask.get_pixel(nx, ny).0[0] == 0 && !exterior[idx(nx, ny)] {
                exterior[idx(nx, ny)] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        if mask.get_pixel(x, y).0[0] != 0 || !exterior[idx(x, y)] {
            ON
        } else {
            OFF
        }
    })
}

/// Count of solid pixels in the mask.
#[must_use]
pub fn solid_count(mask: &GrayImage) -> u64 {
    mask.pixels().filter(|p| p.0[0] != 0).count() as u64
}
