//! cutline-pipeline: Pure contour generation pipeline (sans-IO).
//!
//! Converts raster artwork into an offset cut contour through:
//! decode -> downsample -> background removal -> content crop ->
//! shape detection -> silhouette mask (bridge dilation + hole fill) ->
//! boundary tracing -> simplification/cleanup -> polygon offsetting.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! images and returns structured data. File handling, caching, and
//! rendering live in the sibling crates.

pub mod background;
pub mod clean;
pub mod crop;
pub mod downsample;
pub mod mask;
pub mod offset;
pub mod raster;
pub mod shape;
pub mod simplify;
pub mod trace;
pub mod types;

pub use downsample::DownsampleFilter;
pub use shape::{ShapeDetection, ShapeKind};
pub use types::{
    BoundingBox, ContourConfig, ContourData, ContourError, CornerStyle, Dimensions, GrayImage,
    Point, Polygon, RgbaImage, effective_dpi,
};

/// What each stage actually did for one run; feeds logging and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineReport {
    /// Source raster dimensions.
    pub source: Dimensions,
    /// Working dimensions after the resolution cap.
    pub working: Dimensions,
    /// Whether the input was downsampled.
    pub downsampled: bool,
    /// Whether background removal ran and actually stripped pixels.
    pub background_removed: bool,
    /// Whether the crop found trustworthy content bounds.
    pub content_detected: bool,
    /// Shape classification of the silhouette.
    pub shape: ShapeKind,
    /// Confidence of the shape classification.
    pub shape_confidence: f64,
    /// Whether the closed-form shape offset replaced the general trace.
    pub used_shape_fast_path: bool,
    /// Number of contour rings produced.
    pub contour_count: usize,
    /// Vertex totals per geometry stage.
    pub counts: StageCounts,
}

/// Vertex totals across all rings for each geometry stage.
///
/// Tracing counts are zero when the closed-form shape fast path skips
/// the tracer entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageCounts {
    /// Raw vertices emitted by the boundary tracer.
    pub traced_points: usize,
    /// Vertices surviving simplification and loop removal.
    pub simplified_points: usize,
    /// Vertices in the final offset rings.
    pub offset_points: usize,
}

/// Generate a cut contour from raw image bytes (PNG, JPEG, BMP, WebP).
///
/// # Errors
///
/// Returns [`ContourError::EmptyInput`] if `image_bytes` is empty,
/// [`ContourError::ImageDecode`] if the format is unrecognized, plus
/// everything [`generate_contour`] can return.
pub fn generate_contour_from_bytes(
    image_bytes: &[u8],
    config: &ContourConfig,
) -> Result<ContourData, ContourError> {
    if image_bytes.is_empty() {
        return Err(ContourError::EmptyInput);
    }
    let image = image::load_from_memory(image_bytes)?.to_rgba8();
    generate_contour(&image, config)
}

/// Generate a cut contour from a decoded raster.
///
/// # Errors
///
/// Returns [`ContourError::InvalidConfig`] for nonsensical settings and
/// [`ContourError::NoSilhouette`] when no pixel clears the alpha
/// threshold.
pub fn generate_contour(image: &RgbaImage, config: &ContourConfig) -> Result<ContourData, ContourError> {
    generate_contour_with_report(image, config).map(|(data, _)| data)
}

/// [`generate_contour`] plus a per-stage [`PipelineReport`].
///
/// # Errors
///
/// Same as [`generate_contour`].
#[allow(clippy::too_many_lines)]
pub fn generate_contour_with_report(
    image: &RgbaImage,
    config: &ContourConfig,
) -> Result<(ContourData, PipelineReport), ContourError> {
    validate_config(config)?;
    let source = Dimensions {
        width: image.width(),
        height: image.height(),
    };
    if source.width == 0 || source.height == 0 {
        return Err(ContourError::EmptyInput);
    }

    // 1. Cap the working resolution; remember the scale back to source.
    let (working_image, scale) =
        downsample::downsample(image, config.max_dimension, config.downsample_filter);
    let working = Dimensions {
        width: working_image.width(),
        height: working_image.height(),
    };

    // 2. Optional background removal.
    let (working_image, background_removed) = if config.remove_background {
        background::remove_background(&working_image, config.whiteness_threshold)
    } else {
        (working_image, false)
    };

    // 3. Crop to content.
    let crop = crop::crop_to_content(&working_image, config.alpha_threshold);

    // 4. Shape detection on the cropped raster.
    let detection = shape::detect_shape(&crop.image, config.alpha_threshold);

    // All offsets below are in working pixels; inch values convert via
    // the working-resolution DPI so the uniform rescale to source space
    // at the end reproduces the source-resolution offset exactly.
    let dpi_working = effective_dpi(working.width, config.target_width_inches);
    let offset_px = config.offset_inches * dpi_working;

    // 5. Closed-form fast path for confidently regular shapes.
    let (cropped_space_paths, counts, used_fast_path) =
        match offset::offset_shape(&detection, offset_px, config.corner_style) {
            Some(ring) => {
                let counts = StageCounts {
                    offset_points: ring.len(),
                    ..StageCounts::default()
                };
                (vec![ring], counts, true)
            }
            None => {
                let (paths, counts) = trace_and_offset(&crop.image, config, offset_px)?;
                (paths, counts, false)
            }
        };
    if cropped_space_paths.is_empty() {
        return Err(ContourError::NoSilhouette);
    }

    // 6. Map back: crop origin, then working -> source scale.
    let preview_path: Vec<Polygon> = cropped_space_paths
        .iter()
        .map(|p| p.translated(f64::from(crop.bounds.min_x), f64::from(crop.bounds.min_y)))
        .collect();
    let path: Vec<Polygon> = preview_path.iter().map(|p| p.scaled(scale.to_source)).collect();

    let bb = joint_bounding_box(&path).ok_or(ContourError::NoSilhouette)?;
    let dpi_source = effective_dpi(source.width, config.target_width_inches);

    let report = PipelineReport {
        source,
        working,
        downsampled: scale != downsample::Scale::IDENTITY,
        background_removed,
        content_detected: crop.content_detected,
        shape: detection.kind,
        shape_confidence: detection.confidence,
        used_shape_fast_path: used_fast_path,
        contour_count: path.len(),
        counts,
    };
    let data = ContourData {
        width_inches: bb.width() / dpi_source,
        height_inches: bb.height() / dpi_source,
        image_offset_x: -bb.min_x,
        image_offset_y: -bb.min_y,
        effective_dpi: dpi_source,
        bleed_inches: config.bleed_inches,
        background_color: crop.background_color,
        path,
        preview_path,
    };
    Ok((data, report))
}

/// The general pipeline: mask, bridge-dilate, fill, trace, simplify,
/// clean, offset. Output is in the cropped image's pixel space.
fn trace_and_offset(
    image: &RgbaImage,
    config: &ContourConfig,
    offset_px: f64,
) -> Result<(Vec<Polygon>, StageCounts), ContourError> {
    let silhouette = mask::mask_from_alpha(image, config.alpha_threshold);
    if mask::solid_count(&silhouette) == 0 {
        return Err(ContourError::NoSilhouette);
    }

    // Bridge radius is half the merge distance: two fragments each grow
    // halfway across the gap.
    let bridge_radius = config.merge_distance_px / 2;
    let bridged = mask::dilate_disk(&silhouette, bridge_radius);
    let filled = if config.fill_holes { mask::fill_holes(&bridged) } else { bridged };

    let pad = f64::from(bridge_radius);
    let traced = trace::trace_boundaries(&filled);

    let mut counts = StageCounts::default();
    let mut out = Vec::with_capacity(traced.len());
    for ring in &traced {
        counts.traced_points += ring.len();
        let simplified = simplify::simplify(ring, config.simplify_tolerance);
        let cleaned = clean::clean_polygon(&simplified);
        if cleaned.len() < 3 {
            continue;
        }
        counts.simplified_points += cleaned.len();
        // Undo the dilation padding before offsetting.
        let unpadded = cleaned.translated(-pad, -pad);
        let ring = offset::offset_polygon(&unpadded, offset_px, config.corner_style);
        counts.offset_points += ring.len();
        out.push(ring);
    }
    // Largest ring first; export order then matches cut priority.
    out.sort_by(|a, b| {
        b.signed_area()
            .abs()
            .partial_cmp(&a.signed_area().abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok((out, counts))
}

fn joint_bounding_box(paths: &[Polygon]) -> Option<BoundingBox> {
    let mut boxes = paths.iter().filter_map(Polygon::bounding_box);
    let first = boxes.next()?;
    Some(boxes.fold(first, |acc, bb| BoundingBox {
        min_x: acc.min_x.min(bb.min_x),
        min_y: acc.min_y.min(bb.min_y),
        max_x: acc.max_x.max(bb.max_x),
        max_y: acc.max_y.max(bb.max_y),
    }))
}

fn validate_config(config: &ContourConfig) -> Result<(), ContourError> {
    if !(config.target_width_inches.is_finite() && config.target_width_inches > 0.0) {
        return Err(ContourError::InvalidConfig(format!(
            "target width must be a positive number of inches, got {}",
            config.target_width_inches
        )));
    }
    if !config.offset_inches.is_finite() {
        return Err(ContourError::InvalidConfig(format!(
            "offset must be finite, got {}",
            config.offset_inches
        )));
    }
    if !(config.simplify_tolerance.is_finite() && config.simplify_tolerance >= 0.0) {
        return Err(ContourError::InvalidConfig(format!(
            "simplify tolerance must be non-negative, got {}",
            config.simplify_tolerance
        )));
    }
    if config.whiteness_threshold > 100 {
        return Err(ContourError::InvalidConfig(format!(
            "whiteness threshold is a 0-100 scale, got {}",
            config.whiteness_threshold
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::Rgba;

    const OPAQUE: Rgba<u8> = Rgba([200, 30, 30, 255]);
    const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

    fn centered_square(size: u32, extent: u32) -> RgbaImage {
        let start = (size - extent) / 2;
        RgbaImage::from_fn(size, size, |x, y| {
            if x >= start && x < start + extent && y >= start && y < start + extent {
                OPAQUE
            } else {
                CLEAR
            }
        })
    }

    /// Config that forces the general trace path (no fast-path noise in
    /// assertions): irregular enough inputs are used alongside it.
    fn base_config() -> ContourConfig {
        ContourConfig {
            target_width_inches: 3.0,
            ..ContourConfig::default()
        }
    }

    #[test]
    fn empty_bytes_are_rejected() {
        let result = generate_contour_from_bytes(&[], &base_config());
        assert!(matches!(result, Err(ContourError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_are_rejected() {
        let result = generate_contour_from_bytes(&[0xFF, 0x00], &base_config());
        assert!(matches!(result, Err(ContourError::ImageDecode(_))));
    }

    #[test]
    fn fully_transparent_image_has_no_silhouette() {
        let img = RgbaImage::from_pixel(40, 40, CLEAR);
        let result = generate_contour(&img, &base_config());
        assert!(matches!(result, Err(ContourError::NoSilhouette)));
    }

    #[test]
    fn invalid_target_width_is_rejected() {
        let config = ContourConfig {
            target_width_inches: 0.0,
            ..base_config()
        };
        let img = centered_square(50, 20);
        assert!(matches!(
            generate_contour(&img, &config),
            Err(ContourError::InvalidConfig(_))
        ));
    }

    #[test]
    fn square_image_produces_offset_contour() {
        let img = centered_square(100, 60);
        let (data, report) = generate_contour_with_report(&img, &base_config()).unwrap();
        assert_eq!(report.contour_count, 1);
        assert!(!data.path.is_empty());

        // 100 px at 3 in -> 33.33 dpi; 0.125 in offset -> ~4.17 px.
        let dpi = 100.0 / 3.0;
        let expected = (60.0 + 2.0 * 0.125 * dpi) / dpi;
        assert!(
            (data.width_inches - expected).abs() < 0.15,
            "width {} vs expected {expected}",
            data.width_inches
        );
        assert!((data.effective_dpi - dpi).abs() < 1e-9);
        // Contour bounding box starts at the crop origin minus the
        // offset; the recorded offset points back to the raster origin.
        let expected_min_x = 20.0 - 0.125 * dpi;
        assert!(
            (data.image_offset_x + expected_min_x).abs() < 0.5,
            "image_offset_x {}",
            data.image_offset_x
        );
    }

    #[test]
    fn square_silhouette_takes_shape_fast_path() {
        let img = centered_square(100, 60);
        let (_, report) = generate_contour_with_report(&img, &base_config()).unwrap();
        assert_eq!(report.shape, ShapeKind::Square);
        assert!(report.used_shape_fast_path);
        // Closed-form geometry skips the tracer entirely.
        assert_eq!(report.counts.traced_points, 0);
        assert!(report.counts.offset_points > 0);
    }

    #[test]
    fn stage_counts_shrink_through_simplification() {
        // A blobby two-rectangle union defeats the shape detector, so
        // the general trace path runs and fills in all three counters.
        let img = RgbaImage::from_fn(120, 100, |x, y| {
            let body = (20..100).contains(&x) && (30..80).contains(&y);
            let tab = (50..70).contains(&x) && (10..30).contains(&y);
            if body || tab { Rgba([0, 0, 0, 255]) } else { Rgba([0, 0, 0, 0]) }
        });
        let (_, report) = generate_contour_with_report(&img, &base_config()).unwrap();
        assert!(!report.used_shape_fast_path);
        assert!(report.counts.traced_points > report.counts.simplified_points);
        assert!(report.counts.simplified_points >= 3);
        assert!(report.counts.offset_points >= report.counts.simplified_points);
    }

    #[test]
    fn dilated_square_mask_bounding_box() {
        // 100x100 fully opaque mask, dilated by 10, traced and
        // simplified: bounding box grows to about 120x120 centred on
        // the original, i.e. [-10,-10]..[110,110] after unpadding.
        let mask = GrayImage::from_pixel(100, 100, image::Luma([255]));
        let dilated = mask::dilate_disk(&mask, 10);
        let polygons = trace::trace_boundaries(&dilated);
        assert_eq!(polygons.len(), 1);
        let simplified = simplify::simplify(&polygons[0], 1.0).translated(-10.0, -10.0);
        let bb = simplified.bounding_box().unwrap();
        assert!((bb.min_x + 10.0).abs() <= 2.0, "min_x {}", bb.min_x);
        assert!((bb.min_y + 10.0).abs() <= 2.0, "min_y {}", bb.min_y);
        assert!((bb.max_x - 110.0).abs() <= 2.0, "max_x {}", bb.max_x);
        assert!((bb.max_y - 110.0).abs() <= 2.0, "max_y {}", bb.max_y);
    }

    #[test]
    fn nearby_fragments_bridge_into_one_contour() {
        // Two 20x20 squares 4 px apart; merge distance 6 -> radius 3
        // bridges the gap into a single boundary.
        let img = RgbaImage::from_fn(60, 40, |x, y| {
            let left = (8..28).contains(&x) && (10..30).contains(&y);
            let right = (32..52).contains(&x) && (10..30).contains(&y);
            if left || right { OPAQUE } else { CLEAR }
        });
        let config = ContourConfig {
            merge_distance_px: 6,
            ..base_config()
        };
        let (_, report) = generate_contour_with_report(&img, &config).unwrap();
        assert_eq!(report.contour_count, 1);

        // Without bridging the squares stay separate.
        let config = ContourConfig {
            merge_distance_px: 0,
            ..base_config()
        };
        let (_, report) = generate_contour_with_report(&img, &config).unwrap();
        assert_eq!(report.contour_count, 2);
    }

    #[test]
    fn oversized_input_is_downsampled_and_rescaled() {
        let img = centered_square(300, 200);
        let config = ContourConfig {
            max_dimension: 150,
            ..base_config()
        };
        let (data, report) = generate_contour_with_report(&img, &config).unwrap();
        assert!(report.downsampled);
        assert_eq!(report.working, Dimensions { width: 150, height: 150 });
        // Physical size is resolution independent.
        let (full_data, _) = generate_contour_with_report(&img, &base_config()).unwrap();
        assert!(
            (data.width_inches - full_data.width_inches).abs() < 0.1,
            "{} vs {}",
            data.width_inches,
            full_data.width_inches
        );
    }

    #[test]
    fn background_removal_feeds_the_silhouette() {
        // White canvas with a red square: without removal there is no
        // transparency at all, so the whole canvas is the silhouette.
        let img = RgbaImage::from_fn(50, 50, |x, y| {
            if (20..30).contains(&x) && (20..30).contains(&y) {
                OPAQUE
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let with_removal = ContourConfig {
            remove_background: true,
            ..base_config()
        };
        let (data, report) = generate_contour_with_report(&img, &with_removal).unwrap();
        assert!(report.background_removed);
        // Contour wraps the 10 px square plus offset, far below 50 px.
        let dpi = 50.0 / 3.0;
        assert!(data.width_inches < (30.0) / dpi);

        let (data, _) = generate_contour_with_report(&img, &base_config()).unwrap();
        // Whole canvas silhouette: about the full 3 inches plus offset.
        assert!(data.width_inches > 3.0);
    }

    #[test]
    fn preview_and_path_agree_up_to_scale() {
        let img = centered_square(200, 120);
        let config = ContourConfig {
            max_dimension: 100,
            ..base_config()
        };
        let (data, _) = generate_contour_with_report(&img, &config).unwrap();
        let preview_bb = joint_bounding_box(&data.preview_path).unwrap();
        let path_bb = joint_bounding_box(&data.path).unwrap();
        assert!((path_bb.width() - preview_bb.width() * 2.0).abs() < 1e-9);
    }
}
