//! cutline: CLI for generating offset cut contours from raster images.
//!
//! Decodes an image, runs the contour pipeline with configurable
//! parameters, and writes an SVG cut file plus an optional raster
//! preview PNG.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin cutline -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::info;

use cutline_export::{PreviewStyle, SvgMetadata, render_preview, to_svg};
use cutline_pipeline::{ContourConfig, CornerStyle, generate_contour_with_report};

/// Generate a print/cut-ready offset contour from a raster image.
///
/// Reads PNG, JPEG, BMP, or WebP input; writes an SVG sized in physical
/// inches and, optionally, a raster preview of the cut line over the
/// artwork.
#[derive(Parser)]
#[command(name = "cutline", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// SVG output path. Defaults to the input path with an .svg extension.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Also write a raster preview PNG to this path.
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Intended physical width of the full raster, in inches.
    #[arg(long, default_value_t = ContourConfig::DEFAULT_TARGET_WIDTH_INCHES)]
    width: f64,

    /// Outward cut-line offset from the silhouette, in inches.
    #[arg(long, default_value_t = ContourConfig::DEFAULT_OFFSET_INCHES)]
    offset: f64,

    /// Extra bleed recorded in the output, in inches.
    #[arg(long, default_value_t = 0.0)]
    bleed: f64,

    /// Corner treatment for convex offset corners.
    #[arg(long, value_enum, default_value_t = Corner::Rounded)]
    corners: Corner,

    /// Maximum bridging gap between silhouette fragments, in pixels.
    /// Zero disables bridging.
    #[arg(long, default_value_t = ContourConfig::DEFAULT_MERGE_DISTANCE_PX)]
    merge_distance: u32,

    /// Cut around enclosed transparent holes instead of filling them.
    #[arg(long)]
    keep_holes: bool,

    /// Strip a border-connected near-white background before tracing.
    #[arg(long)]
    remove_background: bool,

    /// Whiteness threshold (0-100) for background removal.
    #[arg(long, default_value_t = ContourConfig::DEFAULT_WHITENESS_THRESHOLD, value_parser = clap::builder::RangedU64ValueParser::<u8>::new().range(..=100))]
    whiteness: u8,

    /// Alpha value (0-255) above which a pixel counts as silhouette.
    #[arg(long, default_value_t = ContourConfig::DEFAULT_ALPHA_THRESHOLD)]
    alpha_threshold: u8,

    /// RDP simplification tolerance in pixels.
    #[arg(long, default_value_t = ContourConfig::DEFAULT_SIMPLIFY_TOLERANCE)]
    tolerance: f64,

    /// Longest-edge cap in pixels; larger inputs are downsampled.
    #[arg(long, default_value_t = ContourConfig::DEFAULT_MAX_DIMENSION, value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..))]
    max_dimension: u32,

    /// Full contour config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// The JSON must be a valid `ContourConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,
}

/// Corner treatment selection.
#[derive(Clone, Copy, ValueEnum)]
enum Corner {
    /// Circular arcs centred on the original vertex.
    Rounded,
    /// Mitred corners, beveled past the miter limit.
    Sharp,
}

/// Build a [`ContourConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<ContourConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(ContourConfig {
        alpha_threshold: cli.alpha_threshold,
        offset_inches: cli.offset,
        bleed_inches: cli.bleed,
        target_width_inches: cli.width,
        corner_style: match cli.corners {
            Corner::Rounded => CornerStyle::Rounded,
            Corner::Sharp => CornerStyle::Sharp,
        },
        merge_distance_px: cli.merge_distance,
        fill_holes: !cli.keep_holes,
        remove_background: cli.remove_background,
        whiteness_threshold: cli.whiteness,
        simplify_tolerance: cli.tolerance,
        max_dimension: cli.max_dimension,
        ..ContourConfig::default()
    })
}

fn svg_output_path(cli: &Cli) -> PathBuf {
    cli.svg
        .clone()
        .unwrap_or_else(|| cli.image_path.with_extension("svg"))
}

/// File stem of the input, for the SVG `<title>`.
fn title_of(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = config_from_cli(cli)?;

    let source = image::open(&cli.image_path)
        .map_err(|e| format!("Error reading {}: {e}", cli.image_path.display()))?
        .to_rgba8();
    info!(
        path = %cli.image_path.display(),
        width = source.width(),
        height = source.height(),
        "image decoded"
    );

    let (data, report) = generate_contour_with_report(&source, &config)
        .map_err(|e| format!("Contour generation failed: {e}"))?;
    info!(
        downsampled = report.downsampled,
        background_removed = report.background_removed,
        content_detected = report.content_detected,
        shape = ?report.shape,
        confidence = report.shape_confidence,
        fast_path = report.used_shape_fast_path,
        contours = report.contour_count,
        traced_points = report.counts.traced_points,
        simplified_points = report.counts.simplified_points,
        offset_points = report.counts.offset_points,
        "contour generated"
    );
    info!(
        width_in = data.width_inches,
        height_in = data.height_inches,
        dpi = data.effective_dpi,
        "cut line sized"
    );

    let config_json =
        serde_json::to_string(&config).map_err(|e| format!("Error serializing config: {e}"))?;
    let metadata = SvgMetadata {
        title: title_of(&cli.image_path),
        description: Some("generated by cutline"),
        config_json: Some(&config_json),
    };
    let svg_path = svg_output_path(cli);
    std::fs::write(&svg_path, to_svg(&data, &metadata))
        .map_err(|e| format!("Error writing {}: {e}", svg_path.display()))?;
    info!(path = %svg_path.display(), "SVG written");

    if let Some(ref preview_path) = cli.preview {
        // Preview paths are in working resolution; match the artwork.
        let (working, _) = cutline_pipeline::downsample::downsample(
            &source,
            config.max_dimension,
            config.downsample_filter,
        );
        let preview = render_preview(&data, &working, &PreviewStyle::default())
            .map_err(|e| format!("Preview rendering failed: {e}"))?;
        preview
            .save(preview_path)
            .map_err(|e| format!("Error writing {}: {e}", preview_path.display()))?;
        info!(path = %preview_path.display(), "preview written");
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}
