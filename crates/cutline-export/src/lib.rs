//! cutline-export: Pure serializers and preview rendering (sans-IO)
//!
//! Converts generated contours into output artifacts: SVG documents
//! for vector export and tiny-skia raster previews for on-screen
//! display. File writing lives with the callers.

pub mod path;
pub mod preview;
pub mod svg;

pub use path::{PathCommand, polygon_commands, smoothed_commands};
pub use preview::{ExportError, PreviewStyle, render_preview};
pub use svg::{SvgMetadata, build_path_data, to_svg};
