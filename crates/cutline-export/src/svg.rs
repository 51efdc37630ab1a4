//! SVG serialization of cut contours.
//!
//! Converts a [`ContourData`] into an SVG string using the [`svg`]
//! crate for document construction, XML escaping, and path data
//! formatting. Each contour ring becomes a closed `<path>`; the
//! document is sized in physical inches with a pixel-space `viewBox`
//! so cutters and print software agree on scale.
//!
//! Optional [`SvgMetadata`] embeds `<title>` and `<desc>` elements plus
//! a namespaced `<metadata>` block carrying the serialized
//! configuration for reproducibility.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Element, Path, Title};
use svg::node::{Node, Text, Value};

use cutline_pipeline::{ContourData, Polygon};

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped automatically
/// by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the source image filename (without extension).
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    ///
    /// Typically the generation parameters in human-readable form.
    pub description: Option<&'a str>,

    /// Serialized [`ContourConfig`](cutline_pipeline::ContourConfig)
    /// JSON, emitted inside a `<metadata>` element wrapped in a
    /// namespaced `<cutline:config>` element, so exported files carry
    /// machine-parseable settings.
    pub config_json: Option<&'a str>,
}

/// Build an SVG path `d` attribute string from a closed ring.
///
/// Uses `M` for the first point, `L` for the rest, and a closing `z`.
/// Returns an empty string for rings with fewer than 2 points.
#[must_use]
pub fn build_path_data(polygon: &Polygon) -> String {
    build_path_data_translated(polygon, 0.0, 0.0)
}

/// Like [`build_path_data`] but translates every coordinate first.
/// Used by [`to_svg`] to shift contours into the viewBox origin.
fn build_path_data_translated(polygon: &Polygon, dx: f64, dy: f64) -> String {
    let points = polygon.points();
    if points.len() < 2 {
        return String::new();
    }

    let first = &points[0];
    let mut data = Data::new().move_to((first.x + dx, first.y + dy));
    for p in &points[1..] {
        data = data.line_to((p.x + dx, p.y + dy));
    }
    data = data.close();
    String::from(Value::from(data))
}

/// Serialize a contour into an SVG document string.
///
/// The document `width`/`height` are the contour's physical size in
/// inches; the `viewBox` spans the contour bounding box in source
/// pixels, with every ring translated by the recorded image offset so
/// the box starts at the origin. Each ring with 2 or more points
/// becomes one closed `<path>`.
#[must_use]
pub fn to_svg(data: &ContourData, metadata: &SvgMetadata<'_>) -> String {
    let vb_width = data.width_inches * data.effective_dpi;
    let vb_height = data.height_inches * data.effective_dpi;

    let mut doc = Document::new()
        .set("width", format!("{:.4}in", data.width_inches))
        .set("height", format!("{:.4}in", data.height_inches))
        .set("viewBox", format!("0 0 {vb_width:.2} {vb_height:.2}"));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }
    if let Some(config_json) = metadata.config_json {
        let mut config_el = Element::new("cutline:config");
        config_el.assign("xmlns:cutline", "https://cutline.dev/ns/1");
        config_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(config_el);
        doc = doc.add(metadata_el);
    }

    for ring in &data.path {
        let d = build_path_data_translated(ring, data.image_offset_x, data.image_offset_y);
        if d.is_empty() {
            continue;
        }
        let path = Path::new()
            .set("d", d)
            .set("fill", "none")
            .set("stroke", "black")
            .set("stroke-width", 1);
        doc = doc.add(path);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
