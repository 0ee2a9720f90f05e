//! Label text: SVG `<text>` markup and raster strips.
//!
//! Raster writers lay the label out as a small SVG document and rasterise it
//! with `resvg`, so all writers share the same text placement.

use super::{fmt_num, Canvas, LABEL_MARGIN_SIDE};
use crate::config::{Color, LabelAlignment, LabelFont, LabelSpec};
use crate::error::EncodeError;
use crate::escape;
use image::{Rgba, RgbaImage};
use std::sync::{Arc, OnceLock};

/// System fonts, loaded once per process.
static SYSTEM_FONTS: OnceLock<Arc<fontdb::Database>> = OnceLock::new();

fn system_fonts() -> &'static Arc<fontdb::Database> {
    SYSTEM_FONTS.get_or_init(|| {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        tracing::debug!(faces = db.len(), "loaded system fonts for labels");
        Arc::new(db)
    })
}

/// Font database and family name to lay out `font` with.
///
/// A font file is loaded on top of the system fonts and its own family name is
/// used; otherwise the configured family is looked up among the system fonts.
pub(crate) fn font_database(font: &LabelFont) -> Result<(Arc<fontdb::Database>, String), EncodeError> {
    let system = system_fonts();
    let Some(path) = font.path() else {
        return Ok((Arc::clone(system), font.family().to_string()));
    };

    let mut db = (**system).clone();
    let before = db.len();
    db.load_font_file(path)
        .map_err(|err| format!("unable to read label font `{}`: {err}", path.display()))?;
    let family = db
        .faces()
        .skip(before)
        .find_map(|face| face.families.first().map(|(name, _)| name.clone()))
        .ok_or_else(|| format!("`{}` is not a usable font file", path.display()))?;
    Ok((Arc::new(db), family))
}

/// Horizontal anchor of the label and the matching `text-anchor` value.
pub(crate) fn anchor(alignment: LabelAlignment, width: u32) -> (f64, &'static str) {
    match alignment {
        LabelAlignment::Left => (f64::from(LABEL_MARGIN_SIDE), "start"),
        LabelAlignment::Center => (f64::from(width) / 2.0, "middle"),
        LabelAlignment::Right => (f64::from(width.saturating_sub(LABEL_MARGIN_SIDE)), "end"),
    }
}

/// Baseline of the label, measured from the top of the label strip.
pub(crate) fn baseline(font: &LabelFont) -> f64 {
    f64::from(font.size()).ceil()
}

/// `<text>` element for `label` in a strip of `width` whose top edge is at `top`.
pub(crate) fn svg_text(label: &LabelSpec, family: &str, width: u32, top: f64, fill: Color) -> String {
    let (x, text_anchor) = anchor(label.alignment(), width);
    let mut element = format!(
        "<text x=\"{}\" y=\"{}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\" text-anchor=\"{}\"",
        fmt_num(x),
        fmt_num(top + baseline(label.font())),
        escape::html(family),
        fmt_num(f64::from(label.font().size())),
        fill.to_hex(),
        text_anchor,
    );
    if fill.a < 255 {
        element += &format!(" fill-opacity=\"{}\"", fmt_num(fill.opacity()));
    }
    element += &format!(">{}</text>", escape::html(label.text()));
    element
}

/// Rasterises the label strip of `canvas`: full width, `canvas.label_height()` tall.
pub(crate) fn rasterize(canvas: &Canvas<'_>, label: &LabelSpec) -> Result<RgbaImage, EncodeError> {
    let (width, height) = (canvas.width(), canvas.label_height());
    let (fontdb, family) = font_database(label.font())?;

    let svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">{}</svg>",
        svg_text(label, &family, width, 0.0, canvas.foreground()),
    );
    let options = usvg::Options {
        fontdb,
        ..Default::default()
    };
    let tree = usvg::Tree::from_str(&svg, &options)
        .map_err(|err| format!("unable to lay out label: {err}"))?;

    let mut pixmap = tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| format!("label strip of {width}x{height} cannot be allocated"))?;
    let bg = canvas.background();
    pixmap.fill(tiny_skia::Color::from_rgba8(bg.r, bg.g, bg.b, bg.a));
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    let mut strip = RgbaImage::new(width, height);
    for (pixel, source) in strip.pixels_mut().zip(pixmap.pixels()) {
        let color = source.demultiply();
        *pixel = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
    Ok(strip)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(text: &str, alignment: LabelAlignment) -> LabelSpec {
        LabelSpec {
            text: text.into(),
            font: LabelFont::default(),
            alignment,
        }
    }

    #[test]
    fn text_element_is_escaped_and_anchored() {
        let element = svg_text(
            &label("<Scan & go>", LabelAlignment::Center),
            "Open Sans",
            320,
            320.0,
            Color::BLACK,
        );
        assert_eq!(
            element,
            "<text x=\"160\" y=\"340\" font-family=\"Open Sans\" font-size=\"20\" fill=\"#000000\" \
             text-anchor=\"middle\">&lt;Scan &amp; go&gt;</text>"
        );
    }

    #[test]
    fn alignment_moves_the_anchor() {
        assert_eq!(anchor(LabelAlignment::Left, 320), (10.0, "start"));
        assert_eq!(anchor(LabelAlignment::Right, 320), (310.0, "end"));
    }

    #[test]
    fn missing_font_file_is_an_error() {
        let font = LabelFont::from_file("/nonexistent/font.ttf", 12.0);
        assert!(font_database(&font).is_err());
    }
}
