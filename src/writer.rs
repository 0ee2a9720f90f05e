//! Writer formats and the strategy registry.
//!
//! A writer turns an encoded module matrix into an output container. The set of
//! writers is closed: [`WriterFormat`] lists every supported format and
//! [`WriterFormat::strategy`] maps each one to its renderer and its default
//! options. The mapping is total, so there is no "unknown format" case past
//! parsing; unknown tags are rejected by [`resolve`].

use crate::error::QrError;
use crate::render::pdf::PdfRenderer;
use crate::render::raster::{PngRenderer, WebPRenderer};
use crate::render::svg::SvgRenderer;
use crate::render::Renderer;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Revision of the default option presets below. Bump whenever a default changes.
pub const OPTIONS_VERSION: u32 = 1;

static PNG: PngRenderer = PngRenderer;
static SVG: SvgRenderer = SvgRenderer;
static WEBP: WebPRenderer = WebPRenderer;
static PDF: PdfRenderer = PdfRenderer;

/// Output container for a QR code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WriterFormat {
    /// Portable Network Graphics raster image.
    Png,
    /// Scalable Vector Graphics document.
    Svg,
    /// WebP raster image.
    WebP,
    /// Single-page PDF document.
    Pdf,
}

impl WriterFormat {
    /// Every supported format, in registry order.
    pub const ALL: [WriterFormat; 4] = [
        WriterFormat::Png,
        WriterFormat::Svg,
        WriterFormat::WebP,
        WriterFormat::Pdf,
    ];

    /// The lowercase tag, which is also the file extension.
    pub fn tag(self) -> &'static str {
        match self {
            WriterFormat::Png => "png",
            WriterFormat::Svg => "svg",
            WriterFormat::WebP => "webp",
            WriterFormat::Pdf => "pdf",
        }
    }

    /// File extension used when the artifact is saved.
    pub fn extension(self) -> &'static str {
        self.tag()
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            WriterFormat::Png => "image/png",
            WriterFormat::Svg => "image/svg+xml",
            WriterFormat::WebP => "image/webp",
            WriterFormat::Pdf => "application/pdf",
        }
    }

    /// Returns the renderer and the default options for this format.
    pub fn strategy(self) -> WriterStrategy {
        let renderer: &'static dyn Renderer = match self {
            WriterFormat::Png => &PNG,
            WriterFormat::Svg => &SVG,
            WriterFormat::WebP => &WEBP,
            WriterFormat::Pdf => &PDF,
        };
        WriterStrategy {
            format: self,
            renderer,
            default_options: WriterOptions::defaults_for(self),
        }
    }
}

impl fmt::Display for WriterFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for WriterFormat {
    type Err = QrError;

    /// Parses a tag case-insensitively.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        WriterFormat::ALL
            .into_iter()
            .find(|format| format.tag().eq_ignore_ascii_case(tag))
            .ok_or_else(|| QrError::UnsupportedFormat {
                tag: tag.to_string(),
            })
    }
}

/// Resolves a format tag to its writer strategy.
///
/// # Errors
///
/// Returns [`QrError::UnsupportedFormat`] for anything other than `png`, `svg`,
/// `webp` or `pdf` (in any letter case).
///
/// # Example
///
/// ```
/// use qrpress::writer::{resolve, WriterFormat};
///
/// let strategy = resolve("PNG").unwrap();
/// assert_eq!(strategy.format(), WriterFormat::Png);
/// assert!(resolve("gif").is_err());
/// ```
pub fn resolve(tag: &str) -> Result<WriterStrategy, QrError> {
    tag.parse::<WriterFormat>().map(WriterFormat::strategy)
}

/// A renderer handle paired with the options it starts from.
#[derive(Clone)]
pub struct WriterStrategy {
    format: WriterFormat,
    renderer: &'static dyn Renderer,
    default_options: WriterOptions,
}

impl WriterStrategy {
    pub fn format(&self) -> WriterFormat {
        self.format
    }

    pub fn renderer(&self) -> &'static dyn Renderer {
        self.renderer
    }

    pub fn default_options(&self) -> &WriterOptions {
        &self.default_options
    }
}

impl fmt::Debug for WriterStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriterStrategy")
            .field("format", &self.format)
            .field("default_options", &self.default_options)
            .finish_non_exhaustive()
    }
}

/// A single writer option value.
#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl OptionValue {
    fn type_name(&self) -> &'static str {
        match self {
            OptionValue::Null => "null",
            OptionValue::Bool(_) => "bool",
            OptionValue::Int(_) => "integer",
            OptionValue::Str(_) => "string",
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        OptionValue::Int(i64::from(value))
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Str(value)
    }
}

impl<T: Into<OptionValue>> From<Option<T>> for OptionValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(OptionValue::Null, Into::into)
    }
}

/// Options handed to a renderer, keyed by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriterOptions {
    values: BTreeMap<String, OptionValue>,
}

impl WriterOptions {
    fn from_pairs<const N: usize>(pairs: [(&str, OptionValue); N]) -> Self {
        Self {
            values: pairs
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
        }
    }

    /// Default option presets, pinned by [`OPTIONS_VERSION`].
    pub fn defaults_for(format: WriterFormat) -> Self {
        match format {
            // -1 selects the codec's default zlib level
            WriterFormat::Png => Self::from_pairs([("compression_level", OptionValue::Int(-1))]),
            WriterFormat::Svg => Self::from_pairs([
                ("block_id", "block".into()),
                ("exclude_xml_declaration", false.into()),
                ("exclude_svg_width_and_height", false.into()),
                ("force_xlink_href", false.into()),
                ("compact", true.into()),
            ]),
            WriterFormat::WebP => Self::from_pairs([("quality", OptionValue::Int(80))]),
            WriterFormat::Pdf => Self::from_pairs([
                ("unit", "mm".into()),
                ("x", OptionValue::Int(0)),
                ("y", OptionValue::Int(0)),
                ("link", OptionValue::Null),
            ]),
        }
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(OptionValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key) {
            Some(OptionValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(OptionValue::Str(value)) => Some(value),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns a copy with `key` replaced by `value`.
    ///
    /// The key must be one of the format's default keys and the value must have
    /// the same type as the default. Keys whose default is `null` accept either
    /// `null` or a string.
    pub fn with_override(
        &self,
        format: WriterFormat,
        key: &str,
        value: OptionValue,
    ) -> Result<Self, QrError> {
        let defaults = Self::defaults_for(format);
        let Some(default) = defaults.get(key) else {
            return Err(QrError::invalid(
                "writer_options",
                format!("`{key}` is not an option of the {format} writer"),
            ));
        };

        let compatible = match (default, &value) {
            (OptionValue::Null, OptionValue::Null | OptionValue::Str(_)) => true,
            (default, value) => default.type_name() == value.type_name(),
        };
        if !compatible {
            return Err(QrError::invalid(
                "writer_options",
                format!(
                    "`{key}` expects a {} value, got {}",
                    default.type_name(),
                    value.type_name()
                ),
            ));
        }

        let mut options = self.clone();
        options.values.insert(key.to_string(), value);
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn resolve_is_case_insensitive() {
        for tag in ["png", "PNG", "Svg", "WEBP", "pDf"] {
            let strategy = resolve(tag).unwrap();
            assert!(strategy.format().tag().eq_ignore_ascii_case(tag));
            assert_eq!(strategy.renderer().format(), strategy.format());
        }
    }

    #[test]
    fn resolve_rejects_unknown_tags_without_fallback() {
        for tag in ["", "jpg", "gif", "png ", "svgz"] {
            let err = resolve(tag).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedFormat);
        }
    }

    #[test]
    fn default_presets_are_pinned() {
        let png = WriterOptions::defaults_for(WriterFormat::Png);
        assert_eq!(png.int("compression_level"), Some(-1));
        assert_eq!(png.len(), 1);

        let svg = WriterOptions::defaults_for(WriterFormat::Svg);
        assert_eq!(svg.str("block_id"), Some("block"));
        assert_eq!(svg.bool("compact"), Some(true));
        assert_eq!(svg.bool("force_xlink_href"), Some(false));
        assert_eq!(svg.len(), 5);

        let webp = WriterOptions::defaults_for(WriterFormat::WebP);
        assert_eq!(webp.int("quality"), Some(80));

        let pdf = WriterOptions::defaults_for(WriterFormat::Pdf);
        assert_eq!(pdf.str("unit"), Some("mm"));
        assert_eq!(pdf.get("link"), Some(&OptionValue::Null));
        assert_eq!(pdf.int("x"), Some(0));
        assert_eq!(pdf.int("y"), Some(0));
    }

    #[test]
    fn overrides_are_checked_against_defaults() {
        let svg = WriterOptions::defaults_for(WriterFormat::Svg);

        let compact = svg
            .with_override(WriterFormat::Svg, "compact", false.into())
            .unwrap();
        assert_eq!(compact.bool("compact"), Some(false));
        // the source is untouched
        assert_eq!(svg.bool("compact"), Some(true));

        assert!(svg
            .with_override(WriterFormat::Svg, "quality", 10_i64.into())
            .is_err());
        assert!(svg
            .with_override(WriterFormat::Svg, "compact", "yes".into())
            .is_err());

        let pdf = WriterOptions::defaults_for(WriterFormat::Pdf);
        let linked = pdf
            .with_override(WriterFormat::Pdf, "link", "https://example.com".into())
            .unwrap();
        assert_eq!(linked.str("link"), Some("https://example.com"));
    }

    #[test]
    fn mime_types_follow_the_format_family() {
        assert_eq!(WriterFormat::Png.mime_type(), "image/png");
        assert_eq!(WriterFormat::WebP.mime_type(), "image/webp");
        assert_eq!(WriterFormat::Svg.mime_type(), "image/svg+xml");
        assert_eq!(WriterFormat::Pdf.mime_type(), "application/pdf");
        assert_eq!(WriterFormat::WebP.extension(), "webp");
    }
}
