//! Build parameters.
//!
//! [`Draft`] is the mutable, possibly incomplete set of parameters held by a
//! [`QrBuilder`](crate::QrBuilder). Setter-level checks (ranges, non-empty
//! labels) happen as values are stored; the checks that need the whole picture
//! happen once in [`Draft::validate`], which produces the immutable
//! [`ValidatedConfig`] snapshot handed to the encoder.

use crate::error::QrError;
use crate::writer::{WriterFormat, WriterOptions, WriterStrategy};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Error correction level of the encoded symbol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCorrectionLevel {
    /// Tolerates ~7% erroneous codewords.
    Low,
    /// Tolerates ~15% erroneous codewords.
    Medium,
    /// Tolerates ~25% erroneous codewords.
    Quartile,
    /// Tolerates ~30% erroneous codewords.
    #[default]
    High,
}

impl FromStr for ErrorCorrectionLevel {
    type Err = QrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l" | "low" => Ok(Self::Low),
            "m" | "medium" => Ok(Self::Medium),
            "q" | "quartile" => Ok(Self::Quartile),
            "h" | "high" => Ok(Self::High),
            _ => Err(QrError::invalid(
                "error_correction_level",
                format!("`{s}` is not one of L, M, Q, H"),
            )),
        }
    }
}

/// How the block size is rounded when the pixel size is not a multiple of the
/// module count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RoundBlockSizeMode {
    /// Keep fractional blocks; the symbol fills the pixel size exactly.
    None,
    /// Round blocks down and give the leftover pixels to the margin.
    #[default]
    Margin,
    /// Round blocks up; the image grows past the pixel size.
    Enlarge,
    /// Round blocks down; the image shrinks below the pixel size.
    Shrink,
}

impl FromStr for RoundBlockSizeMode {
    type Err = QrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "margin" => Ok(Self::Margin),
            "enlarge" => Ok(Self::Enlarge),
            "shrink" => Ok(Self::Shrink),
            _ => Err(QrError::invalid(
                "round_block_size_mode",
                format!("`{s}` is not one of none, margin, enlarge, shrink"),
            )),
        }
    }
}

/// Horizontal placement of the label under the symbol.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LabelAlignment {
    Left,
    #[default]
    Center,
    Right,
}

impl FromStr for LabelAlignment {
    type Err = QrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "center" | "centre" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            _ => Err(QrError::invalid(
                "label_alignment",
                format!("`{s}` is not one of left, center, right"),
            )),
        }
    }
}

/// Font used for the label.
///
/// `path` points at a TrueType/OpenType file. When it is absent the family is
/// looked up among the system fonts. The file is only opened at encode time.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelFont {
    family: String,
    size: f32,
    path: Option<PathBuf>,
}

impl LabelFont {
    pub const DEFAULT_FAMILY: &'static str = "Open Sans";
    pub const DEFAULT_SIZE: f32 = 20.0;

    pub fn new(family: impl Into<String>, size: f32) -> Self {
        Self {
            family: family.into(),
            size,
            path: None,
        }
    }

    /// A font loaded from a file; the family name is read from the file.
    pub fn from_file(path: impl Into<PathBuf>, size: f32) -> Self {
        Self {
            family: Self::DEFAULT_FAMILY.to_string(),
            size,
            path: Some(path.into()),
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl Default for LabelFont {
    fn default() -> Self {
        Self::new(Self::DEFAULT_FAMILY, Self::DEFAULT_SIZE)
    }
}

/// Character encoding of the payload, by label (`UTF-8`, `ISO-8859-1`, ...).
///
/// Any non-empty label is accepted here; the encoder decides which ones it
/// supports.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CharacterEncoding(String);

impl CharacterEncoding {
    pub fn utf8() -> Self {
        Self("UTF-8".to_string())
    }

    pub fn new(label: &str) -> Result<Self, QrError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(QrError::invalid("encoding", "encoding label must not be empty"));
        }
        Ok(Self(label.to_string()))
    }

    pub fn label(&self) -> &str {
        &self.0
    }

    fn normalized(&self) -> String {
        self.0.to_ascii_lowercase().replace(['-', '_'], "")
    }

    pub fn is_utf8(&self) -> bool {
        self.normalized() == "utf8"
    }

    pub fn is_latin1(&self) -> bool {
        matches!(self.normalized().as_str(), "iso88591" | "latin1")
    }
}

impl Default for CharacterEncoding {
    fn default() -> Self {
        Self::utf8()
    }
}

impl fmt::Display for CharacterEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// `#rrggbb`, without the alpha channel.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn opacity(self) -> f64 {
        f64::from(self.a) / 255.0
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl FromStr for Color {
    type Err = QrError;

    /// Parses `#RRGGBB` or `#RRGGBBAA` (the `#` is optional).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        let invalid = || QrError::invalid("color", format!("`{s}` is not a #RRGGBB or #RRGGBBAA color"));
        if !(hex.len() == 6 || hex.len() == 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Color::rgba(channel(0)?, channel(2)?, channel(4)?, alpha))
    }
}

/// Logo composited over the centre of the symbol.
#[derive(Clone, Debug, PartialEq)]
pub struct LogoSpec {
    pub(crate) path: PathBuf,
    pub(crate) resize_width: Option<u32>,
    pub(crate) resize_height: Option<u32>,
    pub(crate) punchout_background: bool,
}

impl LogoSpec {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn resize_width(&self) -> Option<u32> {
        self.resize_width
    }

    pub fn resize_height(&self) -> Option<u32> {
        self.resize_height
    }

    pub fn punchout_background(&self) -> bool {
        self.punchout_background
    }
}

/// Caption drawn below the symbol.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelSpec {
    pub(crate) text: String,
    pub(crate) font: LabelFont,
    pub(crate) alignment: LabelAlignment,
}

impl LabelSpec {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn font(&self) -> &LabelFont {
        &self.font
    }

    pub fn alignment(&self) -> LabelAlignment {
        self.alignment
    }
}

/// Parameters as they are being configured.
#[derive(Clone, Debug)]
pub struct Draft {
    pub(crate) payload: String,
    pub(crate) encoding: CharacterEncoding,
    pub(crate) error_correction_level: ErrorCorrectionLevel,
    pub(crate) pixel_size: u32,
    pub(crate) margin: u32,
    pub(crate) round_block_size_mode: RoundBlockSizeMode,
    pub(crate) logo_path: Option<PathBuf>,
    pub(crate) logo_resize_width: Option<u32>,
    pub(crate) logo_resize_height: Option<u32>,
    pub(crate) logo_punchout_background: bool,
    pub(crate) label_text: String,
    pub(crate) label_font: LabelFont,
    pub(crate) label_alignment: LabelAlignment,
    pub(crate) foreground: Color,
    pub(crate) background: Color,
    pub(crate) writer: WriterStrategy,
    pub(crate) writer_options: WriterOptions,
    pub(crate) validate_result: bool,
}

impl Draft {
    pub const DEFAULT_PIXEL_SIZE: u32 = 300;
    pub const DEFAULT_MARGIN: u32 = 10;
    pub const DEFAULT_FORMAT: WriterFormat = WriterFormat::Svg;

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn format(&self) -> WriterFormat {
        self.writer.format()
    }

    pub fn writer_options(&self) -> &WriterOptions {
        &self.writer_options
    }

    /// Checks the parameters as a whole and takes an immutable snapshot.
    ///
    /// # Errors
    ///
    /// [`QrError::MissingData`] when the payload is empty, whatever else is set.
    pub fn validate(&self) -> Result<ValidatedConfig, QrError> {
        if self.payload.is_empty() {
            return Err(QrError::MissingData);
        }

        let logo = self
            .logo_path
            .as_ref()
            .filter(|path| !path.as_os_str().is_empty())
            .map(|path| LogoSpec {
                path: path.clone(),
                resize_width: self.logo_resize_width,
                resize_height: self.logo_resize_height,
                punchout_background: self.logo_punchout_background,
            });

        let label = (!self.label_text.is_empty()).then(|| LabelSpec {
            text: self.label_text.clone(),
            font: self.label_font.clone(),
            alignment: self.label_alignment,
        });

        Ok(ValidatedConfig {
            payload: self.payload.clone(),
            encoding: self.encoding.clone(),
            error_correction_level: self.error_correction_level,
            pixel_size: self.pixel_size,
            margin: self.margin,
            round_block_size_mode: self.round_block_size_mode,
            logo,
            label,
            foreground: self.foreground,
            background: self.background,
            writer: self.writer.clone(),
            writer_options: self.writer_options.clone(),
            validate_result: self.validate_result,
        })
    }
}

impl Default for Draft {
    fn default() -> Self {
        let writer = Self::DEFAULT_FORMAT.strategy();
        Self {
            payload: String::new(),
            encoding: CharacterEncoding::utf8(),
            error_correction_level: ErrorCorrectionLevel::High,
            pixel_size: Self::DEFAULT_PIXEL_SIZE,
            margin: Self::DEFAULT_MARGIN,
            round_block_size_mode: RoundBlockSizeMode::Margin,
            logo_path: None,
            logo_resize_width: None,
            logo_resize_height: None,
            logo_punchout_background: false,
            label_text: String::new(),
            label_font: LabelFont::default(),
            label_alignment: LabelAlignment::Center,
            foreground: Color::BLACK,
            background: Color::WHITE,
            writer_options: writer.default_options().clone(),
            writer,
            validate_result: false,
        }
    }
}

/// Immutable snapshot of a validated [`Draft`], consumed by one encode.
#[derive(Clone, Debug)]
pub struct ValidatedConfig {
    payload: String,
    encoding: CharacterEncoding,
    error_correction_level: ErrorCorrectionLevel,
    pixel_size: u32,
    margin: u32,
    round_block_size_mode: RoundBlockSizeMode,
    logo: Option<LogoSpec>,
    label: Option<LabelSpec>,
    foreground: Color,
    background: Color,
    writer: WriterStrategy,
    writer_options: WriterOptions,
    validate_result: bool,
}

impl ValidatedConfig {
    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn encoding(&self) -> &CharacterEncoding {
        &self.encoding
    }

    pub fn error_correction_level(&self) -> ErrorCorrectionLevel {
        self.error_correction_level
    }

    pub fn pixel_size(&self) -> u32 {
        self.pixel_size
    }

    pub fn margin(&self) -> u32 {
        self.margin
    }

    pub fn round_block_size_mode(&self) -> RoundBlockSizeMode {
        self.round_block_size_mode
    }

    pub fn logo(&self) -> Option<&LogoSpec> {
        self.logo.as_ref()
    }

    pub fn label(&self) -> Option<&LabelSpec> {
        self.label.as_ref()
    }

    pub fn foreground(&self) -> Color {
        self.foreground
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn writer(&self) -> &WriterStrategy {
        &self.writer
    }

    pub fn format(&self) -> WriterFormat {
        self.writer.format()
    }

    pub fn writer_options(&self) -> &WriterOptions {
        &self.writer_options
    }

    pub fn validate_result(&self) -> bool {
        self.validate_result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn empty_payload_fails_closed() {
        let draft = Draft::default();
        assert_eq!(draft.validate().unwrap_err().kind(), ErrorKind::MissingData);
    }

    #[test]
    fn empty_logo_path_and_label_are_dropped() {
        let draft = Draft {
            payload: "hello".into(),
            logo_path: Some(PathBuf::new()),
            ..Draft::default()
        };
        let config = draft.validate().unwrap();
        assert!(config.logo().is_none());
        assert!(config.label().is_none());
        assert_eq!(config.format(), WriterFormat::Svg);
        assert_eq!(config.pixel_size(), 300);
        assert_eq!(config.margin(), 10);
        assert_eq!(config.error_correction_level(), ErrorCorrectionLevel::High);
        assert_eq!(config.round_block_size_mode(), RoundBlockSizeMode::Margin);
    }

    #[test]
    fn colors_parse_from_hex() {
        assert_eq!("#ff8000".parse::<Color>().unwrap(), Color::rgb(255, 128, 0));
        assert_eq!("00000080".parse::<Color>().unwrap(), Color::rgba(0, 0, 0, 128));
        assert!("#fff".parse::<Color>().is_err());
        assert!("#gg0000".parse::<Color>().is_err());
        assert_eq!(Color::rgb(255, 128, 0).to_hex(), "#ff8000");
    }

    #[test]
    fn encodings_are_recognised_by_label() {
        assert!(CharacterEncoding::utf8().is_utf8());
        assert!(CharacterEncoding::new("utf8").unwrap().is_utf8());
        assert!(CharacterEncoding::new("ISO-8859-1").unwrap().is_latin1());
        assert!(CharacterEncoding::new("  ").is_err());
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("q".parse::<ErrorCorrectionLevel>().unwrap(), ErrorCorrectionLevel::Quartile);
        assert_eq!("Enlarge".parse::<RoundBlockSizeMode>().unwrap(), RoundBlockSizeMode::Enlarge);
        assert_eq!("RIGHT".parse::<LabelAlignment>().unwrap(), LabelAlignment::Right);
        assert!("x".parse::<ErrorCorrectionLevel>().is_err());
    }
}
