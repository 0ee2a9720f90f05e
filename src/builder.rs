//! The fluent QR builder.

use crate::artifact::Artifact;
use crate::config::{
    CharacterEncoding, Color, Draft, ErrorCorrectionLevel, LabelAlignment, LabelFont,
    RoundBlockSizeMode,
};
use crate::deliver;
use crate::encoder::{QrEncoder, SymbolEncoder};
use crate::error::QrError;
use crate::writer::{self, OptionValue, WriterFormat, WriterOptions};
use std::path::{Path, PathBuf};

/// Largest accepted `pixel_size`.
pub const MAX_PIXEL_SIZE: u32 = 16_384;
/// Largest accepted `margin`.
pub const MAX_MARGIN: u32 = 4_096;
/// Largest accepted label font size, in pixels.
pub const MAX_LABEL_FONT_SIZE: f32 = 1_024.0;
/// Longest label accepted by [`QrBuilder::data_uri`], in characters.
pub const MAX_URI_LABEL_CHARS: usize = 100;

/// Where a builder is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuildState {
    /// Nothing has been set yet.
    Unconfigured,
    /// Some parameters are set, but there is no payload.
    Configuring,
    /// A payload is set; `build()` can be attempted.
    Ready,
    /// The last `build()` succeeded and nothing changed since.
    Built,
}

/// Accumulates QR parameters and builds [`Artifact`]s.
///
/// Setters validate their input before storing it; a rejected value leaves the
/// builder untouched. Fallible setters return `Result<&mut Self, QrError>` and
/// infallible ones `&mut Self`, so both chain.
///
/// # Example
///
/// ```rust
/// use qrpress::{deliver, QrBuilder, QrError};
///
/// fn main() -> Result<(), QrError> {
///     let mut builder = QrBuilder::new();
///     builder
///         .writer_format("png")?
///         .pixel_size(200)?
///         .payload("https://example.com")
///         .label_text("Scan me");
///
///     let artifact = builder.build()?;
///     assert_eq!(artifact.mime_type(), "image/png");
///     assert!(deliver::embed_string(&artifact).starts_with("data:image/png;base64,"));
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct QrBuilder<E = QrEncoder> {
    draft: Draft,
    encoder: E,
    state: BuildState,
}

impl QrBuilder<QrEncoder> {
    /// A builder with the default parameters and the default encoder.
    pub fn new() -> Self {
        Self::with_encoder(QrEncoder)
    }
}

impl Default for QrBuilder<QrEncoder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: SymbolEncoder> QrBuilder<E> {
    /// A builder with the default parameters that builds through `encoder`.
    pub fn with_encoder(encoder: E) -> Self {
        Self {
            draft: Draft::default(),
            encoder,
            state: BuildState::Unconfigured,
        }
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// The parameters as currently configured.
    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn format(&self) -> WriterFormat {
        self.draft.format()
    }

    pub fn writer_options(&self) -> &WriterOptions {
        self.draft.writer_options()
    }

    fn touch(&mut self) -> &mut Self {
        self.state = if self.draft.payload.is_empty() {
            BuildState::Configuring
        } else {
            BuildState::Ready
        };
        self
    }

    /// Selects the writer by tag (`png`, `svg`, `webp`, `pdf`, any case).
    ///
    /// The writer options are reset to the defaults of the new format.
    ///
    /// # Errors
    ///
    /// [`QrError::UnsupportedFormat`] for any other tag; the current format and
    /// options are kept.
    pub fn writer_format(&mut self, tag: &str) -> Result<&mut Self, QrError> {
        let strategy = writer::resolve(tag)?;
        self.draft.writer_options = strategy.default_options().clone();
        self.draft.writer = strategy;
        Ok(self.touch())
    }

    /// Selects the writer; the writer options are reset to its defaults.
    pub fn writer(&mut self, format: WriterFormat) -> &mut Self {
        let strategy = format.strategy();
        self.draft.writer_options = strategy.default_options().clone();
        self.draft.writer = strategy;
        self.touch()
    }

    /// Overrides one option of the current writer.
    ///
    /// # Errors
    ///
    /// [`QrError::InvalidParameter`] when the writer has no such option or the
    /// value has the wrong type.
    pub fn writer_option(
        &mut self,
        key: &str,
        value: impl Into<OptionValue>,
    ) -> Result<&mut Self, QrError> {
        let options = self
            .draft
            .writer_options
            .with_override(self.draft.format(), key, value.into())?;
        self.draft.writer_options = options;
        Ok(self.touch())
    }

    /// Sets the text to encode. Emptiness is only checked by [`build`](Self::build).
    pub fn payload(&mut self, data: impl Into<String>) -> &mut Self {
        self.draft.payload = data.into();
        self.touch()
    }

    /// Sets the character encoding by label, e.g. `UTF-8` or `ISO-8859-1`.
    pub fn encoding(&mut self, label: &str) -> Result<&mut Self, QrError> {
        self.draft.encoding = CharacterEncoding::new(label)?;
        Ok(self.touch())
    }

    pub fn error_correction_level(&mut self, level: ErrorCorrectionLevel) -> &mut Self {
        self.draft.error_correction_level = level;
        self.touch()
    }

    /// Sets the side length of the symbol area in pixels (1 to [`MAX_PIXEL_SIZE`]).
    pub fn pixel_size(&mut self, size: i64) -> Result<&mut Self, QrError> {
        self.draft.pixel_size = bounded("pixel_size", size, 1, MAX_PIXEL_SIZE)?;
        Ok(self.touch())
    }

    /// Sets the quiet zone around the symbol in pixels (0 to [`MAX_MARGIN`]).
    pub fn margin(&mut self, margin: i64) -> Result<&mut Self, QrError> {
        self.draft.margin = bounded("margin", margin, 0, MAX_MARGIN)?;
        Ok(self.touch())
    }

    pub fn round_block_size_mode(&mut self, mode: RoundBlockSizeMode) -> &mut Self {
        self.draft.round_block_size_mode = mode;
        self.touch()
    }

    /// Sets the logo image. The file is only read at build time; an empty path
    /// means no logo.
    pub fn logo_path(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.draft.logo_path = Some(path.into());
        self.touch()
    }

    pub fn clear_logo(&mut self) -> &mut Self {
        self.draft.logo_path = None;
        self.touch()
    }

    /// Resizes the logo to `width` pixels; `None` keeps the natural width.
    ///
    /// The width must be between 1 and [`MAX_PIXEL_SIZE`].
    pub fn logo_resize_width(&mut self, width: Option<u32>) -> Result<&mut Self, QrError> {
        self.draft.logo_resize_width = logo_side("logo_resize_width", width)?;
        Ok(self.touch())
    }

    /// Resizes the logo to `height` pixels; `None` keeps the natural height.
    pub fn logo_resize_height(&mut self, height: Option<u32>) -> Result<&mut Self, QrError> {
        self.draft.logo_resize_height = logo_side("logo_resize_height", height)?;
        Ok(self.touch())
    }

    pub fn logo_punchout_background(&mut self, punchout: bool) -> &mut Self {
        self.draft.logo_punchout_background = punchout;
        self.touch()
    }

    /// Sets the caption drawn below the symbol; an empty text means no label.
    pub fn label_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.draft.label_text = text.into();
        self.touch()
    }

    /// Sets the label font. The size must be above 0 and at most
    /// [`MAX_LABEL_FONT_SIZE`].
    pub fn label_font(&mut self, font: LabelFont) -> Result<&mut Self, QrError> {
        let size = font.size();
        if !(size.is_finite() && size > 0.0 && size <= MAX_LABEL_FONT_SIZE) {
            return Err(QrError::invalid(
                "label_font",
                format!("font size must be above 0 and at most {MAX_LABEL_FONT_SIZE}, got {size}"),
            ));
        }
        self.draft.label_font = font;
        Ok(self.touch())
    }

    pub fn label_alignment(&mut self, alignment: LabelAlignment) -> &mut Self {
        self.draft.label_alignment = alignment;
        self.touch()
    }

    pub fn foreground_color(&mut self, color: Color) -> &mut Self {
        self.draft.foreground = color;
        self.touch()
    }

    pub fn background_color(&mut self, color: Color) -> &mut Self {
        self.draft.background = color;
        self.touch()
    }

    /// Reads raster output back after rendering and fails the build when it
    /// does not match the encoded data. Vector and document writers cannot be
    /// validated, so enabling this makes their builds fail.
    pub fn validate_result(&mut self, validate: bool) -> &mut Self {
        self.draft.validate_result = validate;
        self.touch()
    }

    /// Validates the parameters and encodes them into an artifact.
    ///
    /// The encoder runs exactly once per call. Building twice without changing
    /// anything yields identical content.
    ///
    /// # Errors
    ///
    /// - [`QrError::MissingData`] when no payload is set
    /// - [`QrError::BuildFailed`] when the encoder fails; the original error is
    ///   kept as the source
    pub fn build(&mut self) -> Result<Artifact, QrError> {
        let config = self.draft.validate()?;
        let span = tracing::debug_span!("build", format = %config.format());
        let _enter = span.enter();

        let artifact = self.encoder.build(&config).map_err(|source| {
            tracing::debug!(error = %source, "encoder failed");
            QrError::BuildFailed { source }
        })?;
        self.state = BuildState::Built;
        Ok(artifact)
    }

    /// Builds with the current format and saves the result as
    /// `{dir}/{base_name}.{extension}`.
    ///
    /// # Arguments
    ///
    /// * `base_name` - File name without extension; letters, digits, spaces, `_` and `-`.
    /// * `dir` - Existing directory to write into.
    ///
    /// # Errors
    ///
    /// [`QrError::InvalidFilename`] and [`QrError::InvalidPath`] are reported
    /// before anything is built; build and write failures follow.
    pub fn save_to_file(
        &mut self,
        base_name: &str,
        dir: impl AsRef<Path>,
    ) -> Result<Artifact, QrError> {
        let dir = dir.as_ref();
        deliver::check_target(dir, base_name)?;
        let artifact = self.build()?;
        deliver::save_to_file(artifact, dir, base_name)
    }

    /// Configures format, payload and label in one call and returns the
    /// resulting data URI.
    ///
    /// # Errors
    ///
    /// - [`QrError::UnsupportedFormat`] for an unknown `format`
    /// - [`QrError::MissingData`] when `data` is blank
    /// - [`QrError::InvalidParameter`] when `label` exceeds 100 characters
    pub fn data_uri(&mut self, format: &str, data: &str, label: &str) -> Result<String, QrError> {
        let strategy = writer::resolve(format)?;
        if data.trim().is_empty() {
            return Err(QrError::MissingData);
        }
        if label.chars().count() > MAX_URI_LABEL_CHARS {
            return Err(QrError::invalid(
                "label_text",
                format!("label must not exceed {MAX_URI_LABEL_CHARS} characters"),
            ));
        }

        self.writer(strategy.format()).payload(data).label_text(label);
        let artifact = self.build()?;
        Ok(deliver::embed_string(&artifact))
    }
}

fn bounded(name: &'static str, value: i64, min: u32, max: u32) -> Result<u32, QrError> {
    u32::try_from(value)
        .ok()
        .filter(|value| (min..=max).contains(value))
        .ok_or_else(|| QrError::invalid(name, format!("must be between {min} and {max}, got {value}")))
}

fn logo_side(name: &'static str, value: Option<u32>) -> Result<Option<u32>, QrError> {
    value
        .map(|side| bounded(name, i64::from(side), 1, MAX_PIXEL_SIZE))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EncodeError, ErrorKind};
    use crate::config::ValidatedConfig;
    use std::cell::Cell;

    #[test]
    fn state_follows_configuration() {
        let mut builder = QrBuilder::new();
        assert_eq!(builder.state(), BuildState::Unconfigured);

        builder.margin(4).unwrap();
        assert_eq!(builder.state(), BuildState::Configuring);

        builder.payload("hello");
        assert_eq!(builder.state(), BuildState::Ready);

        builder.build().unwrap();
        assert_eq!(builder.state(), BuildState::Built);

        builder.label_text("again");
        assert_eq!(builder.state(), BuildState::Ready);
    }

    #[test]
    fn rejected_values_leave_the_draft_untouched() {
        let mut builder = QrBuilder::new();
        builder.pixel_size(120).unwrap().margin(2).unwrap();

        assert_eq!(builder.pixel_size(0).unwrap_err().kind(), ErrorKind::InvalidParameter);
        assert_eq!(builder.pixel_size(-5).unwrap_err().kind(), ErrorKind::InvalidParameter);
        assert_eq!(builder.margin(-1).unwrap_err().kind(), ErrorKind::InvalidParameter);
        assert!(builder.logo_resize_width(Some(0)).is_err());
        assert!(builder.label_font(LabelFont::new("Open Sans", 0.0)).is_err());
        assert!(builder.encoding(" ").is_err());

        assert_eq!(builder.draft().pixel_size, 120);
        assert_eq!(builder.draft().margin, 2);
        assert_eq!(builder.draft().label_font, LabelFont::default());
    }

    #[test]
    fn format_change_resets_option_overrides() {
        let mut builder = QrBuilder::new();
        builder.writer_option("compact", false).unwrap();
        assert_eq!(builder.writer_options().bool("compact"), Some(false));

        builder.writer(WriterFormat::Png).writer(WriterFormat::Svg);
        assert_eq!(builder.writer_options().bool("compact"), Some(true));

        let err = builder.writer_option("quality", 50_i64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
    }

    #[test]
    fn encoder_runs_once_per_build() {
        let calls = Cell::new(0);
        let counting = |config: &ValidatedConfig| -> Result<Artifact, EncodeError> {
            calls.set(calls.get() + 1);
            Ok(Artifact::new(config.format(), vec![1]))
        };
        let mut builder = QrBuilder::with_encoder(counting);
        builder.payload("x");
        builder.build().unwrap();
        builder.build().unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn data_uri_checks_its_arguments() {
        let mut builder = QrBuilder::new();
        let long = "x".repeat(101);

        assert_eq!(builder.data_uri("gif", "data", "").unwrap_err().kind(), ErrorKind::UnsupportedFormat);
        assert_eq!(builder.data_uri("png", "   ", "").unwrap_err().kind(), ErrorKind::MissingData);
        assert_eq!(builder.data_uri("png", "data", &long).unwrap_err().kind(), ErrorKind::InvalidParameter);

        let uri = builder.data_uri("svg", "Qr Test Data", "Scan Me").unwrap();
        assert!(uri.starts_with("data:image/svg+xml;base64,"));
        assert_eq!(builder.format(), WriterFormat::Svg);
    }

    #[test]
    fn sizes_have_upper_bounds() {
        let mut builder = QrBuilder::new();

        let err = builder.label_font(LabelFont::new("Open Sans", 1.0e10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert!(builder.label_font(LabelFont::new("Open Sans", MAX_LABEL_FONT_SIZE)).is_ok());

        let err = builder.logo_resize_width(Some(200_000)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        let err = builder.logo_resize_height(Some(MAX_PIXEL_SIZE + 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        assert!(builder.logo_resize_height(Some(MAX_PIXEL_SIZE)).is_ok());

        assert_eq!(builder.draft().logo_resize_width, None);
        assert_eq!(builder.draft().logo_resize_height, Some(MAX_PIXEL_SIZE));
    }
}
