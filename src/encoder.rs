//! Symbol encoding: from a validated configuration to rendered bytes.
//!
//! The builder talks to an encoder only through [`SymbolEncoder`], so tests and
//! hosts can swap in their own. [`QrEncoder`] is the default implementation:
//! it produces the module matrix with `qrcodegen` and hands it to the renderer
//! of the configured writer.

use crate::artifact::Artifact;
use crate::config::{CharacterEncoding, ErrorCorrectionLevel, ValidatedConfig};
use crate::error::EncodeError;
use crate::render::{Canvas, Layout, Logo, ModuleMatrix};
use qrcodegen::{QrCode, QrCodeEcc, QrSegment, Version};

/// ECI designator for ISO-8859-1.
const ECI_ISO_8859_1: u32 = 3;

/// Turns a validated configuration into an [`Artifact`].
///
/// Called exactly once per [`QrBuilder::build`](crate::QrBuilder::build).
/// Any failure is reported as a boxed error and wrapped by the builder into
/// [`QrError::BuildFailed`](crate::QrError::BuildFailed).
///
/// Closures with the right signature are encoders too:
///
/// ```
/// use qrpress::{Artifact, QrBuilder, WriterFormat};
/// use qrpress::config::ValidatedConfig;
///
/// let echo = |config: &ValidatedConfig| {
///     Ok::<_, qrpress::EncodeError>(Artifact::new(
///         config.format(),
///         config.payload().as_bytes().to_vec(),
///     ))
/// };
/// let mut builder = QrBuilder::with_encoder(echo);
/// builder.payload("hello").writer(WriterFormat::Png);
/// assert_eq!(builder.build().unwrap().content(), b"hello");
/// ```
pub trait SymbolEncoder {
    fn build(&self, config: &ValidatedConfig) -> Result<Artifact, EncodeError>;
}

impl<F> SymbolEncoder for F
where
    F: Fn(&ValidatedConfig) -> Result<Artifact, EncodeError>,
{
    fn build(&self, config: &ValidatedConfig) -> Result<Artifact, EncodeError> {
        self(config)
    }
}

/// Default encoder backed by `qrcodegen` and the built-in renderers.
#[derive(Clone, Copy, Debug, Default)]
pub struct QrEncoder;

impl QrEncoder {
    /// Encodes the payload of `config` into a module matrix.
    ///
    /// UTF-8 payloads use the most compact segment modes; ISO-8859-1 payloads
    /// are written as bytes behind an ECI header. Other encodings are rejected.
    pub fn matrix(config: &ValidatedConfig) -> Result<ModuleMatrix, EncodeError> {
        let segments = segments(config.payload(), config.encoding())?;
        let code = QrCode::encode_segments_advanced(
            &segments,
            ecc(config.error_correction_level()),
            Version::MIN,
            Version::MAX,
            None,
            false,
        )
        .map_err(|err| format!("unable to encode payload: {err}"))?;

        let size = code.size();
        Ok(ModuleMatrix::from_fn(size as u32, |x, y| {
            code.get_module(x as i32, y as i32)
        }))
    }
}

impl SymbolEncoder for QrEncoder {
    fn build(&self, config: &ValidatedConfig) -> Result<Artifact, EncodeError> {
        let matrix = Self::matrix(config)?;
        let layout = Layout::compute(
            matrix.size(),
            config.pixel_size(),
            config.margin(),
            config.round_block_size_mode(),
        )?;
        tracing::debug!(
            modules = matrix.size(),
            block_size = layout.block_size(),
            outer_size = layout.outer_size(),
            "encoded payload"
        );

        let logo = config
            .logo()
            .map(|spec| Logo::load(spec, layout.outer_size()))
            .transpose()?;
        let canvas = Canvas::new(&matrix, layout, config, logo)?;

        let renderer = config.writer().renderer();
        let content = renderer.render(&canvas, config.writer_options())?;
        if config.validate_result() {
            renderer.validate(&content, &canvas)?;
        }

        tracing::debug!(format = %config.format(), bytes = content.len(), "rendered QR code");
        Ok(Artifact::new(config.format(), content))
    }
}

fn ecc(level: ErrorCorrectionLevel) -> QrCodeEcc {
    match level {
        ErrorCorrectionLevel::Low => QrCodeEcc::Low,
        ErrorCorrectionLevel::Medium => QrCodeEcc::Medium,
        ErrorCorrectionLevel::Quartile => QrCodeEcc::Quartile,
        ErrorCorrectionLevel::High => QrCodeEcc::High,
    }
}

fn segments(payload: &str, encoding: &CharacterEncoding) -> Result<Vec<QrSegment>, EncodeError> {
    if encoding.is_utf8() {
        return Ok(QrSegment::make_segments(payload));
    }
    if encoding.is_latin1() {
        let bytes = payload
            .chars()
            .map(|c| u8::try_from(u32::from(c)))
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| format!("payload cannot be represented in {encoding}"))?;
        return Ok(vec![
            QrSegment::make_eci(ECI_ISO_8859_1),
            QrSegment::make_bytes(&bytes),
        ]);
    }
    Err(format!("unsupported character encoding `{encoding}`; use UTF-8 or ISO-8859-1").into())
}
