//! Renderers: turn an encoded symbol into output bytes.
//!
//! Every [`WriterFormat`] has one renderer, reached through its
//! [`WriterStrategy`](crate::writer::WriterStrategy). Renderers receive a
//! [`Canvas`] describing what to draw and the writer options in effect.

pub mod label;
pub mod matrix;
pub mod pdf;
pub mod raster;
pub mod svg;

use crate::config::{Color, LabelSpec, LogoSpec, ValidatedConfig};
use crate::error::EncodeError;
use crate::writer::{WriterFormat, WriterOptions};
use image::imageops::FilterType;
use image::RgbaImage;

pub use matrix::{Layout, ModuleMatrix};

/// Space between the bottom of the symbol and the bottom of the label strip.
pub(crate) const LABEL_MARGIN_BOTTOM: u32 = 10;
/// Space between the image edge and a left/right aligned label.
pub(crate) const LABEL_MARGIN_SIDE: u32 = 10;

/// Renders a [`Canvas`] into one output container.
pub trait Renderer: Send + Sync {
    /// The format this renderer produces.
    fn format(&self) -> WriterFormat;

    /// Draws the canvas and returns the encoded bytes.
    fn render(&self, canvas: &Canvas<'_>, options: &WriterOptions) -> Result<Vec<u8>, EncodeError>;

    /// Checks that `rendered` shows the canvas matrix.
    ///
    /// Only raster writers can read their own output back; the default fails.
    fn validate(&self, _rendered: &[u8], _canvas: &Canvas<'_>) -> Result<(), EncodeError> {
        Err(format!("unable to validate the result of the {} writer", self.format()).into())
    }
}

/// A logo image, already resized.
#[derive(Clone, Debug)]
pub struct Logo {
    image: RgbaImage,
    punchout: bool,
}

impl Logo {
    /// Reads and resizes the logo described by `spec`.
    ///
    /// With a single resize dimension the other one follows the aspect ratio.
    /// A resize target wider or taller than `max_side` is rejected.
    pub fn load(spec: &LogoSpec, max_side: u32) -> Result<Self, EncodeError> {
        let source = image::open(spec.path()).map_err(|err| {
            format!("unable to read logo `{}`: {err}", spec.path().display())
        })?;

        let (width, height) = (source.width(), source.height());
        let target = match (spec.resize_width(), spec.resize_height()) {
            (Some(w), Some(h)) => Some((u64::from(w), u64::from(h))),
            (Some(w), None) => Some((u64::from(w), scaled(height, w, width))),
            (None, Some(h)) => Some((scaled(width, h, height), u64::from(h))),
            (None, None) => None,
        };
        let image = match target {
            Some((w, h)) if w > u64::from(max_side) || h > u64::from(max_side) => {
                return Err(format!(
                    "logo resize to {w}x{h} exceeds the {max_side}px symbol"
                )
                .into());
            }
            Some((w, h)) if (w, h) != (u64::from(width), u64::from(height)) => {
                // both sides are at most max_side here
                source
                    .resize_exact(w as u32, h as u32, FilterType::Lanczos3)
                    .to_rgba8()
            }
            _ => source.to_rgba8(),
        };

        Ok(Self {
            image,
            punchout: spec.punchout_background(),
        })
    }

    pub fn from_image(image: RgbaImage, punchout: bool) -> Self {
        Self { image, punchout }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn punchout(&self) -> bool {
        self.punchout
    }
}

fn scaled(value: u32, numerator: u32, denominator: u32) -> u64 {
    (u64::from(value) * u64::from(numerator) / u64::from(denominator.max(1))).max(1)
}

/// Everything a renderer draws: the symbol, its placement, colors, logo and label.
#[derive(Debug)]
pub struct Canvas<'a> {
    matrix: &'a ModuleMatrix,
    layout: Layout,
    foreground: Color,
    background: Color,
    logo: Option<Logo>,
    label: Option<&'a LabelSpec>,
    label_height: u32,
    height: u32,
}

impl<'a> Canvas<'a> {
    /// Fails when the symbol and its label strip do not fit in `u32` pixels.
    pub fn new(
        matrix: &'a ModuleMatrix,
        layout: Layout,
        config: &'a ValidatedConfig,
        logo: Option<Logo>,
    ) -> Result<Self, EncodeError> {
        let label = config.label();
        let label_height = match label {
            Some(label) => strip_height(label.font().size())?,
            None => 0,
        };
        let height = layout
            .outer_size()
            .checked_add(label_height)
            .ok_or("image height overflows with the label strip")?;

        Ok(Self {
            matrix,
            layout,
            foreground: config.foreground(),
            background: config.background(),
            logo,
            label,
            label_height,
            height,
        })
    }

    pub fn matrix(&self) -> &ModuleMatrix {
        self.matrix
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn foreground(&self) -> Color {
        self.foreground
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn logo(&self) -> Option<&Logo> {
        self.logo.as_ref()
    }

    pub fn label(&self) -> Option<&LabelSpec> {
        self.label
    }

    pub fn width(&self) -> u32 {
        self.layout.outer_size()
    }

    /// Total height: the symbol plus the label strip, if any.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn label_height(&self) -> u32 {
        self.label_height
    }

    /// Top-left corner of the logo, centred on the symbol.
    pub fn logo_origin(&self) -> Option<(u32, u32)> {
        self.logo.as_ref().map(|logo| {
            let outer = self.layout.outer_size();
            (
                outer.saturating_sub(logo.image.width()) / 2,
                outer.saturating_sub(logo.image.height()) / 2,
            )
        })
    }

    /// Returns `true` when the pixel lies under the logo.
    pub(crate) fn covered_by_logo(&self, x: f64, y: f64) -> bool {
        match (self.logo.as_ref(), self.logo_origin()) {
            (Some(logo), Some((left, top))) => {
                let (left, top) = (f64::from(left), f64::from(top));
                x >= left
                    && y >= top
                    && x < left + f64::from(logo.image.width())
                    && y < top + f64::from(logo.image.height())
            }
            _ => false,
        }
    }
}

/// Height of the label strip for a font of `size` pixels.
fn strip_height(size: f32) -> Result<u32, EncodeError> {
    let line = f64::from(size * 1.25).ceil();
    if !(line.is_finite() && line >= 0.0 && line <= f64::from(u32::MAX)) {
        return Err(format!("label font size {size} is too large").into());
    }
    (line as u32)
        .checked_add(LABEL_MARGIN_BOTTOM)
        .ok_or_else(|| format!("label font size {size} is too large").into())
}

/// Formats a coordinate with at most four decimals and no trailing zeros.
pub(crate) fn fmt_num(value: f64) -> String {
    let text = format!("{value:.4}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}
