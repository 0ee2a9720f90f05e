//! # qrpress
//!
//! A Rust library for configuring, rendering and delivering QR codes.
//!
//! `qrpress` wraps QR symbol encoding in a small pipeline: a fluent [`QrBuilder`]
//! collects and validates parameters, a writer renders the symbol into an output
//! container (PNG, SVG, WebP or PDF), and the resulting [`Artifact`] is delivered
//! either inline (a data URI or an HTML tag) or as a saved file. A separate
//! [`fault`] layer turns faults the host did not handle into one uniform
//! diagnostic page.
//!
//! ## Features
//!
//! - Four error correction levels, UTF-8 and ISO-8859-1 payloads.
//! - PNG, SVG, WebP and PDF writers with per-format options.
//! - Logos with optional background punch-out, captions below the symbol.
//! - Custom foreground and background colors.
//! - Atomic file saves and self-contained embed strings.
//!
//! ## Installation
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! qrpress = "0.1" # Replace with the latest version
//! ```
//!
//! ## Example
//!
//! Generate an SVG with a caption and save it:
//!
//! ```rust,no_run
//! use qrpress::{LabelAlignment, QrBuilder, QrError};
//!
//! fn main() -> Result<(), QrError> {
//!     let mut builder = QrBuilder::new();
//!     builder
//!         .writer_format("svg")?
//!         .payload("https://example.com")
//!         .label_text("Scan me")
//!         .label_alignment(LabelAlignment::Center);
//!
//!     builder.save_to_file("example", "output")?;
//!     Ok(())
//! }
//! ```
//!
//! One-shot generation with [`qr`]:
//!
//! ```rust
//! let artifact = qrpress::qr("Hello, World!", "png", "", "Test").unwrap();
//! assert_eq!(artifact.mime_type(), "image/png");
//! ```
//!
//! ## Modules
//!
//! - [`writer`]: Writer formats, strategies and options.
//! - [`config`]: Parameter types, the draft and the validated snapshot.
//! - [`encoder`]: The encoder seam and the default `qrcodegen` encoder.
//! - [`render`]: Renderers for each writer format.
//! - [`deliver`]: Embed strings, HTML tags and file saves.
//! - [`fault`]: Process-level fault pages.

pub mod artifact;
pub mod builder;
pub mod config;
pub mod deliver;
pub mod encoder;
pub mod error;
pub mod escape;
pub mod fault;
pub mod render;
pub mod writer;

pub use artifact::Artifact;
pub use builder::{BuildState, QrBuilder};
pub use config::{
    CharacterEncoding, Color, ErrorCorrectionLevel, LabelAlignment, LabelFont,
    RoundBlockSizeMode, ValidatedConfig,
};
pub use encoder::{QrEncoder, SymbolEncoder};
pub use error::{EncodeError, ErrorKind, QrError};
pub use writer::{OptionValue, WriterFormat, WriterOptions};

/// Builds a QR code in one call.
///
/// # Arguments
///
/// * `data` - Text to encode.
/// * `format` - Writer tag: `png`, `svg`, `webp` or `pdf`.
/// * `logo_path` - Logo image to place in the centre; empty for none.
/// * `label` - Caption below the symbol; empty for none.
///
/// # Errors
///
/// Any [`QrError`] the builder reports, e.g. [`QrError::UnsupportedFormat`]
/// or [`QrError::MissingData`].
pub fn qr(data: &str, format: &str, logo_path: &str, label: &str) -> Result<Artifact, QrError> {
    let mut builder = QrBuilder::new();
    builder
        .writer_format(format)?
        .payload(data)
        .logo_path(logo_path)
        .label_text(label);
    builder.build()
}
