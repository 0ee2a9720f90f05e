//! The immutable result of a build.

use crate::writer::WriterFormat;
use std::fmt;

/// Rendered QR code: content bytes, MIME type and format tag.
///
/// An artifact is produced once per [`QrBuilder::build`](crate::QrBuilder::build)
/// call and never changes afterwards. Delivery helpers in [`deliver`](crate::deliver)
/// take it by reference or by value.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    content: Vec<u8>,
    mime_type: String,
    format: WriterFormat,
}

impl Artifact {
    /// Creates an artifact whose MIME type is the canonical one for `format`.
    pub fn new(format: WriterFormat, content: Vec<u8>) -> Self {
        Self {
            content,
            mime_type: format.mime_type().to_string(),
            format,
        }
    }

    /// Creates an artifact with an explicit MIME type.
    ///
    /// Meant for custom [`SymbolEncoder`](crate::encoder::SymbolEncoder)s whose
    /// output does not use the canonical MIME type of its format.
    pub fn with_mime_type(
        format: WriterFormat,
        mime_type: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        Self {
            content,
            mime_type: mime_type.into(),
            format,
        }
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Returns the content as text when it is valid UTF-8 (SVG output always is).
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn format(&self) -> WriterFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn into_content(self) -> Vec<u8> {
        self.content
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("format", &self.format)
            .field("mime_type", &self.mime_type)
            .field("len", &self.content.len())
            .finish()
    }
}
