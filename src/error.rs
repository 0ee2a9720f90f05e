//! Error types returned by the builder and the delivery helpers.
//!
//! Every fallible operation in the crate returns [`QrError`]. Callers that only
//! care about the category of a failure can match on [`QrError::kind`], which is
//! stable across releases; the variants themselves carry the details.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed fault raised by a [`SymbolEncoder`](crate::encoder::SymbolEncoder).
///
/// Encoders are free to fail with any error type; the builder stores the
/// original value as the source of [`QrError::BuildFailed`].
pub type EncodeError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Errors produced while configuring, building or delivering a QR code.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum QrError {
    /// A setter received an out-of-range or malformed value. The field is left untouched.
    #[error("invalid value for `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the rejected parameter.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The writer format tag is not one of `png`, `svg`, `webp`, `pdf`.
    #[error("unsupported QR writer type `{tag}`; expected one of png, svg, webp, pdf")]
    UnsupportedFormat {
        /// The tag as supplied by the caller.
        tag: String,
    },

    /// `build()` was called without a payload.
    #[error("QR code data is required")]
    MissingData,

    /// The encoder or one of the renderers failed.
    #[error("failed to generate QR code: {source}")]
    BuildFailed {
        /// The original encoder fault.
        #[source]
        source: EncodeError,
    },

    /// The base name for a saved file contains characters outside `[A-Za-z0-9 _-]`.
    #[error("invalid filename `{name}`; use only letters, numbers, spaces, hyphens or underscores")]
    InvalidFilename {
        /// The rejected base name.
        name: String,
    },

    /// The target directory of a saved file does not exist.
    #[error("invalid path `{}`; directory does not exist", path.display())]
    InvalidPath {
        /// The rejected directory.
        path: PathBuf,
    },

    /// Writing the artifact to disk failed.
    #[error("failed to save QR code to `{}`: {source}", path.display())]
    PersistFailed {
        /// The file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Stable category of a [`QrError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidParameter,
    UnsupportedFormat,
    MissingData,
    BuildFailed,
    InvalidFilename,
    InvalidPath,
    PersistFailed,
}

impl QrError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        QrError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            QrError::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            QrError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            QrError::MissingData => ErrorKind::MissingData,
            QrError::BuildFailed { .. } => ErrorKind::BuildFailed,
            QrError::InvalidFilename { .. } => ErrorKind::InvalidFilename,
            QrError::InvalidPath { .. } => ErrorKind::InvalidPath,
            QrError::PersistFailed { .. } => ErrorKind::PersistFailed,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use qrpress::QrError;
    ///
    /// assert_eq!(QrError::MissingData.as_label(), "missing_data");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidParameter => "invalid_parameter",
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::MissingData => "missing_data",
            ErrorKind::BuildFailed => "build_failed",
            ErrorKind::InvalidFilename => "invalid_filename",
            ErrorKind::InvalidPath => "invalid_path",
            ErrorKind::PersistFailed => "persist_failed",
        }
    }
}
