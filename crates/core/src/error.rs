//! Error types for the folio PDF reader.

use thiserror::Error;

/// Primary error type for parsing, decoding and interpreting PDF content.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Grammar violation while parsing a PDF value.
    #[error("malformed object at offset {pos}: {msg}")]
    MalformedObject { pos: usize, msg: String },

    /// Missing or invalid startxref, unreadable trailer, or a reference to an
    /// unknown entry.
    #[error("broken cross-reference: {0}")]
    BrokenCrossReference(String),

    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("filter {filter} failed: {msg}")]
    FilterDecodeFailure { filter: &'static str, msg: String },

    #[error("content syntax error: {0}")]
    ContentSyntaxError(String),

    #[error("color space {space} takes {expected} components, got {got}")]
    ColorComponentMismatch {
        space: String,
        expected: usize,
        got: usize,
    },

    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
    },

    #[error("key not found: {0}")]
    KeyError(String),

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("interpretation cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`PdfError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MalformedObject,
    BrokenCrossReference,
    UnsupportedFilter,
    FilterDecodeFailure,
    ContentSyntaxError,
    ColorComponentMismatch,
    Other,
}

impl PdfError {
    pub(crate) fn malformed(pos: usize, msg: impl Into<String>) -> Self {
        Self::MalformedObject {
            pos,
            msg: msg.into(),
        }
    }

    pub(crate) fn xref(msg: impl Into<String>) -> Self {
        Self::BrokenCrossReference(msg.into())
    }

    pub(crate) fn syntax(msg: impl Into<String>) -> Self {
        Self::ContentSyntaxError(msg.into())
    }

    pub(crate) fn decode(filter: &'static str, msg: impl Into<String>) -> Self {
        Self::FilterDecodeFailure {
            filter,
            msg: msg.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedObject { .. } | Self::TypeError { .. } | Self::UnexpectedEof => {
                ErrorKind::MalformedObject
            }
            Self::BrokenCrossReference(_) => ErrorKind::BrokenCrossReference,
            Self::UnsupportedFilter(_) => ErrorKind::UnsupportedFilter,
            Self::FilterDecodeFailure { .. } => ErrorKind::FilterDecodeFailure,
            Self::ContentSyntaxError(_) => ErrorKind::ContentSyntaxError,
            Self::ColorComponentMismatch { .. } => ErrorKind::ColorComponentMismatch,
            Self::KeyError(_)
            | Self::InvalidArgument(_)
            | Self::Cancelled
            | Self::Io(_) => ErrorKind::Other,
        }
    }

    /// Whether a BX/EX compatibility section may log this error and carry on.
    pub fn is_recoverable_in_compat(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ContentSyntaxError | ErrorKind::ColorComponentMismatch
        )
    }

    /// Errors that mean "no image produced" rather than a failed page.
    pub(crate) fn degrades_image(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UnsupportedFilter | ErrorKind::FilterDecodeFailure
        )
    }
}

/// Convenience Result type alias for PdfError.
pub type Result<T> = std::result::Result<T, PdfError>;
