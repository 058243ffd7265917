//! Error types for the codec crate.

use crate::value::FieldType;
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A text value contains a NUL character, which the bulk-load protocol
    /// cannot carry even when escaped.
    #[error("field {field} contains a NUL character")]
    NulCharacter {
        /// Zero-based field index.
        field: usize,
    },

    /// Failed to decode a line.
    #[error("decoding failed at line {line}: {message}")]
    DecodingFailed {
        /// One-based line number.
        line: usize,
        /// Description of the decoding error.
        message: String,
    },

    /// A line had the wrong number of fields.
    #[error("line {line} has {found} fields, expected {expected}")]
    FieldCount {
        /// One-based line number.
        line: usize,
        /// Number of declared fields.
        expected: usize,
        /// Number of fields on the line.
        found: usize,
    },

    /// A field could not be parsed as its declared type.
    #[error("line {line}, field {field}: {raw:?} is not a valid {expected}")]
    InvalidValue {
        /// One-based line number.
        line: usize,
        /// Zero-based field index.
        field: usize,
        /// Declared type.
        expected: FieldType,
        /// Unescaped raw text.
        raw: String,
    },

    /// Invalid UTF-8 on a line.
    #[error("invalid UTF-8 at line {line}")]
    InvalidUtf8 {
        /// One-based line number.
        line: usize,
    },

    /// The input ended before the end-of-data sentinel.
    #[error("unexpected end of input: missing end-of-data sentinel")]
    MissingTerminator,

    /// Bytes follow the end-of-data sentinel.
    #[error("data after end-of-data sentinel at line {line}")]
    TrailingData {
        /// One-based line number of the first trailing line.
        line: usize,
    },

    /// The underlying reader failed.
    #[error("I/O error while decoding: {message}")]
    Io {
        /// Description of the I/O error.
        message: String,
    },
}

impl CodecError {
    /// Create a decoding failed error.
    pub fn decoding_failed(line: usize, message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(line: usize, field: usize, expected: FieldType, raw: String) -> Self {
        Self::InvalidValue {
            line,
            field,
            expected,
            raw,
        }
    }

    /// Returns true if this error was raised while producing output.
    ///
    /// Encoding errors point at data the protocol cannot carry; everything
    /// else points at a damaged or mismatched payload.
    pub fn is_encoding(&self) -> bool {
        matches!(self, CodecError::NulCharacter { .. })
    }
}

impl From<std::io::Error> for CodecError {
    /// Unwraps a codec error carried inside an I/O error, so an encoder
    /// failure read through another decoder keeps its kind.
    fn from(err: std::io::Error) -> Self {
        let message = err.to_string();
        match err.into_inner().map(|inner| inner.downcast::<CodecError>()) {
            Some(Ok(codec)) => *codec,
            _ => CodecError::Io { message },
        }
    }
}
