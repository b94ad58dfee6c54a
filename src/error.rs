//! Error types for dochtml library.

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Result type alias for dochtml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while classifying, extracting or converting a document.
#[derive(Error, Debug)]
pub enum Error {
    /// The format hint does not name a supported document format.
    #[error("Unsupported format: {0:?}")]
    UnsupportedFormat(String),

    /// The bytes are not a valid ZIP/OPC package.
    #[error("Not a DOCX package: {0}")]
    NotAPackage(String),

    /// The bytes are not a valid compound-file container.
    #[error("Not a compound file: {0}")]
    NotACompoundFile(String),

    /// The bytes are not a parsable PDF document.
    #[error("Not a PDF document: {0}")]
    NotAPdf(String),

    /// The package is well-formed but lacks its main document part.
    #[error("Missing document structure: {0}")]
    StructureMissing(String),

    /// The compound file is well-formed but lacks the text stream.
    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    /// The container is shorter than its own metadata implies.
    #[error("Truncated container: {0}")]
    Truncated(String),

    /// The PDF document is encrypted and no key was supplied.
    #[error("Document is encrypted")]
    Encrypted,

    /// The external extraction helper is missing or failed.
    #[error("External tool unavailable: {0}")]
    ToolUnavailable(String),

    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Get the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Error::NotAPackage(_) => ErrorKind::NotAPackage,
            Error::NotACompoundFile(_) => ErrorKind::NotACompoundFile,
            Error::NotAPdf(_) => ErrorKind::NotAPdf,
            Error::StructureMissing(_) => ErrorKind::StructureMissing,
            Error::StreamNotFound(_) => ErrorKind::StreamNotFound,
            Error::Truncated(_) => ErrorKind::Truncated,
            Error::Encrypted => ErrorKind::Encrypted,
            Error::ToolUnavailable(_) => ErrorKind::ToolUnavailable,
            Error::Io(_) => ErrorKind::Io,
            Error::Json(_) => ErrorKind::Serialization,
        }
    }

    /// Check if this error only reports an unsupported format.
    ///
    /// Unsupported formats are an expected outcome, not a decode failure.
    pub fn is_unsupported(&self) -> bool {
        self.kind().is_unsupported()
    }
}

/// Stable, serializable classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedFormat,
    NotAPackage,
    NotACompoundFile,
    NotAPdf,
    StructureMissing,
    StreamNotFound,
    Truncated,
    Encrypted,
    ToolUnavailable,
    Io,
    Serialization,
}

impl ErrorKind {
    /// Check if this kind is the non-fatal unsupported-format outcome.
    pub fn is_unsupported(self) -> bool {
        self == ErrorKind::UnsupportedFormat
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::NotAPackage => "not_a_package",
            ErrorKind::NotACompoundFile => "not_a_compound_file",
            ErrorKind::NotAPdf => "not_a_pdf",
            ErrorKind::StructureMissing => "structure_missing",
            ErrorKind::StreamNotFound => "stream_not_found",
            ErrorKind::Truncated => "truncated",
            ErrorKind::Encrypted => "encrypted",
            ErrorKind::ToolUnavailable => "tool_unavailable",
            ErrorKind::Io => "io",
            ErrorKind::Serialization => "serialization",
        };
        f.write_str(name)
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::NotAPdf(err.to_string()),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::FileNotFound => {
                Error::StructureMissing("package part not found".to_string())
            }
            _ => Error::NotAPackage(err.to_string()),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::NotAPackage(format!("malformed markup: {}", err))
    }
}

/// Errors reported by an external text-extraction helper.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The helper program could not be found or launched.
    #[error("{0} is not installed")]
    NotInstalled(String),

    /// The helper ran but exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The helper succeeded but produced no text.
    #[error("{0} produced no text")]
    EmptyOutput(String),

    /// Preparing the helper's input failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<ToolError> for Error {
    fn from(err: ToolError) -> Self {
        Error::ToolUnavailable(err.to_string())
    }
}
