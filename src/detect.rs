//! Document format classification.
//!
//! Classification is driven by the caller's format hint (usually a file
//! extension). Byte-signature sniffing is available for callers that have
//! no hint at all.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// The document formats the pipeline knows how to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    /// Portable Document Format
    Pdf,
    /// Office Open XML word-processing package
    Docx,
    /// Word 97-2003 binary document in a compound-file container
    LegacyDoc,
    /// Anything else
    Unsupported,
}

impl FormatKind {
    /// Canonical lowercase extension, without the leading dot.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            FormatKind::Pdf => Some("pdf"),
            FormatKind::Docx => Some("docx"),
            FormatKind::LegacyDoc => Some("doc"),
            FormatKind::Unsupported => None,
        }
    }

    /// Check if the pipeline has an extractor for this format.
    pub fn is_supported(self) -> bool {
        self != FormatKind::Unsupported
    }
}

impl std::fmt::Display for FormatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatKind::Pdf => f.write_str("PDF"),
            FormatKind::Docx => f.write_str("DOCX"),
            FormatKind::LegacyDoc => f.write_str("DOC"),
            FormatKind::Unsupported => f.write_str("unsupported"),
        }
    }
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const PDF_MAGIC_LEN: usize = 5;
const VERSION_LEN: usize = 3; // e.g., "1.7"

/// Readers accept junk before the PDF header as long as it starts within this window.
const PDF_HEADER_WINDOW: usize = 1024;

/// ZIP local file header, the first record of every OPC package.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Compound-file container signature.
pub const COMPOUND_FILE_MAGIC: &[u8; 8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// Classify a format hint.
///
/// The hint is trimmed, stripped of a leading dot and compared
/// case-insensitively. Every input maps to exactly one [`FormatKind`];
/// unknown or empty hints map to [`FormatKind::Unsupported`].
///
/// # Example
/// ```
/// use dochtml::detect::{classify, FormatKind};
///
/// assert_eq!(classify(".PDF"), FormatKind::Pdf);
/// assert_eq!(classify("xlsx"), FormatKind::Unsupported);
/// ```
pub fn classify(hint: &str) -> FormatKind {
    let hint = hint.trim();
    let hint = hint.strip_prefix('.').unwrap_or(hint);

    if hint.eq_ignore_ascii_case("pdf") {
        FormatKind::Pdf
    } else if hint.eq_ignore_ascii_case("docx") {
        FormatKind::Docx
    } else if hint.eq_ignore_ascii_case("doc") {
        FormatKind::LegacyDoc
    } else {
        FormatKind::Unsupported
    }
}

/// Classify a file path by its extension.
pub fn classify_path<P: AsRef<Path>>(path: P) -> FormatKind {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(classify)
        .unwrap_or(FormatKind::Unsupported)
}

/// Classify raw bytes by their leading signature.
///
/// A ZIP signature is reported as DOCX; whether the package actually holds
/// a word-processing document is decided later by the DOCX walker.
pub fn sniff(data: &[u8]) -> FormatKind {
    if data.starts_with(COMPOUND_FILE_MAGIC) {
        FormatKind::LegacyDoc
    } else if data.starts_with(ZIP_MAGIC) {
        FormatKind::Docx
    } else if find_pdf_header(data).is_some() {
        FormatKind::Pdf
    } else {
        FormatKind::Unsupported
    }
}

/// Locate the `%PDF-` header within the leading window of the data.
fn find_pdf_header(data: &[u8]) -> Option<usize> {
    let window = &data[..data.len().min(PDF_HEADER_WINDOW)];
    window
        .windows(PDF_MAGIC_LEN)
        .position(|w| w == PDF_MAGIC)
}

/// Read the PDF version from the header (e.g. "1.7").
///
/// Returns `None` when the data has no PDF header or the version is malformed.
pub fn detect_pdf_version(data: &[u8]) -> Option<String> {
    let start = find_pdf_header(data)? + PDF_MAGIC_LEN;
    let version_bytes = data.get(start..start + VERSION_LEN)?;
    let version = String::from_utf8_lossy(version_bytes).to_string();

    if is_valid_version(&version) {
        Some(version)
    } else {
        None
    }
}

/// Check if a version string is valid.
fn is_valid_version(version: &str) -> bool {
    if version.len() != 3 {
        return false;
    }

    let chars: Vec<char> = version.chars().collect();
    chars[0].is_ascii_digit() && chars[1] == '.' && chars[2].is_ascii_digit()
}
