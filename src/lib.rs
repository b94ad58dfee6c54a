//! # dochtml
//!
//! Format-dispatching document to HTML conversion for Rust.
//!
//! This library turns PDF, DOCX and legacy Word (`.doc`) documents into
//! minimal, well-formed HTML that keeps paragraph and page boundaries.
//!
//! ## Quick Start
//!
//! ```no_run
//! use dochtml::convert_file;
//!
//! let result = convert_file("report.docx");
//! if let Some(html) = result.html() {
//!     println!("{}", html);
//! }
//! ```
//!
//! ## Features
//!
//! - **Format classification**: by extension hint, optionally by byte signature
//! - **Legacy documents**: external helpers first, built-in compound-file reader as fallback
//! - **Page granularity**: PDF pages are separated by explicit page-break elements
//! - **Typed failures**: every outcome is a [`ConversionResult`], unsupported formats included

pub mod convert;
pub mod detect;
pub mod error;
pub mod external;
pub mod model;
pub mod parser;
pub mod render;

// Re-export commonly used types
pub use convert::{
    ConversionResult, ConvertOptions, DocumentExtractor, FailureInfo, Pipeline, Stage,
};
pub use detect::{classify, classify_path, sniff, FormatKind};
pub use error::{Error, ErrorKind, Result, ToolError};
pub use external::{CommandExtractor, NoTool, TextExtractor};
pub use model::{Block, ExtractedDocument, Paragraph, TextRun};
pub use parser::{ErrorMode, ParseOptions};
pub use render::{to_json, HtmlOptions, JsonFormat};

use std::path::Path;

/// Convert document bytes to HTML.
///
/// # Arguments
///
/// * `bytes` - Document content
/// * `hint` - Format hint, usually the file extension (`"pdf"`, `".docx"`, ...)
///
/// # Example
///
/// ```
/// use dochtml::convert_bytes;
///
/// let result = convert_bytes(b"col1,col2", "csv");
/// assert!(result.is_unsupported());
/// ```
pub fn convert_bytes(bytes: &[u8], hint: &str) -> ConversionResult {
    Pipeline::new().run(bytes, hint)
}

/// Convert document bytes with custom options.
pub fn convert_bytes_with_options(
    bytes: &[u8],
    hint: &str,
    options: ConvertOptions,
) -> ConversionResult {
    Pipeline::with_options(options).run(bytes, hint)
}

/// Convert a file to HTML, using its extension as the format hint.
///
/// A file that cannot be read yields a failed result at the `received` stage.
pub fn convert_file<P: AsRef<Path>>(path: P) -> ConversionResult {
    convert_file_with_options(path, ConvertOptions::default())
}

/// Convert a file with custom options.
pub fn convert_file_with_options<P: AsRef<Path>>(
    path: P,
    options: ConvertOptions,
) -> ConversionResult {
    let path = path.as_ref();
    let hint = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();

    match std::fs::read(path) {
        Ok(bytes) => convert_bytes_with_options(&bytes, hint, options),
        Err(e) => ConversionResult::from_error(&Error::Io(e), Stage::Received),
    }
}

/// Extract the intermediate document model without rendering it.
///
/// # Example
///
/// ```no_run
/// use dochtml::extract;
///
/// let data = std::fs::read("slides.pdf").unwrap();
/// let doc = extract(&data, "pdf").unwrap();
/// println!("{} pages", doc.page_break_count() + 1);
/// ```
pub fn extract(bytes: &[u8], hint: &str) -> Result<ExtractedDocument> {
    Pipeline::new().extract(bytes, hint)
}

/// Extract plain text from a file, one paragraph per line.
pub fn extract_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let hint = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let bytes = std::fs::read(path)?;
    Ok(extract(&bytes, hint)?.plain_text())
}
