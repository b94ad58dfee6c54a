//! PDF extractor.

use crate::detect::FormatKind;
use crate::error::Result;
use crate::model::ExtractedDocument;
use crate::parser::{read_pdf_with_options, ParseOptions};

use super::DocumentExtractor;

/// Extracts one paragraph per PDF page.
#[derive(Debug, Clone, Default)]
pub struct PdfExtractor {
    _private: (),
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl DocumentExtractor for PdfExtractor {
    fn name(&self) -> &str {
        "pdf"
    }

    fn format(&self) -> FormatKind {
        FormatKind::Pdf
    }

    fn extract(&self, bytes: &[u8], options: &ParseOptions) -> Result<ExtractedDocument> {
        read_pdf_with_options(bytes, options)
    }
}
