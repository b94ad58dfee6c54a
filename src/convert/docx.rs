//! DOCX extractor.

use crate::detect::FormatKind;
use crate::error::Result;
use crate::model::ExtractedDocument;
use crate::parser::{read_docx, ParseOptions};

use super::DocumentExtractor;

/// Extracts paragraphs from the main document part of a DOCX package.
#[derive(Debug, Clone, Default)]
pub struct DocxExtractor {
    _private: (),
}

impl DocxExtractor {
    /// Create a new DOCX extractor.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl DocumentExtractor for DocxExtractor {
    fn name(&self) -> &str {
        "docx"
    }

    fn format(&self) -> FormatKind {
        FormatKind::Docx
    }

    fn extract(&self, bytes: &[u8], _options: &ParseOptions) -> Result<ExtractedDocument> {
        read_docx(bytes)
    }
}
