//! PDF page text extraction.
//!
//! Page access goes through the [`PageSource`] trait so the page-to-block
//! mapping does not depend on the concrete PDF library (lopdf). Page text is
//! recovered in reading order from positioned text spans.

use std::collections::BTreeMap;

use lopdf::{Document as LopdfDocument, ObjectId};

use crate::detect::detect_pdf_version;
use crate::error::{Error, Result};
use crate::model::{ExtractedDocument, Paragraph};

use super::layout;
use super::options::{ErrorMode, ParseOptions};

/// Abstract interface for per-page text access.
pub trait PageSource {
    /// Page numbers (1-indexed) in document order.
    fn page_numbers(&self) -> Vec<u32>;

    /// Text of one page in reading order, one line per `\n`.
    fn page_text(&self, page: u32) -> Result<String>;
}

/// Concrete [`PageSource`] backed by `lopdf::Document`.
pub struct LopdfSource {
    doc: LopdfDocument,
    pages: BTreeMap<u32, ObjectId>,
}

impl LopdfSource {
    /// Load from an in-memory byte slice.
    pub fn load(data: &[u8]) -> Result<Self> {
        if detect_pdf_version(data).is_none() {
            return Err(Error::NotAPdf("missing %PDF- header".to_string()));
        }

        let doc = LopdfDocument::load_mem(data)?;

        // lopdf 0.34 cannot decrypt with a user-supplied key.
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }

        let pages = doc.get_pages();
        Ok(Self { doc, pages })
    }

    /// Get PDF version.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }
}

impl PageSource for LopdfSource {
    fn page_numbers(&self) -> Vec<u32> {
        self.pages.keys().copied().collect()
    }

    fn page_text(&self, page: u32) -> Result<String> {
        let page_id = self
            .pages
            .get(&page)
            .copied()
            .ok_or_else(|| Error::NotAPdf(format!("page {} not found", page)))?;

        layout::page_text(&self.doc, page_id)
            .map_err(|e| Error::NotAPdf(format!("page {}: {}", page, e)))
    }
}

/// Read a PDF into one paragraph per page, separated by page breaks.
pub fn read_pdf(data: &[u8]) -> Result<ExtractedDocument> {
    read_pdf_with_options(data, &ParseOptions::default())
}

/// Read a PDF with custom options.
pub fn read_pdf_with_options(data: &[u8], options: &ParseOptions) -> Result<ExtractedDocument> {
    let source = LopdfSource::load(data)?;
    log::debug!("Loaded PDF {}", source.version());
    extract_pages(&source, options)
}

/// Map the pages of a source onto blocks.
///
/// Each page becomes one paragraph; a page break follows every page except
/// the last. A document without pages yields no blocks.
pub fn extract_pages<S: PageSource + ?Sized>(
    source: &S,
    options: &ParseOptions,
) -> Result<ExtractedDocument> {
    let mut doc = ExtractedDocument::new();
    let pages = source.page_numbers();

    for (index, page) in pages.iter().enumerate() {
        if index > 0 {
            doc.add_page_break();
        }

        let text = match source.page_text(*page) {
            Ok(text) => text,
            Err(e) => {
                if options.error_mode == ErrorMode::Strict {
                    return Err(e);
                }
                // In lenient mode, keep the page as an empty paragraph
                log::warn!("Failed to extract text from page {}: {}", page, e);
                String::new()
            }
        };

        let text = if options.normalize_page_text {
            normalize_page_text(&text)
        } else {
            text
        };
        doc.add_paragraph(Paragraph::with_text(text));
    }

    Ok(doc)
}

/// Trim line-trailing whitespace and blank lines around the page text.
fn normalize_page_text(text: &str) -> String {
    let lines: Vec<&str> = text.lines().map(str::trim_end).collect();
    lines.join("\n").trim_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Block;

    struct FakeSource {
        pages: Vec<Option<&'static str>>,
    }

    impl PageSource for FakeSource {
        fn page_numbers(&self) -> Vec<u32> {
            (1..=self.pages.len() as u32).collect()
        }

        fn page_text(&self, page: u32) -> Result<String> {
            self.pages[(page - 1) as usize]
                .map(String::from)
                .ok_or_else(|| Error::NotAPdf(format!("page {} has no content", page)))
        }
    }

    #[test]
    fn test_pages_interleave_with_breaks() {
        let source = FakeSource {
            pages: vec![Some("A"), Some("B"), Some("C")],
        };
        let doc = extract_pages(&source, &ParseOptions::default()).unwrap();

        assert_eq!(doc.blocks.len(), 5);
        assert_eq!(doc.paragraph_count(), 3);
        assert_eq!(doc.page_break_count(), 2);

        let texts: Vec<String> = doc.paragraphs().map(|p| p.text()).collect();
        assert_eq!(texts, vec!["A", "B", "C"]);
        assert!(matches!(doc.blocks[1], Block::PageBreak));
        assert!(matches!(doc.blocks[3], Block::PageBreak));
        assert!(!doc.blocks[4].is_page_break());
    }

    #[test]
    fn test_zero_pages() {
        let source = FakeSource { pages: vec![] };
        let doc = extract_pages(&source, &ParseOptions::default()).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn test_single_page_has_no_break() {
        let source = FakeSource {
            pages: vec![Some("only")],
        };
        let doc = extract_pages(&source, &ParseOptions::default()).unwrap();
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.page_break_count(), 0);
    }

    #[test]
    fn test_lenient_keeps_failed_page() {
        let source = FakeSource {
            pages: vec![Some("A"), None, Some("C")],
        };
        let doc = extract_pages(&source, &ParseOptions::new().lenient()).unwrap();
        let texts: Vec<String> = doc.paragraphs().map(|p| p.text()).collect();
        assert_eq!(texts, vec!["A", "", "C"]);
        assert_eq!(doc.page_break_count(), 2);
    }

    #[test]
    fn test_strict_fails_on_page_error() {
        let source = FakeSource {
            pages: vec![Some("A"), None],
        };
        let result = extract_pages(&source, &ParseOptions::new().strict());
        assert!(matches!(result, Err(Error::NotAPdf(_))));
    }

    #[test]
    fn test_normalize_page_text() {
        assert_eq!(normalize_page_text("\n\nline one  \nline two\t\n\n"), "line one\nline two");
        assert_eq!(normalize_page_text(""), "");
    }

    #[test]
    fn test_load_rejects_non_pdf() {
        assert!(matches!(
            LopdfSource::load(b"PK\x03\x04 zip bytes"),
            Err(Error::NotAPdf(_))
        ));
    }
}
