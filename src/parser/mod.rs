//! Format readers.
//!
//! Each reader turns raw document bytes into an [`ExtractedDocument`](crate::model::ExtractedDocument)
//! or, for legacy documents, plain text.

pub mod cfb;
mod docx;
mod layout;
mod legacy;
mod options;
mod pdf;

pub use cfb::{CompoundFile, DirectoryEntry, EntryType};
pub use docx::{parse_document_xml, read_docx};
pub use layout::{group_spans_into_lines, page_spans, TextLine, TextSpan};
pub use legacy::{read_legacy_doc, TEXT_STREAM_NAME};
pub use options::{ErrorMode, ParseOptions};
pub use pdf::{extract_pages, read_pdf, read_pdf_with_options, LopdfSource, PageSource};
