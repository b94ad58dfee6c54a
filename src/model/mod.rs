//! Intermediate document model.
//!
//! Every extractor produces an [`ExtractedDocument`]: an ordered sequence of
//! blocks in source reading order. Styling is discarded; only paragraph and
//! page boundaries survive.

mod document;
mod paragraph;

pub use document::{Block, ExtractedDocument};
pub use paragraph::{Paragraph, TextRun};
