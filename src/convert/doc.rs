//! Legacy Word document extractor.

use crate::detect::FormatKind;
use crate::error::Result;
use crate::external::{try_external_extract, TextExtractor};
use crate::model::ExtractedDocument;
use crate::parser::{read_legacy_doc, ParseOptions};

use super::DocumentExtractor;

/// Extracts the text of a legacy document as a single paragraph.
///
/// External helpers are tried first, in order. When all of them decline the
/// compound file is decoded directly.
pub struct LegacyDocExtractor {
    tools: Vec<Box<dyn TextExtractor>>,
}

impl LegacyDocExtractor {
    /// Create an extractor that only decodes the compound file.
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Create an extractor with an ordered list of external helpers.
    pub fn with_tools(tools: Vec<Box<dyn TextExtractor>>) -> Self {
        Self { tools }
    }

    /// Names of the configured helpers, in order.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }
}

impl Default for LegacyDocExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentExtractor for LegacyDocExtractor {
    fn name(&self) -> &str {
        "doc"
    }

    fn format(&self) -> FormatKind {
        FormatKind::LegacyDoc
    }

    fn extract(&self, bytes: &[u8], _options: &ParseOptions) -> Result<ExtractedDocument> {
        if let Some(text) = try_external_extract(&self.tools, bytes) {
            return Ok(ExtractedDocument::from_text(text.trim_end()));
        }

        if !self.tools.is_empty() {
            log::debug!("No external helper produced text, decoding the compound file");
        }
        let text = read_legacy_doc(bytes)?;
        Ok(ExtractedDocument::from_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, ToolError};
    use crate::external::NoTool;
    use std::path::Path;

    struct Fixed(&'static str);

    impl TextExtractor for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn extract_text(&self, _path: &Path) -> std::result::Result<String, ToolError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_helper_text_becomes_one_paragraph() {
        let extractor = LegacyDocExtractor::with_tools(vec![Box::new(Fixed("from helper\n\n"))]);
        let doc = extractor
            .extract(b"not even a compound file", &ParseOptions::default())
            .unwrap();
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.plain_text(), "from helper");
    }

    #[test]
    fn test_falls_back_when_helpers_decline() {
        let extractor = LegacyDocExtractor::with_tools(vec![Box::new(NoTool), Box::new(NoTool)]);
        assert_eq!(extractor.tool_names(), vec!["none", "none"]);

        let result = extractor.extract(b"not a compound file", &ParseOptions::default());
        assert!(matches!(result, Err(Error::NotACompoundFile(_))));
    }
}
