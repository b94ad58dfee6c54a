//! Conversion pipeline: classify, extract, serialize.
//!
//! A [`Pipeline`] holds one [`DocumentExtractor`] per supported format and
//! dispatches on the classified [`FormatKind`]. Every call ends in a
//! [`ConversionResult`]; no failure escapes as a panic.
//!
//! # Example
//!
//! ```
//! use dochtml::convert::{ConvertOptions, Pipeline};
//!
//! let pipeline = Pipeline::with_options(ConvertOptions::new().without_external_tools());
//! let result = pipeline.run(b"a,b,c\n", "xlsx");
//! assert!(result.is_unsupported());
//! ```

mod doc;
mod docx;
mod pdf;

pub use doc::LegacyDocExtractor;
pub use docx::DocxExtractor;
pub use pdf::PdfExtractor;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::detect::{classify, sniff, FormatKind};
use crate::error::{Error, ErrorKind, Result};
use crate::external::{default_tools, TextExtractor};
use crate::model::ExtractedDocument;
use crate::parser::ParseOptions;
use crate::render::{to_html_with_options, HtmlOptions, JsonFormat};

/// Message returned for formats the pipeline does not handle.
pub const UNSUPPORTED_MESSAGE: &str = "No highlighting applied for non-doc/docx/pdf files";

/// Options for document conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Options passed to the format readers
    pub parse: ParseOptions,

    /// HTML rendering options
    pub html: HtmlOptions,

    /// Classify by byte signature when the format hint is empty
    pub sniff_missing_hint: bool,

    /// Try external helpers before decoding legacy documents directly
    pub use_external_tools: bool,
}

impl ConvertOptions {
    /// Create new conversion options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set parse options.
    pub fn with_parse_options(mut self, options: ParseOptions) -> Self {
        self.parse = options;
        self
    }

    /// Set HTML rendering options.
    pub fn with_html_options(mut self, options: HtmlOptions) -> Self {
        self.html = options;
        self
    }

    /// Enable or disable byte sniffing for missing hints.
    pub fn with_sniffing(mut self, sniff: bool) -> Self {
        self.sniff_missing_hint = sniff;
        self
    }

    /// Enable or disable external helpers.
    pub fn with_external_tools(mut self, enabled: bool) -> Self {
        self.use_external_tools = enabled;
        self
    }

    /// Decode legacy documents without external helpers.
    pub fn without_external_tools(self) -> Self {
        self.with_external_tools(false)
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            parse: ParseOptions::default(),
            html: HtmlOptions::default(),
            sniff_missing_hint: false,
            use_external_tools: true,
        }
    }
}

/// Pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    Classified,
    Extracted,
    Serialized,
    Done,
    Failed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Classified => "classified",
            Stage::Extracted => "extracted",
            Stage::Serialized => "serialized",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Extracts the intermediate document model from one format.
///
/// Implement this trait to add support for a new document format.
pub trait DocumentExtractor: Send + Sync {
    /// Get the name of this extractor.
    fn name(&self) -> &str;

    /// The format this extractor handles.
    fn format(&self) -> FormatKind;

    /// Extract a document from raw bytes.
    fn extract(&self, bytes: &[u8], options: &ParseOptions) -> Result<ExtractedDocument>;
}

/// The format-dispatching conversion pipeline.
///
/// The pipeline holds no per-call state; one instance can serve many
/// conversions, including from several threads.
pub struct Pipeline {
    options: ConvertOptions,
    extractors: HashMap<FormatKind, Arc<dyn DocumentExtractor>>,
}

impl Pipeline {
    /// Create a pipeline with default options and extractors.
    pub fn new() -> Self {
        Self::with_options(ConvertOptions::default())
    }

    /// Create a pipeline with the default extractors.
    pub fn with_options(options: ConvertOptions) -> Self {
        let tools = if options.use_external_tools {
            default_tools()
        } else {
            Vec::new()
        };

        let mut pipeline = Self {
            options,
            extractors: HashMap::new(),
        };
        pipeline.register(Arc::new(PdfExtractor::new()));
        pipeline.register(Arc::new(DocxExtractor::new()));
        pipeline.register(Arc::new(LegacyDocExtractor::with_tools(tools)));
        pipeline
    }

    /// Replace the external helper strategy list used for legacy documents.
    pub fn with_tools(mut self, tools: Vec<Box<dyn TextExtractor>>) -> Self {
        self.register(Arc::new(LegacyDocExtractor::with_tools(tools)));
        self
    }

    /// Register an extractor, replacing any previous one for the same format.
    pub fn register(&mut self, extractor: Arc<dyn DocumentExtractor>) {
        self.extractors.insert(extractor.format(), extractor);
    }

    /// Get the conversion options.
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Check if a format has a registered extractor.
    pub fn supports(&self, format: FormatKind) -> bool {
        self.extractors.contains_key(&format)
    }

    /// Classify the input.
    ///
    /// The hint decides. Bytes are only sniffed when the hint is empty and
    /// sniffing is enabled.
    pub fn classify(&self, bytes: &[u8], hint: &str) -> FormatKind {
        if self.options.sniff_missing_hint && hint.trim().is_empty() {
            return sniff(bytes);
        }
        classify(hint)
    }

    /// Classify and extract the intermediate document model.
    pub fn extract(&self, bytes: &[u8], hint: &str) -> Result<ExtractedDocument> {
        let format = self.classify(bytes, hint);
        self.extract_format(bytes, hint, format)
    }

    /// Convert to an HTML string.
    pub fn convert(&self, bytes: &[u8], hint: &str) -> Result<String> {
        let doc = self.extract(bytes, hint)?;
        Ok(to_html_with_options(&doc, &self.options.html))
    }

    /// Run the full pipeline, reporting the outcome as a [`ConversionResult`].
    pub fn run(&self, bytes: &[u8], hint: &str) -> ConversionResult {
        let mut tracker = StageTracker::new(bytes.len(), hint);

        let format = self.classify(bytes, hint);
        tracker.advance(Stage::Classified);
        log::debug!("Classified as {}", format);

        let doc = match self.extract_format(bytes, hint, format) {
            Ok(doc) => doc,
            Err(e) => return tracker.fail(e),
        };
        tracker.advance(Stage::Extracted);

        let html = to_html_with_options(&doc, &self.options.html);
        tracker.advance(Stage::Serialized);

        tracker.advance(Stage::Done);
        ConversionResult::Html { html }
    }

    fn extract_format(
        &self,
        bytes: &[u8],
        hint: &str,
        format: FormatKind,
    ) -> Result<ExtractedDocument> {
        let extractor = self
            .extractors
            .get(&format)
            .ok_or_else(|| Error::UnsupportedFormat(hint.trim().to_string()))?;

        log::debug!("Extracting with {}", extractor.name());
        extractor.extract(bytes, &self.options.parse)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Follows one conversion through its states.
struct StageTracker {
    stage: Stage,
}

impl StageTracker {
    fn new(len: usize, hint: &str) -> Self {
        log::debug!("Received {} bytes with hint {:?}", len, hint);
        Self {
            stage: Stage::Received,
        }
    }

    fn advance(&mut self, next: Stage) {
        log::debug!("{} -> {}", self.stage, next);
        self.stage = next;
    }

    /// Move to `Failed`, recording the last stage reached.
    fn fail(mut self, err: Error) -> ConversionResult {
        let reached = self.stage;
        self.advance(Stage::Failed);
        if err.is_unsupported() {
            log::debug!("{}", err);
        } else {
            log::warn!("Conversion failed after {}: {}", reached, err);
        }
        ConversionResult::from_error(&err, reached)
    }
}

/// Outcome of one pipeline run.
///
/// Serializes to `{"html": ...}`, `{"message": ..., "kind": "unsupported_format"}`
/// or `{"error": {"kind": ..., "message": ..., "stage": ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConversionResult {
    /// The document converted successfully.
    Html { html: String },

    /// The format is not handled. This is an expected outcome, not a fault.
    Unsupported { message: String, kind: ErrorKind },

    /// Extraction failed.
    Failed { error: FailureInfo },
}

/// Details of a failed conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureInfo {
    /// Error classification
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
    /// Last stage reached before failing
    pub stage: Stage,
}

impl ConversionResult {
    /// Build the result for an error raised after `stage`.
    pub fn from_error(err: &Error, stage: Stage) -> Self {
        if err.is_unsupported() {
            ConversionResult::Unsupported {
                message: UNSUPPORTED_MESSAGE.to_string(),
                kind: err.kind(),
            }
        } else {
            ConversionResult::Failed {
                error: FailureInfo {
                    kind: err.kind(),
                    message: err.to_string(),
                    stage,
                },
            }
        }
    }

    /// Check if the conversion produced HTML.
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionResult::Html { .. })
    }

    /// Check if the format was unsupported.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ConversionResult::Unsupported { .. })
    }

    /// Get the HTML, if any.
    pub fn html(&self) -> Option<&str> {
        match self {
            ConversionResult::Html { html } => Some(html),
            _ => None,
        }
    }

    /// Get the error kind, if the conversion did not succeed.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ConversionResult::Html { .. } => None,
            ConversionResult::Unsupported { kind, .. } => Some(*kind),
            ConversionResult::Failed { error } => Some(error.kind),
        }
    }

    /// Serialize the response envelope.
    pub fn to_json(&self, format: JsonFormat) -> Result<String> {
        let json = match format {
            JsonFormat::Pretty => serde_json::to_string_pretty(self)?,
            JsonFormat::Compact => serde_json::to_string(self)?,
        };
        Ok(json)
    }
}
