//! HTML rendering options.

/// Options for serializing a document to HTML.
///
/// The defaults produce the bare `<html><body>…</body></html>` shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlOptions {
    /// Prepend `<!DOCTYPE html>`
    pub doctype: bool,

    /// Document title, emitted in a `<head>` element when set
    pub title: Option<String>,

    /// Class attribute of the page separator element
    pub page_break_class: String,

    /// Render line breaks inside a paragraph as `<br>`
    pub preserve_line_breaks: bool,
}

impl HtmlOptions {
    /// Create new HTML options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the doctype declaration.
    pub fn with_doctype(mut self, doctype: bool) -> Self {
        self.doctype = doctype;
        self
    }

    /// Set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the class of page separator elements.
    pub fn with_page_break_class(mut self, class: impl Into<String>) -> Self {
        self.page_break_class = class.into();
        self
    }

    /// Enable or disable line break preservation.
    pub fn with_line_breaks(mut self, preserve: bool) -> Self {
        self.preserve_line_breaks = preserve;
        self
    }
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            doctype: false,
            title: None,
            page_break_class: "page-break".to_string(),
            preserve_line_breaks: false,
        }
    }
}
