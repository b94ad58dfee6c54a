//! HTML rendering for extracted documents.

use crate::model::{Block, ExtractedDocument, Paragraph};

use super::HtmlOptions;

/// Convert a document to HTML with default options.
///
/// # Example
/// ```
/// use dochtml::model::{ExtractedDocument, Paragraph};
/// use dochtml::render::to_html;
///
/// let mut doc = ExtractedDocument::new();
/// doc.add_paragraph(Paragraph::with_text("a < b"));
/// assert_eq!(to_html(&doc), "<html><body><p>a &lt; b</p></body></html>");
/// ```
pub fn to_html(doc: &ExtractedDocument) -> String {
    to_html_with_options(doc, &HtmlOptions::default())
}

/// Convert a document to HTML.
pub fn to_html_with_options(doc: &ExtractedDocument, options: &HtmlOptions) -> String {
    HtmlRenderer::new(options.clone()).render(doc)
}

/// HTML renderer.
///
/// Rendering is total: every document, including an empty one, produces a
/// well-formed shell.
pub struct HtmlRenderer {
    options: HtmlOptions,
    output: String,
}

impl HtmlRenderer {
    /// Create a new HTML renderer.
    pub fn new(options: HtmlOptions) -> Self {
        Self {
            options,
            output: String::new(),
        }
    }

    /// Render a document to an HTML string.
    pub fn render(mut self, doc: &ExtractedDocument) -> String {
        self.open_shell();
        for block in &doc.blocks {
            self.render_block(block);
        }
        self.output.push_str("</body></html>");
        self.output
    }

    fn open_shell(&mut self) {
        if self.options.doctype {
            self.output.push_str("<!DOCTYPE html>");
        }
        self.output.push_str("<html>");
        if let Some(title) = self.options.title.as_deref() {
            self.output.push_str("<head><meta charset=\"utf-8\"><title>");
            escape_into(&mut self.output, title);
            self.output.push_str("</title></head>");
        }
        self.output.push_str("<body>");
    }

    fn render_block(&mut self, block: &Block) {
        match block {
            Block::Paragraph(p) => self.render_paragraph(p),
            Block::PageBreak => {
                self.output.push_str("<div class=\"");
                escape_into(&mut self.output, &self.options.page_break_class);
                self.output.push_str("\"></div>");
            }
        }
    }

    fn render_paragraph(&mut self, para: &Paragraph) {
        self.output.push_str("<p>");
        for run in &para.runs {
            if self.options.preserve_line_breaks {
                let mut lines = run.text.split('\n');
                if let Some(first) = lines.next() {
                    escape_into(&mut self.output, first);
                }
                for line in lines {
                    self.output.push_str("<br>");
                    escape_into(&mut self.output, line);
                }
            } else {
                escape_into(&mut self.output, &run.text);
            }
        }
        self.output.push_str("</p>");
    }
}

/// Escape text for use in element content or a double-quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(&mut out, text);
    out
}

fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}
