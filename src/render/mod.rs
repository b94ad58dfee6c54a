//! Rendering module for converting extracted documents to output formats.

mod html;
mod json;
mod options;

pub use html::{escape_html, to_html, to_html_with_options, HtmlRenderer};
pub use json::{to_json, JsonFormat};
pub use options::HtmlOptions;
