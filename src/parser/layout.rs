//! Reading-order text recovery for PDF pages.
//!
//! Content streams may draw text in any order. The page's text operators are
//! replayed against a text matrix to place each string, then the strings are
//! grouped into lines and read top to bottom, left to right.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use lopdf::content::Content;
use lopdf::{Document as LopdfDocument, Encoding, Object, ObjectId};

use crate::error::Result;

/// Default leading when a stream moves to the next line without setting one.
const DEFAULT_LEADING: f32 = 12.0;

/// `TJ` adjustment (thousandths of an em) treated as a word gap.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// A string placed on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// Decoded text
    pub text: String,
    /// X position of the first glyph
    pub x: f32,
    /// Baseline Y position (PDF space, grows upwards)
    pub y: f32,
    /// Effective font size in points
    pub font_size: f32,
}

impl TextSpan {
    /// Create a new span.
    pub fn new(text: impl Into<String>, x: f32, y: f32, font_size: f32) -> Self {
        Self {
            text: text.into(),
            x,
            y,
            font_size,
        }
    }

    /// Approximate advance width, assuming half an em per character.
    fn estimated_width(&self) -> f32 {
        self.text.chars().count() as f32 * self.font_size * 0.5
    }
}

/// Spans sharing a baseline, ordered left to right.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// The spans, sorted by X
    pub spans: Vec<TextSpan>,
    /// Baseline of the first span
    pub y: f32,
}

impl TextLine {
    fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
        let y = spans.first().map_or(0.0, |s| s.y);
        Self { spans, y }
    }

    /// Line text, with a space wherever two spans are visibly apart.
    pub fn text(&self) -> String {
        let mut result = String::new();

        for (i, span) in self.spans.iter().enumerate() {
            if i > 0 {
                let prev = &self.spans[i - 1];
                let gap = span.x - (prev.x + prev.estimated_width());
                let threshold = span.font_size * 0.1;

                let touching_space = prev.text.ends_with(char::is_whitespace)
                    || span.text.starts_with(char::is_whitespace);
                let both_spaceless = prev
                    .text
                    .chars()
                    .last()
                    .zip(span.text.chars().next())
                    .is_some_and(|(a, b)| is_spaceless_script_char(a) && is_spaceless_script_char(b));

                if gap > threshold && !touching_space && !both_spaceless {
                    result.push(' ');
                }
            }
            result.push_str(&span.text);
        }

        result
    }
}

/// Recover the text of one page in reading order, one line per `\n`.
pub fn page_text(doc: &LopdfDocument, page_id: ObjectId) -> Result<String> {
    let spans = page_spans(doc, page_id)?;
    let lines = group_spans_into_lines(spans);

    Ok(lines
        .iter()
        .map(TextLine::text)
        .collect::<Vec<_>>()
        .join("\n"))
}

/// Place every string the page's content stream shows.
pub fn page_spans(doc: &LopdfDocument, page_id: ObjectId) -> Result<Vec<TextSpan>> {
    let fonts = doc.get_page_fonts(page_id)?;
    let encodings: BTreeMap<Vec<u8>, Encoding> = fonts
        .into_iter()
        .filter(|(_, font)| font.type_is(b"Font"))
        .filter_map(|(name, font)| match font.get_font_encoding(doc) {
            Ok(encoding) => Some((name, encoding)),
            Err(e) => {
                log::debug!("Font {} has no usable encoding: {}", String::from_utf8_lossy(&name), e);
                None
            }
        })
        .collect();

    let content = Content::decode(&doc.get_page_content(page_id)?)?;
    Ok(replay_text_operations(&content, &encodings))
}

/// Walk the text operators, tracking the text matrix.
fn replay_text_operations(content: &Content, encodings: &BTreeMap<Vec<u8>, Encoding>) -> Vec<TextSpan> {
    let mut spans = Vec::new();
    let mut matrix = TextMatrix::default();
    let mut encoding: Option<&Encoding> = None;
    let mut font_size = 12.0;
    let mut in_text = false;

    for op in &content.operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "BT" => {
                in_text = true;
                matrix.reset();
            }
            "ET" => in_text = false,
            "Tf" => {
                if let Some(name) = operands.first().and_then(|o| o.as_name().ok()) {
                    encoding = encodings.get(name);
                }
                font_size = operands.get(1).and_then(number).unwrap_or(font_size);
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    matrix.leading = leading;
                }
            }
            "Td" | "TD" => {
                let tx = operands.first().and_then(number).unwrap_or(0.0);
                let ty = operands.get(1).and_then(number).unwrap_or(0.0);
                if op.operator == "TD" {
                    matrix.leading = -ty;
                }
                matrix.translate(tx, ty);
            }
            "Tm" => {
                if operands.len() >= 6 {
                    let v: Vec<f32> = operands.iter().map(|o| number(o).unwrap_or(0.0)).collect();
                    matrix.set(v[0], v[1], v[2], v[3], v[4], v[5]);
                }
            }
            "T*" => matrix.next_line(),
            "Tj" | "TJ" | "'" | "\"" => {
                if op.operator == "'" || op.operator == "\"" {
                    matrix.next_line();
                }
                if !in_text {
                    continue;
                }

                let shown = match op.operator.as_str() {
                    "\"" => operands.get(2),
                    _ => operands.first(),
                };
                let text = match shown {
                    Some(Object::Array(items)) => decode_tj_array(items, encoding),
                    Some(Object::String(bytes, _)) => decode_string(bytes, encoding),
                    _ => String::new(),
                };

                if !text.trim().is_empty() {
                    let (x, y) = matrix.position();
                    let span = TextSpan::new(text, x, y, font_size * matrix.scale());
                    matrix.advance(span.estimated_width() / matrix.scale().max(f32::EPSILON));
                    spans.push(span);
                }
            }
            _ => {}
        }
    }

    spans
}

/// Sort spans top to bottom and merge those within 30% of a font size into lines.
pub fn group_spans_into_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    // PDF Y grows upwards, so the top of the page has the largest Y
    spans.sort_by(|a, b| match b.y.partial_cmp(&a.y).unwrap_or(Ordering::Equal) {
        Ordering::Equal => a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal),
        other => other,
    });

    let mut lines = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in spans {
        let tolerance = span.font_size * 0.3;
        match current_y {
            Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    lines.push(TextLine::from_spans(std::mem::take(&mut current)));
                }
                current_y = Some(span.y);
                current.push(span);
            }
        }
    }

    if !current.is_empty() {
        lines.push(TextLine::from_spans(current));
    }

    lines
}

fn decode_string(bytes: &[u8], encoding: Option<&Encoding>) -> String {
    match encoding {
        Some(enc) => LopdfDocument::decode_text(enc, bytes).unwrap_or_else(|_| decode_text_simple(bytes)),
        None => decode_text_simple(bytes),
    }
}

/// Decode a `TJ` array; large negative adjustments become spaces.
fn decode_tj_array(items: &[Object], encoding: Option<&Encoding>) -> String {
    let mut combined = String::new();

    for item in items {
        match item {
            Object::String(bytes, _) => combined.push_str(&decode_string(bytes, encoding)),
            other => {
                let Some(adjustment) = number(other) else {
                    continue;
                };
                let needs_space = -adjustment > TJ_SPACE_THRESHOLD
                    && !combined.is_empty()
                    && !combined.ends_with(char::is_whitespace)
                    && !combined.chars().last().is_some_and(is_spaceless_script_char);
                if needs_space {
                    combined.push(' ');
                }
            }
        }
    }

    combined
}

/// Fallback for fonts without a usable encoding: UTF-16BE with BOM, UTF-8, then Latin-1.
fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Scripts written without spaces between words.
fn is_spaceless_script_char(c: char) -> bool {
    matches!(c as u32,
        0x3000..=0x303F // CJK symbols and punctuation
        | 0x3040..=0x30FF // Hiragana, Katakana
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0x20000..=0x2EBEF)
}

/// Text matrix and line matrix state.
#[derive(Debug, Clone)]
struct TextMatrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
    // Start of the current line
    line_e: f32,
    line_f: f32,
    leading: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
            line_e: 0.0,
            line_f: 0.0,
            leading: DEFAULT_LEADING,
        }
    }
}

impl TextMatrix {
    /// Identity matrix at `BT`; leading persists across text objects.
    fn reset(&mut self) {
        *self = Self {
            leading: self.leading,
            ..Self::default()
        };
    }

    fn set(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        self.a = a;
        self.b = b;
        self.c = c;
        self.d = d;
        self.e = e;
        self.f = f;
        self.line_e = e;
        self.line_f = f;
    }

    /// Move to the start of the next line, offset from the current line start.
    fn translate(&mut self, tx: f32, ty: f32) {
        self.line_e += tx * self.a + ty * self.c;
        self.line_f += tx * self.b + ty * self.d;
        self.e = self.line_e;
        self.f = self.line_f;
    }

    fn next_line(&mut self) {
        self.translate(0.0, -self.leading);
    }

    /// Move along the baseline after showing text.
    fn advance(&mut self, tx: f32) {
        self.e += tx * self.a;
        self.f += tx * self.b;
    }

    fn position(&self) -> (f32, f32) {
        (self.e, self.f)
    }

    fn scale(&self) -> f32 {
        (self.a * self.a + self.c * self.c).sqrt()
    }
}
