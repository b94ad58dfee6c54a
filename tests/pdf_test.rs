//! Integration tests for the PDF page extractor.

mod common;

use common::{encrypted_pdf, line_at, pdf_from_operations, pdf_with_pages};
use dochtml::detect::detect_pdf_version;
use dochtml::parser::{read_pdf, LopdfSource, PageSource};
use dochtml::render::to_html;
use dochtml::{Block, ErrorKind};

#[test]
fn test_three_pages_interleave_two_breaks() {
    let data = pdf_with_pages(&["A", "B", "C"]);
    let doc = read_pdf(&data).unwrap();

    assert_eq!(doc.blocks.len(), 5);
    assert_eq!(doc.page_break_count(), 2);
    for (i, block) in doc.blocks.iter().enumerate() {
        assert_eq!(block.is_page_break(), i % 2 == 1, "block {}", i);
    }

    let texts: Vec<String> = doc.paragraphs().map(|p| p.text()).collect();
    assert_eq!(texts, vec!["A", "B", "C"]);
}

#[test]
fn test_pages_render_with_separators() {
    let data = pdf_with_pages(&["one", "two"]);
    let html = to_html(&read_pdf(&data).unwrap());
    assert_eq!(
        html,
        "<html><body><p>one</p><div class=\"page-break\"></div><p>two</p></body></html>"
    );
}

#[test]
fn test_single_page_has_no_break() {
    let doc = read_pdf(&pdf_with_pages(&["solo"])).unwrap();
    assert_eq!(doc.blocks.len(), 1);
    assert!(matches!(doc.blocks[0], Block::Paragraph(_)));
}

#[test]
fn test_zero_pages() {
    let doc = read_pdf(&pdf_with_pages(&[])).unwrap();
    assert!(doc.is_empty());
    assert_eq!(to_html(&doc), "<html><body></body></html>");
}

#[test]
fn test_page_source() {
    let data = pdf_with_pages(&["x", "y"]);
    let source = LopdfSource::load(&data).unwrap();
    assert_eq!(source.version(), "1.5");
    assert_eq!(source.page_numbers(), vec![1, 2]);
    assert_eq!(source.page_text(2).unwrap().trim(), "y");
}

#[test]
fn test_version_header() {
    let data = pdf_with_pages(&["x"]);
    assert_eq!(detect_pdf_version(&data).as_deref(), Some("1.5"));
}

#[test]
fn test_garbage_is_not_a_pdf() {
    let err = read_pdf(b"definitely not a pdf").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotAPdf);
}

#[test]
fn test_truncated_pdf_fails() {
    let data = pdf_with_pages(&["A", "B"]);
    assert!(read_pdf(&data[..64]).is_err());
}

#[test]
fn test_encrypted_pdf_is_not_converted() {
    let err = read_pdf(&encrypted_pdf()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Encrypted, "unexpected error: {}", err);
}

#[test]
fn test_page_text_follows_reading_order() {
    // The bottom line is drawn first
    let mut page = line_at("Bottom", 72, 100);
    page.extend(line_at("Top", 72, 700));
    let doc = read_pdf(&pdf_from_operations(&[page])).unwrap();

    assert_eq!(doc.plain_text(), "Top\nBottom");
}

#[test]
fn test_same_line_reads_left_to_right() {
    let mut page = line_at("world", 300, 500);
    page.extend(line_at("Hello", 72, 500));
    page.extend(line_at("Header", 72, 780));
    let doc = read_pdf(&pdf_from_operations(&[page])).unwrap();

    assert_eq!(doc.plain_text(), "Header\nHello world");
}
