//! DOCX package walker.
//!
//! Opens the OPC package, resolves the main document part through the
//! package relationships and walks its `w:p`/`w:r` tree. Only literal run
//! text survives; formatting, fields and embedded objects are dropped.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::model::{ExtractedDocument, Paragraph};

/// Package-level relationships part.
const PACKAGE_RELS: &str = "_rels/.rels";

/// Conventional location of the main document part.
const DEFAULT_MAIN_PART: &str = "word/document.xml";

/// Relationship type suffix shared by transitional and strict OOXML.
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";

/// Read a DOCX package into paragraphs.
///
/// # Errors
///
/// * [`Error::NotAPackage`] if the bytes are not a ZIP archive or the markup is malformed
/// * [`Error::StructureMissing`] if the main document part or its body is missing
pub fn read_docx(data: &[u8]) -> Result<ExtractedDocument> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    let part = main_document_part(&mut archive)?;
    log::debug!("Main document part: {}", part);

    let xml = read_part(&mut archive, &part)?.ok_or_else(|| {
        Error::StructureMissing(format!("main document part {} not found", part))
    })?;

    parse_document_xml(&xml)
}

/// Read a part from the archive, `None` if it does not exist.
fn read_part<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf)
        .map_err(|e| Error::NotAPackage(format!("{}: {}", name, e)))?;
    Ok(Some(buf))
}

/// Resolve the main document part from `_rels/.rels`, falling back to the conventional path.
fn main_document_part<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>) -> Result<String> {
    let Some(rels) = read_part(archive, PACKAGE_RELS)? else {
        return Ok(DEFAULT_MAIN_PART.to_string());
    };

    let mut reader = Reader::from_reader(&rels[..]);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut rel_type = None;
                let mut target = None;
                for attr in e.attributes().flatten() {
                    let value = attr
                        .unescape_value()
                        .map(|v| v.into_owned())
                        .unwrap_or_default();
                    match attr.key.local_name().as_ref() {
                        b"Type" => rel_type = Some(value),
                        b"Target" => target = Some(value),
                        _ => {}
                    }
                }

                if let (Some(rel_type), Some(target)) = (rel_type, target) {
                    if rel_type.ends_with(OFFICE_DOCUMENT_REL) {
                        return Ok(target.trim_start_matches('/').to_string());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    log::warn!("Package relationships name no main document, using {}", DEFAULT_MAIN_PART);
    Ok(DEFAULT_MAIN_PART.to_string())
}

/// Walk the main document markup into paragraphs.
///
/// Empty paragraphs are kept so paragraph indices stay aligned with the source.
pub fn parse_document_xml(xml: &[u8]) -> Result<ExtractedDocument> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut doc = ExtractedDocument::new();
    let mut saw_body = false;
    let mut paragraph: Option<Paragraph> = None;
    let mut run: Option<String> = None;
    let mut in_text = false;
    // Depth inside content that belongs to an embedded object (text boxes, fallbacks).
    let mut skip_depth = 0usize;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = e.local_name();
                let name = name.as_ref();

                if is_skipped_container(name) {
                    if !is_empty {
                        skip_depth += 1;
                    }
                } else if skip_depth == 0 {
                    match name {
                        b"body" => saw_body = true,
                        b"p" if paragraph.is_none() => {
                            if is_empty {
                                doc.add_paragraph(Paragraph::new());
                            } else {
                                paragraph = Some(Paragraph::new());
                            }
                        }
                        b"r" if paragraph.is_some() => {
                            if is_empty {
                                if let Some(p) = paragraph.as_mut() {
                                    p.add_text("");
                                }
                            } else {
                                run = Some(String::new());
                            }
                        }
                        b"t" if !is_empty => in_text = run.is_some(),
                        b"tab" => push_run_text(&mut run, "\t"),
                        b"br" | b"cr" => push_run_text(&mut run, "\n"),
                        _ => {}
                    }
                }
            }
            Event::Text(ref e) if in_text && skip_depth == 0 => {
                let text = e.unescape()?;
                push_run_text(&mut run, &text);
            }
            Event::CData(ref e) if in_text && skip_depth == 0 => {
                push_run_text(&mut run, &String::from_utf8_lossy(e));
            }
            Event::End(ref e) => {
                let name = e.local_name();
                let name = name.as_ref();

                if is_skipped_container(name) {
                    skip_depth = skip_depth.saturating_sub(1);
                } else if skip_depth == 0 {
                    match name {
                        b"t" => in_text = false,
                        b"r" => {
                            if let (Some(p), Some(text)) = (paragraph.as_mut(), run.take()) {
                                p.add_text(text);
                            }
                        }
                        b"p" => {
                            if let Some(p) = paragraph.take() {
                                doc.add_paragraph(p);
                            }
                        }
                        _ => {}
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_body {
        return Err(Error::StructureMissing(
            "main document part has no body".to_string(),
        ));
    }

    Ok(doc)
}

/// Containers whose text belongs to embedded objects rather than the paragraph.
fn is_skipped_container(local_name: &[u8]) -> bool {
    matches!(local_name, b"txbxContent" | b"Fallback" | b"del")
}

fn push_run_text(run: &mut Option<String>, text: &str) {
    if let Some(run) = run.as_mut() {
        run.push_str(text);
    }
}
