//! Fixture builders shared by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

// ==================== Compound files ====================

const ENDOFCHAIN: u32 = 0xFFFF_FFFE;
const FREESECT: u32 = 0xFFFF_FFFF;
const FATSECT: u32 = 0xFFFF_FFFD;
const NOSTREAM: u32 = 0xFFFF_FFFF;
const MINI_SECTOR: usize = 64;
const MINI_STREAM_CUTOFF: usize = 4096;
const DIRENTRY: usize = 128;

pub const MAGIC: &[u8; 8] = b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1";

/// Builds a compound-file container holding streams under the root storage.
///
/// Layout: FAT in sector 0, directory from sector 1, then the mini FAT, the
/// mini stream and the regular streams. Streams below 4096 bytes go to the
/// mini stream.
pub struct CfbBuilder {
    sector_size: usize,
    streams: Vec<(String, Vec<u8>)>,
}

impl CfbBuilder {
    /// Version 3 container with 512-byte sectors.
    pub fn new() -> Self {
        Self {
            sector_size: 512,
            streams: Vec::new(),
        }
    }

    /// Version 4 container with 4096-byte sectors.
    pub fn v4() -> Self {
        Self {
            sector_size: 4096,
            streams: Vec::new(),
        }
    }

    pub fn stream(mut self, name: &str, data: &[u8]) -> Self {
        self.streams.push((name.to_string(), data.to_vec()));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let ss = self.sector_size;
        let mut fat: Vec<u32> = vec![FATSECT];
        let mut body = vec![0u8; ss];

        // Directory, filled in once every start sector is known
        let dir_bytes = (self.streams.len() + 1) * DIRENTRY;
        let dir_sectors = (dir_bytes + ss - 1) / ss;
        let dir_start = append_chain(&mut body, &mut fat, &vec![0u8; dir_sectors * ss], ss);

        let mut ministream = Vec::new();
        let mut minifat: Vec<u32> = Vec::new();
        let mut starts = vec![ENDOFCHAIN; self.streams.len()];

        for (i, (_, data)) in self.streams.iter().enumerate() {
            if data.is_empty() || data.len() >= MINI_STREAM_CUTOFF {
                continue;
            }
            let first = (ministream.len() / MINI_SECTOR) as u32;
            let count = (data.len() + MINI_SECTOR - 1) / MINI_SECTOR;
            for k in 0..count {
                let next = if k + 1 < count {
                    first + k as u32 + 1
                } else {
                    ENDOFCHAIN
                };
                minifat.push(next);
            }
            ministream.extend_from_slice(data);
            ministream.resize(ministream.len() + (MINI_SECTOR - data.len() % MINI_SECTOR) % MINI_SECTOR, 0);
            starts[i] = first;
        }

        let minifat_bytes: Vec<u8> = minifat.iter().flat_map(|v| v.to_le_bytes()).collect();
        let minifat_start = append_chain(&mut body, &mut fat, &minifat_bytes, ss);
        let minifat_sectors = (minifat_bytes.len() + ss - 1) / ss;
        let root_start = append_chain(&mut body, &mut fat, &ministream, ss);

        for (i, (_, data)) in self.streams.iter().enumerate() {
            if data.len() >= MINI_STREAM_CUTOFF {
                starts[i] = append_chain(&mut body, &mut fat, data, ss);
            }
        }

        assert!(fat.len() <= ss / 4, "fixture needs more than one FAT sector");
        let mut fat_sector = Vec::with_capacity(ss);
        for i in 0..ss / 4 {
            let value = fat.get(i).copied().unwrap_or(FREESECT);
            fat_sector.extend_from_slice(&value.to_le_bytes());
        }
        body[..ss].copy_from_slice(&fat_sector);

        let dir_offset = ss;
        let n = self.streams.len();
        write_entry(
            &mut body[dir_offset..dir_offset + DIRENTRY],
            "Root Entry",
            5,
            NOSTREAM,
            if n > 0 { 1 } else { NOSTREAM },
            root_start,
            ministream.len() as u64,
        );
        for (i, (name, data)) in self.streams.iter().enumerate() {
            let sid = i + 1;
            let right = if sid < n { sid as u32 + 1 } else { NOSTREAM };
            let offset = dir_offset + sid * DIRENTRY;
            write_entry(
                &mut body[offset..offset + DIRENTRY],
                name,
                2,
                right,
                NOSTREAM,
                starts[i],
                data.len() as u64,
            );
        }

        let mut header = vec![0u8; ss];
        header[..8].copy_from_slice(MAGIC);
        put_u16(&mut header, 24, 0x3E);
        put_u16(&mut header, 26, if ss == 512 { 3 } else { 4 });
        put_u16(&mut header, 28, 0xFFFE);
        put_u16(&mut header, 30, if ss == 512 { 9 } else { 12 });
        put_u16(&mut header, 32, 6);
        put_u32(&mut header, 40, if ss == 512 { 0 } else { dir_sectors as u32 });
        put_u32(&mut header, 44, 1);
        put_u32(&mut header, 48, dir_start);
        put_u32(&mut header, 56, MINI_STREAM_CUTOFF as u32);
        put_u32(&mut header, 60, minifat_start);
        put_u32(&mut header, 64, minifat_sectors as u32);
        put_u32(&mut header, 68, ENDOFCHAIN);
        put_u32(&mut header, 72, 0);
        put_u32(&mut header, 76, 0);
        for i in 1..109 {
            put_u32(&mut header, 76 + i * 4, FREESECT);
        }

        header.extend_from_slice(&body);
        header
    }
}

/// Append `data` as a sector chain and return its first sector.
fn append_chain(body: &mut Vec<u8>, fat: &mut Vec<u32>, data: &[u8], ss: usize) -> u32 {
    if data.is_empty() {
        return ENDOFCHAIN;
    }
    let first = (body.len() / ss) as u32;
    let count = (data.len() + ss - 1) / ss;
    for k in 0..count {
        fat.push(if k + 1 < count {
            first + k as u32 + 1
        } else {
            ENDOFCHAIN
        });
    }
    body.extend_from_slice(data);
    body.resize(((first as usize) + count) * ss, 0);
    first
}

fn write_entry(buf: &mut [u8], name: &str, kind: u8, right: u32, child: u32, start: u32, size: u64) {
    let units: Vec<u16> = name.encode_utf16().collect();
    for (i, unit) in units.iter().enumerate() {
        buf[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
    }
    put_u16(buf, 64, ((units.len() + 1) * 2) as u16);
    buf[66] = kind;
    buf[67] = 1;
    put_u32(buf, 68, NOSTREAM);
    put_u32(buf, 72, right);
    put_u32(buf, 76, child);
    put_u32(buf, 116, start);
    buf[120..128].copy_from_slice(&size.to_le_bytes());
}

fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Overwrite the declared size of directory entry `sid` in a v3 container built by [`CfbBuilder`].
pub fn patch_stream_size(file: &mut [u8], sid: usize, size: u64) {
    // Header (512) + FAT sector (512), then the directory
    let offset = 1024 + sid * DIRENTRY + 120;
    file[offset..offset + 8].copy_from_slice(&size.to_le_bytes());
}

/// A `WordDocument` stream: a file information block followed by the text range.
pub fn word_stream(text: &str) -> Vec<u8> {
    const TEXT_START: usize = 0x400;
    let mut stream = vec![0u8; TEXT_START];
    stream[0..2].copy_from_slice(&0xA5ECu16.to_le_bytes());
    stream[0x18..0x1C].copy_from_slice(&(TEXT_START as u32).to_le_bytes());
    stream[0x1C..0x20].copy_from_slice(&((TEXT_START + text.len()) as u32).to_le_bytes());
    stream.extend_from_slice(text.as_bytes());
    stream
}

/// A `WordDocument` stream padded past the mini-stream cutoff.
pub fn large_word_stream(text: &str) -> Vec<u8> {
    let mut stream = word_stream(text);
    stream.resize(6000, 0);
    stream
}

// ==================== DOCX packages ====================

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

/// Package relationships pointing at `target`.
pub fn package_rels(target: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="{}"/></Relationships>"#,
        target
    )
}

/// Wrap body markup in a main document part.
pub fn document_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr/></w:body></w:document>"#,
        body
    )
}

/// Zip the given parts into a package.
pub fn zip_package(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// A DOCX whose body is the given markup.
pub fn docx_from_body(body: &str) -> Vec<u8> {
    let rels = package_rels("word/document.xml");
    let document = document_xml(body);
    zip_package(&[
        ("[Content_Types].xml", CONTENT_TYPES),
        ("_rels/.rels", &rels),
        ("word/document.xml", &document),
    ])
}

/// A DOCX with one single-run paragraph per entry; empty entries become `<w:p/>`.
pub fn docx_from_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
    let mut body = String::new();
    for text in paragraphs {
        if text.is_empty() {
            body.push_str("<w:p/>");
        } else {
            body.push_str(&format!(
                r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
                escape_xml(text)
            ));
        }
    }
    docx_from_body(&body)
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ==================== PDF documents ====================

/// A PDF with one line of text per page.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut doc = build_pdf(pages);
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// A PDF whose trailer declares standard security.
pub fn encrypted_pdf() -> Vec<u8> {
    let mut doc = build_pdf(&["secret"]);
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "O" => Object::string_literal(vec![0x11u8; 32]),
        "U" => Object::string_literal(vec![0x22u8; 32]),
        "P" => -4,
    });
    doc.trailer.set("Encrypt", encrypt_id);
    doc.trailer.set(
        "ID",
        vec![
            Object::string_literal(vec![0x33u8; 16]),
            Object::string_literal(vec![0x33u8; 16]),
        ],
    );
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn build_pdf(pages: &[&str]) -> Document {
    let pages: Vec<Vec<Operation>> = pages.iter().map(|text| line_at(text, 72, 700)).collect();
    build_pdf_from_operations(&pages)
}

/// Operations drawing one line of text at (`x`, `y`).
pub fn line_at(text: &str, x: i64, y: i64) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 24.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}

/// A PDF with one page per operation list.
pub fn pdf_from_operations(pages: &[Vec<Operation>]) -> Vec<u8> {
    let mut doc = build_pdf_from_operations(pages);
    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn build_pdf_from_operations(pages: &[Vec<Operation>]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for operations in pages {
        let content = Content {
            operations: operations.clone(),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}
