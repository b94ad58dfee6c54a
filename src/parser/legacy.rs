//! Best-effort text recovery for Word 97-2003 documents.
//!
//! The text lives in the `WordDocument` stream of the compound-file
//! container. Character and paragraph formatting tables are not parsed, so
//! the whole document comes back as one block of text.

use encoding_rs::WINDOWS_1252;

use crate::error::{Error, Result};

use super::cfb::CompoundFile;

/// Name of the stream holding the document text.
pub const TEXT_STREAM_NAME: &str = "WordDocument";

/// Signature of the file information block at the start of the text stream.
const FIB_IDENT: u16 = 0xA5EC;
const FIB_FC_MIN: usize = 0x18;
const FIB_FC_MAC: usize = 0x1C;

/// Read the plain text of a legacy Word document without any external helper.
///
/// # Errors
///
/// * [`Error::NotACompoundFile`] if the container signature or header is invalid
/// * [`Error::StreamNotFound`] if the container has no `WordDocument` stream
/// * [`Error::Truncated`] if the stream's sector chain runs past the data
pub fn read_legacy_doc(data: &[u8]) -> Result<String> {
    let cfb = CompoundFile::open(data)?;
    let entry = cfb
        .find_stream(TEXT_STREAM_NAME)
        .ok_or_else(|| Error::StreamNotFound(TEXT_STREAM_NAME.to_string()))?;

    log::debug!(
        "Reading {} stream: {} bytes from sector {}",
        entry.name,
        entry.size,
        entry.start_sector
    );
    let stream = cfb.read_stream(entry)?;
    Ok(decode_word_text(text_region(&stream)))
}

/// Narrow the stream to the `fcMin..fcMac` text range when a valid FIB is present.
fn text_region(stream: &[u8]) -> &[u8] {
    let read_u32 = |offset: usize| {
        stream
            .get(offset..offset + 4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
    };

    let ident = stream.get(0..2).map(|b| u16::from_le_bytes([b[0], b[1]]));
    if ident != Some(FIB_IDENT) {
        return stream;
    }

    match (read_u32(FIB_FC_MIN), read_u32(FIB_FC_MAC)) {
        (Some(fc_min), Some(fc_mac)) if fc_min < fc_mac && fc_mac <= stream.len() => {
            &stream[fc_min..fc_mac]
        }
        _ => {
            log::warn!("Text stream has a file information block with an unusable text range");
            stream
        }
    }
}

/// Decode single-byte text, dropping padding and Word control marks.
fn decode_word_text(bytes: &[u8]) -> String {
    let (decoded, _) = WINDOWS_1252.decode_without_bom_handling(bytes);

    let mut text = String::with_capacity(decoded.len());
    for ch in decoded.chars() {
        match ch {
            '\0' => {}
            // Paragraph mark, vertical tab (manual line break), page/section break
            '\r' | '\n' | '\u{0B}' | '\u{0C}' => text.push('\n'),
            // Table cell mark
            '\u{07}' | '\t' => text.push('\t'),
            c if c.is_control() => {}
            c => text.push(c),
        }
    }

    let trimmed = text.trim_end().len();
    text.truncate(trimmed);
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_strips_nul_padding() {
        let mut bytes = b"Hello legacy world".to_vec();
        bytes.extend_from_slice(&[0u8; 64]);
        assert_eq!(decode_word_text(&bytes), "Hello legacy world");
    }

    #[test]
    fn test_decode_maps_word_marks() {
        let bytes = b"First\rSecond\x0bline\x07cell\x13 HYPERLINK \x14link\x15";
        assert_eq!(
            decode_word_text(bytes),
            "First\nSecond\nline\tcell HYPERLINK link"
        );
    }

    #[test]
    fn test_decode_windows_1252() {
        // 0x93/0x94 are curly quotes, 0xE9 is e-acute
        assert_eq!(decode_word_text(b"\x93caf\xe9\x94"), "\u{201C}caf\u{e9}\u{201D}");
    }

    #[test]
    fn test_text_region_without_fib() {
        let stream = b"plain text stream";
        assert_eq!(text_region(stream), stream);
    }

    #[test]
    fn test_text_region_with_fib() {
        let mut stream = vec![0u8; 0x40];
        stream[0..2].copy_from_slice(&FIB_IDENT.to_le_bytes());
        stream[FIB_FC_MIN..FIB_FC_MIN + 4].copy_from_slice(&0x40u32.to_le_bytes());
        stream[FIB_FC_MAC..FIB_FC_MAC + 4].copy_from_slice(&0x45u32.to_le_bytes());
        stream.extend_from_slice(b"Hello, trailing binary tables");

        assert_eq!(text_region(&stream), b"Hello");
    }

    #[test]
    fn test_text_region_with_bad_fib_range() {
        let mut stream = vec![0u8; 0x40];
        stream[0..2].copy_from_slice(&FIB_IDENT.to_le_bytes());
        stream[FIB_FC_MIN..FIB_FC_MIN + 4].copy_from_slice(&0x30u32.to_le_bytes());
        stream[FIB_FC_MAC..FIB_FC_MAC + 4].copy_from_slice(&0x9999u32.to_le_bytes());

        assert_eq!(text_region(&stream).len(), stream.len());
    }

    #[test]
    fn test_read_legacy_doc_rejects_other_formats() {
        assert!(matches!(
            read_legacy_doc(b"%PDF-1.7"),
            Err(Error::NotACompoundFile(_))
        ));
    }
}
