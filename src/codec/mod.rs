//! # Shape Codec
//!
//! Text format of MSTS/ORTS `.s` shape files.
//!
//! ## Pipeline
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Lexer | [`lexer`] | lazy token stream |
//! | Parser | [`parser`] | generic [`Block`] tree |
//! | Mapper | [`mapper`] | typed [`Shape`] |
//! | Serializer | [`serializer`] | text |
//!
//! [`header`] classifies raw bytes without parsing and is consulted by
//! [`decode_bytes`] first, so compressed input fails fast.
//!
//! ## Example
//!
//! ```
//! use shapeio::codec;
//!
//! let text = "SIMISA@@@@@@@@@@JINX0s1t______\n\nshape (\n\tshape_header ( 00000000 00000000 )\n)\n";
//! let mut shape = codec::decode(text).unwrap();
//! shape.points.push(shapeio::domain::Point::new(1.0, 2.0, 3.0));
//!
//! let out = codec::encode(&shape).unwrap();
//! assert!(out.contains("points ( 1\n\t\tpoint ( 1 2 3 )\n\t)"));
//! ```

pub mod encoding;
pub mod header;
pub mod lexer;
pub mod mapper;
pub mod parser;
pub mod serializer;
pub mod tree;

use thiserror::Error;
use tracing::debug;

pub use encoding::{EncodingError, TextEncoding};
pub use header::{inspect, inspect_file, inspect_str, Format, Variant, PROBE_LEN, TEXT_SIGNATURE};
pub use lexer::LexError;
pub use mapper::{DecodeOptions, FromBlock, SchemaError, UnknownBlocks, SECTIONS};
pub use parser::ParseError;
pub use serializer::{EncodeError, FormatOptions, LineEnding, ToBlock};
pub use tree::{Block, Leaf, Literal, Node};

use crate::domain::Shape;
use header::SIMIS_PREFIX;
use lexer::Lexer;
use parser::Parser;

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Input is compressed; decompress it before decoding")]
    CompressedInput,

    #[error("Binary shape files are not supported")]
    UnsupportedVariant,

    #[error("Unrecognized header '{0}'")]
    UnrecognizedHeader(String),

    #[error("Invalid text encoding: {0}")]
    Encoding(#[from] EncodingError),
}

/// Decodes shape text with default options
pub fn decode(text: &str) -> Result<Shape, DecodeError> {
    decode_with(text, &DecodeOptions::default())
}

/// Decodes shape text. The signature line is optional.
pub fn decode_with(text: &str, options: &DecodeOptions) -> Result<Shape, DecodeError> {
    let root = parse_tree(text)?;
    let shape = mapper::map_shape(&root, options)?;

    debug!(
        points = shape.points.len(),
        matrices = shape.matrices.len(),
        sub_objects = shape.sub_object_count(),
        triangles = shape.triangle_count(),
        "decoded shape"
    );
    Ok(shape)
}

/// Decodes raw file bytes in any supported text encoding
pub fn decode_bytes(bytes: &[u8], options: &DecodeOptions) -> Result<Shape, DecodeError> {
    match inspect(&bytes[..bytes.len().min(PROBE_LEN)]) {
        Format::Compressed => return Err(DecodeError::CompressedInput),
        Format::Uncompressed(Variant::Binary) => return Err(DecodeError::UnsupportedVariant),
        Format::Uncompressed(Variant::Text) | Format::Indeterminate => {}
    }

    let (text, encoding) = encoding::decode_text(bytes)?;
    debug!(%encoding, bytes = bytes.len(), "decoded text");
    decode_with(&text, options)
}

/// Lexes and parses `text` into a generic tree, skipping the signature line
pub fn parse_tree(text: &str) -> Result<Block, DecodeError> {
    let start = body_offset(text)?;
    Parser::new(Lexer::starting_at(text, start)).parse_document()
}

/// Decodes a single record such as `point ( 1 2 3 )`
pub fn decode_record<T: FromBlock>(text: &str) -> Result<T, DecodeError> {
    let root = parse_tree(text)?;
    Ok(T::from_block(&root)?)
}

/// Encodes a shape with default formatting
pub fn encode(shape: &Shape) -> Result<String, EncodeError> {
    encode_with(shape, &FormatOptions::default())
}

pub fn encode_with(shape: &Shape, options: &FormatOptions) -> Result<String, EncodeError> {
    let text = serializer::serialize(shape, options)?;
    debug!(bytes = text.len(), "encoded shape");
    Ok(text)
}

/// Encodes a single record without a trailing line ending
pub fn encode_record<T: ToBlock>(record: &T, options: &FormatOptions) -> Result<String, EncodeError> {
    serializer::serialize_record(record, options)
}

/// Byte offset where the block content starts
///
/// Returns 0 when there is no SIMIS header at all, and the start of the next
/// line after a text signature. Any other SIMIS header is an error.
fn body_offset(text: &str) -> Result<usize, DecodeError> {
    let trimmed = text.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if !trimmed.starts_with(SIMIS_PREFIX) {
        return Ok(0);
    }

    let start = text.len() - trimmed.len();
    let line_end = trimmed.find('\n').map_or(trimmed.len(), |i| i + 1);
    let header_line = trimmed[..line_end].trim_end();

    match inspect_str(header_line) {
        Format::Uncompressed(Variant::Text) => Ok(start + line_end),
        Format::Uncompressed(Variant::Binary) => Err(DecodeError::UnsupportedVariant),
        _ if header_line.starts_with("SIMISA@F") => Err(DecodeError::CompressedInput),
        _ => Err(DecodeError::UnrecognizedHeader(
            header_line.chars().take(40).collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Point, VolumeSphere};

    const DOC: &str = "SIMISA@@@@@@@@@@JINX0s1t______\r\n\r\nshape (\r\n\tshape_header ( 00000000 00000000 )\r\n)\r\n";

    #[test]
    fn header_line_is_skipped() {
        let shape = decode(DOC).unwrap();
        assert!(shape.volumes.is_empty());
    }

    #[test]
    fn header_is_optional() {
        assert!(decode("shape ( shape_header ( 00000000 00000000 ) )").is_ok());
    }

    #[test]
    fn errors_after_header_report_file_lines() {
        let text = "SIMISA@@@@@@@@@@JINX0s1t______\n\nshape (\n\tpoints ( 1 )\n)";
        match decode(text) {
            Err(DecodeError::Schema(SchemaError::CountMismatch { line, .. })) => assert_eq!(line, 4),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn other_headers_are_rejected() {
        assert_eq!(
            decode("SIMISA@@@@@@@@@@JINX0s1b______\n").unwrap_err(),
            DecodeError::UnsupportedVariant
        );
        assert_eq!(
            decode("SIMISA@F\u{10}'\0\0@@@@xyz").unwrap_err(),
            DecodeError::CompressedInput
        );
        assert!(matches!(
            decode("SIMISA@@@@@@@@@@JINX0w0t______\n"),
            Err(DecodeError::UnrecognizedHeader(_))
        ));
    }

    #[test]
    fn decode_bytes_utf16() {
        let bytes = TextEncoding::Utf16Le.encode(DOC);
        assert!(decode_bytes(&bytes, &DecodeOptions::default()).is_ok());
    }

    #[test]
    fn decode_bytes_fails_fast_on_compressed() {
        let mut bytes = b"SIMISA@F\x10\x27\x00\x00@@@@".to_vec();
        bytes.extend_from_slice(&[0x78, 0x9c, 0xff, 0xfe]);
        assert_eq!(
            decode_bytes(&bytes, &DecodeOptions::default()).unwrap_err(),
            DecodeError::CompressedInput
        );
    }

    #[test]
    fn decode_bytes_invalid_encoding() {
        let bytes = [b's', b'h', 0xC3, 0x28];
        assert!(matches!(
            decode_bytes(&bytes, &DecodeOptions::default()),
            Err(DecodeError::Encoding(_))
        ));
    }

    #[test]
    fn record_round_trip() {
        let sphere: VolumeSphere = decode_record("vol_sphere ( vector ( -1.23 0.49 40 ) 41.1 )").unwrap();
        let text = encode_record(&sphere, &FormatOptions::default()).unwrap();
        assert_eq!(text, "vol_sphere (\n\tvector ( -1.23 0.49 40 ) 41.1\n)");
        assert_eq!(decode_record::<VolumeSphere>(&text).unwrap(), sphere);
    }

    #[test]
    fn edit_and_re_encode() {
        let mut shape = decode(DOC).unwrap();
        shape.points.push(Point::new(4.0, 5.4, -1.0));
        let text = encode(&shape).unwrap();
        assert!(text.starts_with("SIMISA@@@@@@@@@@JINX0s1t______\n\nshape (\n"));
        assert!(text.contains("\tpoints ( 1\n\t\tpoint ( 4 5.4 -1 )\n\t)\n"));
        assert_eq!(decode(&text).unwrap(), shape);
    }

    #[test]
    fn deeply_nested_unknown_block_is_skipped() {
        let depth = 100_000;
        let text = format!(
            "shape ( shape_header ( 00000000 00000000 ) extra ( {}{}) )",
            "x ( ".repeat(depth),
            ") ".repeat(depth)
        );
        let shape = decode(&text).unwrap();
        assert!(shape.points.is_empty());
    }
}
