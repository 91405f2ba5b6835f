//! Byte-level text encodings
//!
//! MSTS tools write shape files as UTF-16LE with a byte order mark; hand
//! edited files are often plain UTF-8. Detection looks at the BOM first and
//! falls back to the position of NUL bytes in the first four bytes.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const BOM_UTF8: &[u8] = &[0xEF, 0xBB, 0xBF];
const BOM_UTF16_LE: &[u8] = &[0xFF, 0xFE];
const BOM_UTF16_BE: &[u8] = &[0xFE, 0xFF];

#[derive(Debug, Error, PartialEq)]
pub enum EncodingError {
    #[error("invalid UTF-8 at byte {0}")]
    InvalidUtf8(usize),

    #[error("invalid UTF-16 code unit at byte {0}")]
    InvalidUtf16(usize),

    #[error("truncated UTF-16 input: odd number of bytes")]
    OddLength,
}

/// A supported on-disk text encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    Utf8,
    /// UTF-8 with a leading byte order mark
    Utf8Bom,
    /// UTF-16 little endian with BOM, what MSTS tools write
    #[default]
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    /// Guesses the encoding of `bytes` from its first few bytes
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(BOM_UTF8) {
            return TextEncoding::Utf8Bom;
        }
        if bytes.starts_with(BOM_UTF16_LE) {
            return TextEncoding::Utf16Le;
        }
        if bytes.starts_with(BOM_UTF16_BE) {
            return TextEncoding::Utf16Be;
        }

        // BOM-less UTF-16: ASCII text leaves every other byte zero
        match bytes {
            [0, b, ..] if *b != 0 => TextEncoding::Utf16Be,
            [a, 0, ..] if *a != 0 => TextEncoding::Utf16Le,
            _ => TextEncoding::Utf8,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf8",
            TextEncoding::Utf8Bom => "utf8bom",
            TextEncoding::Utf16Le => "utf16le",
            TextEncoding::Utf16Be => "utf16be",
        }
    }

    fn bom(&self) -> &'static [u8] {
        match self {
            TextEncoding::Utf8 => &[],
            TextEncoding::Utf8Bom => BOM_UTF8,
            TextEncoding::Utf16Le => BOM_UTF16_LE,
            TextEncoding::Utf16Be => BOM_UTF16_BE,
        }
    }

    /// Decodes `bytes`, stripping a BOM if present
    pub fn decode(&self, bytes: &[u8]) -> Result<String, EncodingError> {
        let body = strip_bom(bytes, self);
        let skipped = bytes.len() - body.len();

        match self {
            TextEncoding::Utf8 | TextEncoding::Utf8Bom => std::str::from_utf8(body)
                .map(str::to_string)
                .map_err(|e| EncodingError::InvalidUtf8(skipped + e.valid_up_to())),
            TextEncoding::Utf16Le => decode_utf16(body, skipped, u16::from_le_bytes),
            TextEncoding::Utf16Be => decode_utf16(body, skipped, u16::from_be_bytes),
        }
    }

    /// Decodes as much of a byte prefix as is valid, ignoring a cut-off tail
    pub fn decode_prefix(&self, bytes: &[u8]) -> String {
        let body = strip_bom(bytes, self);

        match self {
            TextEncoding::Utf8 | TextEncoding::Utf8Bom => match std::str::from_utf8(body) {
                Ok(s) => s.to_string(),
                Err(e) => String::from_utf8_lossy(&body[..e.valid_up_to()]).into_owned(),
            },
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => {
                let big_endian = *self == TextEncoding::Utf16Be;
                let units = body.chunks_exact(2).map(|pair| {
                    let pair = [pair[0], pair[1]];
                    if big_endian {
                        u16::from_be_bytes(pair)
                    } else {
                        u16::from_le_bytes(pair)
                    }
                });
                char::decode_utf16(units)
                    .map_while(Result::ok)
                    .collect()
            }
        }
    }

    /// Encodes `text`, prefixed with this encoding's BOM
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let mut bytes = self.bom().to_vec();
        match self {
            TextEncoding::Utf8 | TextEncoding::Utf8Bom => bytes.extend_from_slice(text.as_bytes()),
            TextEncoding::Utf16Le => {
                bytes.reserve(text.len() * 2);
                for unit in text.encode_utf16() {
                    bytes.extend_from_slice(&unit.to_le_bytes());
                }
            }
            TextEncoding::Utf16Be => {
                bytes.reserve(text.len() * 2);
                for unit in text.encode_utf16() {
                    bytes.extend_from_slice(&unit.to_be_bytes());
                }
            }
        }
        bytes
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn strip_bom<'a>(bytes: &'a [u8], encoding: &TextEncoding) -> &'a [u8] {
    let bom = match encoding {
        TextEncoding::Utf8 | TextEncoding::Utf8Bom => BOM_UTF8,
        other => other.bom(),
    };
    bytes.strip_prefix(bom).unwrap_or(bytes)
}

fn decode_utf16(
    body: &[u8],
    skipped: usize,
    unit: fn([u8; 2]) -> u16,
) -> Result<String, EncodingError> {
    if body.len() % 2 != 0 {
        return Err(EncodingError::OddLength);
    }

    let units = body.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    let mut text = String::with_capacity(body.len() / 2);
    let mut position = skipped;
    for decoded in char::decode_utf16(units) {
        match decoded {
            Ok(c) => {
                text.push(c);
                position += c.len_utf16() * 2;
            }
            Err(_) => return Err(EncodingError::InvalidUtf16(position)),
        }
    }
    Ok(text)
}

/// Sniffs the encoding of `bytes` and decodes them
pub fn decode_text(bytes: &[u8]) -> Result<(String, TextEncoding), EncodingError> {
    let encoding = TextEncoding::sniff(bytes);
    let text = encoding.decode(bytes)?;
    Ok((text, encoding))
}
