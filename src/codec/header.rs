//! Format header inspection
//!
//! Classifies a file from its first bytes without lexing it. Every MSTS
//! shape file starts with a SIMIS signature:
//!
//! | Bytes | Meaning |
//! |-------|---------|
//! | `SIMISA@@@@@@@@@@JINX0s1t______` | uncompressed text |
//! | `SIMISA@@@@@@@@@@JINX0s1b______` | uncompressed binary |
//! | `SIMISA@F` + 4 length bytes + `@@@@` | compressed |
//!
//! The uncompressed signatures are usually UTF-16LE encoded; the compressed
//! one is always raw ASCII.

use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use super::encoding::TextEncoding;

/// Signature line of an uncompressed text shape file
pub const TEXT_SIGNATURE: &str = "SIMISA@@@@@@@@@@JINX0s1t______";

/// Signature of an uncompressed binary shape file
pub const BINARY_SIGNATURE: &str = "SIMISA@@@@@@@@@@JINX0s1b______";

const COMPRESSED_MAGIC: &[u8] = b"SIMISA@F";
const COMPRESSED_TRAILER: &[u8] = b"@@@@";

/// Common prefix of every SIMIS header
pub const SIMIS_PREFIX: &str = "SIMISA@";

/// Number of leading bytes [`inspect_file`] reads
pub const PROBE_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Text,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "format", content = "variant")]
pub enum Format {
    Uncompressed(Variant),
    Compressed,
    Indeterminate,
}

impl Format {
    pub fn is_compressed(&self) -> bool {
        matches!(self, Format::Compressed)
    }

    pub fn is_shape(&self) -> bool {
        !matches!(self, Format::Indeterminate)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Uncompressed(Variant::Text) => f.write_str("uncompressed text"),
            Format::Uncompressed(Variant::Binary) => f.write_str("uncompressed binary"),
            Format::Compressed => f.write_str("compressed"),
            Format::Indeterminate => f.write_str("indeterminate"),
        }
    }
}

/// Classifies a byte prefix. Never fails: anything unknown is `Indeterminate`.
pub fn inspect(prefix: &[u8]) -> Format {
    if prefix.len() >= COMPRESSED_MAGIC.len() + 4 + COMPRESSED_TRAILER.len()
        && prefix.starts_with(COMPRESSED_MAGIC)
        && prefix[12..16] == *COMPRESSED_TRAILER
    {
        return Format::Compressed;
    }

    let encoding = TextEncoding::sniff(prefix);
    inspect_str(&encoding.decode_prefix(prefix))
}

/// Classifies already decoded text
pub fn inspect_str(text: &str) -> Format {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.starts_with(TEXT_SIGNATURE) {
        Format::Uncompressed(Variant::Text)
    } else if text.starts_with(BINARY_SIGNATURE) {
        Format::Uncompressed(Variant::Binary)
    } else {
        Format::Indeterminate
    }
}

/// Reads the first [`PROBE_LEN`] bytes of `path` and classifies them
pub fn inspect_file(path: impl AsRef<Path>) -> io::Result<Format> {
    let file = File::open(path)?;
    let mut prefix = Vec::with_capacity(PROBE_LEN);
    file.take(PROBE_LEN as u64).read_to_end(&mut prefix)?;
    Ok(inspect(&prefix))
}
