//! Fixed-width hexadecimal words
//!
//! Flags and packed colours in shape files are written as exactly eight hex
//! digits (e.g. `00000400`, `ff969696`). Input may use either case; output is
//! always lower-case.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum HexError {
    #[error("Invalid hex word: expected 8 hex digits, got '{0}'")]
    InvalidHex(String),
}

/// A 32-bit value written as eight hex digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Hex32(pub u32);

impl Hex32 {
    /// Returns the raw value
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Returns true if `s` is exactly eight ASCII hex digits
    pub fn is_hex_word(s: &str) -> bool {
        s.len() == 8 && s.bytes().all(|b| b.is_ascii_hexdigit())
    }
}

impl From<u32> for Hex32 {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Hex32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

impl FromStr for Hex32 {
    type Err = HexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !Self::is_hex_word(s) {
            return Err(HexError::InvalidHex(s.to_string()));
        }

        u32::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| HexError::InvalidHex(s.to_string()))
    }
}

impl TryFrom<String> for Hex32 {
    type Error = HexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Hex32> for String {
    fn from(hex: Hex32) -> Self {
        hex.to_string()
    }
}
