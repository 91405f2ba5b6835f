//! shapeio - Codec for MSTS/ORTS shape files
//!
//! Decodes the parenthesis-delimited `.s` text format into a typed object
//! graph and encodes it back. List counts are derived from the collections
//! on encode, so callers edit plain vectors and never maintain counts.
//!
//! ```
//! use shapeio::{decode, encode};
//!
//! let shape = decode("shape ( shape_header ( 00000000 00000000 ) )").unwrap();
//! assert!(encode(&shape).unwrap().contains("points ( 0 )"));
//! ```

pub mod domain;
pub mod codec;
pub mod storage;
pub mod cli;

pub use codec::{decode, decode_bytes, decode_with, encode, encode_with, DecodeError, EncodeError, Format};
pub use domain::Shape;
