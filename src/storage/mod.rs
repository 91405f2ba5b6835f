//! # Storage Layer
//!
//! File-level wrappers around the codec.
//!
//! ## File Formats
//!
//! | Data | Format | Notes |
//! |------|--------|-------|
//! | Shapes | `.s` text, UTF-16LE + BOM by default | any sniffable encoding is read |
//! | Compressed shapes | SIMIS `@F` container | handled by an external tool |
//! | Config | TOML | `shapeio.toml` (project), `config.toml` (global) |
//!
//! ## Concurrency Safety
//!
//! - All writes are atomic (temp file + rename)
//! - The temp file is held under an exclusive `fs2` lock while written
//!
//! ## Key Types
//!
//! - [`SaveOptions`] - Layout and encoding used by [`dump`]
//! - [`Compressor`] - Compression collaborator, [`ExternalTool`] in practice
//! - [`Config`] - Project and global configuration

mod compression;
mod config;
mod file;

pub use compression::{compress_file, decompress_file, CompressionError, Compressor, ExternalTool};
pub use config::{
    Config, ConfigError, DecodeConfig, FormatConfig, IoConfig, Settings, ToolsConfig,
    PROJECT_CONFIG_FILE,
};
pub use file::{
    copy, dump, find_directory_files, is_compressed, is_shape, load, read_text, replace,
    replace_ignorecase, write_text, SaveOptions, ShapeText,
};
