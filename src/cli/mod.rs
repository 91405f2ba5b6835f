//! # Command-Line Interface
//!
//! The `shapeio` binary: thin commands over [`crate::storage`] and
//! [`crate::codec`].
//!
//! ## Commands
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Query | Read-only inspection | `inspect`, `check`, `info`, `export`, `find` |
//! | Edit | Rewrite files | `fmt`, `replace` |
//! | Compression | External tool | `compress`, `decompress` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Logging
//!
//! Diagnostics go to stderr through `tracing`. `--verbose` enables debug
//! events; `RUST_LOG` overrides both:
//! ```bash
//! RUST_LOG=shapeio=trace shapeio check trains/*.s
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod edit;
mod logging;
mod output;
mod query;

pub use app::{run, Cli, Commands};
pub use output::{Output, OutputFormat};
