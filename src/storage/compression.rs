//! Compression through an external tool
//!
//! The compressed SIMIS container is produced and unpacked by an
//! `ffeditc_unicode.exe`-style program:
//!
//! ```text
//! TOOL INPUT /o:OUTPUT        compress
//! TOOL INPUT /u /o:OUTPUT     decompress
//! ```

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::info;

use super::file::{copy, inspect_path};
use crate::codec::Format;

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("Compression tool not found: {0}")]
    ToolMissing(PathBuf),

    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: PathBuf,
        status: String,
        stderr: String,
    },
}

pub trait Compressor {
    fn compress(&self, input: &Path, output: &Path) -> Result<(), CompressionError>;
    fn decompress(&self, input: &Path, output: &Path) -> Result<(), CompressionError>;
}

/// Runs an external compression program
#[derive(Debug, Clone)]
pub struct ExternalTool {
    path: PathBuf,
}

impl ExternalTool {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn run(&self, input: &Path, output: &Path, unpack: bool) -> Result<(), CompressionError> {
        if !self.path.is_file() {
            return Err(CompressionError::ToolMissing(self.path.clone()));
        }

        let mut command = Command::new(&self.path);
        command.arg(input);
        if unpack {
            command.arg("/u");
        }

        let mut target = std::ffi::OsString::from("/o:");
        target.push(output);
        command.arg(target);

        let result = command.output().map_err(|source| CompressionError::Spawn {
            tool: self.path.clone(),
            source,
        })?;

        if !result.status.success() {
            return Err(CompressionError::Failed {
                tool: self.path.clone(),
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

impl Compressor for ExternalTool {
    fn compress(&self, input: &Path, output: &Path) -> Result<(), CompressionError> {
        self.run(input, output, false)
    }

    fn decompress(&self, input: &Path, output: &Path) -> Result<(), CompressionError> {
        self.run(input, output, true)
    }
}

/// Compresses `input` into `output`. A file that is already compressed is
/// copied instead of handed to the tool. Returns whether the tool ran.
pub fn compress_file(tool: &dyn Compressor, input: &Path, output: &Path) -> Result<bool> {
    convert(tool, input, output, true)
}

/// Decompresses `input` into `output`, copying files that are already plain
pub fn decompress_file(tool: &dyn Compressor, input: &Path, output: &Path) -> Result<bool> {
    convert(tool, input, output, false)
}

fn convert(tool: &dyn Compressor, input: &Path, output: &Path, pack: bool) -> Result<bool> {
    let format = inspect_path(input)?;
    if format == Format::Indeterminate {
        anyhow::bail!("Not a shape file: {}", input.display());
    }

    if format.is_compressed() == pack {
        if input != output {
            copy(input, output)?;
        }
        info!(path = %input.display(), %format, "already in requested state");
        return Ok(false);
    }

    let action = if pack { "compress" } else { "decompress" };
    let result = if pack {
        tool.compress(input, output)
    } else {
        tool.decompress(input, output)
    };
    result.with_context(|| format!("Failed to {} {}", action, input.display()))?;

    info!(input = %input.display(), output = %output.display(), action, "ran compression tool");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    use crate::codec::TEXT_SIGNATURE;

    const PACKED: &[u8] = b"SIMISA@F\x10\x27\x00\x00@@@@\x78\x9c";

    /// Records calls and writes a fixed payload
    #[derive(Default)]
    struct FakeTool {
        calls: RefCell<Vec<&'static str>>,
    }

    impl Compressor for FakeTool {
        fn compress(&self, _input: &Path, output: &Path) -> Result<(), CompressionError> {
            self.calls.borrow_mut().push("compress");
            fs::write(output, PACKED).map_err(|source| CompressionError::Spawn {
                tool: PathBuf::from("fake"),
                source,
            })
        }

        fn decompress(&self, _input: &Path, output: &Path) -> Result<(), CompressionError> {
            self.calls.borrow_mut().push("decompress");
            fs::write(output, TEXT_SIGNATURE).map_err(|source| CompressionError::Spawn {
                tool: PathBuf::from("fake"),
                source,
            })
        }
    }

    #[test]
    fn compress_runs_tool_for_plain_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.s");
        let output = dir.path().join("b.s");
        fs::write(&input, TEXT_SIGNATURE).unwrap();

        let tool = FakeTool::default();
        assert!(compress_file(&tool, &input, &output).unwrap());
        assert_eq!(*tool.calls.borrow(), vec!["compress"]);
        assert_eq!(fs::read(&output).unwrap(), PACKED);
    }

    #[test]
    fn already_compressed_is_copied() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("a.s");
        let output = dir.path().join("b.s");
        fs::write(&input, PACKED).unwrap();

        let tool = FakeTool::default();
        assert!(!compress_file(&tool, &input, &output).unwrap());
        assert!(tool.calls.borrow().is_empty());
        assert_eq!(fs::read(&output).unwrap(), PACKED);
    }

    #[test]
    fn decompress_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.s");
        fs::write(&path, PACKED).unwrap();

        let tool = FakeTool::default();
        assert!(decompress_file(&tool, &path, &path).unwrap());
        assert_eq!(*tool.calls.borrow(), vec!["decompress"]);
        assert!(!decompress_file(&tool, &path, &path).unwrap());
    }

    #[test]
    fn rejects_unknown_input() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.s");
        fs::write(&path, "hello").unwrap();

        let tool = FakeTool::default();
        assert!(compress_file(&tool, &path, &path).is_err());
        assert!(tool.calls.borrow().is_empty());
    }

    #[test]
    fn missing_tool() {
        let dir = TempDir::new().unwrap();
        let tool = ExternalTool::new(dir.path().join("ffeditc_unicode.exe"));
        let err = tool
            .compress(&dir.path().join("a.s"), &dir.path().join("b.s"))
            .unwrap_err();
        assert!(matches!(err, CompressionError::ToolMissing(_)));
    }
}
