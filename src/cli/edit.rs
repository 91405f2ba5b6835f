//! Commands that write files (fmt, replace, compress, decompress)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::output::Output;
use crate::storage::{self, Config, ExternalTool};

/// Decode and re-encode a shape with the configured layout
pub fn fmt(output: &Output, config: &Config, file: &Path, out: Option<&Path>) -> Result<()> {
    let shape = storage::load(file, &config.settings.decode_options())?;
    let target = out.unwrap_or(file);

    storage::dump(&shape, target, &config.settings.save_options())?;
    debug!(
        input = %file.display(),
        output = %target.display(),
        "reformatted shape"
    );

    output.success(&format!("Formatted {}", target.display()));
    Ok(())
}

/// Replace literal text in place, keeping the file's encoding
pub fn replace(output: &Output, file: &Path, from: &str, to: &str, ignore_case: bool) -> Result<()> {
    let count = if ignore_case {
        storage::replace_ignorecase(file, from, to)?
    } else {
        storage::replace(file, from, to)?
    };

    if output.is_json() {
        output.data(&serde_json::json!({
            "path": file,
            "replacements": count,
        }));
    } else {
        output.success(&format!(
            "Replaced {} occurrence{} in {}",
            count,
            if count == 1 { "" } else { "s" },
            file.display()
        ));
    }
    Ok(())
}

/// Run the compression tool in either direction
pub fn compress(
    output: &Output,
    config: &Config,
    file: &Path,
    out: Option<&Path>,
    tool: Option<PathBuf>,
    unpack: bool,
) -> Result<()> {
    let tool_path = tool
        .or_else(|| config.settings.tools.ffeditc.clone())
        .context("No compression tool configured; pass --tool or set tools.ffeditc in shapeio.toml")?;
    let tool = ExternalTool::new(tool_path);
    let target = out.unwrap_or(file);

    let ran = if unpack {
        storage::decompress_file(&tool, file, target)?
    } else {
        storage::compress_file(&tool, file, target)?
    };

    let state = if unpack { "decompressed" } else { "compressed" };
    if ran {
        output.success(&format!("Wrote {} {}", state, target.display()));
    } else {
        output.success(&format!("{} is already {}", file.display(), state));
    }
    Ok(())
}
