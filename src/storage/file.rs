//! Shape file I/O
//!
//! Encoding-aware load and save of `.s` files. Reads accept any text encoding
//! [`TextEncoding::sniff`] recognizes; writes default to UTF-16LE with a BOM
//! and CRLF line endings, which is what the MSTS tools produce.

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use globset::Glob;
use regex::{NoExpand, RegexBuilder};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::codec::{self, DecodeOptions, Format, FormatOptions, LineEnding, TextEncoding};
use crate::domain::Shape;

/// How [`dump`] lays out and encodes a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    pub format: FormatOptions,
    pub encoding: TextEncoding,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            format: FormatOptions {
                line_ending: LineEnding::Crlf,
                ..FormatOptions::default()
            },
            encoding: TextEncoding::Utf16Le,
        }
    }
}

/// Decoded file content plus the encoding it was stored in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeText {
    pub text: String,
    pub encoding: TextEncoding,
}

/// Reads and decodes a shape file
pub fn load(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<Shape> {
    let path = path.as_ref();
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read shape: {}", path.display()))?;

    codec::decode_bytes(&bytes, options)
        .with_context(|| format!("Failed to decode shape: {}", path.display()))
}

/// Encodes a shape and writes it atomically
pub fn dump(shape: &Shape, path: impl AsRef<Path>, options: &SaveOptions) -> Result<()> {
    let path = path.as_ref();
    let text = codec::encode_with(shape, &options.format)
        .with_context(|| format!("Failed to encode shape for {}", path.display()))?;

    write_text(path, &text, options.encoding)
}

pub fn read_text(path: impl AsRef<Path>) -> Result<ShapeText> {
    let path = path.as_ref();
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;

    let (text, encoding) = codec::encoding::decode_text(&bytes)
        .with_context(|| format!("Failed to decode text of {}", path.display()))?;
    debug!(path = %path.display(), %encoding, "read text");

    Ok(ShapeText { text, encoding })
}

/// Writes `text` in `encoding` through a locked temp file and a rename, so
/// the destination is either fully replaced or left untouched.
pub fn write_text(path: impl AsRef<Path>, text: &str, encoding: TextEncoding) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let temp_path = temp_path_for(path);
    let bytes = encoding.encode(text);

    if let Err(err) = write_then_rename(&temp_path, path, &bytes) {
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }

    info!(path = %path.display(), %encoding, bytes = bytes.len(), "wrote file");
    Ok(())
}

fn write_then_rename(temp_path: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

        file.lock_exclusive()
            .with_context(|| format!("Failed to lock {}", temp_path.display()))?;

        let mut writer = BufWriter::new(&file);
        writer
            .write_all(bytes)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush {}", temp_path.display()))?;
    }

    fs::rename(temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// True for a `.s` file (any case) whose header is a known shape format
pub fn is_shape(path: impl AsRef<Path>) -> Result<bool> {
    let path = path.as_ref();
    let has_extension = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("s"));
    if !has_extension || !path.is_file() {
        return Ok(false);
    }

    Ok(inspect_path(path)?.is_shape())
}

/// `Some(true)` when compressed, `Some(false)` when uncompressed, `None` when
/// the header is not recognizable
pub fn is_compressed(path: impl AsRef<Path>) -> Result<Option<bool>> {
    Ok(match inspect_path(path.as_ref())? {
        Format::Compressed => Some(true),
        Format::Uncompressed(_) => Some(false),
        Format::Indeterminate => None,
    })
}

pub(crate) fn inspect_path(path: &Path) -> Result<Format> {
    codec::inspect_file(path).with_context(|| format!("Failed to read header: {}", path.display()))
}

pub fn copy(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    if let Some(parent) = dst.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::copy(src, dst).with_context(|| {
        format!("Failed to copy {} to {}", src.display(), dst.display())
    })?;
    info!(src = %src.display(), dst = %dst.display(), "copied file");
    Ok(())
}

/// Replaces every occurrence of `from`, keeping the file's encoding.
/// Returns the number of replacements; the file is only rewritten when it
/// is non-zero.
pub fn replace(path: impl AsRef<Path>, from: &str, to: &str) -> Result<usize> {
    let path = path.as_ref();
    if from.is_empty() {
        anyhow::bail!("Search text must not be empty");
    }

    let ShapeText { text, encoding } = read_text(path)?;
    let count = text.matches(from).count();
    if count > 0 {
        write_text(path, &text.replace(from, to), encoding)?;
    }
    Ok(count)
}

/// Like [`replace`], matching `from` literally without regard to case
pub fn replace_ignorecase(path: impl AsRef<Path>, from: &str, to: &str) -> Result<usize> {
    let path = path.as_ref();
    if from.is_empty() {
        anyhow::bail!("Search text must not be empty");
    }

    let pattern = RegexBuilder::new(&regex::escape(from))
        .case_insensitive(true)
        .build()
        .context("Failed to build search pattern")?;

    let ShapeText { text, encoding } = read_text(path)?;
    let count = pattern.find_iter(&text).count();
    if count > 0 {
        let replaced = pattern.replace_all(&text, NoExpand(to));
        write_text(path, &replaced, encoding)?;
    }
    Ok(count)
}

/// Lists files in `dir` whose file name matches the glob `pattern`, sorted
pub fn find_directory_files(
    dir: impl AsRef<Path>,
    pattern: &str,
    recursive: bool,
) -> Result<Vec<PathBuf>> {
    let matcher = Glob::new(pattern)
        .with_context(|| format!("Invalid file pattern: {}", pattern))?
        .compile_matcher();

    let dir = dir.as_ref();
    let walker = WalkDir::new(dir)
        .follow_links(true)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 });

    let mut found = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            // Symlink loops and dangling links below the root are not fatal
            Err(err)
                if err.depth() > 0 && (err.loop_ancestor().is_some() || is_not_found(&err)) =>
            {
                debug!(path = ?err.path(), error = %err, "skipping entry");
                continue;
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read directory: {}", dir.display()))
            }
        };

        if entry.file_type().is_file() && matcher.is_match(entry.file_name()) {
            found.push(entry.into_path());
        }
    }

    found.sort();
    debug!(dir = %dir.display(), pattern, count = found.len(), "found files");
    Ok(found)
}

fn is_not_found(err: &walkdir::Error) -> bool {
    err.io_error()
        .is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
}
