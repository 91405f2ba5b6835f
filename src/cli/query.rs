//! Read-only commands (inspect, check, info, export, find)

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use super::output::Output;
use crate::codec;
use crate::domain::Shape;
use crate::storage::{self, Config};

/// Classify files by their header
pub fn inspect(output: &Output, files: &[PathBuf]) -> Result<()> {
    let mut rows = Vec::with_capacity(files.len());
    for path in files {
        let format = codec::inspect_file(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        rows.push((path, format));
    }

    if output.is_json() {
        let items: Vec<_> = rows
            .iter()
            .map(|(path, format)| {
                serde_json::json!({
                    "path": path,
                    "format": format.to_string(),
                    "compressed": format.is_compressed(),
                    "shape": format.is_shape(),
                })
            })
            .collect();
        output.data(&items);
    } else {
        for (path, format) in rows {
            output.row(&[&format.to_string(), &path.display().to_string()]);
        }
    }

    Ok(())
}

/// Decode every file and report the ones that fail
pub fn check(output: &Output, config: &Config, files: &[PathBuf]) -> Result<()> {
    let options = config.settings.decode_options();
    let mut failed = 0;
    let mut items = Vec::with_capacity(files.len());

    for path in files {
        let result = storage::load(path, &options);
        debug!(path = %path.display(), ok = result.is_ok(), "checked");

        match result {
            Ok(_) => {
                output.row(&["ok", &path.display().to_string()]);
                items.push(serde_json::json!({ "path": path, "ok": true }));
            }
            Err(e) => {
                failed += 1;
                let message = format!("{:#}", e);
                output.row(&["FAIL", &path.display().to_string(), &message]);
                items.push(serde_json::json!({ "path": path, "ok": false, "error": message }));
            }
        }
    }

    if output.is_json() {
        output.data(&items);
    }

    if failed > 0 {
        anyhow::bail!("{} of {} files failed to decode", failed, files.len());
    }
    Ok(())
}

/// Element counts of a decoded shape
#[derive(Debug, Serialize)]
struct ShapeSummary {
    points: usize,
    uv_points: usize,
    normals: usize,
    matrices: usize,
    images: usize,
    textures: usize,
    shaders: usize,
    prim_states: usize,
    lod_controls: usize,
    distance_levels: usize,
    sub_objects: usize,
    vertices: usize,
    triangles: usize,
    animations: usize,
}

impl ShapeSummary {
    fn of(shape: &Shape) -> Self {
        let distance_levels = shape.lod_controls.iter().flat_map(|l| &l.distance_levels);
        Self {
            points: shape.points.len(),
            uv_points: shape.uv_points.len(),
            normals: shape.normals.len(),
            matrices: shape.matrices.len(),
            images: shape.images.len(),
            textures: shape.textures.len(),
            shaders: shape.shader_names.len(),
            prim_states: shape.prim_states.len(),
            lod_controls: shape.lod_controls.len(),
            distance_levels: distance_levels.clone().count(),
            sub_objects: shape.sub_object_count(),
            vertices: distance_levels
                .flat_map(|d| &d.sub_objects)
                .map(|s| s.vertices.len())
                .sum(),
            triangles: shape.triangle_count(),
            animations: shape.animations.as_ref().map_or(0, Vec::len),
        }
    }
}

/// Show a summary of a shape
pub fn info(output: &Output, config: &Config, file: &Path) -> Result<()> {
    let shape = storage::load(file, &config.settings.decode_options())?;
    let summary = ShapeSummary::of(&shape);

    if output.is_json() {
        output.data(&summary);
        return Ok(());
    }

    println!("{}", file.display());
    println!(
        "  flags: {} {}",
        shape.shape_header.flags1, shape.shape_header.flags2
    );
    let counts = [
        ("points", summary.points),
        ("uv_points", summary.uv_points),
        ("normals", summary.normals),
        ("matrices", summary.matrices),
        ("images", summary.images),
        ("textures", summary.textures),
        ("shaders", summary.shaders),
        ("prim_states", summary.prim_states),
        ("lod_controls", summary.lod_controls),
        ("distance_levels", summary.distance_levels),
        ("sub_objects", summary.sub_objects),
        ("vertices", summary.vertices),
        ("triangles", summary.triangles),
        ("animations", summary.animations),
    ];
    for (name, count) in counts {
        println!("  {:<16} {}", name, count);
    }

    Ok(())
}

/// Print the typed graph as JSON
pub fn export(output: &Output, config: &Config, file: &Path) -> Result<()> {
    let shape = storage::load(file, &config.settings.decode_options())?;
    output.data(&shape);
    Ok(())
}

/// List matching files, optionally only real shape files
pub fn find(
    output: &Output,
    dir: &Path,
    pattern: &str,
    recursive: bool,
    shapes_only: bool,
) -> Result<()> {
    let mut files = storage::find_directory_files(dir, pattern, recursive)?;
    if shapes_only {
        let mut shapes = Vec::with_capacity(files.len());
        for path in files {
            if storage::is_shape(&path)? {
                shapes.push(path);
            }
        }
        files = shapes;
    }

    if output.is_json() {
        output.data(&files);
    } else {
        for path in &files {
            println!("{}", path.display());
        }
    }

    Ok(())
}
