//! Typed graph to text
//!
//! Emission is depth-first into an in-memory buffer. List counts are always
//! taken from the collection lengths at the moment of writing, so a caller
//! can push or remove items freely. Nothing is returned unless the whole
//! document was emitted.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;

use super::header::TEXT_SIGNATURE;
use super::lexer::classify;
use super::tree::Literal;
use crate::domain::{
    AnimNode, Animation, Colour, Controller, CullablePrims, DistanceLevel, DistanceLevelHeader,
    DistanceLevelsHeader, GeometryInfo, GeometryNode, Hex32, IndexedTrilist, KeyPosition,
    LightMaterial, LightModelCfg, LodControl, Matrix, Point, PrimState, Primitive, Shape,
    ShapeHeader, SubObject, SubObjectHeader, Texture, UvOp, UvPoint, Vector, Vertex, VertexSet,
    VolumeSphere, VtxState,
};

#[derive(Debug, Error, PartialEq)]
pub enum EncodeError {
    #[error("{collection}[{index}]: expected {expected}, found {found}")]
    TypeMismatch {
        collection: String,
        index: usize,
        expected: &'static str,
        found: String,
    },

    #[error("{block}.{field} is not a finite number")]
    NonFinite { block: String, field: String },

    #[error("{block}.{field}: {value:?} contains characters that cannot be written")]
    Unencodable {
        block: String,
        field: String,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }
}

/// Layout of the emitted text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    /// Indent units per nesting level
    pub indent: usize,
    /// Indent with tabs instead of spaces
    pub use_tabs: bool,
    pub line_ending: LineEnding,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent: 1,
            use_tabs: true,
            line_ending: LineEnding::Lf,
        }
    }
}

/// Line-oriented writer that tracks nesting depth
pub struct Emitter {
    out: String,
    depth: usize,
    unit: String,
    newline: &'static str,
}

impl Emitter {
    pub fn new(options: &FormatOptions) -> Self {
        let unit = if options.use_tabs { "\t" } else { " " };
        Self {
            out: String::new(),
            depth: 0,
            unit: unit.repeat(options.indent),
            newline: options.line_ending.as_str(),
        }
    }

    /// Writes one line at the current depth
    pub fn line(&mut self, content: &str) {
        if !content.is_empty() {
            for _ in 0..self.depth {
                self.out.push_str(&self.unit);
            }
        }
        self.out.push_str(content);
        self.out.push_str(self.newline);
    }

    /// Writes `head` and indents everything until the matching [`close`](Self::close)
    pub fn open(&mut self, head: &str) {
        self.line(head);
        self.depth += 1;
    }

    /// Writes `)` followed by `tail` one level up
    pub fn close(&mut self, tail: &str) {
        self.depth = self.depth.saturating_sub(1);
        if tail.is_empty() {
            self.line(")");
        } else {
            self.line(&format!(") {}", tail));
        }
    }

    /// `name ( v1 v2 ... )` on one line
    pub fn inline(&mut self, name: &str, values: &[String]) {
        self.line(&inline(name, values));
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Record types that emit themselves as one block
pub trait ToBlock {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError>;
}

/// Serializes a whole shape: signature line, blank line, `shape` block
pub fn serialize(shape: &Shape, options: &FormatOptions) -> Result<String, EncodeError> {
    let mut e = Emitter::new(options);
    e.line(TEXT_SIGNATURE);
    e.line("");
    shape.emit(&mut e)?;
    Ok(e.finish())
}

/// Serializes a single record without the trailing line ending
pub fn serialize_record<T: ToBlock>(record: &T, options: &FormatOptions) -> Result<String, EncodeError> {
    let mut e = Emitter::new(options);
    record.emit(&mut e)?;
    let mut text = e.finish();
    let trimmed = text.trim_end_matches(['\r', '\n']).len();
    text.truncate(trimmed);
    Ok(text)
}

// ---------------------------------------------------------------------------
// Value formatting
// ---------------------------------------------------------------------------

/// Shortest text that reads back as the same value
///
/// Very large and very small magnitudes use exponent notation so they stay
/// short and never lex as an integer or a hex word.
pub fn format_float(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-5..1e15).contains(&magnitude) {
        format!("{:e}", value)
    } else {
        format!("{}", value)
    }
}

fn float(block: &str, field: &str, value: f64) -> Result<String, EncodeError> {
    if !value.is_finite() {
        return Err(EncodeError::NonFinite {
            block: block.to_string(),
            field: field.to_string(),
        });
    }
    Ok(format_float(value))
}

fn floats(block: &str, fields: &[(&str, f64)]) -> Result<Vec<String>, EncodeError> {
    fields
        .iter()
        .map(|&(field, value)| float(block, field, value))
        .collect()
}

/// Bare when it lexes back as the same word, quoted otherwise
pub fn format_text(block: &str, field: &str, value: &str) -> Result<String, EncodeError> {
    let bare_safe = !value.is_empty()
        && !value.starts_with(['#', '\u{feff}'])
        && !value
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '(' | ')' | '"'));
    if bare_safe {
        if let Ok(Literal::Word(word) | Literal::Hex(word)) = classify(value) {
            if word == value {
                return Ok(word);
            }
        }
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => {
                return Err(EncodeError::Unencodable {
                    block: block.to_string(),
                    field: field.to_string(),
                    value: value.to_string(),
                })
            }
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    Ok(quoted)
}

fn inline(name: &str, values: &[String]) -> String {
    let mut line = format!("{} (", name);
    for value in values {
        let _ = write!(line, " {}", value);
    }
    line.push_str(" )");
    line
}

/// `name ( N v1 v2 ... )` where N is `count`
fn counted_inline<T: ToString>(name: &str, count: usize, values: &[T]) -> String {
    let mut parts = Vec::with_capacity(values.len() + 1);
    parts.push(count.to_string());
    parts.extend(values.iter().map(ToString::to_string));
    inline(name, &parts)
}

fn int_list(name: &str, values: &[i32]) -> String {
    counted_inline(name, values.len(), values)
}

fn records<T: ToBlock>(e: &mut Emitter, name: &str, items: &[T]) -> Result<(), EncodeError> {
    if items.is_empty() {
        e.inline(name, &["0".to_string()]);
        return Ok(());
    }

    e.open(&format!("{} ( {}", name, items.len()));
    for item in items {
        item.emit(e)?;
    }
    e.close("");
    Ok(())
}

fn texts(e: &mut Emitter, name: &str, item: &str, values: &[String]) -> Result<(), EncodeError> {
    if values.is_empty() {
        e.inline(name, &["0".to_string()]);
        return Ok(());
    }

    e.open(&format!("{} ( {}", name, values.len()));
    for value in values {
        let text = format_text(item, "name", value)?;
        e.inline(item, &[text]);
    }
    e.close("");
    Ok(())
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

impl ToBlock for Shape {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        e.open("shape (");
        self.shape_header.emit(e)?;
        records(e, "volumes", &self.volumes)?;
        texts(e, "shader_names", "named_shader", &self.shader_names)?;
        texts(e, "texture_filter_names", "named_filter_mode", &self.texture_filter_names)?;
        records(e, "points", &self.points)?;
        records(e, "uv_points", &self.uv_points)?;
        records(e, "normals", &self.normals)?;
        records(e, "sort_vectors", &self.sort_vectors)?;
        records(e, "colours", &self.colours)?;
        records(e, "matrices", &self.matrices)?;
        texts(e, "images", "image", &self.images)?;
        records(e, "textures", &self.textures)?;
        records(e, "light_materials", &self.light_materials)?;
        records(e, "light_model_cfgs", &self.light_model_cfgs)?;
        records(e, "vtx_states", &self.vtx_states)?;
        records(e, "prim_states", &self.prim_states)?;
        records(e, "lod_controls", &self.lod_controls)?;
        if let Some(animations) = &self.animations {
            records(e, "animations", animations)?;
        }
        e.close("");
        Ok(())
    }
}

impl ToBlock for ShapeHeader {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        e.inline(
            "shape_header",
            &[self.flags1.to_string(), self.flags2.to_string()],
        );
        Ok(())
    }
}

impl ToBlock for Vector {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        let values = floats("vector", &[("x", self.x), ("y", self.y), ("z", self.z)])?;
        e.inline("vector", &values);
        Ok(())
    }
}

impl ToBlock for Point {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        let values = floats("point", &[("x", self.x), ("y", self.y), ("z", self.z)])?;
        e.inline("point", &values);
        Ok(())
    }
}

impl ToBlock for UvPoint {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        let values = floats("uv_point", &[("u", self.u), ("v", self.v)])?;
        e.inline("uv_point", &values);
        Ok(())
    }
}

impl ToBlock for Colour {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        let values = floats(
            "colour",
            &[("a", self.a), ("r", self.r), ("g", self.g), ("b", self.b)],
        )?;
        e.inline("colour", &values);
        Ok(())
    }
}

impl ToBlock for VolumeSphere {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        let radius = float("vol_sphere", "radius", self.radius)?;
        e.open("vol_sphere (");
        let vector = floats(
            "vector",
            &[("x", self.vector.x), ("y", self.vector.y), ("z", self.vector.z)],
        )?;
        e.line(&format!("{} {}", inline("vector", &vector), radius));
        e.close("");
        Ok(())
    }
}

impl ToBlock for Matrix {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        const FIELDS: [&str; 12] = [
            "ax", "ay", "az", "bx", "by", "bz", "cx", "cy", "cz", "dx", "dy", "dz",
        ];

        let name = format_text("matrix", "name", &self.name)?;
        let fields: Vec<(&str, f64)> = FIELDS.into_iter().zip(self.components()).collect();
        let values = floats("matrix", &fields)?;
        e.inline(&format!("matrix {}", name), &values);
        Ok(())
    }
}

impl ToBlock for Texture {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        e.inline(
            "texture",
            &[
                self.image_index.to_string(),
                self.filter_mode.to_string(),
                float("texture", "mipmap_lod_bias", self.mipmap_lod_bias)?,
                self.border_colour.to_string(),
            ],
        );
        Ok(())
    }
}

impl ToBlock for LightMaterial {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        e.inline(
            "light_material",
            &[
                self.flags.to_string(),
                self.diff_colour_index.to_string(),
                self.amb_colour_index.to_string(),
                self.spec_colour_index.to_string(),
                self.emissive_colour_index.to_string(),
                float("light_material", "spec_power", self.spec_power)?,
            ],
        );
        Ok(())
    }
}

impl ToBlock for LightModelCfg {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        e.open(&format!("light_model_cfg ( {}", self.flags));
        records(e, "uv_ops", &self.uv_ops)?;
        e.close("");
        Ok(())
    }
}

impl ToBlock for UvOp {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        let values: Vec<String> = self.values().iter().map(ToString::to_string).collect();
        e.inline(self.block_name(), &values);
        Ok(())
    }
}

impl ToBlock for VtxState {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        let mut values = vec![
            self.flags.to_string(),
            self.matrix_index.to_string(),
            self.light_material_index.to_string(),
            self.light_model_cfg_index.to_string(),
            self.light_flags.to_string(),
        ];
        if let Some(matrix2) = self.matrix2_index {
            values.push(matrix2.to_string());
        }
        e.inline("vtx_state", &values);
        Ok(())
    }
}

impl ToBlock for PrimState {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        let name = format_text("prim_state", "name", &self.name)?;
        let z_bias = float("prim_state", "z_bias", self.z_bias)?;
        e.open(&format!(
            "prim_state {} ( {} {}",
            name, self.flags, self.shader_index
        ));
        e.line(&format!(
            "{} {} {} {} {} {}",
            int_list("tex_idxs", &self.texture_indices),
            z_bias,
            self.vtx_state_index,
            self.alpha_test_mode,
            self.light_cfg_index,
            self.z_buffer_mode
        ));
        e.close("");
        Ok(())
    }
}

impl ToBlock for LodControl {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        e.open("lod_control (");
        self.distance_levels_header.emit(e)?;
        records(e, "distance_levels", &self.distance_levels)?;
        e.close("");
        Ok(())
    }
}

impl ToBlock for DistanceLevelsHeader {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        e.inline("distance_levels_header", &[self.dlevel_bias.to_string()]);
        Ok(())
    }
}

impl ToBlock for DistanceLevel {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        e.open("distance_level (");
        self.distance_level_header.emit(e)?;
        records(e, "sub_objects", &self.sub_objects)?;
        e.close("");
        Ok(())
    }
}

impl ToBlock for DistanceLevelHeader {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        e.open("distance_level_header (");
        e.inline("dlevel_selection", &[self.dlevel_selection.to_string()]);
        e.line(&int_list("hierarchy", &self.hierarchy));
        e.close("");
        Ok(())
    }
}

impl ToBlock for SubObject {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        e.open("sub_object (");
        self.sub_object_header.emit(e)?;
        records(e, "vertices", &self.vertices)?;
        records(e, "vertex_sets", &self.vertex_sets)?;
        primitives(e, &self.primitives)?;
        e.close("");
        Ok(())
    }
}

impl ToBlock for SubObjectHeader {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        e.open(&format!(
            "sub_object_header ( {} {} {} {} {}",
            self.flags,
            self.sort_vector_index,
            self.volume_index,
            self.source_vtx_fmt_flags,
            self.destination_vtx_fmt_flags
        ));
        self.geometry_info.emit(e)?;
        e.line(&int_list("subobject_shaders", &self.subobject_shaders));
        e.line(&format!(
            "{} {}",
            int_list("subobject_light_cfgs", &self.subobject_light_cfgs),
            self.subobject_id
        ));
        e.close("");
        Ok(())
    }
}

impl ToBlock for GeometryInfo {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        let counters: Vec<String> = self.counters().iter().map(ToString::to_string).collect();
        e.open(&format!("geometry_info ( {}", counters.join(" ")));
        records(e, "geometry_nodes", &self.geometry_nodes)?;
        e.line(&int_list("geometry_node_map", &self.geometry_node_map));
        e.close("");
        Ok(())
    }
}

impl ToBlock for GeometryNode {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        e.open(&format!(
            "geometry_node ( {} {} {} {} {}",
            self.tx_light_cmds,
            self.node_x_tx_light_cmds,
            self.trilists,
            self.line_lists,
            self.pt_lists
        ));
        self.cullable_prims.emit(e)?;
        e.close("");
        Ok(())
    }
}

impl ToBlock for CullablePrims {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        e.inline(
            "cullable_prims",
            &[
                self.prims.to_string(),
                self.flat_sections.to_string(),
                self.prim_indices.to_string(),
            ],
        );
        Ok(())
    }
}

impl ToBlock for Vertex {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        e.open(&format!(
            "vertex ( {} {} {} {} {}",
            self.flags, self.point_index, self.normal_index, self.colour1, self.colour2
        ));
        e.line(&int_list("vertex_uvs", &self.vertex_uvs));
        e.close("");
        Ok(())
    }
}

impl ToBlock for VertexSet {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        e.inline(
            "vertex_set",
            &[
                self.vtx_state.to_string(),
                self.vtx_start_index.to_string(),
                self.vtx_count.to_string(),
            ],
        );
        Ok(())
    }
}

/// `prim_state_idx` is written only where it differs from the previous trilist
fn primitives(e: &mut Emitter, primitives: &[Primitive]) -> Result<(), EncodeError> {
    let mut items = 0;
    let mut current = None;
    for primitive in primitives {
        if current != Some(primitive.prim_state_index) {
            items += 1;
            current = Some(primitive.prim_state_index);
        }
        items += 1;
    }

    if items == 0 {
        e.inline("primitives", &["0".to_string()]);
        return Ok(());
    }

    e.open(&format!("primitives ( {}", items));
    let mut current = None;
    for primitive in primitives {
        if current != Some(primitive.prim_state_index) {
            e.inline("prim_state_idx", &[primitive.prim_state_index.to_string()]);
            current = Some(primitive.prim_state_index);
        }
        primitive.indexed_trilist.emit(e)?;
    }
    e.close("");
    Ok(())
}

impl ToBlock for IndexedTrilist {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        let vertex_values: Vec<i32> = self
            .vertex_idxs
            .iter()
            .flat_map(|v| [v.a, v.b, v.c])
            .collect();
        let normal_values: Vec<i32> = self
            .normal_idxs
            .iter()
            .flat_map(|n| [n.index, n.unknown])
            .collect();

        e.open("indexed_trilist (");
        e.line(&counted_inline("vertex_idxs", vertex_values.len(), &vertex_values));
        e.line(&counted_inline("normal_idxs", self.normal_idxs.len(), &normal_values));
        e.line(&counted_inline::<Hex32>("flags", self.flags.len(), &self.flags));
        e.close("");
        Ok(())
    }
}

impl ToBlock for Animation {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        e.open(&format!("animation ( {} {}", self.frame_count, self.frame_rate));
        records(e, "anim_nodes", &self.anim_nodes)?;
        e.close("");
        Ok(())
    }
}

impl ToBlock for AnimNode {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        let name = format_text("anim_node", "name", &self.name)?;
        e.open(&format!("anim_node {} (", name));
        records(e, "controllers", &self.controllers)?;
        e.close("");
        Ok(())
    }
}

impl ToBlock for Controller {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        if let Some((index, key)) = self
            .keys
            .iter()
            .enumerate()
            .find(|(_, key)| !self.kind.accepts(key))
        {
            return Err(EncodeError::TypeMismatch {
                collection: self.kind.block_name().to_string(),
                index,
                expected: self.kind.expected_keys(),
                found: key.block_name().to_string(),
            });
        }

        records(e, self.kind.block_name(), &self.keys)
    }
}

impl ToBlock for KeyPosition {
    fn emit(&self, e: &mut Emitter) -> Result<(), EncodeError> {
        let name = self.block_name();
        let mut values = vec![self.frame().to_string()];
        values.extend(floats(name, &self.values())?);
        e.inline(name, &values);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ControllerKind, NormalIdx, VertexIdx};

    fn text<T: ToBlock>(record: &T) -> String {
        serialize_record(record, &FormatOptions::default()).unwrap()
    }

    #[test]
    fn floats_use_shortest_form() {
        assert_eq!(format_float(4.0), "4");
        assert_eq!(format_float(5.4), "5.4");
        assert_eq!(format_float(-0.828), "-0.828");
        assert_eq!(format_float(1e20), "1e20");
        assert_eq!(format_float(2.5e-9), "2.5e-9");
        assert_eq!(format_float(0.0), "0");
    }

    #[test]
    fn text_quoting() {
        assert_eq!(format_text("b", "f", "TexDiff").unwrap(), "TexDiff");
        assert_eq!(format_text("b", "f", "DB_Track1w.ACE").unwrap(), "DB_Track1w.ACE");
        assert_eq!(format_text("b", "f", "deadbeef").unwrap(), "deadbeef");
        assert_eq!(format_text("b", "f", "two words").unwrap(), "\"two words\"");
        assert_eq!(format_text("b", "f", "42").unwrap(), "\"42\"");
        assert_eq!(format_text("b", "f", "").unwrap(), "\"\"");
        assert_eq!(format_text("b", "f", "a\"b").unwrap(), "\"a\\\"b\"");
        assert!(format_text("b", "f", "bell\u{7}").is_err());
    }

    #[test]
    fn point() {
        assert_eq!(text(&Point::new(1.2, 2.0, 3.0)), "point ( 1.2 2 3 )");
    }

    #[test]
    fn uv_point_vector_colour() {
        assert_eq!(text(&UvPoint::new(0.5, 1.0)), "uv_point ( 0.5 1 )");
        assert_eq!(text(&Vector::new(0.0, -1.0, 0.25)), "vector ( 0 -1 0.25 )");
        assert_eq!(text(&Colour::new(1.0, 0.5, 0.5, 0.5)), "colour ( 1 0.5 0.5 0.5 )");
    }

    #[test]
    fn volume_sphere() {
        let sphere = VolumeSphere::new(Vector::new(-1.23, 0.49, 40.0), 41.1);
        assert_eq!(
            text(&sphere),
            "vol_sphere (\n\tvector ( -1.23 0.49 40 ) 41.1\n)"
        );
    }

    #[test]
    fn matrix() {
        let m = Matrix::translation("ZL01", 0.0, 1.5, -2.0);
        assert_eq!(text(&m), "matrix ZL01 ( 1 0 0 0 1 0 0 0 1 0 1.5 -2 )");
    }

    #[test]
    fn texture_lowercases_hex() {
        let texture = Texture {
            image_index: 3,
            filter_mode: 1,
            mipmap_lod_bias: 0.25,
            border_colour: "FF00FF00".parse().unwrap(),
        };
        assert_eq!(text(&texture), "texture ( 3 1 0.25 ff00ff00 )");
    }

    #[test]
    fn vtx_state_optional_matrix2() {
        let mut state = VtxState {
            flags: Hex32(0),
            matrix_index: 0,
            light_material_index: -5,
            light_model_cfg_index: 0,
            light_flags: Hex32(2),
            matrix2_index: None,
        };
        assert_eq!(text(&state), "vtx_state ( 00000000 0 -5 0 00000002 )");

        state.matrix2_index = Some(1);
        assert_eq!(text(&state), "vtx_state ( 00000000 0 -5 0 00000002 1 )");
    }

    #[test]
    fn prim_state() {
        let state = PrimState {
            name: "Rails".into(),
            flags: Hex32(0xff00ff00),
            shader_index: 2,
            texture_indices: vec![1, 5],
            z_bias: 0.0,
            vtx_state_index: 3,
            alpha_test_mode: 1,
            light_cfg_index: 0,
            z_buffer_mode: 1,
        };
        assert_eq!(
            text(&state),
            "prim_state Rails ( ff00ff00 2\n\ttex_idxs ( 2 1 5 ) 0 3 1 0 1\n)"
        );
    }

    #[test]
    fn light_model_cfg_empty_uv_ops() {
        let cfg = LightModelCfg {
            flags: Hex32(0xff),
            uv_ops: vec![],
        };
        assert_eq!(text(&cfg), "light_model_cfg ( 000000ff\n\tuv_ops ( 0 )\n)");
    }

    #[test]
    fn light_model_cfg_with_uv_ops() {
        let cfg = LightModelCfg {
            flags: Hex32(0),
            uv_ops: vec![UvOp::Copy {
                texture_address_mode: 1,
                source_uv_index: 0,
            }],
        };
        assert_eq!(
            text(&cfg),
            "light_model_cfg ( 00000000\n\tuv_ops ( 1\n\t\tuv_op_copy ( 1 0 )\n\t)\n)"
        );
    }

    #[test]
    fn vertex() {
        let vertex = Vertex {
            flags: Hex32(0),
            point_index: 3413,
            normal_index: 207,
            colour1: Hex32(0xff969696),
            colour2: Hex32(0xff808080),
            vertex_uvs: vec![1153],
        };
        assert_eq!(
            text(&vertex),
            "vertex ( 00000000 3413 207 ff969696 ff808080\n\tvertex_uvs ( 1 1153 )\n)"
        );
    }

    #[test]
    fn geometry_info() {
        let info = GeometryInfo {
            face_normals: 126,
            tx_light_cmds: 2,
            trilist_indices: 378,
            trilists: 2,
            geometry_nodes: vec![GeometryNode {
                tx_light_cmds: 10,
                node_x_tx_light_cmds: 20,
                trilists: 30,
                line_lists: 40,
                pt_lists: 50,
                cullable_prims: CullablePrims {
                    prims: 1,
                    flat_sections: 2,
                    prim_indices: 3,
                },
            }],
            geometry_node_map: vec![0],
            ..GeometryInfo::default()
        };
        assert_eq!(
            text(&info),
            "geometry_info ( 126 2 0 378 0 0 2 0 0 0\n\
             \tgeometry_nodes ( 1\n\
             \t\tgeometry_node ( 10 20 30 40 50\n\
             \t\t\tcullable_prims ( 1 2 3 )\n\
             \t\t)\n\
             \t)\n\
             \tgeometry_node_map ( 1 0 )\n\
             )"
        );
    }

    #[test]
    fn sub_object_header() {
        let header = SubObjectHeader {
            flags: Hex32(0x400),
            sort_vector_index: 6,
            volume_index: 7,
            source_vtx_fmt_flags: Hex32(0x1d2),
            destination_vtx_fmt_flags: Hex32(0x1c4),
            geometry_info: GeometryInfo::default(),
            subobject_shaders: vec![1],
            subobject_light_cfgs: vec![0],
            subobject_id: 1,
        };
        assert_eq!(
            text(&header),
            "sub_object_header ( 00000400 6 7 000001d2 000001c4\n\
             \tgeometry_info ( 0 0 0 0 0 0 0 0 0 0\n\
             \t\tgeometry_nodes ( 0 )\n\
             \t\tgeometry_node_map ( 0 )\n\
             \t)\n\
             \tsubobject_shaders ( 1 1 )\n\
             \tsubobject_light_cfgs ( 1 0 ) 1\n\
             )"
        );
    }

    #[test]
    fn indexed_trilist_counts() {
        let trilist = IndexedTrilist {
            vertex_idxs: vec![VertexIdx::new(1, 2, 3), VertexIdx::new(4, 5, 6)],
            normal_idxs: vec![NormalIdx::new(7, 8), NormalIdx::new(9, 10)],
            flags: vec![Hex32(1), Hex32(2)],
        };
        assert_eq!(
            text(&trilist),
            "indexed_trilist (\n\
             \tvertex_idxs ( 6 1 2 3 4 5 6 )\n\
             \tnormal_idxs ( 2 7 8 9 10 )\n\
             \tflags ( 2 00000001 00000002 )\n\
             )"
        );
    }

    #[test]
    fn primitives_emit_state_changes_only() {
        let trilist = IndexedTrilist::default();
        let prims = vec![
            Primitive {
                prim_state_index: 1,
                indexed_trilist: trilist.clone(),
            },
            Primitive {
                prim_state_index: 1,
                indexed_trilist: trilist.clone(),
            },
            Primitive {
                prim_state_index: 4,
                indexed_trilist: trilist,
            },
        ];
        let mut e = Emitter::new(&FormatOptions::default());
        primitives(&mut e, &prims).unwrap();
        let out = e.finish();

        assert!(out.starts_with("primitives ( 5\n\tprim_state_idx ( 1 )\n\tindexed_trilist (\n"));
        assert_eq!(out.matches("prim_state_idx").count(), 2);
        assert_eq!(out.matches("indexed_trilist").count(), 3);
    }

    #[test]
    fn distance_level_and_lod_control() {
        let lod = LodControl {
            distance_levels_header: DistanceLevelsHeader { dlevel_bias: 0 },
            distance_levels: vec![DistanceLevel {
                distance_level_header: DistanceLevelHeader {
                    dlevel_selection: 2000,
                    hierarchy: vec![-1, 0, 0],
                },
                sub_objects: vec![],
            }],
        };
        assert_eq!(
            text(&lod),
            "lod_control (\n\
             \tdistance_levels_header ( 0 )\n\
             \tdistance_levels ( 1\n\
             \t\tdistance_level (\n\
             \t\t\tdistance_level_header (\n\
             \t\t\t\tdlevel_selection ( 2000 )\n\
             \t\t\t\thierarchy ( 3 -1 0 0 )\n\
             \t\t\t)\n\
             \t\t\tsub_objects ( 0 )\n\
             \t\t)\n\
             \t)\n\
             )"
        );
    }

    #[test]
    fn animation_with_spaces() {
        let animation = Animation {
            frame_count: 5,
            frame_rate: 60,
            anim_nodes: vec![AnimNode {
                name: "Node01".into(),
                controllers: vec![Controller {
                    kind: ControllerKind::LinearPos,
                    keys: vec![KeyPosition::LinearKey {
                        frame: 0,
                        x: 1.0,
                        y: 2.0,
                        z: 3.0,
                    }],
                }],
            }],
        };
        let options = FormatOptions {
            indent: 2,
            use_tabs: false,
            line_ending: LineEnding::Lf,
        };
        assert_eq!(
            serialize_record(&animation, &options).unwrap(),
            "animation ( 5 60\n  anim_nodes ( 1\n    anim_node Node01 (\n      controllers ( 1\n        linear_pos ( 1\n          linear_key ( 0 1 2 3 )\n        )\n      )\n    )\n  )\n)"
        );
    }

    #[test]
    fn controller_rejects_foreign_key() {
        let controller = Controller {
            kind: ControllerKind::TcbPos,
            keys: vec![
                KeyPosition::TcbKey {
                    frame: 0,
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                    w: 1.0,
                    tension: 0.0,
                    continuity: 0.0,
                    bias: 0.0,
                    in_: 0.0,
                    out: 0.0,
                },
                KeyPosition::SlerpRot {
                    frame: 1,
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                    w: 1.0,
                },
            ],
        };
        let err = serialize_record(&controller, &FormatOptions::default()).unwrap_err();
        assert_eq!(
            err,
            EncodeError::TypeMismatch {
                collection: "tcb_pos".into(),
                index: 1,
                expected: "tcb_key",
                found: "slerp_rot".into(),
            }
        );
    }

    #[test]
    fn non_finite_float_is_rejected() {
        let err = serialize_record(&Point::new(0.0, f64::NAN, 0.0), &FormatOptions::default())
            .unwrap_err();
        assert_eq!(
            err,
            EncodeError::NonFinite {
                block: "point".into(),
                field: "y".into(),
            }
        );
    }

    #[test]
    fn crlf_line_endings() {
        let options = FormatOptions {
            line_ending: LineEnding::Crlf,
            ..FormatOptions::default()
        };
        let mut shape = Shape::default();
        shape.points.push(Point::new(1.0, 2.0, 3.0));
        let out = serialize(&shape, &options).unwrap();

        assert!(out.starts_with("SIMISA@@@@@@@@@@JINX0s1t______\r\n\r\nshape (\r\n"));
        assert!(out.contains("\tpoints ( 1\r\n\t\tpoint ( 1 2 3 )\r\n\t)\r\n"));
        assert!(out.ends_with(")\r\n"));
        assert!(!out.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn shape_sections_follow_canonical_order() {
        let mut shape = Shape::default();
        shape.animations = Some(vec![]);
        let out = serialize(&shape, &FormatOptions::default()).unwrap();

        let emitted: Vec<&str> = out
            .lines()
            .filter(|line| line.starts_with('\t') && !line.starts_with("\t\t"))
            .filter_map(|line| line.trim().split_whitespace().next())
            .collect();
        let expected: Vec<&str> = crate::codec::mapper::SECTIONS.iter().map(|s| s.name).collect();
        assert_eq!(emitted, expected);
    }
}
