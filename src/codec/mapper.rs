//! Binds the generic tree to the typed shape model
//!
//! Every record type has a [`FromBlock`] impl that walks the block's children
//! by position through a [`Fields`] cursor. Counted lists go through
//! [`counted`], which checks the declared count against the items actually
//! present before any item is mapped.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::tree::{Block, Literal, Node};
use crate::domain::{
    AnimNode, Animation, Colour, Controller, ControllerKind, CullablePrims, DistanceLevel,
    DistanceLevelHeader, DistanceLevelsHeader, GeometryInfo, GeometryNode, Hex32,
    IndexedTrilist, KeyPosition, LightMaterial, LightModelCfg, LodControl, Matrix, NormalIdx,
    Point, PrimState, Primitive, Shape, ShapeHeader, SubObject, SubObjectHeader, Texture,
    UvOp, UvPoint, Vector, Vertex, VertexIdx, VertexSet, VolumeSphere, VtxState,
};

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("{block} at line {line}: declared {declared} items but found {found}")]
    CountMismatch {
        block: String,
        declared: usize,
        found: usize,
        line: usize,
    },

    #[error("{block} at line {line}: field '{field}' expected {expected}, found {found}")]
    TypeMismatch {
        block: String,
        field: String,
        expected: &'static str,
        found: String,
        line: usize,
    },

    #[error("unrecognized block '{name}' in {parent} at line {line}")]
    Unrecognized {
        name: String,
        parent: String,
        line: usize,
    },

    #[error("{parent} at line {line}: missing required block '{name}'")]
    MissingBlock {
        name: String,
        parent: String,
        line: usize,
    },

    #[error("{block} at line {line}: missing field '{field}'")]
    MissingField {
        block: String,
        field: String,
        line: usize,
    },

    #[error("{block}: unexpected {found} at line {line}")]
    UnexpectedChild {
        block: String,
        found: String,
        line: usize,
    },

    #[error("duplicate block '{name}' in {parent} at line {line}")]
    Duplicate {
        name: String,
        parent: String,
        line: usize,
    },
}

/// What to do with shape-level blocks that are not part of the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownBlocks {
    #[default]
    Skip,
    Reject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    pub unknown_blocks: UnknownBlocks,
}

/// A shape-level section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub name: &'static str,
    /// Item block name for counted lists, `None` for a single record
    pub item: Option<&'static str>,
}

const fn list(name: &'static str, item: &'static str) -> Section {
    Section {
        name,
        item: Some(item),
    }
}

/// Shape-level sections in canonical file order
pub static SECTIONS: &[Section] = &[
    Section {
        name: "shape_header",
        item: None,
    },
    list("volumes", "vol_sphere"),
    list("shader_names", "named_shader"),
    list("texture_filter_names", "named_filter_mode"),
    list("points", "point"),
    list("uv_points", "uv_point"),
    list("normals", "vector"),
    list("sort_vectors", "vector"),
    list("colours", "colour"),
    list("matrices", "matrix"),
    list("images", "image"),
    list("textures", "texture"),
    list("light_materials", "light_material"),
    list("light_model_cfgs", "light_model_cfg"),
    list("vtx_states", "vtx_state"),
    list("prim_states", "prim_state"),
    list("lod_controls", "lod_control"),
    list("animations", "animation"),
];

/// Looks up a shape-level section by block name
pub fn section(name: &str) -> Option<&'static Section> {
    SECTIONS.iter().find(|section| section.name == name)
}

/// Record types that map from a single named block
pub trait FromBlock: Sized {
    const NAME: &'static str;

    fn from_block(block: &Block) -> Result<Self, SchemaError>;
}

/// Maps a root `shape` block
pub fn map_shape(root: &Block, options: &DecodeOptions) -> Result<Shape, SchemaError> {
    if root.name != "shape" {
        return Err(SchemaError::Unrecognized {
            name: root.name.clone(),
            parent: "document".to_string(),
            line: root.line,
        });
    }

    let mut sections: HashMap<&str, &Block> = HashMap::new();
    for child in &root.children {
        let block = match child {
            Node::Block(block) => block,
            Node::Leaf(_) => {
                return Err(SchemaError::UnexpectedChild {
                    block: root.name.clone(),
                    found: child.describe(),
                    line: child.line(),
                })
            }
        };

        if section(&block.name).is_none() {
            match options.unknown_blocks {
                UnknownBlocks::Skip => {
                    debug!(block = %block.name, line = block.line, "skipping unrecognized block");
                    continue;
                }
                UnknownBlocks::Reject => {
                    return Err(SchemaError::Unrecognized {
                        name: block.name.clone(),
                        parent: root.name.clone(),
                        line: block.line,
                    })
                }
            }
        }

        if sections.insert(block.name.as_str(), block).is_some() {
            return Err(SchemaError::Duplicate {
                name: block.name.clone(),
                parent: root.name.clone(),
                line: block.line,
            });
        }
    }

    let header = sections
        .get("shape_header")
        .ok_or_else(|| SchemaError::MissingBlock {
            name: "shape_header".to_string(),
            parent: root.name.clone(),
            line: root.line,
        })?;

    Ok(Shape {
        shape_header: ShapeHeader::from_block(header)?,
        volumes: section_records(&sections, "volumes")?,
        shader_names: section_texts(&sections, "shader_names", "named_shader")?,
        texture_filter_names: section_texts(
            &sections,
            "texture_filter_names",
            "named_filter_mode",
        )?,
        points: section_records(&sections, "points")?,
        uv_points: section_records(&sections, "uv_points")?,
        normals: section_records(&sections, "normals")?,
        sort_vectors: section_records(&sections, "sort_vectors")?,
        colours: section_records(&sections, "colours")?,
        matrices: section_records(&sections, "matrices")?,
        images: section_texts(&sections, "images", "image")?,
        textures: section_records(&sections, "textures")?,
        light_materials: section_records(&sections, "light_materials")?,
        light_model_cfgs: section_records(&sections, "light_model_cfgs")?,
        vtx_states: section_records(&sections, "vtx_states")?,
        prim_states: section_records(&sections, "prim_states")?,
        lod_controls: section_records(&sections, "lod_controls")?,
        animations: sections
            .get("animations")
            .map(|block| records::<Animation>(block))
            .transpose()?,
    })
}

fn section_records<T: FromBlock>(
    sections: &HashMap<&str, &Block>,
    name: &str,
) -> Result<Vec<T>, SchemaError> {
    match sections.get(name) {
        Some(block) => records(block),
        None => Ok(Vec::new()),
    }
}

fn section_texts(
    sections: &HashMap<&str, &Block>,
    name: &str,
    item: &str,
) -> Result<Vec<String>, SchemaError> {
    match sections.get(name) {
        Some(block) => counted(block)?.texts(item),
        None => Ok(Vec::new()),
    }
}

/// Maps a counted list whose items are all `T` records
pub fn records<T: FromBlock>(block: &Block) -> Result<Vec<T>, SchemaError> {
    counted(block)?.records()
}

// ---------------------------------------------------------------------------
// Leaf conversions
// ---------------------------------------------------------------------------

fn type_mismatch(block: &str, field: &str, expected: &'static str, node: &Node) -> SchemaError {
    SchemaError::TypeMismatch {
        block: block.to_string(),
        field: field.to_string(),
        expected,
        found: node.describe(),
        line: node.line(),
    }
}

fn literal<'a>(
    node: &'a Node,
    block: &str,
    field: &str,
    expected: &'static str,
) -> Result<&'a Literal, SchemaError> {
    match node {
        Node::Leaf(leaf) => Ok(&leaf.value),
        Node::Block(_) => Err(type_mismatch(block, field, expected, node)),
    }
}

fn int_value<T: TryFrom<i64>>(node: &Node, block: &str, field: &str) -> Result<T, SchemaError> {
    literal(node, block, field, "integer")?
        .as_integer()
        .and_then(|value| T::try_from(value).ok())
        .ok_or_else(|| type_mismatch(block, field, "integer", node))
}

fn float_value(node: &Node, block: &str, field: &str) -> Result<f64, SchemaError> {
    literal(node, block, field, "float")?
        .as_float()
        .ok_or_else(|| type_mismatch(block, field, "float", node))
}

fn hex_value(node: &Node, block: &str, field: &str) -> Result<Hex32, SchemaError> {
    match literal(node, block, field, "hex")? {
        Literal::Hex(digits) => digits
            .parse()
            .map_err(|_| type_mismatch(block, field, "hex", node)),
        _ => Err(type_mismatch(block, field, "hex", node)),
    }
}

fn text_value(node: &Node, block: &str, field: &str) -> Result<String, SchemaError> {
    literal(node, block, field, "text")?
        .as_text()
        .map(str::to_string)
        .ok_or_else(|| type_mismatch(block, field, "text", node))
}

fn item_block<'a>(node: &'a Node, parent: &Block, expected: &str) -> Result<&'a Block, SchemaError> {
    match node {
        Node::Block(block) if block.name == expected => Ok(block),
        Node::Block(block) => Err(SchemaError::Unrecognized {
            name: block.name.clone(),
            parent: parent.name.clone(),
            line: block.line,
        }),
        Node::Leaf(_) => Err(type_mismatch(&parent.name, "items", "block", node)),
    }
}

fn any_block<'a>(node: &'a Node, parent: &Block) -> Result<&'a Block, SchemaError> {
    match node {
        Node::Block(block) => Ok(block),
        Node::Leaf(_) => Err(type_mismatch(&parent.name, "items", "block", node)),
    }
}

// ---------------------------------------------------------------------------
// Positional field cursor
// ---------------------------------------------------------------------------

/// Reads a block's children in order, one field at a time
pub struct Fields<'a> {
    block: &'a Block,
    rest: std::slice::Iter<'a, Node>,
    labelled: bool,
}

impl<'a> Fields<'a> {
    pub fn new(block: &'a Block) -> Self {
        Self {
            block,
            rest: block.children.iter(),
            labelled: false,
        }
    }

    fn next(&mut self, field: &str) -> Result<&'a Node, SchemaError> {
        self.rest.next().ok_or_else(|| SchemaError::MissingField {
            block: self.block.name.clone(),
            field: field.to_string(),
            line: self.block.line,
        })
    }

    /// The label between block name and parenthesis
    pub fn label(&mut self) -> Result<String, SchemaError> {
        self.labelled = true;
        self.block.label.clone().ok_or_else(|| SchemaError::MissingField {
            block: self.block.name.clone(),
            field: "name".to_string(),
            line: self.block.line,
        })
    }

    pub fn int<T: TryFrom<i64>>(&mut self, field: &str) -> Result<T, SchemaError> {
        let node = self.next(field)?;
        int_value(node, &self.block.name, field)
    }

    pub fn optional_int<T: TryFrom<i64>>(&mut self, field: &str) -> Result<Option<T>, SchemaError> {
        match self.rest.next() {
            Some(node) => int_value(node, &self.block.name, field).map(Some),
            None => Ok(None),
        }
    }

    pub fn float(&mut self, field: &str) -> Result<f64, SchemaError> {
        let node = self.next(field)?;
        float_value(node, &self.block.name, field)
    }

    pub fn hex(&mut self, field: &str) -> Result<Hex32, SchemaError> {
        let node = self.next(field)?;
        hex_value(node, &self.block.name, field)
    }

    pub fn text(&mut self, field: &str) -> Result<String, SchemaError> {
        let node = self.next(field)?;
        text_value(node, &self.block.name, field)
    }

    /// The next child, which must be a block named `name`
    pub fn block(&mut self, name: &str) -> Result<&'a Block, SchemaError> {
        let node = self.next(name)?;
        item_block(node, self.block, name)
    }

    pub fn record<T: FromBlock>(&mut self) -> Result<T, SchemaError> {
        T::from_block(self.block(T::NAME)?)
    }

    /// Fails if any children are left, or if an unused label was given
    pub fn finish(mut self) -> Result<(), SchemaError> {
        if let Some(node) = self.rest.next() {
            return Err(SchemaError::UnexpectedChild {
                block: self.block.name.clone(),
                found: node.describe(),
                line: node.line(),
            });
        }
        if let (false, Some(label)) = (self.labelled, &self.block.label) {
            return Err(SchemaError::UnexpectedChild {
                block: self.block.name.clone(),
                found: format!("label '{}'", label),
                line: self.block.line,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Counted lists
// ---------------------------------------------------------------------------

/// A list block split into its declared count and its items
pub struct Counted<'a> {
    block: &'a Block,
    declared: usize,
    items: &'a [Node],
}

/// Reads the leading count of a list block
pub fn counted(block: &Block) -> Result<Counted<'_>, SchemaError> {
    let first = block
        .children
        .first()
        .ok_or_else(|| SchemaError::MissingField {
            block: block.name.clone(),
            field: "count".to_string(),
            line: block.line,
        })?;

    let declared = match first {
        Node::Leaf(leaf) => leaf.value.as_integer().and_then(|n| usize::try_from(n).ok()),
        Node::Block(_) => None,
    }
    .ok_or_else(|| type_mismatch(&block.name, "count", "non-negative integer", first))?;

    Ok(Counted {
        block,
        declared,
        items: &block.children[1..],
    })
}

impl<'a> Counted<'a> {
    pub fn declared(&self) -> usize {
        self.declared
    }

    pub fn items(&self) -> &'a [Node] {
        self.items
    }

    fn mismatch(&self, found: usize) -> SchemaError {
        SchemaError::CountMismatch {
            block: self.block.name.clone(),
            declared: self.declared,
            found,
            line: self.block.line,
        }
    }

    /// Fails unless exactly `declared` items are present
    pub fn check(&self) -> Result<(), SchemaError> {
        if self.items.len() != self.declared {
            return Err(self.mismatch(self.items.len()));
        }
        Ok(())
    }

    pub fn records<T: FromBlock>(&self) -> Result<Vec<T>, SchemaError> {
        self.check()?;
        self.items
            .iter()
            .map(|node| item_block(node, self.block, T::NAME).and_then(T::from_block))
            .collect()
    }

    pub fn ints<T: TryFrom<i64>>(&self) -> Result<Vec<T>, SchemaError> {
        self.check()?;
        self.values()
    }

    fn values<T: TryFrom<i64>>(&self) -> Result<Vec<T>, SchemaError> {
        self.items
            .iter()
            .map(|node| int_value(node, &self.block.name, "items"))
            .collect()
    }

    pub fn hexes(&self) -> Result<Vec<Hex32>, SchemaError> {
        self.check()?;
        self.items
            .iter()
            .map(|node| hex_value(node, &self.block.name, "items"))
            .collect()
    }

    /// Items of the form `item ( text )`
    pub fn texts(&self, item: &str) -> Result<Vec<String>, SchemaError> {
        self.check()?;
        self.items
            .iter()
            .map(|node| {
                let block = item_block(node, self.block, item)?;
                let mut fields = Fields::new(block);
                let text = fields.text("name")?;
                fields.finish()?;
                Ok(text)
            })
            .collect()
    }
}

/// `hierarchy ( 3 -1 0 0 )` style list of integers
fn int_list(block: &Block) -> Result<Vec<i32>, SchemaError> {
    counted(block)?.ints()
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

impl FromBlock for ShapeHeader {
    const NAME: &'static str = "shape_header";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let header = ShapeHeader {
            flags1: f.hex("flags1")?,
            flags2: f.hex("flags2")?,
        };
        f.finish()?;
        Ok(header)
    }
}

impl FromBlock for Vector {
    const NAME: &'static str = "vector";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let vector = Vector::new(f.float("x")?, f.float("y")?, f.float("z")?);
        f.finish()?;
        Ok(vector)
    }
}

impl FromBlock for Point {
    const NAME: &'static str = "point";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let point = Point::new(f.float("x")?, f.float("y")?, f.float("z")?);
        f.finish()?;
        Ok(point)
    }
}

impl FromBlock for UvPoint {
    const NAME: &'static str = "uv_point";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let uv = UvPoint::new(f.float("u")?, f.float("v")?);
        f.finish()?;
        Ok(uv)
    }
}

impl FromBlock for Colour {
    const NAME: &'static str = "colour";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let colour = Colour::new(f.float("a")?, f.float("r")?, f.float("g")?, f.float("b")?);
        f.finish()?;
        Ok(colour)
    }
}

impl FromBlock for VolumeSphere {
    const NAME: &'static str = "vol_sphere";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let sphere = VolumeSphere::new(f.record()?, f.float("radius")?);
        f.finish()?;
        Ok(sphere)
    }
}

impl FromBlock for Matrix {
    const NAME: &'static str = "matrix";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        const FIELDS: [&str; 12] = [
            "ax", "ay", "az", "bx", "by", "bz", "cx", "cy", "cz", "dx", "dy", "dz",
        ];

        let mut f = Fields::new(block);
        let name = f.label()?;
        let mut components = [0.0; 12];
        for (slot, field) in components.iter_mut().zip(FIELDS) {
            *slot = f.float(field)?;
        }
        f.finish()?;
        Ok(Matrix::from_components(name, components))
    }
}

impl FromBlock for Texture {
    const NAME: &'static str = "texture";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let texture = Texture {
            image_index: f.int("image_index")?,
            filter_mode: f.int("filter_mode")?,
            mipmap_lod_bias: f.float("mipmap_lod_bias")?,
            border_colour: f.hex("border_colour")?,
        };
        f.finish()?;
        Ok(texture)
    }
}

impl FromBlock for LightMaterial {
    const NAME: &'static str = "light_material";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let material = LightMaterial {
            flags: f.hex("flags")?,
            diff_colour_index: f.int("diff_colour_index")?,
            amb_colour_index: f.int("amb_colour_index")?,
            spec_colour_index: f.int("spec_colour_index")?,
            emissive_colour_index: f.int("emissive_colour_index")?,
            spec_power: f.float("spec_power")?,
        };
        f.finish()?;
        Ok(material)
    }
}

impl FromBlock for LightModelCfg {
    const NAME: &'static str = "light_model_cfg";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let flags = f.hex("flags")?;
        let uv_ops = uv_ops(f.block("uv_ops")?)?;
        f.finish()?;
        Ok(LightModelCfg { flags, uv_ops })
    }
}

fn uv_ops(block: &Block) -> Result<Vec<UvOp>, SchemaError> {
    let list = counted(block)?;
    list.check()?;
    list.items()
        .iter()
        .map(|node| uv_op(any_block(node, block)?))
        .collect()
}

fn uv_op(block: &Block) -> Result<UvOp, SchemaError> {
    let mut f = Fields::new(block);
    let op = match block.name.as_str() {
        "uv_op_copy" => UvOp::Copy {
            texture_address_mode: f.int("texture_address_mode")?,
            source_uv_index: f.int("source_uv_index")?,
        },
        "uv_op_reflectmapfull" => UvOp::ReflectMapFull {
            texture_address_mode: f.int("texture_address_mode")?,
        },
        "uv_op_reflectmap" => UvOp::ReflectMap {
            texture_address_mode: f.int("texture_address_mode")?,
        },
        "uv_op_uniformscale" => UvOp::UniformScale {
            texture_address_mode: f.int("texture_address_mode")?,
            source_uv_index: f.int("source_uv_index")?,
            unknown3: f.int("unknown3")?,
            unknown4: f.int("unknown4")?,
        },
        "uv_op_nonuniformscale" => UvOp::NonUniformScale {
            texture_address_mode: f.int("texture_address_mode")?,
            source_uv_index: f.int("source_uv_index")?,
            unknown3: f.int("unknown3")?,
            unknown4: f.int("unknown4")?,
        },
        _ => {
            return Err(SchemaError::Unrecognized {
                name: block.name.clone(),
                parent: "uv_ops".to_string(),
                line: block.line,
            })
        }
    };
    f.finish()?;
    Ok(op)
}

impl FromBlock for VtxState {
    const NAME: &'static str = "vtx_state";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let state = VtxState {
            flags: f.hex("flags")?,
            matrix_index: f.int("matrix_index")?,
            light_material_index: f.int("light_material_index")?,
            light_model_cfg_index: f.int("light_model_cfg_index")?,
            light_flags: f.hex("light_flags")?,
            matrix2_index: f.optional_int("matrix2_index")?,
        };
        f.finish()?;
        Ok(state)
    }
}

impl FromBlock for PrimState {
    const NAME: &'static str = "prim_state";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let state = PrimState {
            name: f.label()?,
            flags: f.hex("flags")?,
            shader_index: f.int("shader_index")?,
            texture_indices: int_list(f.block("tex_idxs")?)?,
            z_bias: f.float("z_bias")?,
            vtx_state_index: f.int("vtx_state_index")?,
            alpha_test_mode: f.int("alpha_test_mode")?,
            light_cfg_index: f.int("light_cfg_index")?,
            z_buffer_mode: f.int("z_buffer_mode")?,
        };
        f.finish()?;
        Ok(state)
    }
}

impl FromBlock for LodControl {
    const NAME: &'static str = "lod_control";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let lod = LodControl {
            distance_levels_header: f.record()?,
            distance_levels: records(f.block("distance_levels")?)?,
        };
        f.finish()?;
        Ok(lod)
    }
}

impl FromBlock for DistanceLevelsHeader {
    const NAME: &'static str = "distance_levels_header";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let header = DistanceLevelsHeader {
            dlevel_bias: f.int("dlevel_bias")?,
        };
        f.finish()?;
        Ok(header)
    }
}

impl FromBlock for DistanceLevel {
    const NAME: &'static str = "distance_level";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let level = DistanceLevel {
            distance_level_header: f.record()?,
            sub_objects: records(f.block("sub_objects")?)?,
        };
        f.finish()?;
        Ok(level)
    }
}

impl FromBlock for DistanceLevelHeader {
    const NAME: &'static str = "distance_level_header";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);

        let mut selection = Fields::new(f.block("dlevel_selection")?);
        let dlevel_selection = selection.int("distance")?;
        selection.finish()?;

        let hierarchy = int_list(f.block("hierarchy")?)?;
        f.finish()?;
        Ok(DistanceLevelHeader {
            dlevel_selection,
            hierarchy,
        })
    }
}

impl FromBlock for SubObject {
    const NAME: &'static str = "sub_object";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let sub_object = SubObject {
            sub_object_header: f.record()?,
            vertices: records(f.block("vertices")?)?,
            vertex_sets: records(f.block("vertex_sets")?)?,
            primitives: primitives(f.block("primitives")?)?,
        };
        f.finish()?;
        Ok(sub_object)
    }
}

impl FromBlock for SubObjectHeader {
    const NAME: &'static str = "sub_object_header";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let header = SubObjectHeader {
            flags: f.hex("flags")?,
            sort_vector_index: f.int("sort_vector_index")?,
            volume_index: f.int("volume_index")?,
            source_vtx_fmt_flags: f.hex("source_vtx_fmt_flags")?,
            destination_vtx_fmt_flags: f.hex("destination_vtx_fmt_flags")?,
            geometry_info: f.record()?,
            subobject_shaders: int_list(f.block("subobject_shaders")?)?,
            subobject_light_cfgs: int_list(f.block("subobject_light_cfgs")?)?,
            subobject_id: f.int("subobject_id")?,
        };
        f.finish()?;
        Ok(header)
    }
}

impl FromBlock for GeometryInfo {
    const NAME: &'static str = "geometry_info";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let info = GeometryInfo {
            face_normals: f.int("face_normals")?,
            tx_light_cmds: f.int("tx_light_cmds")?,
            node_x_tx_light_cmds: f.int("node_x_tx_light_cmds")?,
            trilist_indices: f.int("trilist_indices")?,
            line_list_indices: f.int("line_list_indices")?,
            node_x_trilist_indices: f.int("node_x_trilist_indices")?,
            trilists: f.int("trilists")?,
            line_lists: f.int("line_lists")?,
            pt_lists: f.int("pt_lists")?,
            node_x_trilists: f.int("node_x_trilists")?,
            geometry_nodes: records(f.block("geometry_nodes")?)?,
            geometry_node_map: int_list(f.block("geometry_node_map")?)?,
        };
        f.finish()?;
        Ok(info)
    }
}

impl FromBlock for GeometryNode {
    const NAME: &'static str = "geometry_node";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let node = GeometryNode {
            tx_light_cmds: f.int("tx_light_cmds")?,
            node_x_tx_light_cmds: f.int("node_x_tx_light_cmds")?,
            trilists: f.int("trilists")?,
            line_lists: f.int("line_lists")?,
            pt_lists: f.int("pt_lists")?,
            cullable_prims: f.record()?,
        };
        f.finish()?;
        Ok(node)
    }
}

impl FromBlock for CullablePrims {
    const NAME: &'static str = "cullable_prims";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let prims = CullablePrims {
            prims: f.int("prims")?,
            flat_sections: f.int("flat_sections")?,
            prim_indices: f.int("prim_indices")?,
        };
        f.finish()?;
        Ok(prims)
    }
}

impl FromBlock for Vertex {
    const NAME: &'static str = "vertex";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let vertex = Vertex {
            flags: f.hex("flags")?,
            point_index: f.int("point_index")?,
            normal_index: f.int("normal_index")?,
            colour1: f.hex("colour1")?,
            colour2: f.hex("colour2")?,
            vertex_uvs: int_list(f.block("vertex_uvs")?)?,
        };
        f.finish()?;
        Ok(vertex)
    }
}

impl FromBlock for VertexSet {
    const NAME: &'static str = "vertex_set";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let set = VertexSet {
            vtx_state: f.int("vtx_state")?,
            vtx_start_index: f.int("vtx_start_index")?,
            vtx_count: f.int("vtx_count")?,
        };
        f.finish()?;
        Ok(set)
    }
}

/// `primitives ( N prim_state_idx ( i ) indexed_trilist ( ... ) ... )`
///
/// The count covers both item kinds. Each trilist takes the most recent
/// `prim_state_idx`, and every `prim_state_idx` must be followed by at least
/// one trilist.
fn primitives(block: &Block) -> Result<Vec<Primitive>, SchemaError> {
    let list = counted(block)?;
    list.check()?;

    let unused_index = |line| SchemaError::MissingField {
        block: block.name.clone(),
        field: "indexed_trilist".to_string(),
        line,
    };

    let mut current = None;
    let mut unused: Option<usize> = None;
    let mut primitives = Vec::new();
    for node in list.items() {
        let item = any_block(node, block)?;
        match item.name.as_str() {
            "prim_state_idx" => {
                if let Some(line) = unused {
                    return Err(unused_index(line));
                }
                let mut f = Fields::new(item);
                current = Some(f.int("index")?);
                f.finish()?;
                unused = Some(item.line);
            }
            "indexed_trilist" => {
                unused = None;
                let prim_state_index = current.ok_or_else(|| SchemaError::MissingField {
                    block: block.name.clone(),
                    field: "prim_state_idx".to_string(),
                    line: item.line,
                })?;
                primitives.push(Primitive {
                    prim_state_index,
                    indexed_trilist: IndexedTrilist::from_block(item)?,
                });
            }
            _ => {
                return Err(SchemaError::Unrecognized {
                    name: item.name.clone(),
                    parent: block.name.clone(),
                    line: item.line,
                })
            }
        }
    }

    match unused {
        Some(line) => Err(unused_index(line)),
        None => Ok(primitives),
    }
}

impl FromBlock for IndexedTrilist {
    const NAME: &'static str = "indexed_trilist";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let trilist = IndexedTrilist {
            vertex_idxs: vertex_idxs(f.block("vertex_idxs")?)?,
            normal_idxs: normal_idxs(f.block("normal_idxs")?)?,
            flags: counted(f.block("flags")?)?.hexes()?,
        };
        f.finish()?;
        Ok(trilist)
    }
}

/// The count is the number of integers, three per triangle
fn vertex_idxs(block: &Block) -> Result<Vec<VertexIdx>, SchemaError> {
    let values: Vec<i32> = counted(block)?.ints()?;

    if values.len() % 3 != 0 {
        return Err(SchemaError::MissingField {
            block: block.name.clone(),
            field: if values.len() % 3 == 1 { "b" } else { "c" }.to_string(),
            line: block.line,
        });
    }

    Ok(values
        .chunks_exact(3)
        .map(|t| VertexIdx::new(t[0], t[1], t[2]))
        .collect())
}

/// The count is the number of `index unknown` pairs
fn normal_idxs(block: &Block) -> Result<Vec<NormalIdx>, SchemaError> {
    let list = counted(block)?;
    let items = list.items();

    if items.len() / 2 != list.declared() {
        return Err(list.mismatch(items.len() / 2));
    }
    if let Some(extra) = items.get(list.declared() * 2) {
        return Err(SchemaError::UnexpectedChild {
            block: block.name.clone(),
            found: extra.describe(),
            line: extra.line(),
        });
    }

    let values: Vec<i32> = list.values()?;
    Ok(values
        .chunks_exact(2)
        .map(|p| NormalIdx::new(p[0], p[1]))
        .collect())
}

impl FromBlock for Animation {
    const NAME: &'static str = "animation";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let animation = Animation {
            frame_count: f.int("frame_count")?,
            frame_rate: f.int("frame_rate")?,
            anim_nodes: records(f.block("anim_nodes")?)?,
        };
        f.finish()?;
        Ok(animation)
    }
}

impl FromBlock for AnimNode {
    const NAME: &'static str = "anim_node";

    fn from_block(block: &Block) -> Result<Self, SchemaError> {
        let mut f = Fields::new(block);
        let name = f.label()?;

        let controllers_block = f.block("controllers")?;
        let list = counted(controllers_block)?;
        list.check()?;
        let controllers = list
            .items()
            .iter()
            .map(|node| controller(any_block(node, controllers_block)?))
            .collect::<Result<Vec<_>, _>>()?;

        f.finish()?;
        Ok(AnimNode { name, controllers })
    }
}

fn controller(block: &Block) -> Result<Controller, SchemaError> {
    let kind = ControllerKind::from_block_name(&block.name).ok_or_else(|| {
        SchemaError::Unrecognized {
            name: block.name.clone(),
            parent: "controllers".to_string(),
            line: block.line,
        }
    })?;

    let list = counted(block)?;
    list.check()?;

    let mut keys = Vec::with_capacity(list.declared());
    for (index, node) in list.items().iter().enumerate() {
        let item = any_block(node, block)?;
        let key = key_position(item)?;
        if !kind.accepts(&key) {
            return Err(SchemaError::TypeMismatch {
                block: block.name.clone(),
                field: format!("keys[{}]", index),
                expected: kind.expected_keys(),
                found: key.block_name().to_string(),
                line: item.line,
            });
        }
        keys.push(key);
    }

    Ok(Controller { kind, keys })
}

fn key_position(block: &Block) -> Result<KeyPosition, SchemaError> {
    let mut f = Fields::new(block);
    let key = match block.name.as_str() {
        "slerp_rot" => KeyPosition::SlerpRot {
            frame: f.int("frame")?,
            x: f.float("x")?,
            y: f.float("y")?,
            z: f.float("z")?,
            w: f.float("w")?,
        },
        "linear_key" => KeyPosition::LinearKey {
            frame: f.int("frame")?,
            x: f.float("x")?,
            y: f.float("y")?,
            z: f.float("z")?,
        },
        "tcb_key" => KeyPosition::TcbKey {
            frame: f.int("frame")?,
            x: f.float("x")?,
            y: f.float("y")?,
            z: f.float("z")?,
            w: f.float("w")?,
            tension: f.float("tension")?,
            continuity: f.float("continuity")?,
            bias: f.float("bias")?,
            in_: f.float("in")?,
            out: f.float("out")?,
        },
        _ => {
            return Err(SchemaError::Unrecognized {
                name: block.name.clone(),
                parent: "controller".to_string(),
                line: block.line,
            })
        }
    };
    f.finish()?;
    Ok(key)
}
