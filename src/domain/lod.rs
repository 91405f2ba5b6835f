//! Level-of-detail hierarchy: distance levels, sub-objects and primitives

use serde::{Deserialize, Serialize};

use super::hex::Hex32;

/// `lod_control ( distance_levels_header ( bias ) distance_levels ( N ... ) )`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LodControl {
    pub distance_levels_header: DistanceLevelsHeader,
    pub distance_levels: Vec<DistanceLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DistanceLevelsHeader {
    pub dlevel_bias: i32,
}

/// One distance band and the sub-objects drawn inside it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DistanceLevel {
    pub distance_level_header: DistanceLevelHeader,
    pub sub_objects: Vec<SubObject>,
}

/// `distance_level_header ( dlevel_selection ( D ) hierarchy ( N ... ) )`
///
/// `hierarchy` maps every matrix to its parent matrix, `-1` for the root.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DistanceLevelHeader {
    pub dlevel_selection: i32,
    pub hierarchy: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubObject {
    pub sub_object_header: SubObjectHeader,
    pub vertices: Vec<Vertex>,
    pub vertex_sets: Vec<VertexSet>,
    pub primitives: Vec<Primitive>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubObjectHeader {
    pub flags: Hex32,
    pub sort_vector_index: i32,
    pub volume_index: i32,
    pub source_vtx_fmt_flags: Hex32,
    pub destination_vtx_fmt_flags: Hex32,
    pub geometry_info: GeometryInfo,
    pub subobject_shaders: Vec<i32>,
    pub subobject_light_cfgs: Vec<i32>,
    pub subobject_id: i32,
}

/// Precomputed counters the engine uses to size its buffers
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeometryInfo {
    pub face_normals: i32,
    pub tx_light_cmds: i32,
    pub node_x_tx_light_cmds: i32,
    pub trilist_indices: i32,
    pub line_list_indices: i32,
    pub node_x_trilist_indices: i32,
    pub trilists: i32,
    pub line_lists: i32,
    pub pt_lists: i32,
    pub node_x_trilists: i32,
    pub geometry_nodes: Vec<GeometryNode>,
    pub geometry_node_map: Vec<i32>,
}

impl GeometryInfo {
    /// The ten leading counters in file order
    pub fn counters(&self) -> [i32; 10] {
        [
            self.face_normals,
            self.tx_light_cmds,
            self.node_x_tx_light_cmds,
            self.trilist_indices,
            self.line_list_indices,
            self.node_x_trilist_indices,
            self.trilists,
            self.line_lists,
            self.pt_lists,
            self.node_x_trilists,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeometryNode {
    pub tx_light_cmds: i32,
    pub node_x_tx_light_cmds: i32,
    pub trilists: i32,
    pub line_lists: i32,
    pub pt_lists: i32,
    pub cullable_prims: CullablePrims,
}

/// `cullable_prims ( prims flat_sections prim_indices )`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CullablePrims {
    pub prims: i32,
    pub flat_sections: i32,
    pub prim_indices: i32,
}

/// `vertex ( flags point normal colour1 colour2 vertex_uvs ( N ... ) )`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Vertex {
    pub flags: Hex32,
    pub point_index: i32,
    pub normal_index: i32,
    pub colour1: Hex32,
    pub colour2: Hex32,
    pub vertex_uvs: Vec<i32>,
}

/// `vertex_set ( vtx_state start count )`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VertexSet {
    pub vtx_state: i32,
    pub vtx_start_index: i32,
    pub vtx_count: i32,
}

/// A triangle list together with the prim state it is drawn with
///
/// In the file the prim state index is a sibling `prim_state_idx` item that
/// applies to every following trilist until the next one.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Primitive {
    pub prim_state_index: i32,
    pub indexed_trilist: IndexedTrilist,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexedTrilist {
    pub vertex_idxs: Vec<VertexIdx>,
    pub normal_idxs: Vec<NormalIdx>,
    pub flags: Vec<Hex32>,
}

/// Three vertex indices forming one triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VertexIdx {
    pub a: i32,
    pub b: i32,
    pub c: i32,
}

impl VertexIdx {
    pub fn new(a: i32, b: i32, c: i32) -> Self {
        Self { a, b, c }
    }
}

/// Face normal index of one triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NormalIdx {
    pub index: i32,
    pub unknown: i32,
}

impl NormalIdx {
    pub fn new(index: i32, unknown: i32) -> Self {
        Self { index, unknown }
    }
}
