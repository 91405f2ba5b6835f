//! Textures, lighting and render states

use serde::{Deserialize, Serialize};

use super::hex::Hex32;

/// `texture ( image_index filter_mode mipmap_lod_bias border_colour )`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Texture {
    pub image_index: i32,
    pub filter_mode: i32,
    pub mipmap_lod_bias: f64,
    pub border_colour: Hex32,
}

/// `light_material ( flags diff amb spec emissive spec_power )`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LightMaterial {
    pub flags: Hex32,
    pub diff_colour_index: i32,
    pub amb_colour_index: i32,
    pub spec_colour_index: i32,
    pub emissive_colour_index: i32,
    pub spec_power: f64,
}

/// `light_model_cfg ( flags uv_ops ( N ... ) )`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LightModelCfg {
    pub flags: Hex32,
    pub uv_ops: Vec<UvOp>,
}

/// One texture coordinate operation inside a `uv_ops` list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum UvOp {
    Copy {
        texture_address_mode: i32,
        source_uv_index: i32,
    },
    ReflectMapFull {
        texture_address_mode: i32,
    },
    ReflectMap {
        texture_address_mode: i32,
    },
    UniformScale {
        texture_address_mode: i32,
        source_uv_index: i32,
        unknown3: i32,
        unknown4: i32,
    },
    NonUniformScale {
        texture_address_mode: i32,
        source_uv_index: i32,
        unknown3: i32,
        unknown4: i32,
    },
}

impl UvOp {
    /// Block name used in the file
    pub fn block_name(&self) -> &'static str {
        match self {
            UvOp::Copy { .. } => "uv_op_copy",
            UvOp::ReflectMapFull { .. } => "uv_op_reflectmapfull",
            UvOp::ReflectMap { .. } => "uv_op_reflectmap",
            UvOp::UniformScale { .. } => "uv_op_uniformscale",
            UvOp::NonUniformScale { .. } => "uv_op_nonuniformscale",
        }
    }

    /// Integer fields in file order
    pub fn values(&self) -> Vec<i32> {
        match *self {
            UvOp::Copy {
                texture_address_mode,
                source_uv_index,
            } => vec![texture_address_mode, source_uv_index],
            UvOp::ReflectMapFull {
                texture_address_mode,
            }
            | UvOp::ReflectMap {
                texture_address_mode,
            } => vec![texture_address_mode],
            UvOp::UniformScale {
                texture_address_mode,
                source_uv_index,
                unknown3,
                unknown4,
            }
            | UvOp::NonUniformScale {
                texture_address_mode,
                source_uv_index,
                unknown3,
                unknown4,
            } => vec![texture_address_mode, source_uv_index, unknown3, unknown4],
        }
    }
}

/// `vtx_state ( flags matrix light_material light_model_cfg light_flags [matrix2] )`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VtxState {
    pub flags: Hex32,
    pub matrix_index: i32,
    pub light_material_index: i32,
    pub light_model_cfg_index: i32,
    pub light_flags: Hex32,

    /// Older exporters omit the second matrix index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix2_index: Option<i32>,
}

/// `prim_state NAME ( flags shader tex_idxs ( ... ) z_bias vtx alpha light zbuf )`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PrimState {
    pub name: String,
    pub flags: Hex32,
    pub shader_index: i32,
    pub texture_indices: Vec<i32>,
    pub z_bias: f64,
    pub vtx_state_index: i32,
    pub alpha_test_mode: i32,
    pub light_cfg_index: i32,
    pub z_buffer_mode: i32,
}
