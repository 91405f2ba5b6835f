//! Shape root and geometry records
//!
//! A [`Shape`] owns every collection in the file. Collections are plain
//! vectors: callers may push, remove and reorder freely, and the encoder
//! derives list counts from their lengths.

use serde::{Deserialize, Serialize};

use super::animation::Animation;
use super::hex::Hex32;
use super::lod::LodControl;
use super::material::{LightMaterial, LightModelCfg, PrimState, Texture, VtxState};

/// The root entity of a shape file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Shape {
    pub shape_header: ShapeHeader,
    pub volumes: Vec<VolumeSphere>,
    pub shader_names: Vec<String>,
    pub texture_filter_names: Vec<String>,
    pub points: Vec<Point>,
    pub uv_points: Vec<UvPoint>,
    pub normals: Vec<Vector>,
    pub sort_vectors: Vec<Vector>,
    pub colours: Vec<Colour>,
    pub matrices: Vec<Matrix>,
    pub images: Vec<String>,
    pub textures: Vec<Texture>,
    pub light_materials: Vec<LightMaterial>,
    pub light_model_cfgs: Vec<LightModelCfg>,
    pub vtx_states: Vec<VtxState>,
    pub prim_states: Vec<PrimState>,
    pub lod_controls: Vec<LodControl>,

    /// `None` when the file has no `animations` block at all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animations: Option<Vec<Animation>>,
}

impl Shape {
    /// Creates an empty shape with the given header
    pub fn new(shape_header: ShapeHeader) -> Self {
        Self {
            shape_header,
            ..Self::default()
        }
    }

    /// Total number of sub-objects across all LOD levels
    pub fn sub_object_count(&self) -> usize {
        self.lod_controls
            .iter()
            .flat_map(|lod| &lod.distance_levels)
            .map(|level| level.sub_objects.len())
            .sum()
    }

    /// Total number of triangles across all LOD levels
    pub fn triangle_count(&self) -> usize {
        self.lod_controls
            .iter()
            .flat_map(|lod| &lod.distance_levels)
            .flat_map(|level| &level.sub_objects)
            .flat_map(|sub| &sub.primitives)
            .map(|prim| prim.indexed_trilist.vertex_idxs.len())
            .sum()
    }
}

/// `shape_header ( flags1 flags2 )`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShapeHeader {
    pub flags1: Hex32,
    pub flags2: Hex32,
}

impl ShapeHeader {
    pub fn new(flags1: impl Into<Hex32>, flags2: impl Into<Hex32>) -> Self {
        Self {
            flags1: flags1.into(),
            flags2: flags2.into(),
        }
    }
}

/// `vector ( x y z )`, used for normals, sort vectors and sphere centres
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// `point ( x y z )`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// `uv_point ( u v )`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UvPoint {
    pub u: f64,
    pub v: f64,
}

impl UvPoint {
    pub fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }
}

/// `colour ( a r g b )`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Colour {
    pub a: f64,
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Colour {
    pub fn new(a: f64, r: f64, g: f64, b: f64) -> Self {
        Self { a, r, g, b }
    }
}

/// `vol_sphere ( vector ( x y z ) radius )`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VolumeSphere {
    pub vector: Vector,
    pub radius: f64,
}

impl VolumeSphere {
    pub fn new(vector: Vector, radius: f64) -> Self {
        Self { vector, radius }
    }
}

/// `matrix NAME ( ax ay az bx by bz cx cy cz dx dy dz )`
///
/// The first three rows are the rotation/scale basis, `d` is the translation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Matrix {
    pub name: String,
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
    pub bx: f64,
    pub by: f64,
    pub bz: f64,
    pub cx: f64,
    pub cy: f64,
    pub cz: f64,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Matrix {
    /// Builds a matrix from its twelve components in file order
    pub fn from_components(name: impl Into<String>, c: [f64; 12]) -> Self {
        Self {
            name: name.into(),
            ax: c[0],
            ay: c[1],
            az: c[2],
            bx: c[3],
            by: c[4],
            bz: c[5],
            cx: c[6],
            cy: c[7],
            cz: c[8],
            dx: c[9],
            dy: c[10],
            dz: c[11],
        }
    }

    /// Identity rotation with the given translation
    pub fn translation(name: impl Into<String>, dx: f64, dy: f64, dz: f64) -> Self {
        Self::from_components(name, [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, dx, dy, dz])
    }

    /// Returns the twelve components in file order
    pub fn components(&self) -> [f64; 12] {
        [
            self.ax, self.ay, self.az, self.bx, self.by, self.bz, self.cx, self.cy, self.cz,
            self.dx, self.dy, self.dz,
        ]
    }
}
