//! Typed shape model
//!
//! The in-memory graph a decoded shape file maps to. Contains no I/O and no
//! knowledge of the text format; see [`crate::codec`] for that.

mod hex;
mod shape;
mod material;
mod lod;
mod animation;

pub use hex::{Hex32, HexError};
pub use shape::{Colour, Matrix, Point, Shape, ShapeHeader, UvPoint, Vector, VolumeSphere};
pub use material::{LightMaterial, LightModelCfg, PrimState, Texture, UvOp, VtxState};
pub use lod::{
    CullablePrims, DistanceLevel, DistanceLevelHeader, DistanceLevelsHeader, GeometryInfo,
    GeometryNode, IndexedTrilist, LodControl, NormalIdx, Primitive, SubObject, SubObjectHeader,
    Vertex, VertexIdx, VertexSet,
};
pub use animation::{AnimNode, Animation, Controller, ControllerKind, KeyPosition};
