//! x3dfilter Geometry
//!
//! Mesh buffers, affine flattening, face-loop triangulation, epsilon
//! coordinate dedup and normal synthesis, built on nalgebra and earcutr.

pub mod dedup;
pub mod error;
pub mod mesh;
pub mod normals;
pub mod transform;
pub mod triangulation;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

pub use nalgebra::{Matrix4, Point2, Point3, Vector3};

pub use dedup::{CoordinateDedup, DedupMap, DEFAULT_EPSILON};
pub use mesh::{CoordinateBuffer, IndexBuffer};
pub use transform::TransformParams;
