//! Resource module
//!
//! Geometry and bounding volumes shared by every instance of a pool.

pub mod bounds;
pub mod geometry;

pub use bounds::{AABB, BoundingSphere};
pub use geometry::{Geometry, GeometryDesc};
