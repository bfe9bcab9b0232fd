//! Camera module: camera matrices and frustum.
//!
//! The camera is a passive data container owned and driven by the caller.
//! Instanced meshes only read its frustum during `update_culling`.

mod camera;
mod frustum;

pub use camera::Camera;
pub use frustum::{
    Frustum, FrustumTest,
    PLANE_LEFT, PLANE_RIGHT, PLANE_BOTTOM, PLANE_TOP, PLANE_NEAR, PLANE_FAR,
};
