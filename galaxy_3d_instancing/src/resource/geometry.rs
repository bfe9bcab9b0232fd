//! Resource-level geometry for instanced drawing.
//!
//! The instancing pool only needs the local bounding sphere of the shared
//! geometry. Vertex positions are kept so the sphere can be computed when
//! the loader did not provide one. GPU vertex/index buffers belong to the
//! rendering backend and are not modeled here.

use glam::Vec3;
use crate::error::Result;
use crate::engine_bail;
use super::bounds::BoundingSphere;

// ============================================================================
// GEOMETRY DESC
// ============================================================================

/// Descriptor for creating a Geometry
#[derive(Debug, Clone, Default)]
pub struct GeometryDesc {
    /// Debug name
    pub name: String,
    /// Local-space vertex positions (may be empty when `bounding_sphere` is given)
    pub positions: Vec<Vec3>,
    /// Precomputed local bounding sphere
    pub bounding_sphere: Option<BoundingSphere>,
}

// ============================================================================
// GEOMETRY
// ============================================================================

/// Shared geometry of an instanced mesh
#[derive(Debug, Clone)]
pub struct Geometry {
    name: String,
    positions: Vec<Vec3>,
    bounding_sphere: Option<BoundingSphere>,
}

impl Geometry {
    /// Create a geometry from a descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, or if a provided bounding
    /// sphere has a negative or non-finite radius.
    pub fn from_desc(desc: GeometryDesc) -> Result<Self> {
        if desc.name.is_empty() {
            engine_bail!("galaxy3d::Geometry", "Geometry name must not be empty");
        }
        if let Some(sphere) = &desc.bounding_sphere {
            if !sphere.radius.is_finite() || sphere.radius < 0.0 {
                engine_bail!("galaxy3d::Geometry",
                    "Geometry '{}': invalid bounding sphere radius {}", desc.name, sphere.radius);
            }
        }

        Ok(Self {
            name: desc.name,
            positions: desc.positions,
            bounding_sphere: desc.bounding_sphere,
        })
    }

    /// Axis-aligned box centered on the origin (24 vertices like a
    /// textured cube, only positions are kept).
    pub fn cuboid(name: &str, width: f32, height: f32, depth: f32) -> Result<Self> {
        let h = Vec3::new(width, height, depth) * 0.5;
        let mut positions = Vec::with_capacity(24);
        for face in 0..6 {
            let axis = face / 2;
            let sign = if face % 2 == 0 { 1.0 } else { -1.0 };
            for corner in 0..4 {
                let u = if corner & 1 == 0 { -1.0 } else { 1.0 };
                let v = if corner & 2 == 0 { -1.0 } else { 1.0 };
                let p = match axis {
                    0 => Vec3::new(sign * h.x, u * h.y, v * h.z),
                    1 => Vec3::new(u * h.x, sign * h.y, v * h.z),
                    _ => Vec3::new(u * h.x, v * h.y, sign * h.z),
                };
                positions.push(p);
            }
        }

        let mut geometry = Self::from_desc(GeometryDesc {
            name: name.to_string(),
            positions,
            bounding_sphere: None,
        })?;
        geometry.compute_bounding_sphere();
        Ok(geometry)
    }

    /// Compute (or recompute) the bounding sphere from the vertex positions.
    ///
    /// Returns false and leaves the sphere untouched if there are no positions.
    pub fn compute_bounding_sphere(&mut self) -> bool {
        match BoundingSphere::from_points(&self.positions) {
            Some(sphere) => {
                self.bounding_sphere = Some(sphere);
                true
            }
            None => false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Local bounding sphere, if computed or provided
    pub fn bounding_sphere(&self) -> Option<&BoundingSphere> {
        self.bounding_sphere.as_ref()
    }
}

#[cfg(test)]
#[path = "geometry_tests.rs"]
mod tests;
