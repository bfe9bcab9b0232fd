/// Frustum: six clipping planes for instance culling.
///
/// Each plane is a Vec4 (A, B, C, D) with an inward unit normal (A, B, C):
/// a point P is inside when dot(normal, P) + D >= 0 for all six planes.

use glam::{Mat4, Vec3, Vec4};
use crate::resource::{AABB, BoundingSphere};

/// Result of a 3-way frustum/AABB classification.
///
/// Drives the octree classifier:
/// - `Outside` → every instance of the subtree is culled
/// - `Inside` → every instance of the subtree is contained
/// - `Partial` → test instances individually and recurse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrustumTest {
    /// AABB is entirely outside the frustum
    Outside,
    /// AABB is entirely inside the frustum
    Inside,
    /// AABB partially overlaps the frustum
    Partial,
}

/// Frustum plane indices
pub const PLANE_LEFT: usize = 0;
pub const PLANE_RIGHT: usize = 1;
pub const PLANE_BOTTOM: usize = 2;
pub const PLANE_TOP: usize = 3;
pub const PLANE_NEAR: usize = 4;
pub const PLANE_FAR: usize = 5;

/// Six frustum planes: left, right, bottom, top, near, far.
#[derive(Debug, Clone, Copy)]
pub struct Frustum {
    pub planes: [Vec4; 6],
}

impl Frustum {
    /// Extract frustum planes from a view-projection matrix (Gribb & Hartmann).
    ///
    /// Works for perspective and orthographic projections with a [-1, 1]
    /// or [0, 1] clip depth; with glam's `_rh` projections the near plane
    /// extracted from row3 + row2 is conservative.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let m = vp.to_cols_array_2d();
        let row = |r: usize| Vec4::new(m[0][r], m[1][r], m[2][r], m[3][r]);
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        let mut planes = [
            r3 + r0, // left
            r3 - r0, // right
            r3 + r1, // bottom
            r3 - r1, // top
            r3 + r2, // near
            r3 - r2, // far
        ];

        for plane in &mut planes {
            let normal_len = plane.truncate().length();
            if normal_len > 0.0 {
                *plane /= normal_len;
            }
        }

        Self { planes }
    }

    /// Signed distance from a point to one plane (positive = inside).
    #[inline]
    pub fn distance_to_plane(&self, plane: usize, point: Vec3) -> f32 {
        let p = self.planes[plane];
        p.truncate().dot(point) + p.w
    }

    /// Sphere containment test.
    ///
    /// Returns `true` when the sphere is inside or intersects the frustum.
    /// Conservative near the frustum corners (may report spheres that only
    /// touch the extended planes), never misses a visible sphere.
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        let neg_radius = -sphere.radius;
        for plane in &self.planes {
            if plane.truncate().dot(sphere.center) + plane.w < neg_radius {
                return false;
            }
        }
        true
    }

    /// Test if an AABB intersects this frustum ("positive vertex" test).
    ///
    /// May return false positives, never false negatives.
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        for plane in &self.planes {
            let normal = plane.truncate();
            let p_vertex = Self::positive_vertex(normal, aabb);
            if normal.dot(p_vertex) + plane.w < 0.0 {
                return false;
            }
        }
        true
    }

    /// Classify an AABB against the frustum (3-way test).
    ///
    /// - p-vertex outside any plane → `Outside` (early out)
    /// - n-vertex outside any plane → at least `Partial`
    /// - otherwise → `Inside`
    pub fn classify_aabb(&self, aabb: &AABB) -> FrustumTest {
        let mut all_inside = true;

        for plane in &self.planes {
            let normal = plane.truncate();

            if normal.dot(Self::positive_vertex(normal, aabb)) + plane.w < 0.0 {
                return FrustumTest::Outside;
            }

            // Negative vertex: corner least in the direction of the normal
            let n_vertex = Vec3::new(
                if normal.x >= 0.0 { aabb.min.x } else { aabb.max.x },
                if normal.y >= 0.0 { aabb.min.y } else { aabb.max.y },
                if normal.z >= 0.0 { aabb.min.z } else { aabb.max.z },
            );
            if normal.dot(n_vertex) + plane.w < 0.0 {
                all_inside = false;
            }
        }

        if all_inside { FrustumTest::Inside } else { FrustumTest::Partial }
    }

    /// Corner of `aabb` most aligned with `normal`
    #[inline]
    fn positive_vertex(normal: Vec3, aabb: &AABB) -> Vec3 {
        Vec3::new(
            if normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
            if normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
            if normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
        )
    }
}

#[cfg(test)]
#[path = "frustum_tests.rs"]
mod tests;
