/// Bounding volumes used for culling.
///
/// `BoundingSphere` is what geometries carry and what the classifiers test.
/// `AABB` is used by the octree classifier for node bounds.

use glam::Vec3;

// ===== AABB =====

/// Axis-Aligned Bounding Box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner (x, y, z)
    pub min: Vec3,
    /// Maximum corner (x, y, z)
    pub max: Vec3,
}

impl AABB {
    /// An inverted box that any `expand` call replaces
    pub const EMPTY: AABB = AABB {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Extent along each axis
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Whether no point was ever added
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow to include `other`
    pub fn expand(&mut self, other: &AABB) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// Test if this AABB fully contains another AABB.
    pub fn contains(&self, other: &AABB) -> bool {
        self.min.x <= other.min.x && self.max.x >= other.max.x
        && self.min.y <= other.min.y && self.max.y >= other.max.y
        && self.min.z <= other.min.z && self.max.z >= other.max.z
    }
}

// ===== BOUNDING SPHERE =====

/// Sphere bounds (center, radius)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Sphere enclosing a point cloud.
    ///
    /// Center is the center of the points' AABB, radius the largest
    /// distance from that center. Returns `None` for an empty slice.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let mut aabb = AABB::EMPTY;
        for p in points {
            aabb.expand(&AABB { min: *p, max: *p });
        }
        let center = aabb.center();

        let radius_sq = points.iter()
            .map(|p| p.distance_squared(center))
            .fold(0.0_f32, f32::max);

        Some(Self { center, radius: radius_sq.sqrt() })
    }

    /// World-space sphere of one instance.
    ///
    /// Two approximations are kept on purpose:
    /// - the local center is offset by `position` but not rotated, so the
    ///   result is only exact when the local center is the origin;
    /// - the radius is scaled by the largest scale component, exact for
    ///   uniform scale and an overestimate otherwise.
    pub fn instance_world(&self, position: Vec3, scale: Vec3) -> BoundingSphere {
        BoundingSphere {
            center: self.center + position,
            radius: self.radius * max_component(scale),
        }
    }

    /// AABB enclosing the sphere
    pub fn aabb(&self) -> AABB {
        let r = Vec3::splat(self.radius);
        AABB { min: self.center - r, max: self.center + r }
    }
}

/// Largest of the three components, without the NaN handling of `f32::max`.
#[inline]
pub(crate) fn max_component(v: Vec3) -> f32 {
    if v.x > v.y {
        if v.x > v.z { v.x } else { v.z }
    } else if v.y > v.z {
        v.y
    } else {
        v.z
    }
}

#[cfg(test)]
#[path = "bounds_tests.rs"]
mod tests;
