/// OctreeClassifier: static octree driving frustum classification of a pool.
///
/// Single-node placement: each instance is stored in exactly one node,
/// the deepest node whose AABB fully contains the AABB of the instance's
/// world bounding sphere. An instance straddling a child boundary stays
/// in the parent.
///
/// The tree is pre-allocated at build time with a fixed depth; all
/// 8^d nodes exist regardless of occupancy. Instances are placed once,
/// from their transforms at build time, and never re-inserted.
///
/// Each node caches the containment it last applied to its subtree.
/// When a node classifies `Inside` or `Outside` and the cached value is
/// the same, every instance below it already carries the right
/// `IN_FRUSTUM` flag and the whole subtree is skipped. `Partial` nodes
/// are always visited.

use rustc_hash::FxHashMap;
use glam::Vec3;
use crate::camera::{Camera, Frustum, FrustumTest};
use crate::resource::{BoundingSphere, AABB};
use crate::engine_debug;
use super::attribute_buffer::AttributeBuffers;
use super::classifier::{apply_containment, SpatialClassifier};
use super::instance::InstanceKey;
use super::registry::InstanceRegistry;

/// Index of the root node in the flat node array.
const ROOT: usize = 0;

/// Deepest tree accepted by `InstancedMesh` (299 593 nodes)
pub const MAX_OCTREE_DEPTH: u32 = 6;

/// A single node in the octree.
struct OctreeNode {
    /// World-space AABB of this node
    aabb: AABB,
    /// Index of the first child in the flat array (0 = no children / leaf)
    first_child: usize,
    parent: Option<usize>,
    /// Instances stored in this node, with their world sphere
    objects: Vec<(InstanceKey, BoundingSphere)>,
    /// Containment applied to the subtree on the last visit
    cached: Option<FrustumTest>,
}

/// Mutable state threaded through one classification pass
struct ClassifyPass<'a> {
    frustum: &'a Frustum,
    registry: &'a mut InstanceRegistry,
    buffers: &'a mut AttributeBuffers,
    show: &'a mut Vec<InstanceKey>,
    hide: &'a mut Vec<InstanceKey>,
    rebuilds: u32,
}

/// Static octree spatial classifier.
pub struct OctreeClassifier {
    /// Flat array of all octree nodes (depth-first layout)
    nodes: Vec<OctreeNode>,
    /// Maximum depth of the tree (root = depth 0)
    max_depth: u32,
    /// Reverse lookup: instance key → node index
    object_locations: FxHashMap<InstanceKey, usize>,
    /// Pre-computed subtree sizes indexed by remaining depth.
    /// subtree_sizes[d] = total node count for a subtree of depth d.
    subtree_sizes: Vec<usize>,
}

impl OctreeClassifier {
    /// Create an empty classifier. Nodes are allocated by `build`.
    ///
    /// `max_depth` is clamped to `MAX_OCTREE_DEPTH`.
    pub fn new(max_depth: u32) -> Self {
        let max_depth = max_depth.min(MAX_OCTREE_DEPTH);
        Self {
            nodes: Vec::new(),
            max_depth,
            object_locations: FxHashMap::default(),
            subtree_sizes: (0..=max_depth).map(Self::total_node_count).collect(),
        }
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Number of allocated nodes (0 before `build`)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of placed instances
    pub fn object_count(&self) -> usize {
        self.object_locations.len()
    }

    /// Bounds of the root node, once built
    pub fn world_bounds(&self) -> Option<AABB> {
        self.nodes.first().map(|root| root.aabb)
    }

    /// Depth of the node holding `key` (root = 0)
    pub fn depth_of(&self, key: InstanceKey) -> Option<u32> {
        let mut node = *self.object_locations.get(&key)?;
        let mut depth = 0;
        while let Some(parent) = self.nodes[node].parent {
            node = parent;
            depth += 1;
        }
        Some(depth)
    }

    /// Total number of nodes for a given depth: (8^(d+1) - 1) / 7
    fn total_node_count(max_depth: u32) -> usize {
        let mut count = 0usize;
        let mut level_count = 1usize;
        for _ in 0..=max_depth {
            count += level_count;
            level_count *= 8;
        }
        count
    }

    /// Recursively build the static octree node array (depth-first).
    fn build_recursive(
        nodes: &mut Vec<OctreeNode>,
        aabb: &AABB,
        parent: Option<usize>,
        depth: u32,
        max_depth: u32,
    ) {
        let node_index = nodes.len();
        nodes.push(OctreeNode {
            aabb: *aabb,
            first_child: 0,
            parent,
            objects: Vec::new(),
            cached: None,
        });

        if depth >= max_depth {
            return;
        }

        let center = aabb.center();
        nodes[node_index].first_child = nodes.len();

        for octant in 0..8u8 {
            let child_aabb = Self::octant_aabb(aabb, &center, octant);
            Self::build_recursive(nodes, &child_aabb, Some(node_index), depth + 1, max_depth);
        }
    }

    /// Compute the AABB of a specific octant (0-7).
    ///
    /// Octant bit layout: bit0 = X, bit1 = Y, bit2 = Z.
    /// - 0 = low, 1 = high for each axis.
    fn octant_aabb(parent: &AABB, center: &Vec3, octant: u8) -> AABB {
        AABB {
            min: Vec3::new(
                if octant & 1 == 0 { parent.min.x } else { center.x },
                if octant & 2 == 0 { parent.min.y } else { center.y },
                if octant & 4 == 0 { parent.min.z } else { center.z },
            ),
            max: Vec3::new(
                if octant & 1 == 0 { center.x } else { parent.max.x },
                if octant & 2 == 0 { center.y } else { parent.max.y },
                if octant & 4 == 0 { center.z } else { parent.max.z },
            ),
        }
    }

    /// Determine which octant a point falls into relative to a center.
    fn point_octant(center: &Vec3, point: &Vec3) -> u8 {
        ((point.x >= center.x) as u8)
            | (((point.y >= center.y) as u8) << 1)
            | (((point.z >= center.z) as u8) << 2)
    }

    /// Offset of octant `i` in the depth-first node layout.
    fn subtree_offset(&self, octant: u8, remaining_depth: u32) -> usize {
        octant as usize * self.subtree_sizes[remaining_depth as usize]
    }

    /// Find the deepest node that fully contains `aabb`.
    ///
    /// If both corners fall into the same octant the box fits in that
    /// child; otherwise it straddles a boundary and stays here.
    fn find_target_node(&self, aabb: &AABB) -> usize {
        if !self.nodes[ROOT].aabb.contains(aabb) {
            return ROOT;
        }

        let mut node_idx = ROOT;
        let mut depth = 0;

        loop {
            let first_child = self.nodes[node_idx].first_child;
            if depth >= self.max_depth || first_child == 0 {
                return node_idx;
            }

            let center = self.nodes[node_idx].aabb.center();
            let min_oct = Self::point_octant(&center, &aabb.min);
            let max_oct = Self::point_octant(&center, &aabb.max);

            if min_oct != max_oct {
                return node_idx;
            }

            node_idx = first_child + self.subtree_offset(min_oct, self.max_depth - depth - 1);
            depth += 1;
        }
    }

    /// Visit a node with its containment, either computed here or
    /// inherited from an `Inside` / `Outside` ancestor.
    fn classify_recursive(
        &mut self,
        node_idx: usize,
        inherited: Option<FrustumTest>,
        depth: u32,
        pass: &mut ClassifyPass<'_>,
    ) {
        let class = inherited.unwrap_or_else(|| pass.frustum.classify_aabb(&self.nodes[node_idx].aabb));

        if class != FrustumTest::Partial && self.nodes[node_idx].cached == Some(class) {
            return;
        }
        self.nodes[node_idx].cached = Some(class);

        for &(key, sphere) in &self.nodes[node_idx].objects {
            let Some(entity) = pass.registry.get_mut(key) else {
                continue;
            };
            if !entity.is_visible() {
                continue;
            }
            let contained = match class {
                FrustumTest::Inside => true,
                FrustumTest::Outside => false,
                FrustumTest::Partial => pass.frustum.intersects_sphere(&sphere),
            };
            if apply_containment(key, entity, contained, pass.buffers, pass.show, pass.hide) {
                pass.rebuilds += 1;
            }
        }

        let first_child = self.nodes[node_idx].first_child;
        if depth >= self.max_depth || first_child == 0 {
            return;
        }

        let child_inherited = match class {
            FrustumTest::Partial => None,
            settled => Some(settled),
        };
        for octant in 0..8u8 {
            let child_idx = first_child + self.subtree_offset(octant, self.max_depth - depth - 1);
            self.classify_recursive(child_idx, child_inherited, depth + 1, pass);
        }
    }
}

impl SpatialClassifier for OctreeClassifier {
    fn build(&mut self, registry: &InstanceRegistry, bounding_sphere: &BoundingSphere) {
        let spheres: Vec<(InstanceKey, BoundingSphere)> = registry.iter()
            .map(|(key, entity)| (key, bounding_sphere.instance_world(entity.position(), entity.scale())))
            .collect();

        let mut world_aabb = AABB::EMPTY;
        for (_, sphere) in &spheres {
            world_aabb.expand(&sphere.aabb());
        }
        if world_aabb.is_empty() {
            world_aabb = AABB { min: Vec3::ZERO, max: Vec3::ZERO };
        }

        let total_nodes = Self::total_node_count(self.max_depth);
        self.nodes = Vec::with_capacity(total_nodes);
        Self::build_recursive(&mut self.nodes, &world_aabb, None, 0, self.max_depth);
        debug_assert_eq!(self.nodes.len(), total_nodes);

        self.object_locations.clear();
        self.object_locations.reserve(spheres.len());
        for (key, sphere) in spheres {
            let node_idx = self.find_target_node(&sphere.aabb());
            self.nodes[node_idx].objects.push((key, sphere));
            self.object_locations.insert(key, node_idx);
        }

        engine_debug!("galaxy3d::OctreeClassifier",
            "Built octree: {} nodes, depth {}, {} instances",
            self.nodes.len(), self.max_depth, self.object_locations.len());
    }

    fn classify(
        &mut self,
        camera: &Camera,
        registry: &mut InstanceRegistry,
        buffers: &mut AttributeBuffers,
        show: &mut Vec<InstanceKey>,
        hide: &mut Vec<InstanceKey>,
    ) -> u32 {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut pass = ClassifyPass {
            frustum: camera.frustum(),
            registry,
            buffers,
            show,
            hide,
            rebuilds: 0,
        };
        self.classify_recursive(ROOT, None, 0, &mut pass);
        pass.rebuilds
    }

    fn invalidate(&mut self, key: InstanceKey) {
        let mut node = self.object_locations.get(&key).copied();
        while let Some(idx) = node {
            self.nodes[idx].cached = None;
            node = self.nodes[idx].parent;
        }
    }
}

#[cfg(test)]
#[path = "octree_classifier_tests.rs"]
mod tests;
