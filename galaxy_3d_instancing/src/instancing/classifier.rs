//! Frustum classification of instances.
//!
//! A classifier compares each instance's world bounding sphere against
//! the camera frustum, updates the `IN_FRUSTUM` flag and reports the
//! instances whose flag changed: `show` for those now contained, `hide`
//! for those that left. User-hidden instances are never reported.
//!
//! Two strategies exist:
//! - `DynamicClassifier` tests every visible instance each frame and
//!   follows transform changes.
//! - A `SpatialClassifier` (default `OctreeClassifier`) is built once
//!   from the initial transforms and answers from a spatial index.

use crate::camera::Camera;
use crate::resource::BoundingSphere;
use super::attribute_buffer::AttributeBuffers;
use super::instance::{InstanceEntity, InstanceFlags, InstanceKey};
use super::registry::InstanceRegistry;

// ===== BEHAVIOUR =====

/// How an instanced mesh classifies its instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullingBehaviour {
    /// Spatial index built once; instances are expected not to move
    #[default]
    Static,
    /// Every visible instance tested every frame
    Dynamic,
}

// ===== SPATIAL CLASSIFIER TRAIT =====

/// Spatial index answering frustum classification for a static pool.
///
/// Implementations follow the same output contract as
/// `DynamicClassifier::classify`: skip user-hidden instances, flip
/// `IN_FRUSTUM` on change, push changed keys to `show` / `hide`, and
/// write the matrix of contained instances whose transform is dirty.
pub trait SpatialClassifier: Send + Sync {
    /// Build the index from the current transforms.
    fn build(&mut self, registry: &InstanceRegistry, bounding_sphere: &BoundingSphere);

    /// Classify against the camera frustum. Returns the number of
    /// matrices written.
    fn classify(
        &mut self,
        camera: &Camera,
        registry: &mut InstanceRegistry,
        buffers: &mut AttributeBuffers,
        show: &mut Vec<InstanceKey>,
        hide: &mut Vec<InstanceKey>,
    ) -> u32;

    /// Drop any cached state covering `key`.
    fn invalidate(&mut self, key: InstanceKey);
}

/// Apply one containment result to an instance.
///
/// Shared by every classifier: flips `IN_FRUSTUM` and records the change,
/// then refreshes the matrix of a contained instance if it is dirty.
/// Returns true if the matrix was written.
pub(crate) fn apply_containment(
    key: InstanceKey,
    entity: &mut InstanceEntity,
    contained: bool,
    buffers: &mut AttributeBuffers,
    show: &mut Vec<InstanceKey>,
    hide: &mut Vec<InstanceKey>,
) -> bool {
    if contained != entity.is_in_frustum() {
        entity.set_flag(InstanceFlags::IN_FRUSTUM, contained);
        if contained {
            show.push(key);
        } else {
            hide.push(key);
        }
    }

    if contained && entity.is_matrix_dirty() {
        entity.refresh_matrix(buffers);
        return true;
    }
    false
}

// ===== DYNAMIC CLASSIFIER =====

/// Brute-force classifier for moving instances.
///
/// World spheres are recomputed from the current transform on every
/// pass. See `BoundingSphere::instance_world` for the approximations.
#[derive(Debug, Clone)]
pub struct DynamicClassifier {
    bounding_sphere: BoundingSphere,
}

impl DynamicClassifier {
    pub fn new(bounding_sphere: BoundingSphere) -> Self {
        Self { bounding_sphere }
    }

    pub fn bounding_sphere(&self) -> &BoundingSphere {
        &self.bounding_sphere
    }

    /// Test every visible instance. Returns the number of matrices written.
    pub fn classify(
        &self,
        camera: &Camera,
        registry: &mut InstanceRegistry,
        buffers: &mut AttributeBuffers,
        show: &mut Vec<InstanceKey>,
        hide: &mut Vec<InstanceKey>,
    ) -> u32 {
        let frustum = camera.frustum();
        let mut rebuilds = 0;

        for (key, entity) in registry.iter_mut() {
            if !entity.is_visible() {
                continue;
            }
            let sphere = self.bounding_sphere.instance_world(entity.position(), entity.scale());
            let contained = frustum.intersects_sphere(&sphere);
            if apply_containment(key, entity, contained, buffers, show, hide) {
                rebuilds += 1;
            }
        }
        rebuilds
    }
}

// ===== CLASSIFIER SELECTION =====

/// Classification strategy of one mesh, fixed at construction
pub enum Classifier {
    Dynamic(DynamicClassifier),
    Spatial(Box<dyn SpatialClassifier>),
}

impl Classifier {
    pub fn behaviour(&self) -> CullingBehaviour {
        match self {
            Classifier::Dynamic(_) => CullingBehaviour::Dynamic,
            Classifier::Spatial(_) => CullingBehaviour::Static,
        }
    }

    pub(crate) fn classify(
        &mut self,
        camera: &Camera,
        registry: &mut InstanceRegistry,
        buffers: &mut AttributeBuffers,
        show: &mut Vec<InstanceKey>,
        hide: &mut Vec<InstanceKey>,
    ) -> u32 {
        match self {
            Classifier::Dynamic(dynamic) => dynamic.classify(camera, registry, buffers, show, hide),
            Classifier::Spatial(spatial) => spatial.classify(camera, registry, buffers, show, hide),
        }
    }

    pub(crate) fn invalidate(&mut self, key: InstanceKey) {
        if let Classifier::Spatial(spatial) = self {
            spatial.invalidate(key);
        }
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classifier::Dynamic(dynamic) => f.debug_tuple("Dynamic").field(dynamic).finish(),
            Classifier::Spatial(_) => f.write_str("Spatial(..)"),
        }
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
