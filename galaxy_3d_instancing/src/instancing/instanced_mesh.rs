/// InstancedMesh: a fixed pool of instances of one geometry and material.
///
/// The pool keeps every renderable instance in the prefix
/// `[0, active_count)` of its attribute buffers, so a renderer draws the
/// mesh with one instanced draw of `active_count` instances reading the
/// buffers from slot 0.
///
/// Per frame, `update_culling` classifies instances against the camera
/// frustum and moves the ones whose containment changed with the minimum
/// number of slot swaps. Visibility toggles move a single instance
/// immediately.

use std::time::Instant;
use glam::{Quat, Vec3};
use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::resource::{BoundingSphere, Geometry};
use crate::{engine_bail, engine_debug, engine_error, engine_trace, engine_warn};
use super::attribute_buffer::{AttributeBuffers, AttributeDesc, DirtyRange};
use super::classifier::{Classifier, CullingBehaviour, DynamicClassifier, SpatialClassifier};
use super::instance::{InstanceEntity, InstanceFlags, InstanceInit, InstanceKey};
use super::octree_classifier::{OctreeClassifier, MAX_OCTREE_DEPTH};
use super::partition::{PartitionManager, PartitionStats};
use super::registry::InstanceRegistry;

const SOURCE: &str = "galaxy3d::InstancedMesh";

// ===== CONFIGURATION =====

/// Optional settings of an instanced mesh
#[derive(Debug, Clone)]
pub struct InstancedMeshConfig {
    /// Classification strategy (default: Static)
    pub behaviour: CullingBehaviour,
    /// Cull instances individually against the camera frustum
    /// (default: true). When false, renderable means visible.
    pub per_instance_culling: bool,
    /// Allocate a color buffer with this initial color for every instance
    pub color: Option<Vec3>,
    /// Custom per-instance buffers
    pub attributes: Vec<AttributeDesc>,
    /// Depth of the default octree (Static behaviour)
    pub octree_depth: u32,
}

impl Default for InstancedMeshConfig {
    fn default() -> Self {
        Self {
            behaviour: CullingBehaviour::Static,
            per_instance_culling: true,
            color: None,
            attributes: Vec::new(),
            octree_depth: 4,
        }
    }
}

/// Per-slot initializer, called once per instance in ascending index order
pub type InstanceInitializer = Box<dyn FnMut(&mut InstanceInit<'_>, u32)>;

/// Construction arguments of an instanced mesh.
///
/// `geometry`, `material`, `capacity` and `initializer` are mandatory.
pub struct InstancedMeshDesc<M> {
    /// Shared geometry; must carry a bounding sphere
    pub geometry: Option<Geometry>,
    /// Shared material (opaque to the pool)
    pub material: Option<M>,
    /// Number of instances (> 0)
    pub capacity: u32,
    pub initializer: Option<InstanceInitializer>,
    pub config: InstancedMeshConfig,
    /// Spatial classifier replacing the default octree (Static behaviour)
    pub classifier: Option<Box<dyn SpatialClassifier>>,
}

impl<M> Default for InstancedMeshDesc<M> {
    fn default() -> Self {
        Self {
            geometry: None,
            material: None,
            capacity: 0,
            initializer: None,
            config: InstancedMeshConfig::default(),
            classifier: None,
        }
    }
}

/// Outcome of one `update_culling` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CullingStats {
    /// Instances that entered the frustum
    pub shown: u32,
    /// Instances that left the frustum
    pub hidden: u32,
    pub partition: PartitionStats,
    /// Matrices written during classification
    pub matrix_rebuilds: u32,
}

// ===== INSTANCED MESH =====

/// A pool of instances sharing one geometry and one material
pub struct InstancedMesh<M> {
    geometry: Geometry,
    material: M,
    bounding_sphere: BoundingSphere,
    per_instance_culling: bool,
    behaviour: CullingBehaviour,
    partition: PartitionManager,
    classifier: Option<Classifier>,
    /// Scratch lists reused across frames
    show: Vec<InstanceKey>,
    hide: Vec<InstanceKey>,
    static_move_warned: bool,
}

fn missing(name: &'static str) -> Error {
    engine_error!(SOURCE, "Missing mandatory argument: {}", name);
    Error::MissingArgument(name)
}

impl<M> InstancedMesh<M> {
    /// Create the pool.
    ///
    /// Runs the initializer for every slot, writes the initial matrices,
    /// moves instances the initializer hid out of the active prefix and
    /// builds the classifier.
    ///
    /// # Errors
    ///
    /// - `MissingArgument` if geometry, material or initializer is absent
    /// - `InvalidArgument` if capacity is 0, the octree depth is too large
    ///   or a custom attribute is malformed
    /// - `InvalidResource` if the geometry has no bounding sphere
    pub fn new(desc: InstancedMeshDesc<M>) -> Result<Self> {
        let start = Instant::now();
        let InstancedMeshDesc { geometry, material, capacity, initializer, config, classifier } = desc;

        let geometry = geometry.ok_or_else(|| missing("geometry"))?;
        let material = material.ok_or_else(|| missing("material"))?;
        if capacity == 0 {
            engine_bail!(SOURCE, "Capacity must be positive");
        }
        let mut initializer = initializer.ok_or_else(|| missing("initializer"))?;

        let Some(&bounding_sphere) = geometry.bounding_sphere() else {
            let message = format!("Geometry '{}' has no bounding sphere", geometry.name());
            engine_error!(SOURCE, "{}", message);
            return Err(Error::InvalidResource(message));
        };

        if config.octree_depth > MAX_OCTREE_DEPTH {
            engine_bail!(SOURCE, "Octree depth {} exceeds the maximum of {}",
                config.octree_depth, MAX_OCTREE_DEPTH);
        }

        let mut registry = InstanceRegistry::with_capacity(capacity);
        let mut buffers = AttributeBuffers::new(capacity, config.color, &config.attributes)?;

        for index in 0..capacity {
            let key = registry.create();
            let entity = registry.get_mut(key).ok_or_else(|| {
                Error::InitializationFailed(format!("Instance {} was not registered", index))
            })?;
            initializer(&mut InstanceInit::new(key, &mut *entity, &mut buffers), index);
            entity.refresh_matrix(&mut buffers);
        }

        let hidden: Vec<InstanceKey> = registry.iter()
            .filter(|(_, entity)| !entity.is_visible())
            .map(|(key, _)| key)
            .collect();

        let mut partition = PartitionManager::new(registry, buffers);
        partition.buffers_mut().mark_active_prefix(capacity);
        if !hidden.is_empty() {
            partition.reconcile(&[], &hidden);
        }

        let classifier = if config.per_instance_culling {
            Some(match config.behaviour {
                CullingBehaviour::Dynamic => {
                    if classifier.is_some() {
                        engine_warn!(SOURCE, "Spatial classifier ignored by a Dynamic mesh");
                    }
                    Classifier::Dynamic(DynamicClassifier::new(bounding_sphere))
                }
                CullingBehaviour::Static => {
                    let mut spatial = classifier.unwrap_or_else(|| {
                        Box::new(OctreeClassifier::new(config.octree_depth)) as Box<dyn SpatialClassifier>
                    });
                    spatial.build(partition.registry(), &bounding_sphere);
                    Classifier::Spatial(spatial)
                }
            })
        } else {
            None
        };

        engine_debug!(SOURCE,
            "Created '{}' with {} instances ({:?}, culling {}, {} hidden) in {:?}",
            geometry.name(), capacity, config.behaviour, config.per_instance_culling,
            hidden.len(), start.elapsed());

        Ok(Self {
            geometry,
            material,
            bounding_sphere,
            per_instance_culling: config.per_instance_culling,
            behaviour: config.behaviour,
            partition,
            classifier,
            show: Vec::new(),
            hide: Vec::new(),
            static_move_warned: false,
        })
    }

    // ===== ACCESSORS =====

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn material(&self) -> &M {
        &self.material
    }

    pub fn bounding_sphere(&self) -> &BoundingSphere {
        &self.bounding_sphere
    }

    pub fn capacity(&self) -> u32 {
        self.partition.capacity()
    }

    /// Number of instances to draw, read from slot 0
    pub fn active_count(&self) -> u32 {
        self.partition.active_count()
    }

    pub fn behaviour(&self) -> CullingBehaviour {
        self.behaviour
    }

    pub fn per_instance_culling(&self) -> bool {
        self.per_instance_culling
    }

    pub fn partition(&self) -> &PartitionManager {
        &self.partition
    }

    pub fn classifier(&self) -> Option<&Classifier> {
        self.classifier.as_ref()
    }

    /// Instance handles in creation order
    pub fn keys(&self) -> &[InstanceKey] {
        self.partition.registry().keys()
    }

    pub fn instance(&self, key: InstanceKey) -> Option<&InstanceEntity> {
        self.partition.registry().get(key)
    }

    pub fn is_renderable(&self, key: InstanceKey) -> bool {
        self.instance(key)
            .is_some_and(|entity| entity.is_renderable(self.per_instance_culling))
    }

    /// Instances shown by the last `update_culling`
    pub fn last_shown(&self) -> &[InstanceKey] {
        &self.show
    }

    /// Instances hidden by the last `update_culling`
    pub fn last_hidden(&self) -> &[InstanceKey] {
        &self.hide
    }

    pub fn attribute_buffers(&self) -> &AttributeBuffers {
        self.partition.buffers()
    }

    /// Mutable access for consumers clearing update ranges after upload
    pub fn attribute_buffers_mut(&mut self) -> &mut AttributeBuffers {
        self.partition.buffers_mut()
    }

    /// Take and clear the pending upload range of every buffer
    pub fn take_update_ranges(&mut self) -> Vec<(String, DirtyRange)> {
        self.partition.buffers_mut().take_update_ranges()
    }

    // ===== PER-INSTANCE MUTATORS =====

    /// Change user visibility, moving the instance in or out of the
    /// active prefix right away when its renderability changes.
    pub fn set_visible(&mut self, key: InstanceKey, visible: bool) {
        let culling = self.per_instance_culling;
        let Some(entity) = self.partition.registry_mut().get_mut(key) else {
            engine_warn!(SOURCE, "set_visible on unknown instance {:?}", key);
            return;
        };
        if entity.is_visible() == visible {
            return;
        }

        let was_renderable = entity.is_renderable(culling);
        entity.set_flag(InstanceFlags::VISIBLE, visible);
        let renderable = entity.is_renderable(culling);

        if let Some(classifier) = self.classifier.as_mut() {
            classifier.invalidate(key);
        }

        if was_renderable == renderable {
            return;
        }
        if renderable {
            self.partition.activate_one(key);
            let (registry, buffers) = self.partition.parts_mut();
            if let Some(entity) = registry.get_mut(key) {
                if entity.is_matrix_dirty() {
                    entity.refresh_matrix(buffers);
                }
            }
        } else {
            self.partition.deactivate_one(key);
        }
    }

    pub fn set_position(&mut self, key: InstanceKey, position: Vec3) {
        self.mutate_transform(key, |entity| entity.set_position(position));
    }

    pub fn set_rotation(&mut self, key: InstanceKey, rotation: Quat) {
        self.mutate_transform(key, |entity| entity.set_rotation(rotation));
    }

    pub fn set_scale(&mut self, key: InstanceKey, scale: Vec3) {
        self.mutate_transform(key, |entity| entity.set_scale(scale));
    }

    /// Set the color of one instance. Returns false if the mesh has no
    /// color buffer or the key is unknown.
    pub fn set_color(&mut self, key: InstanceKey, color: Vec3) -> bool {
        let Some(slot) = self.partition.registry().slot_of(key) else {
            return false;
        };
        self.partition.buffers_mut().write_color(slot, color)
    }

    /// Write a custom attribute of one instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the key or attribute is unknown, if `name` is
    /// the reserved matrix or color buffer, or if `values` does not match
    /// the attribute's item size.
    pub fn set_attribute(&mut self, key: InstanceKey, name: &str, values: &[f32]) -> Result<()> {
        let Some(slot) = self.partition.registry().slot_of(key) else {
            engine_bail!(SOURCE, "Unknown instance {:?}", key);
        };
        let index = self.partition.buffers().custom_index_of(name)?;
        self.partition.buffers_mut().write_item(index, slot, values)
    }

    fn mutate_transform(&mut self, key: InstanceKey, mutate: impl FnOnce(&mut InstanceEntity)) {
        let Some(entity) = self.partition.registry_mut().get_mut(key) else {
            engine_warn!(SOURCE, "Transform change on unknown instance {:?}", key);
            return;
        };
        mutate(entity);

        if self.per_instance_culling
            && self.behaviour == CullingBehaviour::Static
            && !self.static_move_warned
        {
            self.static_move_warned = true;
            engine_warn!(SOURCE,
                "Instance moved in Static mesh '{}': the spatial index keeps its initial placement",
                self.geometry.name());
        }
    }

    // ===== PER-FRAME =====

    /// Classify instances against the camera frustum and apply the
    /// resulting partition changes. No-op when per-instance culling is
    /// disabled.
    pub fn update_culling(&mut self, camera: &Camera) -> CullingStats {
        self.show.clear();
        self.hide.clear();
        let Some(classifier) = self.classifier.as_mut() else {
            return CullingStats::default();
        };

        let (registry, buffers) = self.partition.parts_mut();
        let matrix_rebuilds = classifier.classify(camera, registry, buffers, &mut self.show, &mut self.hide);

        let partition = self.partition.reconcile(&self.show, &self.hide);

        engine_trace!(SOURCE, "Culling '{}': +{} -{} ({} swaps), active {}/{}",
            self.geometry.name(), self.show.len(), self.hide.len(),
            partition.total_swaps(), self.partition.active_count(), self.partition.capacity());

        CullingStats {
            shown: self.show.len() as u32,
            hidden: self.hide.len() as u32,
            partition,
            matrix_rebuilds,
        }
    }

    /// Write the matrix of every active instance whose transform changed.
    /// Returns the number of matrices written.
    pub fn update_matrices(&mut self) -> u32 {
        let active = self.partition.active_count();
        let (registry, buffers) = self.partition.parts_mut();
        let mut written = 0;

        for slot in 0..active {
            let Some(key) = registry.key_at_slot(slot) else {
                break;
            };
            if let Some(entity) = registry.get_mut(key) {
                if entity.is_matrix_dirty() {
                    entity.refresh_matrix(buffers);
                    written += 1;
                }
            }
        }
        written
    }
}

#[cfg(test)]
#[path = "instanced_mesh_tests.rs"]
mod tests;
