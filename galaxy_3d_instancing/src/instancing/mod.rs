//! Instancing module: pooled instances drawn with a single draw call.
//!
//! - `InstancedMesh`: the pool (construction, per-instance mutators, per-frame culling)
//! - `PartitionManager`: swap-based active prefix over the attribute buffers
//! - `AttributeBuffers`: per-instance GPU payload and pending upload ranges
//! - `DynamicClassifier` / `OctreeClassifier`: frustum classification strategies

mod attribute_buffer;
mod classifier;
mod instance;
mod instanced_mesh;
mod octree_classifier;
mod partition;
mod registry;

pub use attribute_buffer::{
    AttributeBuffer, AttributeBuffers, AttributeDesc, DirtyRange,
    MATRIX_ATTRIBUTE, COLOR_ATTRIBUTE,
};
pub use classifier::{Classifier, CullingBehaviour, DynamicClassifier, SpatialClassifier};
pub use instance::{InstanceEntity, InstanceFlags, InstanceInit, InstanceKey};
pub use instanced_mesh::{
    CullingStats, InstanceInitializer, InstancedMesh, InstancedMeshConfig, InstancedMeshDesc,
};
pub use octree_classifier::{OctreeClassifier, MAX_OCTREE_DEPTH};
pub use partition::{PartitionManager, PartitionStats};
pub use registry::InstanceRegistry;
