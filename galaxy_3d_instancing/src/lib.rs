/*!
# Galaxy 3D Instancing

Pooled instanced meshes with per-instance frustum culling for the
Galaxy 3D engine.

An `InstancedMesh` owns a fixed number of instances of one geometry and
one material. Their per-instance data (transform matrix, optional color,
custom attributes) lives in flat attribute buffers ready for GPU upload.
Renderable instances are kept in a contiguous prefix of those buffers so
the whole mesh is drawn with one instanced draw call of `active_count`
instances.

## Architecture

- **InstancedMesh**: the pool, its construction and per-instance mutators
- **PartitionManager**: keeps renderable instances in the active prefix with slot swaps
- **AttributeBuffers**: per-instance buffers and their pending upload byte ranges
- **DynamicClassifier**: tests every instance against the frustum each frame
- **SpatialClassifier / OctreeClassifier**: static spatial index with cached node containment
- **Camera / Frustum**: frustum planes extracted from the view-projection matrix

The crate does no GPU work: a renderer uploads the dirty ranges and issues
the draw.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod camera;
pub mod resource;
pub mod instancing;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Instanced mesh entry point
    pub use crate::instancing::InstancedMesh;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Camera sub-module
    pub mod camera {
        pub use crate::camera::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }

    // Instancing sub-module
    pub mod instancing {
        pub use crate::instancing::*;
    }
}

// Re-export math library at crate root
pub use glam;
