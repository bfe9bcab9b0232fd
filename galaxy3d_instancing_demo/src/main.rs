//! Galaxy3D instancing demo
//!
//! Fills a 500-unit cube with 10 000 boxes at random positions and
//! rotations, then flies a camera through it. Each frame runs the culling
//! pass and consumes the pending upload ranges as a renderer would.
//!
//! Usage: galaxy3d_instancing_demo [frames]

use std::time::Instant;
use galaxy_3d_instancing::galaxy3d::{Engine, InstancedMesh};
use galaxy_3d_instancing::galaxy3d::camera::Camera;
use galaxy_3d_instancing::galaxy3d::instancing::{
    CullingBehaviour, InstanceInit, InstancedMeshConfig, InstancedMeshDesc,
};
use galaxy_3d_instancing::galaxy3d::log::{DefaultLogger, LogSeverity};
use galaxy_3d_instancing::galaxy3d::resource::Geometry;
use galaxy_3d_instancing::{engine_error, engine_info};
use glam::{EulerRot, Mat4, Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const INSTANCE_COUNT: u32 = 10_000;
const WORLD_SIZE: f32 = 500.0;
const DEFAULT_FRAMES: u32 = 600;
const FRAME_TIME: f32 = 1.0 / 60.0;

/// Stand-in for a GPU material; the pool never looks inside it
struct BoxMaterial {
    _name: &'static str,
}

fn main() {
    Engine::set_logger(DefaultLogger::with_min_severity(LogSeverity::Debug));

    let frames = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_FRAMES);

    let geometry = match Geometry::cuboid("box", 1.0, 1.0, 1.0) {
        Ok(geometry) => geometry,
        Err(e) => {
            engine_error!("galaxy3d::Demo", "Failed to create geometry: {}", e);
            return;
        }
    };

    let mut rng = StdRng::seed_from_u64(2024);
    let desc = InstancedMeshDesc {
        geometry: Some(geometry),
        material: Some(BoxMaterial { _name: "box" }),
        capacity: INSTANCE_COUNT,
        initializer: Some(Box::new(move |instance: &mut InstanceInit<'_>, _index: u32| {
            let half = WORLD_SIZE * 0.5;
            instance.set_position(Vec3::new(
                rng.gen_range(-half..half),
                rng.gen_range(-half..half),
                rng.gen_range(-half..half),
            ));
            let tau = std::f32::consts::TAU;
            instance.set_rotation(Quat::from_euler(
                EulerRot::XYZ,
                rng.gen_range(0.0..tau),
                rng.gen_range(0.0..tau),
                rng.gen_range(0.0..tau),
            ));
            instance.set_color(Vec3::new(
                rng.gen_range(0.0..1.0),
                rng.gen_range(0.0..1.0),
                rng.gen_range(0.0..1.0),
            ));
        })),
        config: InstancedMeshConfig {
            behaviour: CullingBehaviour::Static,
            color: Some(Vec3::ONE),
            ..Default::default()
        },
        classifier: None,
    };

    let mut mesh = match InstancedMesh::new(desc) {
        Ok(mesh) => mesh,
        Err(e) => {
            engine_error!("galaxy3d::Demo", "Failed to create instanced mesh: {}", e);
            return;
        }
    };

    let projection = Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 16.0 / 9.0, 0.1, 1000.0);
    let mut camera = Camera::from_matrices(Mat4::IDENTITY, projection);

    let start = Instant::now();
    let mut total_swaps = 0u64;
    let mut uploaded_bytes = 0u64;

    for frame in 0..frames {
        let t = frame as f32 * FRAME_TIME;
        camera.set_view(fly_through_view(t));
        camera.refresh_frustum();

        let stats = mesh.update_culling(&camera);
        total_swaps += stats.partition.total_swaps() as u64;

        // A renderer would upload these ranges, then draw active_count instances
        for (_, range) in mesh.take_update_ranges() {
            uploaded_bytes += range.len() as u64;
        }

        if frame % 60 == 0 {
            engine_info!("galaxy3d::Demo",
                "frame {:>4}: {:>5}/{} visible (+{} -{})",
                frame, mesh.active_count(), mesh.capacity(), stats.shown, stats.hidden);
        }
    }

    engine_info!("galaxy3d::Demo",
        "{} frames in {:?}: {} swaps, {:.1} MiB uploaded",
        frames, start.elapsed(), total_swaps, uploaded_bytes as f64 / (1024.0 * 1024.0));
}

/// Camera path: a slow orbit inside the cube, looking ahead along the path
fn fly_through_view(t: f32) -> Mat4 {
    let radius = WORLD_SIZE * 0.3;
    let angle = t * 0.25;
    let eye = Vec3::new(angle.cos() * radius, (t * 0.1).sin() * 40.0, angle.sin() * radius);
    let ahead = Vec3::new(-angle.sin(), 0.0, angle.cos());
    Mat4::look_at_rh(eye, eye + ahead, Vec3::Y)
}
