//! Integration tests for InstancedMesh
//!
//! Multi-frame scenarios through the public API: random cameras, visibility
//! toggles and moves, checking the active-prefix partition after every frame.
//!
//! Run with: cargo test --test instanced_mesh_integration_tests

use galaxy_3d_instancing::galaxy3d::{Error, InstancedMesh};
use galaxy_3d_instancing::galaxy3d::camera::Camera;
use galaxy_3d_instancing::galaxy3d::instancing::{
    CullingBehaviour, InstanceInit, InstanceKey, InstancedMeshConfig, InstancedMeshDesc,
    PartitionStats, MATRIX_ATTRIBUTE,
};
use galaxy_3d_instancing::galaxy3d::resource::{BoundingSphere, Geometry, GeometryDesc};
use galaxy_3d_instancing::glam::{Mat4, Quat, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ============================================================================
// HELPERS
// ============================================================================

struct Material;

const WORLD: f32 = 200.0;

fn color_code(index: u32) -> Vec3 {
    Vec3::new(index as f32, (index * 2) as f32, (index * 3) as f32)
}

/// Random transforms seeded per mesh, color encodes the creation index
fn random_desc(capacity: u32, seed: u64, behaviour: CullingBehaviour) -> InstancedMeshDesc<Material> {
    let mut rng = StdRng::seed_from_u64(seed);
    InstancedMeshDesc {
        geometry: Some(Geometry::cuboid("box", 2.0, 2.0, 2.0).unwrap()),
        material: Some(Material),
        capacity,
        initializer: Some(Box::new(move |instance: &mut InstanceInit<'_>, i: u32| {
            instance.set_position(random_point(&mut rng));
            instance.set_rotation(Quat::from_rotation_y(rng.gen_range(0.0..std::f32::consts::TAU)));
            instance.set_scale(Vec3::splat(rng.gen_range(0.5..2.0)));
            instance.set_color(color_code(i));
        })),
        config: InstancedMeshConfig {
            behaviour,
            color: Some(Vec3::ZERO),
            ..Default::default()
        },
        classifier: None,
    }
}

fn random_point(rng: &mut StdRng) -> Vec3 {
    Vec3::new(
        rng.gen_range(-WORLD..WORLD),
        rng.gen_range(-WORLD..WORLD),
        rng.gen_range(-WORLD..WORLD),
    )
}

fn random_camera(rng: &mut StdRng) -> Camera {
    let eye = random_point(rng);
    let dir = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-0.5..0.5), rng.gen_range(-1.0..1.0))
        .try_normalize()
        .unwrap_or(Vec3::NEG_Z);
    let view = Mat4::look_at_rh(eye, eye + dir, Vec3::Y);
    let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 16.0 / 9.0, 0.1, 250.0);
    Camera::from_matrices(view, proj)
}

fn camera_at(eye: Vec3, dir: Vec3) -> Camera {
    let view = Mat4::look_at_rh(eye, eye + dir, Vec3::Y);
    let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 1.0, 0.1, 500.0);
    Camera::from_matrices(view, proj)
}

/// Check the partition, the slot table and the payload of every slot
fn assert_invariants(mesh: &InstancedMesh<Material>) {
    let registry = mesh.partition().registry();
    let buffers = mesh.attribute_buffers();
    let mut renderable = 0;

    for slot in 0..mesh.capacity() {
        let key = registry.key_at_slot(slot).unwrap();
        let entity = mesh.instance(key).unwrap();
        assert_eq!(entity.slot(), slot);

        let is_renderable = mesh.is_renderable(key);
        assert_eq!(is_renderable, slot < mesh.active_count(), "slot {} / active {}", slot, mesh.active_count());
        if is_renderable {
            renderable += 1;
            assert!(!entity.is_matrix_dirty(), "stale matrix in active slot {}", slot);
            assert_eq!(buffers.matrix_at(slot), entity.compose_matrix());
        }

        let code = color_code(entity.index());
        assert_eq!(buffers.color().unwrap().item(slot), &code.to_array());
    }
    assert_eq!(renderable, mesh.active_count());
}

// ============================================================================
// PROPERTIES
// ============================================================================

#[test]
fn test_integration_invariants_over_random_frames() {
    let mut mesh = InstancedMesh::new(random_desc(400, 7, CullingBehaviour::Dynamic)).unwrap();
    let keys: Vec<InstanceKey> = mesh.keys().to_vec();
    let mut rng = StdRng::seed_from_u64(42);
    assert_invariants(&mesh);

    for _ in 0..60 {
        for _ in 0..20 {
            let key = keys[rng.gen_range(0..keys.len())];
            match rng.gen_range(0..3) {
                0 => mesh.set_visible(key, rng.gen_bool(0.5)),
                1 => mesh.set_position(key, random_point(&mut rng)),
                _ => mesh.set_scale(key, Vec3::splat(rng.gen_range(0.5..3.0))),
            }
        }
        assert_eq!(mesh.active_count() as usize,
            keys.iter().filter(|&&k| mesh.is_renderable(k)).count());

        let camera = random_camera(&mut rng);
        let stats = mesh.update_culling(&camera);
        assert_eq!(stats.partition.pair_swaps, stats.shown.min(stats.hidden));
        assert_invariants(&mesh);
    }
}

#[test]
fn test_integration_update_culling_is_idempotent() {
    let mut mesh = InstancedMesh::new(random_desc(300, 3, CullingBehaviour::Dynamic)).unwrap();
    let camera = camera_at(Vec3::new(0.0, 0.0, 150.0), Vec3::NEG_Z);

    mesh.update_culling(&camera);
    let active = mesh.active_count();
    let slots = mesh.partition().registry().slots().to_vec();
    mesh.take_update_ranges();

    let stats = mesh.update_culling(&camera);
    assert_eq!(stats.shown, 0);
    assert_eq!(stats.hidden, 0);
    assert_eq!(stats.partition, PartitionStats::default());
    assert_eq!(mesh.active_count(), active);
    assert_eq!(mesh.partition().registry().slots(), slots.as_slice());
    assert!(mesh.take_update_ranges().is_empty());
}

#[test]
fn test_integration_batch_result_matches_renderable_set() {
    let mut mesh = InstancedMesh::new(random_desc(250, 11, CullingBehaviour::Dynamic)).unwrap();
    let mut rng = StdRng::seed_from_u64(5);

    for _ in 0..10 {
        let camera = random_camera(&mut rng);
        let before = mesh.active_count() as i64;
        let stats = mesh.update_culling(&camera);
        assert_eq!(mesh.active_count() as i64, before + stats.shown as i64 - stats.hidden as i64);

        let mut expected: Vec<u32> = mesh.keys().iter()
            .filter(|&&k| mesh.is_renderable(k))
            .map(|&k| mesh.instance(k).unwrap().index())
            .collect();
        let mut active: Vec<u32> = (0..mesh.active_count())
            .map(|slot| {
                let key = mesh.partition().registry().key_at_slot(slot).unwrap();
                mesh.instance(key).unwrap().index()
            })
            .collect();
        expected.sort_unstable();
        active.sort_unstable();
        assert_eq!(active, expected);
    }
}

#[test]
fn test_integration_static_matches_dynamic() {
    let mut static_mesh = InstancedMesh::new(random_desc(600, 99, CullingBehaviour::Static)).unwrap();
    let mut dynamic_mesh = InstancedMesh::new(random_desc(600, 99, CullingBehaviour::Dynamic)).unwrap();
    let mut rng = StdRng::seed_from_u64(1234);

    for frame in 0..25 {
        let camera = random_camera(&mut rng);
        let a = static_mesh.update_culling(&camera);
        let b = dynamic_mesh.update_culling(&camera);
        assert_eq!((a.shown, a.hidden), (b.shown, b.hidden), "frame {}", frame);
        assert_eq!(static_mesh.active_count(), dynamic_mesh.active_count());

        for (ka, kb) in static_mesh.keys().iter().zip(dynamic_mesh.keys()) {
            assert_eq!(static_mesh.is_renderable(*ka), dynamic_mesh.is_renderable(*kb));
        }
        assert_invariants(&static_mesh);
    }
}

// ============================================================================
// SCENARIOS
// ============================================================================

fn row_desc(capacity: u32, behaviour: CullingBehaviour) -> InstancedMeshDesc<Material> {
    InstancedMeshDesc {
        geometry: Some(Geometry::from_desc(GeometryDesc {
            name: "row".to_string(),
            positions: Vec::new(),
            bounding_sphere: Some(BoundingSphere::new(Vec3::ZERO, 1.0)),
        }).unwrap()),
        material: Some(Material),
        capacity,
        initializer: Some(Box::new(|instance: &mut InstanceInit<'_>, i: u32| {
            instance.set_position(Vec3::new(i as f32 * 10.0, 0.0, 0.0));
            instance.set_color(color_code(i));
        })),
        config: InstancedMeshConfig { behaviour, color: Some(Vec3::ZERO), ..Default::default() },
        classifier: None,
    }
}

#[test]
fn test_integration_hide_one_of_four() {
    let mut mesh = InstancedMesh::new(row_desc(4, CullingBehaviour::Static)).unwrap();
    let keys = mesh.keys().to_vec();

    mesh.set_visible(keys[2], false);

    assert_eq!(mesh.active_count(), 3);
    assert_eq!(mesh.instance(keys[3]).unwrap().slot(), 2);
    assert_eq!(mesh.instance(keys[2]).unwrap().slot(), 3);
    assert_invariants(&mesh);

    let matrix = mesh.attribute_buffers().get(MATRIX_ATTRIBUTE).unwrap();
    assert_eq!(matrix.update_range().unwrap().end, 4 * 64);
}

#[test]
fn test_integration_show_three_hide_one() {
    // Row along +X; a camera on the axis looking at the first instances
    let mut mesh = InstancedMesh::new(row_desc(6, CullingBehaviour::Dynamic)).unwrap();
    let narrow = |eye: Vec3| {
        let view = Mat4::look_at_rh(eye, eye + Vec3::X, Vec3::Y);
        let proj = Mat4::perspective_rh(0.2, 1.0, 0.1, 25.0);
        Camera::from_matrices(view, proj)
    };

    // sees x = 0, 10, 20
    mesh.update_culling(&narrow(Vec3::new(-2.0, 0.0, 0.0)));
    assert_eq!(mesh.active_count(), 3);

    // sees x = 10, 20, 30, 40, 50 with a deeper far plane
    let view = Mat4::look_at_rh(Vec3::new(8.0, 0.0, 0.0), Vec3::new(9.0, 0.0, 0.0), Vec3::Y);
    let proj = Mat4::perspective_rh(0.2, 1.0, 0.1, 50.0);
    let stats = mesh.update_culling(&Camera::from_matrices(view, proj));

    assert_eq!((stats.shown, stats.hidden), (3, 1));
    assert_eq!(stats.partition.pair_swaps, 1);
    assert_eq!(stats.partition.activations, 2);
    assert_eq!(stats.partition.deactivations, 0);
    assert_eq!(mesh.active_count(), 5);
    assert_invariants(&mesh);
}

#[test]
fn test_integration_offscreen_move_never_stale() {
    let mut mesh = InstancedMesh::new(row_desc(3, CullingBehaviour::Dynamic)).unwrap();
    let keys = mesh.keys().to_vec();
    let camera = camera_at(Vec3::new(10.0, 0.0, 50.0), Vec3::NEG_Z);

    mesh.update_culling(&camera);
    assert_eq!(mesh.active_count(), 3);

    mesh.set_position(keys[1], Vec3::new(10.0, 0.0, 100.0));
    let stats = mesh.update_culling(&camera);
    assert_eq!(stats.hidden, 1);
    assert_eq!(stats.matrix_rebuilds, 0);

    mesh.set_rotation(keys[1], Quat::from_rotation_x(1.0));
    mesh.set_position(keys[1], Vec3::new(10.0, 5.0, 0.0));
    let stats = mesh.update_culling(&camera);
    assert_eq!(stats.shown, 1);
    assert_eq!(stats.matrix_rebuilds, 1);
    assert_invariants(&mesh);

    assert_eq!(mesh.update_culling(&camera).matrix_rebuilds, 0);
}

#[test]
fn test_integration_construction_errors() {
    let mut desc = row_desc(2, CullingBehaviour::Static);
    desc.material = None;
    let err = InstancedMesh::new(desc).err().unwrap();
    assert!(matches!(err, Error::MissingArgument("material")));
    assert_eq!(err.to_string(), "Missing argument: material is mandatory");

    let desc = row_desc(0, CullingBehaviour::Static);
    assert!(matches!(InstancedMesh::new(desc), Err(Error::InvalidArgument(_))));
}
