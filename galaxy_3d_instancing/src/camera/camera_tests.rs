use glam::{Mat4, Vec3};
use super::*;

fn look_at_origin() -> (Mat4, Mat4) {
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
    let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, 16.0 / 9.0, 0.1, 100.0);
    (view, proj)
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_camera_new() {
    let (view, proj) = look_at_origin();
    let frustum = Frustum::from_view_projection(&Mat4::IDENTITY);
    let camera = Camera::new(view, proj, frustum);

    assert_eq!(*camera.view_matrix(), view);
    assert_eq!(*camera.projection_matrix(), proj);
    assert_eq!(camera.frustum().planes, frustum.planes);
}

#[test]
fn test_camera_from_matrices_extracts_frustum() {
    let (view, proj) = look_at_origin();
    let camera = Camera::from_matrices(view, proj);

    let expected = Frustum::from_view_projection(&(proj * view));
    assert_eq!(camera.frustum().planes, expected.planes);
    assert_eq!(camera.view_projection_matrix(), proj * view);
}

// ============================================================================
// Setters
// ============================================================================

#[test]
fn test_set_view_does_not_touch_frustum() {
    let (view, proj) = look_at_origin();
    let mut camera = Camera::from_matrices(view, proj);
    let before = *camera.frustum();

    let new_view = Mat4::look_at_rh(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y);
    camera.set_view(new_view);

    assert_eq!(*camera.view_matrix(), new_view);
    assert_eq!(camera.frustum().planes, before.planes);
}

#[test]
fn test_refresh_frustum() {
    let (view, proj) = look_at_origin();
    let mut camera = Camera::from_matrices(view, proj);

    let new_view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, -5.0), Vec3::ZERO, Vec3::Y);
    camera.set_view(new_view);
    camera.refresh_frustum();

    let expected = Frustum::from_view_projection(&(proj * new_view));
    assert_eq!(camera.frustum().planes, expected.planes);
}

#[test]
fn test_set_projection_and_frustum() {
    let (view, proj) = look_at_origin();
    let mut camera = Camera::from_matrices(view, proj);

    let ortho = Mat4::orthographic_rh(-1.0, 1.0, -1.0, 1.0, 0.1, 10.0);
    camera.set_projection(ortho);
    assert_eq!(*camera.projection_matrix(), ortho);

    let identity = Frustum::from_view_projection(&Mat4::IDENTITY);
    camera.set_frustum(identity);
    assert_eq!(camera.frustum().planes, identity.planes);
}
