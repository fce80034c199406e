//! Shadow Algorithm Tests
//!
//! Tests for:
//! - CSM cascade split computation (practical split scheme)
//! - Frustum corners extraction in world space
//! - Cascade VP matrix construction (GL clip convention)
//! - High-level cascade building from shadow settings

use glam::{Mat4, Vec3};

use lantern::render::shadow_utils::*;
use lantern::settings::ShadowSettings;

const EPSILON: f32 = 1e-4;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn camera_matrices(pos: Vec3, look_dir: Vec3, fov_deg: f32, aspect: f32) -> (Mat4, Mat4) {
    let proj = Mat4::perspective_rh_gl(fov_deg.to_radians(), aspect, 0.1, 500.0);
    let view = Mat4::look_at_rh(pos, pos + look_dir, Vec3::Y);
    (proj, view)
}

fn project(vp: &Mat4, point: Vec3) -> Vec3 {
    let clip = *vp * point.extend(1.0);
    clip.truncate() / clip.w
}

// ============================================================================
// compute_cascade_splits Tests
// ============================================================================

#[test]
fn cascade_splits_last_equals_far() {
    let splits = compute_cascade_splits(4, 0.1, 100.0, 0.5);
    assert!(
        approx(splits[3], 100.0),
        "Last split should equal far plane, got {}",
        splits[3]
    );
}

#[test]
fn cascade_splits_monotonically_increasing() {
    let splits = compute_cascade_splits(4, 0.1, 100.0, 0.75);
    for i in 1..4 {
        assert!(
            splits[i] > splits[i - 1],
            "splits[{i}]={} <= splits[{}]={}",
            splits[i],
            i - 1,
            splits[i - 1]
        );
    }
}

#[test]
fn cascade_splits_lambda_0_uniform() {
    let splits = compute_cascade_splits(4, 1.0, 100.0, 0.0);
    // lambda=0 → 1 + (100-1) * (i/4)
    let expected = [25.75, 50.5, 75.25, 100.0];
    for i in 0..4 {
        assert!(
            approx(splits[i], expected[i]),
            "splits[{i}]: expected {}, got {}",
            expected[i],
            splits[i]
        );
    }
}

#[test]
fn cascade_splits_lambda_1_logarithmic() {
    let splits = compute_cascade_splits(4, 1.0, 100.0, 1.0);
    // 100^(1/4) ≈ 3.162, 100^(2/4) = 10, 100^(3/4) ≈ 31.62
    assert!((splits[0] - 3.162).abs() < 0.01, "got {}", splits[0]);
    assert!(approx(splits[1], 10.0), "got {}", splits[1]);
    assert!((splits[2] - 31.62).abs() < 0.1, "got {}", splits[2]);
    assert!(approx(splits[3], 100.0), "got {}", splits[3]);
}

#[test]
fn cascade_splits_single_cascade() {
    let splits = compute_cascade_splits(1, 0.1, 50.0, 0.5);
    assert!(approx(splits[0], 50.0), "got {}", splits[0]);
    assert_eq!(&splits[1..], &[0.0, 0.0, 0.0]);
}

#[test]
fn cascade_splits_clamped_to_max() {
    let splits = compute_cascade_splits(10, 0.1, 100.0, 0.5);
    assert!(approx(splits[3], 100.0), "last = {}", splits[3]);
}

// ============================================================================
// compute_frustum_corners_world Tests
// ============================================================================

#[test]
fn frustum_corners_near_far_distances() {
    let (proj, view) = camera_matrices(Vec3::ZERO, Vec3::NEG_Z, 60.0, 1.0);
    let corners = compute_frustum_corners_world(&proj, &view, 1.0, 10.0);

    for (i, corner) in corners.iter().enumerate().take(4) {
        assert!((corner.z + 1.0).abs() < 1e-3, "near corner {i}: z = {}", corner.z);
    }
    for (i, corner) in corners.iter().enumerate().skip(4) {
        assert!((corner.z + 10.0).abs() < 1e-3, "far corner {i}: z = {}", corner.z);
    }
}

#[test]
fn frustum_corners_symmetry() {
    let (proj, view) = camera_matrices(Vec3::ZERO, Vec3::NEG_Z, 60.0, 1.0);
    let corners = compute_frustum_corners_world(&proj, &view, 1.0, 10.0);

    assert!(approx(corners[0].x, -corners[1].x), "near face should be X-symmetric");
    assert!(approx(corners[2].x, -corners[3].x), "near face should be X-symmetric");
    assert!(approx(corners[0].y, -corners[3].y), "near face should be Y-symmetric");
}

#[test]
fn frustum_corners_follow_camera_position() {
    let (proj, view) = camera_matrices(Vec3::new(10.0, 0.0, 0.0), Vec3::NEG_Z, 60.0, 1.0);
    let corners = compute_frustum_corners_world(&proj, &view, 1.0, 10.0);
    let center = corners.iter().copied().sum::<Vec3>() / 8.0;
    assert!((center.x - 10.0).abs() < 1e-3, "center = {center:?}");
}

// ============================================================================
// build_cascade_vp Tests
// ============================================================================

#[test]
fn cascade_vp_is_finite_and_invertible() {
    let (proj, view) = camera_matrices(Vec3::ZERO, Vec3::NEG_Z, 60.0, 1.0);
    let corners = compute_frustum_corners_world(&proj, &view, 1.0, 50.0);
    let vp = build_cascade_vp(Vec3::new(0.0, -1.0, -0.5), &corners, 2048, 100.0);

    assert!(vp.is_finite(), "VP contains NaN or Inf: {vp:?}");
    assert!(vp.determinant().abs() > 1e-10, "VP should be invertible");
}

#[test]
fn cascade_vp_contains_every_slice_corner() {
    let (proj, view) = camera_matrices(Vec3::new(0.0, 2.0, 5.0), Vec3::NEG_Z, 60.0, 16.0 / 9.0);
    let corners = compute_frustum_corners_world(&proj, &view, 0.5, 30.0);
    let vp = build_cascade_vp(Vec3::new(0.3, -1.0, -0.2), &corners, 1024, 30.0);

    for corner in corners {
        let ndc = project(&vp, corner);
        assert!(
            ndc.x.abs() <= 1.0 + EPSILON && ndc.y.abs() <= 1.0 + EPSILON,
            "corner {corner:?} outside the cascade: {ndc:?}"
        );
        // GL convention: depth in -1..1
        assert!(ndc.z >= -1.0 - EPSILON && ndc.z <= 1.0 + EPSILON, "depth {}", ndc.z);
    }
}

#[test]
fn cascade_vp_handles_vertical_and_zero_light() {
    let (proj, view) = camera_matrices(Vec3::ZERO, Vec3::NEG_Z, 60.0, 1.0);
    let corners = compute_frustum_corners_world(&proj, &view, 1.0, 20.0);

    let straight_down = build_cascade_vp(Vec3::NEG_Y, &corners, 512, 10.0);
    assert!(straight_down.is_finite());

    let degenerate = build_cascade_vp(Vec3::ZERO, &corners, 512, 10.0);
    assert!(degenerate.is_finite());
}

// ============================================================================
// build_directional_cascades Tests
// ============================================================================

#[test]
fn directional_cascades_respect_settings() {
    let (proj, view) = camera_matrices(Vec3::new(0.0, 5.0, 10.0), Vec3::NEG_Z, 60.0, 1.5);
    let settings = ShadowSettings {
        cascade_count: 3,
        max_distance: 60.0,
        ..Default::default()
    };

    let set = build_directional_cascades(Vec3::new(-0.4, -1.0, -0.3), &proj, &view, 0.1, 500.0, &settings, 60.0);

    assert_eq!(set.count, 3);
    assert!(approx(set.splits[2], 60.0), "last split = {}", set.splits[2]);
    assert_eq!(set.splits[3], 0.0);
    for vp in &set.view_projections[..3] {
        assert!(vp.is_finite());
        assert_ne!(*vp, Mat4::IDENTITY);
    }
    assert_eq!(set.view_projections[3], Mat4::IDENTITY);
}

#[test]
fn directional_cascades_clamp_to_camera_far() {
    let (proj, view) = camera_matrices(Vec3::ZERO, Vec3::NEG_Z, 60.0, 1.0);
    let settings = ShadowSettings {
        cascade_count: 2,
        max_distance: 1000.0,
        ..Default::default()
    };

    let set = build_directional_cascades(Vec3::NEG_Y, &proj, &view, 0.1, 40.0, &settings, 40.0);
    assert!(approx(set.splits[1], 40.0), "last split = {}", set.splits[1]);
}
