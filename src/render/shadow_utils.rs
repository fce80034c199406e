//! Shadow Utilities
//!
//! Pure math for cascaded directional shadows, kept out of the passes so it
//! can be tested on its own.
//!
//! # Provided Functions
//!
//! - Cascade split computation (practical split scheme)
//! - Frustum slice corners in world space
//! - Orthographic view-projection per cascade, snapped to the texel grid
//! - [`build_directional_cascades`], the high-level builder used by swap
//!   extraction
//!
//! All projections follow the OpenGL clip convention (z in `-1..1`), matching
//! the camera projection and the `* 0.5 + 0.5` lookup in `chunks/shadow.glsl`.

use glam::{Mat4, Vec3};

use crate::settings::ShadowSettings;

/// Maximum cascade count per directional light.
pub const MAX_CASCADES: u32 = 4;

/// Minimum depth range behind each cascade so casters outside the view
/// slice still land in the map.
const MIN_FAR_EXTENSION: f32 = 50.0;

// ============================================================================
// Cascade Split Computation
// ============================================================================

/// Computes cascade split distances using the practical split scheme.
///
/// `lambda` blends between uniform (`0.0`) and logarithmic (`1.0`)
/// distribution. Returns the far distance of each cascade in view space;
/// entries past `cascade_count` stay zero.
#[must_use]
pub fn compute_cascade_splits(
    cascade_count: u32,
    near: f32,
    far: f32,
    lambda: f32,
) -> [f32; MAX_CASCADES as usize] {
    let mut splits = [0.0f32; MAX_CASCADES as usize];
    let n = cascade_count.min(MAX_CASCADES) as usize;

    for (i, split) in splits.iter_mut().enumerate().take(n) {
        let p = (i + 1) as f32 / n as f32;
        let log_split = near * (far / near).powf(p);
        let uni_split = near + (far - near) * p;
        *split = lambda * log_split + (1.0 - lambda) * uni_split;
    }

    // The last split always reaches the far plane
    if n > 0 {
        splits[n - 1] = far;
    }

    splits
}

// ============================================================================
// Frustum Corners in World Space
// ============================================================================

/// Computes the 8 corners of a view-space frustum slice in world space.
///
/// Field of view and aspect ratio are read back from the perspective
/// `projection`; corners are then built in view space (RH, -Z forward) and
/// moved to world space through the inverse of `view`.
#[must_use]
pub fn compute_frustum_corners_world(
    projection: &Mat4,
    view: &Mat4,
    slice_near: f32,
    slice_far: f32,
) -> [Vec3; 8] {
    let tan_half_fov = 1.0 / projection.y_axis.y;
    let aspect = projection.y_axis.y / projection.x_axis.x;

    let h_near = tan_half_fov * slice_near;
    let w_near = h_near * aspect;
    let h_far = tan_half_fov * slice_far;
    let w_far = h_far * aspect;

    let corners_view = [
        // Near face
        Vec3::new(-w_near, -h_near, -slice_near),
        Vec3::new(w_near, -h_near, -slice_near),
        Vec3::new(w_near, h_near, -slice_near),
        Vec3::new(-w_near, h_near, -slice_near),
        // Far face
        Vec3::new(-w_far, -h_far, -slice_far),
        Vec3::new(w_far, -h_far, -slice_far),
        Vec3::new(w_far, h_far, -slice_far),
        Vec3::new(-w_far, h_far, -slice_far),
    ];

    let inv_view = view.inverse();
    corners_view.map(|c| inv_view.transform_point3(c))
}

// ============================================================================
// Cascade View-Projection
// ============================================================================

/// Normalized light direction, falling back to straight down the -Z axis.
#[must_use]
pub fn safe_light_direction(direction: Vec3) -> Vec3 {
    if direction.length_squared() > 1e-6 {
        direction.normalize()
    } else {
        -Vec3::Z
    }
}

/// Builds an orthographic view-projection for one cascade.
///
/// The light-space AABB of the slice is extended towards the light by
/// `caster_extension` and snapped to the texel grid of a `shadow_map_size`
/// map so the cascade does not shimmer while the camera moves.
#[must_use]
pub fn build_cascade_vp(
    light_direction: Vec3,
    frustum_corners: &[Vec3; 8],
    shadow_map_size: u32,
    caster_extension: f32,
) -> Mat4 {
    let dir = safe_light_direction(light_direction);

    let center = frustum_corners.iter().copied().sum::<Vec3>() / 8.0;
    let up = if dir.y.abs() > 0.99 { Vec3::X } else { Vec3::Y };
    let light_view = Mat4::look_at_rh(center - dir, center, up);

    let mut ls_min = Vec3::splat(f32::MAX);
    let mut ls_max = Vec3::splat(f32::MIN);
    for c in frustum_corners {
        let ls = light_view.transform_point3(*c);
        ls_min = ls_min.min(ls);
        ls_max = ls_max.max(ls);
    }

    // In the RH light view ls_max.z faces the light, ls_min.z faces away.
    let base_z_range = (ls_max.z - ls_min.z).max(1.0);
    ls_max.z += caster_extension.max(base_z_range);
    ls_min.z -= base_z_range.max(MIN_FAR_EXTENSION);

    let size = shadow_map_size.max(1) as f32;
    let texel_x = (ls_max.x - ls_min.x) / size;
    let texel_y = (ls_max.y - ls_min.y) / size;
    if texel_x > 0.0 {
        ls_min.x = (ls_min.x / texel_x).floor() * texel_x;
        ls_max.x = (ls_max.x / texel_x).ceil() * texel_x;
    }
    if texel_y > 0.0 {
        ls_min.y = (ls_min.y / texel_y).floor() * texel_y;
        ls_max.y = (ls_max.y / texel_y).ceil() * texel_y;
    }

    // near/far are positive distances along -Z
    let proj = Mat4::orthographic_rh_gl(
        ls_min.x, ls_max.x, ls_min.y, ls_max.y, -ls_max.z, -ls_min.z,
    );

    proj * light_view
}

// ============================================================================
// High-level Builder
// ============================================================================

/// Every cascade of one directional light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeSet {
    pub count: u32,
    /// Far split distance per cascade in view space.
    pub splits: [f32; MAX_CASCADES as usize],
    /// Unused cascades hold the identity.
    pub view_projections: [Mat4; MAX_CASCADES as usize],
}

/// Splits the camera frustum up to the shadow distance and fits one
/// orthographic cascade per slice.
#[must_use]
pub fn build_directional_cascades(
    light_direction: Vec3,
    projection: &Mat4,
    view: &Mat4,
    camera_near: f32,
    camera_far: f32,
    shadow: &ShadowSettings,
    caster_extension: f32,
) -> CascadeSet {
    let count = shadow.effective_cascades();
    let near = camera_near.max(0.01);
    let far = shadow.max_distance.min(camera_far).max(near + 0.01);

    let splits = compute_cascade_splits(count, near, far, shadow.cascade_split_lambda);

    let mut view_projections = [Mat4::IDENTITY; MAX_CASCADES as usize];
    let mut slice_near = near;
    for (c, vp) in view_projections.iter_mut().enumerate().take(count as usize) {
        let slice_far = splits[c];
        let corners = compute_frustum_corners_world(projection, view, slice_near, slice_far);
        *vp = build_cascade_vp(light_direction, &corners, shadow.map_size, caster_extension);
        slice_near = slice_far;
    }

    CascadeSet {
        count,
        splits,
        view_projections,
    }
}
