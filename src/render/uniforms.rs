//! Parameter Blocks
//!
//! `#[repr(C)]` mirrors of the std140 uniform blocks declared in
//! `src/shader/glsl/chunks`. Every member is 16-byte sized so the Rust layout
//! matches std140 without explicit padding.
//!
//! | Block         | GLSL chunk     | Bound by            |
//! |---------------|----------------|---------------------|
//! | `CameraBlock` | `camera.glsl`  | main pass           |
//! | `LightsBlock` | `lights.glsl`  | main pass           |
//! | `ShadowBlock` | `shadow.glsl`  | shadow + main pass  |

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, UVec4, Vec4};

use super::shadow_utils::MAX_CASCADES;
use super::swap::FrameSwapData;
use crate::settings::ShadowSettings;

pub const CAMERA_BLOCK: &str = "CameraBlock";
pub const LIGHTS_BLOCK: &str = "LightsBlock";
pub const SHADOW_BLOCK: &str = "ShadowBlock";

pub const MAX_DIRECTIONAL_LIGHTS: usize = 4;
pub const MAX_POINT_LIGHTS: usize = 16;
pub const MAX_SPOT_LIGHTS: usize = 8;

// ============================================================================
// Camera
// ============================================================================

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct CameraBlock {
    pub view: Mat4,
    pub projection: Mat4,
    pub view_projection: Mat4,
    pub position: Vec4,
    /// x: near, y: far, z: aspect
    pub params: Vec4,
}

impl CameraBlock {
    #[must_use]
    pub fn from_swap(swap: &FrameSwapData) -> Self {
        let camera = &swap.camera;
        Self {
            view: camera.view,
            projection: camera.projection,
            view_projection: camera.view_projection,
            position: camera.position.extend(1.0),
            params: Vec4::new(camera.near, camera.far, camera.aspect, 0.0),
        }
    }
}

// ============================================================================
// Lights
// ============================================================================

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuDirectionalLight {
    pub direction: Vec4,
    /// rgb: color, a: intensity
    pub color: Vec4,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuPointLight {
    /// xyz: position, w: range
    pub position: Vec4,
    pub color: Vec4,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuSpotLight {
    /// xyz: position, w: range
    pub position: Vec4,
    pub direction: Vec4,
    pub color: Vec4,
    /// x: cos(inner), y: cos(outer)
    pub cone: Vec4,
}

/// Bounded light arrays. Slots past the counts are zeroed and ignored by the
/// shaders.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct LightsBlock {
    /// x: directional, y: point, z: spot
    pub counts: UVec4,
    pub ambient: Vec4,
    pub directional: [GpuDirectionalLight; MAX_DIRECTIONAL_LIGHTS],
    pub point: [GpuPointLight; MAX_POINT_LIGHTS],
    pub spot: [GpuSpotLight; MAX_SPOT_LIGHTS],
}

impl LightsBlock {
    #[must_use]
    pub fn from_swap(swap: &FrameSwapData) -> Self {
        let mut block = Self::zeroed();
        block.ambient = swap.ambient.extend(1.0);

        for (slot, light) in block.directional.iter_mut().zip(&swap.directional_lights) {
            *slot = GpuDirectionalLight {
                direction: light.direction.extend(0.0),
                color: light.color.extend(light.intensity),
            };
        }
        for (slot, light) in block.point.iter_mut().zip(&swap.point_lights) {
            *slot = GpuPointLight {
                position: light.position.extend(light.range),
                color: light.color.extend(light.intensity),
            };
        }
        for (slot, light) in block.spot.iter_mut().zip(&swap.spot_lights) {
            *slot = GpuSpotLight {
                position: light.position.extend(light.range),
                direction: light.direction.extend(0.0),
                color: light.color.extend(light.intensity),
                cone: Vec4::new(light.cos_inner, light.cos_outer, 0.0, 0.0),
            };
        }

        block.counts = UVec4::new(
            swap.directional_lights.len().min(MAX_DIRECTIONAL_LIGHTS) as u32,
            swap.point_lights.len().min(MAX_POINT_LIGHTS) as u32,
            swap.spot_lights.len().min(MAX_SPOT_LIGHTS) as u32,
            0,
        );
        block
    }
}

// ============================================================================
// Shadow
// ============================================================================

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ShadowBlock {
    pub cascade_view_projection: [Mat4; MAX_CASCADES as usize],
    pub splits: Vec4,
    /// x: bias, y: normal bias, z: pcf kernel, w: cascade count
    pub params: Vec4,
    pub light_direction: Vec4,
}

impl ShadowBlock {
    /// Cascade data of the frame, or an inert block (zero cascades) when no
    /// shadow is rendered.
    #[must_use]
    pub fn from_swap(swap: &FrameSwapData, settings: &ShadowSettings) -> Self {
        let mut block = Self {
            cascade_view_projection: [Mat4::IDENTITY; MAX_CASCADES as usize],
            splits: Vec4::ZERO,
            params: Vec4::new(
                settings.bias,
                settings.normal_bias,
                settings.pcf_kernel.max(1) as f32,
                0.0,
            ),
            light_direction: Vec4::ZERO,
        };
        if let Some(shadow) = &swap.shadow {
            block.cascade_view_projection = shadow.view_projections;
            block.splits = Vec4::from_array(shadow.splits);
            block.params.w = shadow.cascade_count as f32;
            block.light_direction = shadow.light_direction.extend(0.0);
        }
        block
    }
}
