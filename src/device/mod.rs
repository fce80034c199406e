//! Graphics Device Boundary
//!
//! The core never talks to a graphics API directly. Everything it needs from
//! the GPU goes through the narrow [`GraphicsDevice`] contract:
//!
//! - compile a shader stage from source text
//! - link a program from stages plus a named parameter table
//! - create / destroy 2D, layered and cube textures
//! - create render targets from color/depth textures
//! - upload geometry and parameter-block buffers
//! - bind targets, apply pipeline state, bind textures, update uniforms
//! - submit draws
//!
//! Backends (GL, wgpu, a recorder for tests) implement the trait. The crate
//! ships [`HeadlessDevice`], a recording backend used by tests and demos.

mod headless;
mod state;

pub use headless::{DeviceCommand, DrawRecord, HeadlessDevice};
pub use state::{DepthState, PipelineState};

use std::fmt;

use crate::errors::Result;
use crate::resources::geometry::MeshData;
use crate::shader::parameters::{ParamValue, ParameterTable};

macro_rules! device_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

device_id!(
    /// A compiled shader stage.
    StageId
);
device_id!(
    /// A linked shader program.
    ProgramId
);
device_id!(
    /// A device texture (2D, layered 2D or cube).
    TextureId
);
device_id!(
    /// A device buffer (parameter blocks).
    BufferId
);
device_id!(
    /// A render target bound to a set of color/depth textures.
    RenderTargetId
);
device_id!(
    /// Uploaded vertex/index data.
    GeometryId
);

/// Programmable pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Geometry,
    Fragment,
}

impl ShaderStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Geometry => "geometry",
            Self::Fragment => "fragment",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Texture shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// A 2D texture with `layers` array layers (1 for a plain 2D texture).
    D2 { layers: u32 },
    /// A six-faced cube map.
    Cube,
}

/// Sampling policy attached to a texture at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SamplerDescriptor {
    pub filter: wgpu::FilterMode,
    pub address_mode: wgpu::AddressMode,
    /// Depth comparison sampling (shadow maps).
    pub compare: Option<wgpu::CompareFunction>,
}

impl SamplerDescriptor {
    pub const LINEAR_CLAMP: Self = Self {
        filter: wgpu::FilterMode::Linear,
        address_mode: wgpu::AddressMode::ClampToEdge,
        compare: None,
    };

    pub const LINEAR_REPEAT: Self = Self {
        filter: wgpu::FilterMode::Linear,
        address_mode: wgpu::AddressMode::Repeat,
        compare: None,
    };

    pub const NEAREST_CLAMP: Self = Self {
        filter: wgpu::FilterMode::Nearest,
        address_mode: wgpu::AddressMode::ClampToEdge,
        compare: None,
    };

    pub const SHADOW: Self = Self {
        filter: wgpu::FilterMode::Linear,
        address_mode: wgpu::AddressMode::ClampToEdge,
        compare: Some(wgpu::CompareFunction::LessEqual),
    };
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self::LINEAR_REPEAT
    }
}

/// Everything the device needs to allocate a texture.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureDescriptor {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub kind: TextureKind,
    pub format: wgpu::TextureFormat,
    pub sampler: SamplerDescriptor,
}

/// Where draws land.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// The presentation surface owned by the window layer.
    Surface,
    Offscreen(RenderTargetId),
}

/// Clear values applied when a target is bound. `None` keeps the contents.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClearOps {
    pub color: Option<[f32; 4]>,
    pub depth: Option<f32>,
    pub stencil: Option<u32>,
}

impl ClearOps {
    pub const NONE: Self = Self {
        color: None,
        depth: None,
        stencil: None,
    };

    #[must_use]
    pub fn color_depth(color: [f32; 4], depth: f32) -> Self {
        Self {
            color: Some(color),
            depth: Some(depth),
            stencil: Some(0),
        }
    }

    #[must_use]
    pub fn depth_only(depth: f32) -> Self {
        Self {
            color: None,
            depth: Some(depth),
            stencil: None,
        }
    }
}

/// The graphics device boundary.
///
/// Implementations report failures through [`LanternError`](crate::errors::LanternError):
/// compile failures as `ShaderCompileFailed`, link failures as
/// `ProgramLinkFailed` and anything else as `Device`.
pub trait GraphicsDevice {
    // ── Programs ──────────────────────────────────────────────────────────
    fn compile_stage(&mut self, label: &str, stage: ShaderStage, source: &str) -> Result<StageId>;

    fn link_program(
        &mut self,
        label: &str,
        stages: &[StageId],
        parameters: &ParameterTable,
    ) -> Result<ProgramId>;

    // ── Resources ─────────────────────────────────────────────────────────
    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<TextureId>;

    fn destroy_texture(&mut self, texture: TextureId);

    fn create_render_target(
        &mut self,
        label: &str,
        color: &[TextureId],
        depth: Option<TextureId>,
    ) -> Result<RenderTargetId>;

    fn destroy_render_target(&mut self, target: RenderTargetId);

    fn create_buffer(&mut self, label: &str, size: usize) -> Result<BufferId>;

    fn write_buffer(&mut self, buffer: BufferId, data: &[u8]);

    fn create_geometry(&mut self, label: &str, mesh: &MeshData) -> Result<GeometryId>;

    // ── Command submission ────────────────────────────────────────────────
    fn bind_render_target(&mut self, target: RenderTarget, clear: ClearOps);

    fn apply_pipeline_state(&mut self, state: &PipelineState);

    fn use_program(&mut self, program: ProgramId);

    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    fn bind_parameter_block(&mut self, program: ProgramId, block: &str, buffer: BufferId);

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: &ParamValue);

    fn draw(&mut self, program: ProgramId, geometry: GeometryId, instances: u32);

    /// Hands the finished frame to the presentation layer.
    fn present(&mut self) {}
}
