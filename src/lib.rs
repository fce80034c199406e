//! Lantern: a forward rendering core built around feature-flag shader
//! variants and a Shadow → Main → Postprocess pass pipeline.

pub mod device;
pub mod engine;
pub mod errors;
pub mod render;
pub mod resources;
pub mod scene;
pub mod settings;
pub mod shader;

pub use device::{GraphicsDevice, HeadlessDevice, PipelineState};
pub use engine::Engine;
pub use errors::{LanternError, Result};
pub use render::{FrameStats, FrameSwapData, RenderPipeline};
pub use resources::primitives::*;
pub use resources::{
    BlendMode, FrameFeatures, GeometryHandle, GeometryStore, Material, MaterialHandle,
    MaterialStore, MeshData, ResourceRegistry, Texture,
};
pub use scene::{Camera, Light, LightKind, Mesh, Node, NodeHandle, Scene, Transform};
pub use settings::{RendererSettings, ShadowSettings, ToneMappingMode, ToneMappingSettings};
pub use shader::{
    FeatureGraph, PhongFeatures, ShaderDefinition, ShaderDescriptor, ShaderFamily, ShaderLibrary,
    ShaderVariant, UnlitFeatures,
};
