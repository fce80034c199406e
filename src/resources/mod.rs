//! Render Resources
//!
//! Data the pipeline draws with, independent of any particular backend:
//! - Texture / Buffer / Framebuffer: device-backed handles with metadata
//! - Geometry: planar mesh data, primitives and the geometry store
//! - Material: closed material kinds and the material store
//! - Registry: the typed, name-keyed render resource registry

pub mod geometry;
pub mod material;
pub mod primitives;
pub mod registry;
pub mod texture;

pub use geometry::{Geometry, GeometryHandle, GeometryStore, MeshData};
pub use material::{
    BlendMode, FrameFeatures, Material, MaterialHandle, MaterialKind, MaterialStore,
    PhongMaterial, TextureBindings, UnlitMaterial,
};
pub use registry::{RenderResource, ResourceRegistry, TypedResource, names};
pub use texture::{Buffer, Framebuffer, Texture};
