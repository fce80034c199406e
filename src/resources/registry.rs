//! Typed Render Resource Registry
//!
//! A name-keyed store of heterogeneous render resources owned by the
//! pipeline. The orchestrator rebuilds it whenever attachments change; passes
//! only read it when they build their resource flows.
//!
//! ```rust,ignore
//! registry.add(names::MAIN_COLOR, color_texture);
//! let color: Texture = registry.get(names::MAIN_COLOR)?;
//! ```
//!
//! Adding under an existing name replaces the entry. Retrieval checks both
//! presence and type.

use rustc_hash::FxHashMap;

use super::geometry::GeometryHandle;
use super::material::MaterialHandle;
use super::texture::{Buffer, Framebuffer, Texture};
use crate::errors::{LanternError, Result};

/// Well-known registry names.
pub mod names {
    pub const MAIN_COLOR: &str = "main_color";
    pub const MAIN_DEPTH: &str = "main_depth";
    pub const MAIN_TARGET: &str = "main_target";
    pub const SHADOW_MAP: &str = "shadow_map";
    pub const SHADOW_TARGET: &str = "shadow_target";
    pub const CAMERA_BLOCK: &str = "camera_block";
    pub const LIGHTS_BLOCK: &str = "lights_block";
    pub const SHADOW_BLOCK: &str = "shadow_block";
}

/// Everything the registry can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderResource {
    Texture(Texture),
    Buffer(Buffer),
    Framebuffer(Framebuffer),
    Material(MaterialHandle),
    Geometry(GeometryHandle),
}

impl RenderResource {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Texture(_) => Texture::KIND,
            Self::Buffer(_) => Buffer::KIND,
            Self::Framebuffer(_) => Framebuffer::KIND,
            Self::Material(_) => MaterialHandle::KIND,
            Self::Geometry(_) => GeometryHandle::KIND,
        }
    }
}

/// A concrete resource type retrievable from the registry.
pub trait TypedResource: Sized + Into<RenderResource> {
    const KIND: &'static str;

    fn from_resource(resource: &RenderResource) -> Option<Self>;
}

macro_rules! typed_resource {
    ($ty:ty, $variant:ident, $kind:literal) => {
        impl TypedResource for $ty {
            const KIND: &'static str = $kind;

            fn from_resource(resource: &RenderResource) -> Option<Self> {
                match resource {
                    RenderResource::$variant(value) => Some(*value),
                    _ => None,
                }
            }
        }

        impl From<$ty> for RenderResource {
            fn from(value: $ty) -> Self {
                RenderResource::$variant(value)
            }
        }
    };
}

typed_resource!(Texture, Texture, "texture");
typed_resource!(Buffer, Buffer, "buffer");
typed_resource!(Framebuffer, Framebuffer, "framebuffer");
typed_resource!(MaterialHandle, Material, "material");
typed_resource!(GeometryHandle, Geometry, "geometry");

#[derive(Debug, Default)]
pub struct ResourceRegistry {
    entries: FxHashMap<String, RenderResource>,
}

impl ResourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `resource` under `name`, returning the entry it replaced.
    pub fn add(&mut self, name: &str, resource: impl Into<RenderResource>) -> Option<RenderResource> {
        let resource = resource.into();
        let previous = self.entries.insert(name.to_string(), resource);
        if let Some(previous) = &previous {
            log::trace!("Registry: replaced '{name}' ({} -> {})", previous.kind(), resource.kind());
        }
        previous
    }

    /// Type-checked lookup.
    pub fn get<T: TypedResource>(&self, name: &str) -> Result<T> {
        let resource = self
            .entries
            .get(name)
            .ok_or_else(|| LanternError::ResourceNotFound(name.to_string()))?;
        T::from_resource(resource).ok_or_else(|| LanternError::ResourceTypeMismatch {
            name: name.to_string(),
            expected: T::KIND,
            found: resource.kind(),
        })
    }

    /// Lookup that treats an absent entry as `None` but still type-checks.
    pub fn get_optional<T: TypedResource>(&self, name: &str) -> Result<Option<T>> {
        if self.contains(name) {
            self.get(name).map(Some)
        } else {
            Ok(None)
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<RenderResource> {
        self.entries.remove(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{BufferId, TextureId, TextureKind};

    fn texture(id: u64, width: u32, height: u32) -> Texture {
        Texture {
            id: TextureId(id),
            width,
            height,
            kind: TextureKind::D2 { layers: 1 },
            format: wgpu::TextureFormat::Rgba16Float,
        }
    }

    #[test]
    fn add_overwrites() {
        let mut registry = ResourceRegistry::new();
        assert!(registry.add("main_color", texture(1, 800, 600)).is_none());
        let previous = registry.add("main_color", texture(2, 1920, 1080));
        assert_eq!(previous, Some(RenderResource::Texture(texture(1, 800, 600))));
        assert_eq!(registry.len(), 1);

        let current: Texture = registry.get("main_color").unwrap();
        assert_eq!(current.id, TextureId(2));
    }

    #[test]
    fn optional_lookup_still_checks_type() {
        let mut registry = ResourceRegistry::new();
        registry.add("block", Buffer { id: BufferId(3), size: 64 });

        assert_eq!(registry.get_optional::<Texture>("skybox").unwrap(), None);
        assert!(registry.get_optional::<Texture>("block").is_err());
    }
}
