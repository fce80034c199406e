//! Shader Library
//!
//! Owns every loaded [`ShaderDefinition`], keyed by family name. There is no
//! process-wide cache: the engine context owns one library and hands out
//! `Arc`s to the definitions it holds.
//!
//! Families are addressed through the [`ShaderFamily`] trait, which ties a
//! name to its feature type and descriptor so typed retrieval cannot mix
//! families up.

use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::definition::{ShaderDefinition, ShaderDescriptor, VariantCache};
use super::features::FeatureFlags;
use super::source::{EmbeddedShaders, SourceProvider};
use crate::device::GraphicsDevice;
use crate::errors::{LanternError, Result};

/// A shader family known at compile time.
pub trait ShaderFamily {
    type Features: FeatureFlags;

    /// Unique library key.
    const NAME: &'static str;

    fn descriptor() -> ShaderDescriptor<Self::Features>;
}

struct LibraryEntry {
    definition: Arc<dyn Any + Send + Sync>,
    cache: Arc<dyn VariantCache>,
}

/// Name-keyed store of shader definitions.
pub struct ShaderLibrary {
    provider: Box<dyn SourceProvider + Send + Sync>,
    entries: RwLock<FxHashMap<String, LibraryEntry>>,
}

impl std::fmt::Debug for ShaderLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read();
        let mut names: Vec<_> = entries.keys().cloned().collect();
        names.sort();
        f.debug_struct("ShaderLibrary")
            .field("families", &names)
            .finish_non_exhaustive()
    }
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::embedded()
    }
}

impl ShaderLibrary {
    pub fn new(provider: impl SourceProvider + Send + Sync + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    /// A library reading the GLSL shipped inside the crate.
    #[must_use]
    pub fn embedded() -> Self {
        Self::new(EmbeddedShaders)
    }

    /// Returns the definition of family `S`, loading it on first use.
    pub fn get<S: ShaderFamily>(&self) -> Result<Arc<ShaderDefinition<S::Features>>> {
        if let Some(entry) = self.entries.read().get(S::NAME) {
            return downcast::<S::Features>(S::NAME, entry);
        }

        let mut entries = self.entries.write();
        if let Some(entry) = entries.get(S::NAME) {
            return downcast::<S::Features>(S::NAME, entry);
        }

        let definition = Arc::new(ShaderDefinition::load(
            S::descriptor(),
            self.provider.as_ref(),
        )?);
        log::info!("Loaded shader family '{}'", S::NAME);
        entries.insert(
            S::NAME.to_string(),
            LibraryEntry {
                definition: definition.clone(),
                cache: definition.clone(),
            },
        );
        Ok(definition)
    }

    /// Loads an ad-hoc definition under its descriptor name.
    ///
    /// An existing entry of the same feature type is returned unchanged.
    pub fn load<F: FeatureFlags>(
        &self,
        descriptor: ShaderDescriptor<F>,
    ) -> Result<Arc<ShaderDefinition<F>>> {
        let name = descriptor.name.clone();
        let mut entries = self.entries.write();
        if let Some(entry) = entries.get(&name) {
            return downcast::<F>(&name, entry);
        }

        let definition = Arc::new(ShaderDefinition::load(descriptor, self.provider.as_ref())?);
        log::info!("Loaded shader family '{name}'");
        entries.insert(
            name,
            LibraryEntry {
                definition: definition.clone(),
                cache: definition.clone(),
            },
        );
        Ok(definition)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Loaded family names, sorted.
    #[must_use]
    pub fn family_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Total cached variants over every family.
    #[must_use]
    pub fn variant_count(&self) -> usize {
        self.caches().iter().map(|cache| cache.variant_count()).sum()
    }

    /// Generates every legal variant of every loaded family.
    pub fn generate_all_variants(&self) -> Result<usize> {
        let mut total = 0;
        for cache in self.caches() {
            total += cache.generate_all()?;
        }
        Ok(total)
    }

    /// Links every pending variant of every loaded family.
    pub fn link_all_variants(&self, device: &mut dyn GraphicsDevice) -> Result<usize> {
        let mut linked = 0;
        for cache in self.caches() {
            linked += cache.link_all(device)?;
        }
        Ok(linked)
    }

    fn caches(&self) -> Vec<Arc<dyn VariantCache>> {
        let entries = self.entries.read();
        let mut caches: Vec<_> = entries
            .iter()
            .map(|(name, entry)| (name.clone(), Arc::clone(&entry.cache)))
            .collect();
        caches.sort_by(|a, b| a.0.cmp(&b.0));
        caches.into_iter().map(|(_, cache)| cache).collect()
    }
}

fn downcast<F: FeatureFlags>(name: &str, entry: &LibraryEntry) -> Result<Arc<ShaderDefinition<F>>> {
    Arc::clone(&entry.definition)
        .downcast::<ShaderDefinition<F>>()
        .map_err(|_| LanternError::ShaderFamilyMismatch(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{HeadlessDevice, ShaderStage};
    use crate::shader::source::MemoryShaders;
    use bitflags::bitflags;

    bitflags! {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
        struct Feat: u32 {
            const USE_X = 1 << 0;
            const USE_Y = 1 << 1;
        }
    }

    bitflags! {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
        struct Other: u32 {
            const USE_Z = 1 << 0;
        }
    }

    struct Family;

    impl ShaderFamily for Family {
        type Features = Feat;
        const NAME: &'static str = "family";

        fn descriptor() -> ShaderDescriptor<Feat> {
            ShaderDescriptor::new(Self::NAME)
                .stage(ShaderStage::Vertex, "f.vert")
                .stage(ShaderStage::Fragment, "f.frag")
        }
    }

    struct Impostor;

    impl ShaderFamily for Impostor {
        type Features = Other;
        const NAME: &'static str = "family";

        fn descriptor() -> ShaderDescriptor<Other> {
            ShaderDescriptor::new(Self::NAME)
        }
    }

    fn library() -> ShaderLibrary {
        ShaderLibrary::new(
            MemoryShaders::new()
                .with("f.vert", "void main() {}\n")
                .with("f.frag", "void main() {}\n"),
        )
    }

    #[test]
    fn definitions_are_loaded_once() {
        let library = library();
        let a = library.get::<Family>().unwrap();
        let b = library.get::<Family>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(library.family_names(), vec!["family".to_string()]);
    }

    #[test]
    fn name_reuse_with_another_feature_type_fails() {
        let library = library();
        library.get::<Family>().unwrap();
        let err = library.get::<Impostor>().unwrap_err();
        assert!(matches!(err, LanternError::ShaderFamilyMismatch(_)));
    }

    #[test]
    fn bulk_generation_and_linking() {
        let library = library();
        library.get::<Family>().unwrap();
        let mut device = HeadlessDevice::new();

        assert_eq!(library.generate_all_variants().unwrap(), 4);
        assert_eq!(library.link_all_variants(&mut device).unwrap(), 4);
        assert_eq!(library.link_all_variants(&mut device).unwrap(), 0);
        assert_eq!(library.variant_count(), 4);
    }
}
