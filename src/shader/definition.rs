//! Shader Definitions & Variant Cache
//!
//! A [`ShaderDefinition`] is one base shader: per-stage source with includes
//! already expanded, a base [`ParameterTable`], an extra table per feature, a
//! whitelist and a [`FeatureGraph`]. It is built once and never mutated; the
//! only interior state is its variant cache.
//!
//! [`ShaderDefinition::get_variant`] turns a legal flag set into a
//! [`ShaderVariant`] (preprocessed sources, canonical name, merged
//! parameters). Each distinct flag set yields exactly one `Arc<ShaderVariant>`
//! for the lifetime of the definition. Lookups take a read lock; the first
//! insertion of a flag set is serialized behind the write lock.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use super::features::{FeatureFlags, active_symbols, describe, features_of};
use super::graph::{FeatureGraph, Violation};
use super::parameters::ParameterTable;
use super::source::{SourceProvider, inject_defines, load_expanded, split_version};
use crate::device::{GraphicsDevice, ProgramId, ShaderStage};
use crate::errors::{LanternError, Result};

// ─── Descriptor ───────────────────────────────────────────────────────────────

/// Everything needed to load a [`ShaderDefinition`].
#[derive(Debug, Clone)]
pub struct ShaderDescriptor<F: FeatureFlags> {
    pub name: String,
    /// Stage → source path understood by the [`SourceProvider`].
    pub stages: Vec<(ShaderStage, String)>,
    pub parameters: ParameterTable,
    /// Extra parameters contributed by single features.
    pub feature_parameters: Vec<(F, ParameterTable)>,
    pub whitelist: F,
    pub graph: FeatureGraph<F>,
}

impl<F: FeatureFlags> ShaderDescriptor<F> {
    /// A descriptor with every declared feature whitelisted and no relations.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            stages: Vec::new(),
            parameters: ParameterTable::new(),
            feature_parameters: Vec::new(),
            whitelist: F::all(),
            graph: FeatureGraph::new(),
        }
    }

    #[must_use]
    pub fn stage(mut self, stage: ShaderStage, path: &str) -> Self {
        self.stages.push((stage, path.to_string()));
        self
    }

    #[must_use]
    pub fn parameters(mut self, parameters: ParameterTable) -> Self {
        self.parameters = parameters;
        self
    }

    #[must_use]
    pub fn feature_parameters(mut self, feature: F, parameters: ParameterTable) -> Self {
        self.feature_parameters.push((feature, parameters));
        self
    }

    #[must_use]
    pub fn whitelist(mut self, whitelist: F) -> Self {
        self.whitelist = whitelist;
        self
    }

    #[must_use]
    pub fn graph(mut self, graph: FeatureGraph<F>) -> Self {
        self.graph = graph;
        self
    }
}

// ─── Variant ──────────────────────────────────────────────────────────────────

/// Preprocessed source for one stage of a variant.
#[derive(Debug, Clone)]
pub struct VariantStage {
    pub stage: ShaderStage,
    pub source: String,
}

/// One concrete program of a shader family: the base sources specialized by a
/// flag set.
#[derive(Debug)]
pub struct ShaderVariant {
    name: String,
    base_name: String,
    bits: u32,
    defines: Vec<&'static str>,
    stages: Vec<VariantStage>,
    parameters: ParameterTable,
    program: Mutex<Option<ProgramId>>,
}

impl ShaderVariant {
    /// Canonical name: base name followed by `_SYMBOL` per active feature.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Raw bits of the flag set this variant was built for.
    #[must_use]
    pub fn feature_bits(&self) -> u32 {
        self.bits
    }

    /// Injected `#define` symbols in bit order.
    #[must_use]
    pub fn defines(&self) -> &[&'static str] {
        &self.defines
    }

    #[must_use]
    pub fn stages(&self) -> &[VariantStage] {
        &self.stages
    }

    #[must_use]
    pub fn source(&self, stage: ShaderStage) -> Option<&str> {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.source.as_str())
    }

    /// Base parameters merged with those of every active feature.
    #[must_use]
    pub fn parameters(&self) -> &ParameterTable {
        &self.parameters
    }

    /// The linked program, if [`link`](Self::link) has succeeded.
    #[must_use]
    pub fn program(&self) -> Option<ProgramId> {
        *self.program.lock()
    }

    #[must_use]
    pub fn is_linked(&self) -> bool {
        self.program.lock().is_some()
    }

    /// Compiles and links the variant on `device`. Idempotent: once linked,
    /// later calls return the stored program without touching the device.
    pub fn link(&self, device: &mut dyn GraphicsDevice) -> Result<ProgramId> {
        let mut slot = self.program.lock();
        if let Some(program) = *slot {
            return Ok(program);
        }

        let mut stage_ids = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            stage_ids.push(device.compile_stage(&self.name, stage.stage, &stage.source)?);
        }
        let program = device.link_program(&self.name, &stage_ids, &self.parameters)?;

        log::debug!("Linked shader variant '{}' as {program}", self.name);
        *slot = Some(program);
        Ok(program)
    }
}

// ─── Definition ───────────────────────────────────────────────────────────────

#[derive(Debug)]
struct StageTemplate {
    stage: ShaderStage,
    version: String,
    body: String,
}

/// A loaded base shader and its cache of variants.
#[derive(Debug)]
pub struct ShaderDefinition<F: FeatureFlags> {
    name: String,
    stages: Vec<StageTemplate>,
    parameters: ParameterTable,
    feature_parameters: FxHashMap<F, ParameterTable>,
    whitelist: F,
    graph: FeatureGraph<F>,
    variants: RwLock<FxHashMap<F, Arc<ShaderVariant>>>,
}

impl<F: FeatureFlags> ShaderDefinition<F> {
    /// Reads and preprocesses every stage of `descriptor`.
    ///
    /// Fails with `ShaderSourceNotFound` when a stage file or one of its
    /// includes is missing.
    pub fn load(descriptor: ShaderDescriptor<F>, provider: &dyn SourceProvider) -> Result<Self> {
        let ShaderDescriptor {
            name,
            stages,
            parameters,
            feature_parameters,
            whitelist,
            graph,
        } = descriptor;

        let mut templates = Vec::with_capacity(stages.len());
        for (stage, path) in &stages {
            let expanded = load_expanded(provider, &name, path)?;
            let (version, body) = split_version(&expanded);
            templates.push(StageTemplate {
                stage: *stage,
                version,
                body,
            });
        }

        let mut per_feature: FxHashMap<F, ParameterTable> = FxHashMap::default();
        for (features, table) in feature_parameters {
            for feature in features_of(features) {
                per_feature.entry(feature).or_default().merge(&table);
            }
        }

        log::debug!(
            "Loaded shader definition '{name}' ({} stages, whitelist [{}])",
            templates.len(),
            describe(whitelist)
        );

        Ok(Self {
            name,
            stages: templates,
            parameters,
            feature_parameters: per_feature,
            whitelist,
            graph,
            variants: RwLock::new(FxHashMap::default()),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn whitelist(&self) -> F {
        self.whitelist
    }

    #[must_use]
    pub fn graph(&self) -> &FeatureGraph<F> {
        &self.graph
    }

    #[must_use]
    pub fn base_parameters(&self) -> &ParameterTable {
        &self.parameters
    }

    #[must_use]
    pub fn feature_parameters(&self, feature: F) -> Option<&ParameterTable> {
        self.feature_parameters.get(&feature)
    }

    /// Every legal flag set under the whitelist, sorted by bits.
    #[must_use]
    pub fn legal_feature_sets(&self) -> Vec<F> {
        self.graph.enumerate(self.whitelist)
    }

    /// Checks `features` against the whitelist and the dependency graph.
    pub fn validate(&self, features: F) -> Result<()> {
        self.graph
            .validate(features, self.whitelist)
            .map_err(|violation| match violation {
                Violation::OutsideWhitelist(_) => LanternError::FeatureOutsideWhitelist {
                    shader: self.name.clone(),
                    requested: describe(features),
                    whitelist: describe(self.whitelist),
                },
                other => LanternError::IllegalFeatureCombination {
                    shader: self.name.clone(),
                    requested: describe(features),
                    reason: other.describe(),
                },
            })
    }

    /// Returns the variant for `features`, synthesizing and caching it on
    /// first request.
    pub fn get_variant(&self, features: F) -> Result<Arc<ShaderVariant>> {
        if let Some(variant) = self.variants.read().get(&features) {
            return Ok(Arc::clone(variant));
        }

        self.validate(features)?;

        let mut variants = self.variants.write();
        if let Some(variant) = variants.get(&features) {
            return Ok(Arc::clone(variant));
        }

        let variant = Arc::new(self.synthesize(features));
        log::debug!("Generated shader variant '{}'", variant.name());
        variants.insert(features, Arc::clone(&variant));
        Ok(variant)
    }

    /// Generates every legal variant and returns them in bit order.
    pub fn generate_all_variants(&self) -> Result<Vec<Arc<ShaderVariant>>> {
        self.legal_feature_sets()
            .into_iter()
            .map(|features| self.get_variant(features))
            .collect()
    }

    /// Links every cached variant that is not linked yet.
    ///
    /// Returns how many variants were newly linked.
    pub fn link_all_variants(&self, device: &mut dyn GraphicsDevice) -> Result<usize> {
        let mut pending: Vec<(F, Arc<ShaderVariant>)> = self
            .variants
            .read()
            .iter()
            .filter(|(_, variant)| !variant.is_linked())
            .map(|(features, variant)| (*features, Arc::clone(variant)))
            .collect();
        pending.sort_by_key(|(features, _)| features.bits());

        for (_, variant) in &pending {
            variant.link(device)?;
        }

        if !pending.is_empty() {
            log::debug!("Shader '{}': linked {} variants", self.name, pending.len());
        }
        Ok(pending.len())
    }

    /// Number of cached variants.
    #[must_use]
    pub fn variant_count(&self) -> usize {
        self.variants.read().len()
    }

    /// Canonical variant name for a flag set.
    #[must_use]
    pub fn variant_name(&self, features: F) -> String {
        let mut name = self.name.clone();
        for symbol in active_symbols(features) {
            name.push('_');
            name.push_str(symbol);
        }
        name
    }

    fn synthesize(&self, features: F) -> ShaderVariant {
        let defines = active_symbols(features);

        let stages = self
            .stages
            .iter()
            .map(|template| VariantStage {
                stage: template.stage,
                source: inject_defines(&template.version, &defines, &template.body),
            })
            .collect();

        let mut parameters = self.parameters.clone();
        for feature in features_of(features) {
            if let Some(extra) = self.feature_parameters.get(&feature) {
                parameters.merge(extra);
            }
        }

        ShaderVariant {
            name: self.variant_name(features),
            base_name: self.name.clone(),
            bits: features.bits(),
            defines,
            stages,
            parameters,
            program: Mutex::new(None),
        }
    }
}

// ─── Type-erased access ───────────────────────────────────────────────────────

/// Feature-type independent view of a definition, used for bulk operations
/// over every loaded family.
pub trait VariantCache: Send + Sync {
    fn name(&self) -> &str;

    /// Generates every legal variant; returns the number now cached.
    fn generate_all(&self) -> Result<usize>;

    /// Links every pending variant; returns how many were newly linked.
    fn link_all(&self, device: &mut dyn GraphicsDevice) -> Result<usize>;

    fn variant_count(&self) -> usize;
}

impl<F: FeatureFlags> VariantCache for ShaderDefinition<F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate_all(&self) -> Result<usize> {
        self.generate_all_variants()?;
        Ok(ShaderDefinition::variant_count(self))
    }

    fn link_all(&self, device: &mut dyn GraphicsDevice) -> Result<usize> {
        self.link_all_variants(device)
    }

    fn variant_count(&self) -> usize {
        ShaderDefinition::variant_count(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;
    use crate::shader::parameters::ParamValue;
    use crate::shader::source::MemoryShaders;
    use bitflags::bitflags;

    bitflags! {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
        struct Feat: u32 {
            const USE_A = 1 << 0;
            const USE_B = 1 << 1;
            const USE_C = 1 << 2;
        }
    }

    fn sources() -> MemoryShaders {
        MemoryShaders::new()
            .with("test.vert", "#version 330 core\nvoid main() {}\n")
            .with("test.frag", "#version 330 core\n#include \"chunk.glsl\"\nvoid main() {}\n")
            .with("chunk.glsl", "float chunk() { return 1.0; }\n")
    }

    fn definition() -> ShaderDefinition<Feat> {
        let descriptor = ShaderDescriptor::new("test")
            .stage(ShaderStage::Vertex, "test.vert")
            .stage(ShaderStage::Fragment, "test.frag")
            .parameters(ParameterTable::new().with("u_scale", 1.0))
            .feature_parameters(Feat::USE_B, ParameterTable::new().with("u_scale", 2.0))
            .whitelist(Feat::USE_A | Feat::USE_B)
            .graph(FeatureGraph::new().require(Feat::USE_B, Feat::USE_A));
        ShaderDefinition::load(descriptor, &sources()).unwrap()
    }

    #[test]
    fn variant_source_has_defines_after_version() {
        let def = definition();
        let variant = def.get_variant(Feat::USE_A | Feat::USE_B).unwrap();
        let frag = variant.source(ShaderStage::Fragment).unwrap();
        assert!(frag.starts_with(
            "#version 330 core\n#define USE_A\n#define USE_B\nfloat chunk()"
        ));
        assert_eq!(variant.name(), "test_USE_A_USE_B");
        assert_eq!(variant.parameters().get("u_scale"), Some(&ParamValue::Float(2.0)));
    }

    #[test]
    fn same_set_returns_same_instance() {
        let def = definition();
        let a = def.get_variant(Feat::USE_A).unwrap();
        let b = def.get_variant(Feat::USE_A).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(def.variant_count(), 1);
    }

    #[test]
    fn outside_whitelist_is_a_configuration_error() {
        let def = definition();
        let err = def.get_variant(Feat::USE_C).unwrap_err();
        assert!(matches!(err, LanternError::FeatureOutsideWhitelist { .. }));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn missing_dependency_is_rejected() {
        let def = definition();
        let err = def.get_variant(Feat::USE_B).unwrap_err();
        assert!(matches!(err, LanternError::IllegalFeatureCombination { .. }));
    }

    #[test]
    fn link_is_idempotent() {
        let def = definition();
        let mut device = HeadlessDevice::new();
        def.generate_all_variants().unwrap();
        assert_eq!(def.variant_count(), 3);

        assert_eq!(def.link_all_variants(&mut device).unwrap(), 3);
        assert_eq!(def.link_all_variants(&mut device).unwrap(), 0);
        assert_eq!(device.programs_linked(), 3);
    }

    #[test]
    fn missing_stage_file_fails_load() {
        let descriptor = ShaderDescriptor::<Feat>::new("broken").stage(ShaderStage::Vertex, "nope.vert");
        let err = ShaderDefinition::load(descriptor, &sources()).unwrap_err();
        assert!(matches!(err, LanternError::ShaderSourceNotFound { .. }));
    }
}
