//! Shader Variant System
//!
//! A shader family is one base shader plus a closed set of orthogonal
//! features. Each legal combination of features is a **variant**: the base
//! sources with one `#define` per active feature, a canonical name and a
//! merged parameter table. Variants are synthesized on demand, cached per
//! flag set and linked on the graphics device at most once.
//!
//! - [`features`]: flag-set helpers over `bitflags` types
//! - [`graph`]: requirement / exclusion graph and legal-set enumeration
//! - [`source`]: source providers, `#include` expansion, define injection
//! - [`parameters`]: typed parameter tables
//! - [`definition`]: definitions, variants and the cache
//! - [`library`]: the name-keyed library owned by the engine
//! - [`families`]: built-in shader families

pub mod definition;
pub mod families;
pub mod features;
pub mod graph;
pub mod library;
pub mod parameters;
pub mod source;

pub use definition::{ShaderDefinition, ShaderDescriptor, ShaderVariant, VariantCache, VariantStage};
pub use families::{
    NoFeatures, PhongFeatures, PhongShader, SHADOW_MAP_UNIT, ShadowDepthShader, SkyboxShader,
    ToneMapFeatures, ToneMapShader, UnlitFeatures, UnlitShader,
};
pub use features::{FeatureFlags, MAX_FEATURES};
pub use graph::{FeatureGraph, Violation};
pub use library::{ShaderFamily, ShaderLibrary};
pub use parameters::{ParamValue, ParameterTable};
pub use source::{EmbeddedShaders, MemoryShaders, ShaderDirectory, SourceProvider};
