//! Built-in shader families.
//!
//! Each family declares its feature flags (bit order = `#define` order), the
//! relations between them and its default parameter tables. The GLSL lives in
//! `src/shader/glsl` and is embedded into the binary.

use bitflags::bitflags;
use glam::{Mat4, Vec3, Vec4};

use super::definition::ShaderDescriptor;
use super::graph::FeatureGraph;
use super::library::ShaderFamily;
use super::parameters::{ParamValue, ParameterTable};
use crate::device::ShaderStage;
use crate::settings::{ToneMappingMode, ToneMappingSettings};

// ─── Texture units ────────────────────────────────────────────────────────────

pub const ALBEDO_MAP_UNIT: u32 = 0;
pub const NORMAL_MAP_UNIT: u32 = 1;
pub const HEIGHT_MAP_UNIT: u32 = 2;
pub const SPECULAR_MAP_UNIT: u32 = 3;
pub const EMISSIVE_MAP_UNIT: u32 = 4;
pub const COLOR_MAP_UNIT: u32 = 0;
pub const SKYBOX_UNIT: u32 = 0;
pub const POSTPROCESS_INPUT_UNIT: u32 = 0;
/// Fixed unit the main pass binds the shadow map to.
pub const SHADOW_MAP_UNIT: u32 = 7;

// ─── Feature sets ─────────────────────────────────────────────────────────────

bitflags! {
    /// Optional capabilities of the Blinn-Phong surface shader.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct PhongFeatures: u32 {
        const USE_ALBEDO_MAP       = 1 << 0;
        const USE_NORMAL_MAP       = 1 << 1;
        /// Parallax mapping; needs the tangent frame of the normal map.
        const USE_HEIGHT_MAP       = 1 << 2;
        const USE_SPECULAR_MAP     = 1 << 3;
        const USE_EMISSIVE_MAP     = 1 << 4;
        const USE_ALPHA_TEST       = 1 << 5;
        const RECEIVE_SHADOWS      = 1 << 6;
        const USE_CASCADED_SHADOWS = 1 << 7;
        const USE_PCF              = 1 << 8;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct UnlitFeatures: u32 {
        const USE_COLOR_MAP  = 1 << 0;
        const USE_ALPHA_TEST = 1 << 1;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ToneMapFeatures: u32 {
        const TONEMAP_REINHARD = 1 << 0;
        const TONEMAP_ACES     = 1 << 1;
        const GAMMA_CORRECT    = 1 << 2;
    }
}

bitflags! {
    /// Feature set of families without optional features.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct NoFeatures: u32 {}
}

impl ToneMapFeatures {
    /// Operator and gamma selection for the current settings.
    #[must_use]
    pub fn from_settings(settings: &ToneMappingSettings) -> Self {
        let mut features = match settings.mode {
            ToneMappingMode::Linear => Self::empty(),
            ToneMappingMode::Reinhard => Self::TONEMAP_REINHARD,
            ToneMappingMode::AcesFilmic => Self::TONEMAP_ACES,
        };
        if (settings.gamma - 1.0).abs() > f32::EPSILON {
            features |= Self::GAMMA_CORRECT;
        }
        features
    }
}

// ─── Families ─────────────────────────────────────────────────────────────────

/// Lit surfaces: Blinn-Phong with optional maps and cascaded shadows.
pub struct PhongShader;

impl ShaderFamily for PhongShader {
    type Features = PhongFeatures;
    const NAME: &'static str = "phong";

    fn descriptor() -> ShaderDescriptor<PhongFeatures> {
        ShaderDescriptor::new(Self::NAME)
            .stage(ShaderStage::Vertex, "phong.vert")
            .stage(ShaderStage::Fragment, "phong.frag")
            .parameters(
                ParameterTable::new()
                    .with("u_model", Mat4::IDENTITY)
                    .with("u_normal_matrix", Mat4::IDENTITY)
                    .with("u_diffuse", Vec4::ONE)
                    .with("u_specular", Vec3::splat(0.5))
                    .with("u_shininess", 32.0)
                    .with("u_emissive", Vec3::ZERO)
                    .with("u_opacity", 1.0),
            )
            .feature_parameters(
                PhongFeatures::USE_ALBEDO_MAP,
                ParameterTable::new().with("u_albedo_map", ParamValue::Sampler(ALBEDO_MAP_UNIT)),
            )
            .feature_parameters(
                PhongFeatures::USE_NORMAL_MAP,
                ParameterTable::new()
                    .with("u_normal_map", ParamValue::Sampler(NORMAL_MAP_UNIT))
                    .with("u_normal_scale", 1.0),
            )
            .feature_parameters(
                PhongFeatures::USE_HEIGHT_MAP,
                ParameterTable::new()
                    .with("u_height_map", ParamValue::Sampler(HEIGHT_MAP_UNIT))
                    .with("u_parallax_scale", 0.05),
            )
            .feature_parameters(
                PhongFeatures::USE_SPECULAR_MAP,
                ParameterTable::new()
                    .with("u_specular_map", ParamValue::Sampler(SPECULAR_MAP_UNIT)),
            )
            .feature_parameters(
                PhongFeatures::USE_EMISSIVE_MAP,
                ParameterTable::new()
                    .with("u_emissive_map", ParamValue::Sampler(EMISSIVE_MAP_UNIT)),
            )
            .feature_parameters(
                PhongFeatures::USE_ALPHA_TEST,
                ParameterTable::new().with("u_alpha_cutoff", 0.5),
            )
            .feature_parameters(
                PhongFeatures::RECEIVE_SHADOWS,
                ParameterTable::new().with("u_shadow_map", ParamValue::Sampler(SHADOW_MAP_UNIT)),
            )
            .graph(
                FeatureGraph::new()
                    .require(PhongFeatures::USE_HEIGHT_MAP, PhongFeatures::USE_NORMAL_MAP)
                    .require(
                        PhongFeatures::USE_CASCADED_SHADOWS | PhongFeatures::USE_PCF,
                        PhongFeatures::RECEIVE_SHADOWS,
                    ),
            )
    }
}

/// Unshaded color, optionally textured.
pub struct UnlitShader;

impl ShaderFamily for UnlitShader {
    type Features = UnlitFeatures;
    const NAME: &'static str = "unlit";

    fn descriptor() -> ShaderDescriptor<UnlitFeatures> {
        ShaderDescriptor::new(Self::NAME)
            .stage(ShaderStage::Vertex, "unlit.vert")
            .stage(ShaderStage::Fragment, "unlit.frag")
            .parameters(
                ParameterTable::new()
                    .with("u_model", Mat4::IDENTITY)
                    .with("u_color", Vec4::ONE)
                    .with("u_opacity", 1.0),
            )
            .feature_parameters(
                UnlitFeatures::USE_COLOR_MAP,
                ParameterTable::new().with("u_color_map", ParamValue::Sampler(COLOR_MAP_UNIT)),
            )
            .feature_parameters(
                UnlitFeatures::USE_ALPHA_TEST,
                ParameterTable::new().with("u_alpha_cutoff", 0.5),
            )
    }
}

/// Depth-only caster program writing every cascade layer through instancing.
pub struct ShadowDepthShader;

impl ShaderFamily for ShadowDepthShader {
    type Features = NoFeatures;
    const NAME: &'static str = "shadow_depth";

    fn descriptor() -> ShaderDescriptor<NoFeatures> {
        ShaderDescriptor::new(Self::NAME)
            .stage(ShaderStage::Vertex, "shadow_depth.vert")
            .stage(ShaderStage::Geometry, "shadow_depth.geom")
            .stage(ShaderStage::Fragment, "shadow_depth.frag")
            .parameters(ParameterTable::new().with("u_model", Mat4::IDENTITY))
    }
}

pub struct SkyboxShader;

impl ShaderFamily for SkyboxShader {
    type Features = NoFeatures;
    const NAME: &'static str = "skybox";

    fn descriptor() -> ShaderDescriptor<NoFeatures> {
        ShaderDescriptor::new(Self::NAME)
            .stage(ShaderStage::Vertex, "skybox.vert")
            .stage(ShaderStage::Fragment, "skybox.frag")
            .parameters(ParameterTable::new().with("u_skybox", ParamValue::Sampler(SKYBOX_UNIT)))
    }
}

/// Full-screen HDR resolve: exposure, tone-mapping operator, gamma.
pub struct ToneMapShader;

impl ShaderFamily for ToneMapShader {
    type Features = ToneMapFeatures;
    const NAME: &'static str = "tonemap";

    fn descriptor() -> ShaderDescriptor<ToneMapFeatures> {
        ShaderDescriptor::new(Self::NAME)
            .stage(ShaderStage::Vertex, "fullscreen.vert")
            .stage(ShaderStage::Fragment, "tonemap.frag")
            .parameters(
                ParameterTable::new()
                    .with("u_input", ParamValue::Sampler(POSTPROCESS_INPUT_UNIT))
                    .with("u_exposure", 1.0)
                    .with("u_gamma", 2.2),
            )
            .graph(
                FeatureGraph::new()
                    .exclude(ToneMapFeatures::TONEMAP_REINHARD, ToneMapFeatures::TONEMAP_ACES),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phong_taxonomy_enumerates_every_legal_combination() {
        let descriptor = PhongShader::descriptor();
        let sets = descriptor.graph.enumerate(descriptor.whitelist);
        // albedo 2 * normal/height 3 * specular 2 * emissive 2 * alpha 2 * shadows 5
        assert_eq!(sets.len(), 240);
        assert!(sets.iter().all(|s| {
            !s.contains(PhongFeatures::USE_HEIGHT_MAP) || s.contains(PhongFeatures::USE_NORMAL_MAP)
        }));
    }

    #[test]
    fn tonemap_operators_are_exclusive() {
        let descriptor = ToneMapShader::descriptor();
        let sets = descriptor.graph.enumerate(descriptor.whitelist);
        assert_eq!(sets.len(), 6);
        assert!(!sets.contains(&(ToneMapFeatures::TONEMAP_REINHARD | ToneMapFeatures::TONEMAP_ACES)));
    }

    #[test]
    fn tonemap_features_follow_settings() {
        let mut settings = ToneMappingSettings {
            mode: ToneMappingMode::Reinhard,
            gamma: 1.0,
            ..Default::default()
        };
        assert_eq!(ToneMapFeatures::from_settings(&settings), ToneMapFeatures::TONEMAP_REINHARD);

        settings.mode = ToneMappingMode::AcesFilmic;
        settings.gamma = 2.2;
        assert_eq!(
            ToneMapFeatures::from_settings(&settings),
            ToneMapFeatures::TONEMAP_ACES | ToneMapFeatures::GAMMA_CORRECT
        );
    }

    #[test]
    fn featureless_families_have_a_single_variant() {
        let descriptor = SkyboxShader::descriptor();
        assert_eq!(descriptor.graph.enumerate(descriptor.whitelist), vec![NoFeatures::empty()]);
    }
}
