//! Materials
//!
//! A material couples a shader family with per-instance values and bound
//! textures. Its flag set is not stored: [`Material::variant`] derives it on
//! every call from the textures that are present, the instance options and the
//! frame-wide [`FrameFeatures`], so toggling a texture or the shadow settings
//! takes effect on the next draw.
//!
//! Material kinds form a closed enum; each kind maps to one built-in family.

use std::sync::Arc;

use glam::{Vec3, Vec4};
use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use super::texture::Texture;
use crate::device::{GraphicsDevice, PipelineState, ProgramId, TextureId};
use crate::errors::{LanternError, Result};
use crate::shader::families::{
    ALBEDO_MAP_UNIT, COLOR_MAP_UNIT, EMISSIVE_MAP_UNIT, HEIGHT_MAP_UNIT, NORMAL_MAP_UNIT,
    SPECULAR_MAP_UNIT,
};
use crate::shader::features::describe;
use crate::shader::{
    ParamValue, ParameterTable, PhongFeatures, PhongShader, ShaderDefinition, ShaderLibrary,
    ShaderVariant, UnlitFeatures, UnlitShader,
};

new_key_type! {
    pub struct MaterialHandle;
}

/// Uniforms set by the draw loop rather than by the material.
pub const MODEL_MATRIX_UNIFORM: &str = "u_model";
pub const NORMAL_MATRIX_UNIFORM: &str = "u_normal_matrix";

/// Texture-unit → texture list for one draw.
pub type TextureBindings = SmallVec<[(u32, TextureId); 8]>;

/// How a material is composited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Opaque,
    /// Alpha blended, sorted back to front, no depth write.
    Translucent,
}

/// Frame-wide switches that feed the material derivation rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FrameFeatures {
    /// A shadow map is rendered this frame.
    pub shadows: bool,
    /// More than one cascade is active.
    pub cascaded_shadows: bool,
    /// Filtered (PCF) shadow lookups.
    pub soft_shadows: bool,
}

// ─── Phong ────────────────────────────────────────────────────────────────────

/// Blinn-Phong surface.
#[derive(Debug, Clone)]
pub struct PhongMaterial {
    definition: Arc<ShaderDefinition<PhongFeatures>>,

    pub diffuse: Vec4,
    pub specular: Vec3,
    pub shininess: f32,
    pub emissive: Vec3,
    pub opacity: f32,
    pub normal_scale: f32,
    pub parallax_scale: f32,
    /// Enables alpha testing with this cutoff.
    pub alpha_cutoff: Option<f32>,
    pub receive_shadows: bool,

    pub albedo_map: Option<Texture>,
    pub normal_map: Option<Texture>,
    /// Only honored together with a normal map.
    pub height_map: Option<Texture>,
    pub specular_map: Option<Texture>,
    pub emissive_map: Option<Texture>,

    /// Extra uniform overrides applied after the fields above.
    pub overrides: ParameterTable,
}

impl PhongMaterial {
    #[must_use]
    pub fn new(definition: Arc<ShaderDefinition<PhongFeatures>>) -> Self {
        Self {
            definition,
            diffuse: Vec4::ONE,
            specular: Vec3::splat(0.5),
            shininess: 32.0,
            emissive: Vec3::ZERO,
            opacity: 1.0,
            normal_scale: 1.0,
            parallax_scale: 0.05,
            alpha_cutoff: None,
            receive_shadows: true,
            albedo_map: None,
            normal_map: None,
            height_map: None,
            specular_map: None,
            emissive_map: None,
            overrides: ParameterTable::new(),
        }
    }

    #[must_use]
    pub fn with_diffuse(mut self, diffuse: Vec4) -> Self {
        self.diffuse = diffuse;
        self
    }

    #[must_use]
    pub fn definition(&self) -> &Arc<ShaderDefinition<PhongFeatures>> {
        &self.definition
    }

    /// Current flag set, recomputed from present textures and `frame`.
    #[must_use]
    pub fn features(&self, frame: FrameFeatures) -> PhongFeatures {
        let mut features = PhongFeatures::empty();
        features.set(PhongFeatures::USE_ALBEDO_MAP, self.albedo_map.is_some());
        features.set(PhongFeatures::USE_NORMAL_MAP, self.normal_map.is_some());
        features.set(
            PhongFeatures::USE_HEIGHT_MAP,
            self.height_map.is_some() && self.normal_map.is_some(),
        );
        features.set(PhongFeatures::USE_SPECULAR_MAP, self.specular_map.is_some());
        features.set(PhongFeatures::USE_EMISSIVE_MAP, self.emissive_map.is_some());
        features.set(PhongFeatures::USE_ALPHA_TEST, self.alpha_cutoff.is_some());

        if self.receive_shadows && frame.shadows {
            features |= PhongFeatures::RECEIVE_SHADOWS;
            features.set(PhongFeatures::USE_CASCADED_SHADOWS, frame.cascaded_shadows);
            features.set(PhongFeatures::USE_PCF, frame.soft_shadows);
        }

        features
    }

    fn texture_bindings(&self, features: PhongFeatures) -> TextureBindings {
        let slots = [
            (PhongFeatures::USE_ALBEDO_MAP, ALBEDO_MAP_UNIT, self.albedo_map),
            (PhongFeatures::USE_NORMAL_MAP, NORMAL_MAP_UNIT, self.normal_map),
            (PhongFeatures::USE_HEIGHT_MAP, HEIGHT_MAP_UNIT, self.height_map),
            (PhongFeatures::USE_SPECULAR_MAP, SPECULAR_MAP_UNIT, self.specular_map),
            (PhongFeatures::USE_EMISSIVE_MAP, EMISSIVE_MAP_UNIT, self.emissive_map),
        ];
        slots
            .into_iter()
            .filter(|(feature, _, _)| features.contains(*feature))
            .filter_map(|(_, unit, texture)| texture.map(|t| (unit, t.id)))
            .collect()
    }

    fn instance_parameters(&self) -> ParameterTable {
        let mut table = ParameterTable::new()
            .with("u_diffuse", self.diffuse)
            .with("u_specular", self.specular)
            .with("u_shininess", self.shininess)
            .with("u_emissive", self.emissive)
            .with("u_opacity", self.opacity)
            .with("u_normal_scale", self.normal_scale)
            .with("u_parallax_scale", self.parallax_scale);
        if let Some(cutoff) = self.alpha_cutoff {
            table.insert("u_alpha_cutoff", cutoff);
        }
        table.merge(&self.overrides);
        table
    }
}

// ─── Unlit ────────────────────────────────────────────────────────────────────

/// Flat colored surface.
#[derive(Debug, Clone)]
pub struct UnlitMaterial {
    definition: Arc<ShaderDefinition<UnlitFeatures>>,

    pub color: Vec4,
    pub opacity: f32,
    pub alpha_cutoff: Option<f32>,
    pub color_map: Option<Texture>,
    pub overrides: ParameterTable,
}

impl UnlitMaterial {
    #[must_use]
    pub fn new(definition: Arc<ShaderDefinition<UnlitFeatures>>) -> Self {
        Self {
            definition,
            color: Vec4::ONE,
            opacity: 1.0,
            alpha_cutoff: None,
            color_map: None,
            overrides: ParameterTable::new(),
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn definition(&self) -> &Arc<ShaderDefinition<UnlitFeatures>> {
        &self.definition
    }

    #[must_use]
    pub fn features(&self) -> UnlitFeatures {
        let mut features = UnlitFeatures::empty();
        features.set(UnlitFeatures::USE_COLOR_MAP, self.color_map.is_some());
        features.set(UnlitFeatures::USE_ALPHA_TEST, self.alpha_cutoff.is_some());
        features
    }

    fn texture_bindings(&self, features: UnlitFeatures) -> TextureBindings {
        let mut bindings = TextureBindings::new();
        if features.contains(UnlitFeatures::USE_COLOR_MAP)
            && let Some(texture) = self.color_map
        {
            bindings.push((COLOR_MAP_UNIT, texture.id));
        }
        bindings
    }

    fn instance_parameters(&self) -> ParameterTable {
        let mut table = ParameterTable::new()
            .with("u_color", self.color)
            .with("u_opacity", self.opacity);
        if let Some(cutoff) = self.alpha_cutoff {
            table.insert("u_alpha_cutoff", cutoff);
        }
        table.merge(&self.overrides);
        table
    }
}

// ─── Material ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum MaterialKind {
    Phong(PhongMaterial),
    Unlit(UnlitMaterial),
}

#[derive(Debug, Clone)]
pub struct Material {
    pub kind: MaterialKind,
    pub blend: BlendMode,
    pub double_sided: bool,
}

impl Material {
    #[must_use]
    pub fn new(kind: MaterialKind) -> Self {
        Self {
            kind,
            blend: BlendMode::Opaque,
            double_sided: false,
        }
    }

    /// Default Phong material from the library's Phong family.
    pub fn phong(library: &ShaderLibrary) -> Result<Self> {
        Ok(Self::new(MaterialKind::Phong(PhongMaterial::new(
            library.get::<PhongShader>()?,
        ))))
    }

    /// Default unlit material from the library's unlit family.
    pub fn unlit(library: &ShaderLibrary) -> Result<Self> {
        Ok(Self::new(MaterialKind::Unlit(UnlitMaterial::new(
            library.get::<UnlitShader>()?,
        ))))
    }

    #[must_use]
    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    #[must_use]
    pub fn with_double_sided(mut self, double_sided: bool) -> Self {
        self.double_sided = double_sided;
        self
    }

    #[must_use]
    pub fn is_translucent(&self) -> bool {
        self.blend == BlendMode::Translucent
    }

    /// Name of the shader family backing this material.
    #[must_use]
    pub fn shader_name(&self) -> &str {
        match &self.kind {
            MaterialKind::Phong(m) => m.definition.name(),
            MaterialKind::Unlit(m) => m.definition.name(),
        }
    }

    /// Human readable current flag set.
    #[must_use]
    pub fn describe_features(&self, frame: FrameFeatures) -> String {
        match &self.kind {
            MaterialKind::Phong(m) => describe(m.features(frame)),
            MaterialKind::Unlit(m) => describe(m.features()),
        }
    }

    /// Resolves the variant for the current flag set.
    pub fn variant(&self, frame: FrameFeatures) -> Result<Arc<ShaderVariant>> {
        match &self.kind {
            MaterialKind::Phong(m) => m.definition.get_variant(m.features(frame)),
            MaterialKind::Unlit(m) => m.definition.get_variant(m.features()),
        }
    }

    /// Textures the current variant samples, by unit.
    #[must_use]
    pub fn texture_bindings(&self, frame: FrameFeatures) -> TextureBindings {
        match &self.kind {
            MaterialKind::Phong(m) => m.texture_bindings(m.features(frame)),
            MaterialKind::Unlit(m) => m.texture_bindings(m.features()),
        }
    }

    /// Pipeline state preset for this material.
    #[must_use]
    pub fn pipeline_state(&self) -> PipelineState {
        let state = match self.blend {
            BlendMode::Opaque => PipelineState::opaque(),
            BlendMode::Translucent => PipelineState::translucent(),
        };
        if self.double_sided {
            state.double_sided()
        } else {
            state
        }
    }

    /// Per-instance values keyed by uniform name.
    #[must_use]
    pub fn instance_parameters(&self) -> ParameterTable {
        match &self.kind {
            MaterialKind::Phong(m) => m.instance_parameters(),
            MaterialKind::Unlit(m) => m.instance_parameters(),
        }
    }

    /// Pushes every parameter of `variant` except the transform uniforms.
    /// Instance values win over the variant's defaults.
    pub fn push_parameters(
        &self,
        device: &mut dyn GraphicsDevice,
        program: ProgramId,
        variant: &ShaderVariant,
    ) {
        let instance = self.instance_parameters();
        for (name, default) in variant.parameters().iter() {
            if name == MODEL_MATRIX_UNIFORM || name == NORMAL_MATRIX_UNIFORM {
                continue;
            }
            let value: &ParamValue = instance.get(name).unwrap_or(default);
            device.set_uniform(program, name, value);
        }
    }
}

// ─── Store ────────────────────────────────────────────────────────────────────

/// Handle-addressed material storage.
#[derive(Debug, Default)]
pub struct MaterialStore {
    materials: SlotMap<MaterialHandle, Material>,
}

impl MaterialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, material: Material) -> MaterialHandle {
        self.materials.insert(material)
    }

    #[must_use]
    pub fn get(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(handle)
    }

    pub fn get_mut(&mut self, handle: MaterialHandle) -> Option<&mut Material> {
        self.materials.get_mut(handle)
    }

    /// Like [`get`](Self::get), but a dead handle is an error.
    pub fn resolve(&self, handle: MaterialHandle) -> Result<&Material> {
        self.materials
            .get(handle)
            .ok_or_else(|| LanternError::InvalidHandle {
                kind: "material",
                handle: format!("{handle:?}"),
            })
    }

    pub fn remove(&mut self, handle: MaterialHandle) -> Option<Material> {
        self.materials.remove(handle)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{HeadlessDevice, TextureKind};

    fn texture(id: u64) -> Texture {
        Texture {
            id: TextureId(id),
            width: 4,
            height: 4,
            kind: TextureKind::D2 { layers: 1 },
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }

    fn phong() -> PhongMaterial {
        let library = ShaderLibrary::embedded();
        PhongMaterial::new(library.get::<PhongShader>().unwrap())
    }

    #[test]
    fn features_follow_present_textures() {
        let mut material = phong();
        assert_eq!(material.features(FrameFeatures::default()), PhongFeatures::empty());

        material.albedo_map = Some(texture(1));
        material.height_map = Some(texture(2));
        // Height without a normal map is not a legal combination.
        assert_eq!(
            material.features(FrameFeatures::default()),
            PhongFeatures::USE_ALBEDO_MAP
        );

        material.normal_map = Some(texture(3));
        assert_eq!(
            material.features(FrameFeatures::default()),
            PhongFeatures::USE_ALBEDO_MAP
                | PhongFeatures::USE_NORMAL_MAP
                | PhongFeatures::USE_HEIGHT_MAP
        );
    }

    #[test]
    fn shadow_features_follow_the_frame() {
        let mut material = phong();
        let frame = FrameFeatures {
            shadows: true,
            cascaded_shadows: true,
            soft_shadows: false,
        };
        assert_eq!(
            material.features(frame),
            PhongFeatures::RECEIVE_SHADOWS | PhongFeatures::USE_CASCADED_SHADOWS
        );

        material.receive_shadows = false;
        assert_eq!(material.features(frame), PhongFeatures::empty());
    }

    #[test]
    fn describes_the_derived_flag_set() {
        let mut phong = phong();
        phong.albedo_map = Some(texture(1));
        let material = Material::new(MaterialKind::Phong(phong));
        let frame = FrameFeatures {
            shadows: true,
            cascaded_shadows: false,
            soft_shadows: false,
        };
        assert_eq!(
            material.describe_features(frame),
            "USE_ALBEDO_MAP|RECEIVE_SHADOWS"
        );
        assert_eq!(
            Material::unlit(&ShaderLibrary::embedded())
                .unwrap()
                .describe_features(frame),
            "<none>"
        );
    }

    #[test]
    fn bindings_only_cover_active_features() {
        let mut material = phong();
        material.albedo_map = Some(texture(10));
        material.height_map = Some(texture(11));
        let bindings = Material::new(MaterialKind::Phong(material))
            .texture_bindings(FrameFeatures::default());
        assert_eq!(bindings.as_slice(), &[(ALBEDO_MAP_UNIT, TextureId(10))]);
    }

    #[test]
    fn instance_values_override_variant_defaults() {
        let mut inner = phong();
        inner.shininess = 8.0;
        let material = Material::new(MaterialKind::Phong(inner));
        let variant = material.variant(FrameFeatures::default()).unwrap();

        let mut device = HeadlessDevice::new();
        let program = variant.link(&mut device).unwrap();
        material.push_parameters(&mut device, program, &variant);

        let shininess = device.commands().iter().find_map(|cmd| match cmd {
            crate::device::DeviceCommand::SetUniform { name, value, .. } if name == "u_shininess" => {
                Some(*value)
            }
            _ => None,
        });
        assert_eq!(shininess, Some(ParamValue::Float(8.0)));
        assert!(!device.commands().iter().any(|cmd| matches!(
            cmd,
            crate::device::DeviceCommand::SetUniform { name, .. } if name == MODEL_MATRIX_UNIFORM
        )));
    }

    #[test]
    fn translucent_double_sided_state() {
        let library = ShaderLibrary::embedded();
        let material = Material::unlit(&library)
            .unwrap()
            .with_blend(BlendMode::Translucent)
            .with_double_sided(true);
        let state = material.pipeline_state();
        assert!(state.blend.is_some());
        assert!(state.cull_mode.is_none());
        assert!(material.is_translucent());
    }
}
