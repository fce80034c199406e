//! Renderer Settings
//!
//! Configuration consumed once when the [`RenderPipeline`](crate::render::RenderPipeline)
//! is created. Settings can be built in code or loaded from JSON; every field
//! has a default so partial files are accepted.
//!
//! ```rust,ignore
//! use lantern::settings::{RendererSettings, ToneMappingMode};
//!
//! let mut settings = RendererSettings::from_json_str(r#"{ "shadow": { "map_size": 4096 } }"#)?;
//! settings.tone_mapping.mode = ToneMappingMode::Reinhard;
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::render::shadow_utils::MAX_CASCADES;

/// Default HDR color attachment format.
pub const HDR_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Default depth attachment format.
pub const DEPTH_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;
/// Shadow map format.
pub const SHADOW_TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// ---------------------------------------------------------------------------
// ShadowSettings
// ---------------------------------------------------------------------------

/// Directional shadow configuration.
///
/// This is the single canonical table of shadow defaults. Materials and
/// passes read from it instead of carrying their own copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowSettings {
    /// Master switch. When off, the shadow pass still clears its target but
    /// materials never receive the shadow features.
    pub enabled: bool,
    /// Edge length of each cascade layer in texels.
    pub map_size: u32,
    /// Number of cascades, clamped to `1..=MAX_CASCADES`.
    pub cascade_count: u32,
    /// Blend between uniform (0.0) and logarithmic (1.0) splits.
    pub cascade_split_lambda: f32,
    /// Shadows are not rendered beyond this view distance.
    pub max_distance: f32,
    pub bias: f32,
    pub normal_bias: f32,
    /// PCF kernel edge (1 = hard, 3 = 3x3 taps, ...).
    pub pcf_kernel: u32,
    /// Enables the PCF shader feature on materials that receive shadows.
    pub soft_shadows: bool,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            map_size: 2048,
            cascade_count: 4,
            cascade_split_lambda: 0.75,
            max_distance: 100.0,
            bias: 0.005,
            normal_bias: 0.02,
            pcf_kernel: 3,
            soft_shadows: true,
        }
    }
}

impl ShadowSettings {
    /// Cascade count clamped to the supported range.
    #[inline]
    #[must_use]
    pub fn effective_cascades(&self) -> u32 {
        self.cascade_count.clamp(1, MAX_CASCADES)
    }
}

// ---------------------------------------------------------------------------
// ToneMappingSettings
// ---------------------------------------------------------------------------

/// Tone mapping operator applied by the postprocess pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneMappingMode {
    Linear,
    Reinhard,
    #[default]
    AcesFilmic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneMappingSettings {
    pub mode: ToneMappingMode,
    pub exposure: f32,
    /// Output gamma. `1.0` disables gamma correction.
    pub gamma: f32,
}

impl Default for ToneMappingSettings {
    fn default() -> Self {
        Self {
            mode: ToneMappingMode::default(),
            exposure: 1.0,
            gamma: 2.2,
        }
    }
}

// ---------------------------------------------------------------------------
// RendererSettings
// ---------------------------------------------------------------------------

/// Global configuration for the forward pipeline.
///
/// | Field               | Description                                  | Default               |
/// |---------------------|----------------------------------------------|-----------------------|
/// | `clear_color`       | Main color target clear value                | Black (0,0,0,1)       |
/// | `ambient`           | Ambient light written to the lights block    | (0.03, 0.03, 0.03)    |
/// | `color_format`      | HDR scene color format                       | `Rgba16Float`         |
/// | `depth_format`      | Scene depth format                           | `Depth24PlusStencil8` |
/// | `shadow`            | Shadow configuration                         | see [`ShadowSettings`]|
/// | `tone_mapping`      | Postprocess configuration                    | ACES, exposure 1      |
/// | `prebuild_variants` | Build and link every variant at startup      | `false`               |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    pub clear_color: [f32; 4],
    pub ambient: [f32; 3],
    #[serde(skip, default = "default_color_format")]
    pub color_format: wgpu::TextureFormat,
    #[serde(skip, default = "default_depth_format")]
    pub depth_format: wgpu::TextureFormat,
    pub shadow: ShadowSettings,
    pub tone_mapping: ToneMappingSettings,
    pub prebuild_variants: bool,
}

fn default_color_format() -> wgpu::TextureFormat {
    HDR_TEXTURE_FORMAT
}

fn default_depth_format() -> wgpu::TextureFormat {
    DEPTH_TEXTURE_FORMAT
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            ambient: [0.03, 0.03, 0.03],
            color_format: HDR_TEXTURE_FORMAT,
            depth_format: DEPTH_TEXTURE_FORMAT,
            shadow: ShadowSettings::default(),
            tone_mapping: ToneMappingSettings::default(),
            prebuild_variants: false,
        }
    }
}

impl RendererSettings {
    /// Parses settings from a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads settings from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let settings = Self::from_json_str(&text)?;
        log::info!("Loaded renderer settings from {}", path.display());
        Ok(settings)
    }

    /// Serializes the settings back to pretty JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
