//! Render Pipeline Orchestrator
//!
//! Drives the fixed forward frame:
//!
//! ```text
//! update_render_resource ─▶ update_ubo ─▶ update_render_pass ─▶ execute ─▶ present
//!   (attachments)            (param blocks)  (flows + contexts)   Shadow → Main → Postprocess
//! ```
//!
//! The pipeline owns the [`ResourceRegistry`]. Attachments are (re)created
//! here and inserted under the well-known [`names`]; passes only read the
//! registry when their flows are rebuilt, so a resize is visible to every pass
//! on the frame it happens. Any error aborts the frame before presentation.

use crate::device::{GraphicsDevice, SamplerDescriptor, TextureDescriptor, TextureKind};
use crate::errors::Result;
use crate::resources::{
    Buffer, FrameFeatures, Framebuffer, GeometryStore, MaterialStore, ResourceRegistry, Texture,
    names,
};
use crate::settings::{RendererSettings, SHADOW_TEXTURE_FORMAT, ShadowSettings};
use crate::shader::{PhongShader, ShaderLibrary, UnlitShader};

use super::pass::{PassFrame, PassStats, RenderPass, ResourceFlow};
use super::passes::{
    MainContext, MainFlow, MainPass, PostprocessContext, PostprocessFlow, PostprocessPass,
    ShadowContext, ShadowFlow, ShadowPass,
};
use super::swap::FrameSwapData;
use super::uniforms::{CameraBlock, LightsBlock, ShadowBlock};

/// Per-pass work of the last executed frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame_index: u64,
    pub shadow: PassStats,
    pub main: PassStats,
    pub postprocess: PassStats,
}

impl FrameStats {
    #[must_use]
    pub fn total(&self) -> PassStats {
        let mut total = self.shadow;
        total += self.main;
        total += self.postprocess;
        total
    }
}

/// Shadow map shape: (edge size, layers).
type ShadowLayout = (u32, u32);

pub struct RenderPipeline {
    settings: RendererSettings,
    registry: ResourceRegistry,

    shadow_pass: ShadowPass,
    main_pass: MainPass,
    postprocess_pass: PostprocessPass,

    surface_size: (u32, u32),
    attachment_size: Option<(u32, u32)>,
    shadow_layout: Option<ShadowLayout>,

    frame_count: u64,
    last_stats: FrameStats,
}

impl RenderPipeline {
    /// Builds the passes and parameter blocks. Attachments are allocated on
    /// the first [`update_render_resource`](Self::update_render_resource).
    pub fn new(
        device: &mut dyn GraphicsDevice,
        library: &ShaderLibrary,
        settings: RendererSettings,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let shadow_pass = ShadowPass::new(library)?;
        let main_pass = MainPass::new(library)?;
        let postprocess_pass = PostprocessPass::new(library, &settings.tone_mapping)?;

        let mut registry = ResourceRegistry::new();
        registry.add(
            names::CAMERA_BLOCK,
            Buffer::create(device, "CameraBlock", size_of::<CameraBlock>())?,
        );
        registry.add(
            names::LIGHTS_BLOCK,
            Buffer::create(device, "LightsBlock", size_of::<LightsBlock>())?,
        );
        registry.add(
            names::SHADOW_BLOCK,
            Buffer::create(device, "ShadowBlock", size_of::<ShadowBlock>())?,
        );

        if settings.prebuild_variants {
            library.get::<PhongShader>()?;
            library.get::<UnlitShader>()?;
            let generated = library.generate_all_variants()?;
            let linked = library.link_all_variants(device)?;
            log::info!("Prebuilt {generated} shader variants ({linked} newly linked)");
        }

        log::info!(
            "Render pipeline created: {width}x{height}, {} cascade(s), tone mapping '{}'",
            settings.shadow.effective_cascades(),
            postprocess_pass.variant_name()
        );

        Ok(Self {
            settings,
            registry,
            shadow_pass,
            main_pass,
            postprocess_pass,
            surface_size: (width.max(1), height.max(1)),
            attachment_size: None,
            shadow_layout: None,
            frame_count: 0,
            last_stats: FrameStats::default(),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    #[must_use]
    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    #[must_use]
    pub fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    #[must_use]
    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Records a new surface size; attachments follow on the next frame.
    pub fn resize(&mut self, width: u32, height: u32) {
        let size = (width.max(1), height.max(1));
        if size != self.surface_size {
            log::debug!("Surface resized to {}x{}", size.0, size.1);
            self.surface_size = size;
        }
    }

    /// Replaces the shadow settings; the map is reallocated on the next frame
    /// if its size or cascade count changed.
    pub fn set_shadow_settings(&mut self, shadow: ShadowSettings) {
        self.settings.shadow = shadow;
    }

    /// Material derivation switches for the frame in `swap`.
    #[must_use]
    pub fn frame_features(&self, swap: &FrameSwapData) -> FrameFeatures {
        let shadow = &self.settings.shadow;
        match &swap.shadow {
            Some(data) => FrameFeatures {
                shadows: true,
                cascaded_shadows: data.cascade_count > 1,
                soft_shadows: shadow.soft_shadows && shadow.pcf_kernel > 1,
            },
            None => FrameFeatures::default(),
        }
    }

    // ========================================================================
    // Frame Steps
    // ========================================================================

    /// Step 1: (re)creates attachments whose shape no longer matches the
    /// surface size or the shadow settings. Returns `true` if anything was
    /// reallocated.
    pub fn update_render_resource(&mut self, device: &mut dyn GraphicsDevice) -> Result<bool> {
        let mut changed = false;

        if self.attachment_size != Some(self.surface_size) {
            self.recreate_main_attachments(device)?;
            changed = true;
        }

        let layout = self.wanted_shadow_layout();
        if self.shadow_layout != Some(layout) {
            self.recreate_shadow_map(device, layout)?;
            changed = true;
        }

        Ok(changed)
    }

    /// Step 2: copies camera, lights and shadow data into the parameter
    /// blocks.
    pub fn update_ubo(&self, device: &mut dyn GraphicsDevice, swap: &FrameSwapData) -> Result<()> {
        let camera: Buffer = self.registry.get(names::CAMERA_BLOCK)?;
        let lights: Buffer = self.registry.get(names::LIGHTS_BLOCK)?;
        let shadow: Buffer = self.registry.get(names::SHADOW_BLOCK)?;

        camera.write(device, &CameraBlock::from_swap(swap));
        lights.write(device, &LightsBlock::from_swap(swap));
        shadow.write(device, &ShadowBlock::from_swap(swap, &self.settings.shadow));
        Ok(())
    }

    /// Step 3: rebuilds every flow from the registry and every context from
    /// the swap data.
    pub fn update_render_pass(&mut self, swap: &FrameSwapData) -> Result<()> {
        self.shadow_pass
            .set_resource_flow(ShadowFlow::from_registry(&self.registry)?);
        self.shadow_pass.set_context(ShadowContext::from_swap(swap))?;

        self.main_pass
            .set_resource_flow(MainFlow::from_registry(&self.registry)?);
        self.main_pass
            .set_context(MainContext::from_swap(swap, self.settings.clear_color))?;

        self.postprocess_pass
            .set_resource_flow(PostprocessFlow::from_registry(&self.registry)?);
        self.postprocess_pass.set_context(PostprocessContext)?;
        Ok(())
    }

    /// Step 4: Shadow → Main → Postprocess.
    pub fn execute(&mut self, frame: &mut PassFrame<'_>) -> Result<FrameStats> {
        let shadow = self.shadow_pass.execute(frame)?;
        let main = self.main_pass.execute(frame)?;
        let postprocess = self.postprocess_pass.execute(frame)?;

        self.frame_count += 1;
        self.last_stats = FrameStats {
            frame_index: self.frame_count,
            shadow,
            main,
            postprocess,
        };
        Ok(self.last_stats)
    }

    /// Runs all four steps and presents.
    pub fn render_frame(
        &mut self,
        device: &mut dyn GraphicsDevice,
        materials: &MaterialStore,
        geometries: &mut GeometryStore,
        swap: &FrameSwapData,
    ) -> Result<FrameStats> {
        self.update_render_resource(device)?;
        self.update_ubo(device, swap)?;
        self.update_render_pass(swap)?;

        let features = self.frame_features(swap);
        check_draw_handles(swap, materials, geometries, features)?;
        let stats = {
            let mut frame = PassFrame {
                device: &mut *device,
                materials,
                geometries,
                features,
            };
            self.execute(&mut frame)?
        };
        device.present();

        let total = stats.total();
        log::trace!(
            "Frame {}: {} draws, {} program binds",
            stats.frame_index,
            total.draw_calls,
            total.program_binds
        );
        Ok(stats)
    }

    // ========================================================================
    // Attachments
    // ========================================================================

    fn wanted_shadow_layout(&self) -> ShadowLayout {
        let shadow = &self.settings.shadow;
        if shadow.enabled {
            (shadow.map_size.max(1), shadow.effective_cascades())
        } else {
            // Placeholder so the main pass always has a map to bind.
            (1, 1)
        }
    }

    fn recreate_main_attachments(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        if let Ok(target) = self.registry.get::<Framebuffer>(names::MAIN_TARGET) {
            target.destroy(device);
        }
        for name in [names::MAIN_COLOR, names::MAIN_DEPTH] {
            if let Ok(texture) = self.registry.get::<Texture>(name) {
                texture.destroy(device);
            }
        }

        let (width, height) = self.surface_size;
        let color = Texture::create(
            device,
            &TextureDescriptor {
                label: names::MAIN_COLOR.to_string(),
                width,
                height,
                kind: TextureKind::D2 { layers: 1 },
                format: self.settings.color_format,
                sampler: SamplerDescriptor::LINEAR_CLAMP,
            },
        )?;
        let depth = Texture::create(
            device,
            &TextureDescriptor {
                label: names::MAIN_DEPTH.to_string(),
                width,
                height,
                kind: TextureKind::D2 { layers: 1 },
                format: self.settings.depth_format,
                sampler: SamplerDescriptor::NEAREST_CLAMP,
            },
        )?;
        let target = Framebuffer::create(device, names::MAIN_TARGET, Some(&color), Some(&depth))?;

        self.registry.add(names::MAIN_COLOR, color);
        self.registry.add(names::MAIN_DEPTH, depth);
        self.registry.add(names::MAIN_TARGET, target);
        self.attachment_size = Some(self.surface_size);

        log::info!("Allocated main attachments {width}x{height}");
        Ok(())
    }

    fn recreate_shadow_map(
        &mut self,
        device: &mut dyn GraphicsDevice,
        (size, layers): ShadowLayout,
    ) -> Result<()> {
        if let Ok(target) = self.registry.get::<Framebuffer>(names::SHADOW_TARGET) {
            target.destroy(device);
        }
        if let Ok(texture) = self.registry.get::<Texture>(names::SHADOW_MAP) {
            texture.destroy(device);
        }

        let shadow_map = Texture::create(
            device,
            &TextureDescriptor {
                label: names::SHADOW_MAP.to_string(),
                width: size,
                height: size,
                kind: TextureKind::D2 { layers },
                format: SHADOW_TEXTURE_FORMAT,
                sampler: SamplerDescriptor::SHADOW,
            },
        )?;
        let target = Framebuffer::create(device, names::SHADOW_TARGET, None, Some(&shadow_map))?;

        self.registry.add(names::SHADOW_MAP, shadow_map);
        self.registry.add(names::SHADOW_TARGET, target);
        self.shadow_layout = Some((size, layers));

        log::info!("Allocated shadow map {size}x{size} with {layers} layer(s)");
        Ok(())
    }
}

/// Fails on any dead handle or illegal variant in the draw list, so a bad
/// entry aborts the frame before any pass submits work.
fn check_draw_handles(
    swap: &FrameSwapData,
    materials: &MaterialStore,
    geometries: &GeometryStore,
    features: FrameFeatures,
) -> Result<()> {
    for entry in &swap.draws {
        materials.resolve(entry.material)?.variant(features)?;
        geometries.resolve(entry.geometry)?;
    }
    if let Some(shadow) = &swap.shadow {
        for caster in &shadow.casters {
            geometries.resolve(caster.geometry)?;
        }
    }
    Ok(())
}
