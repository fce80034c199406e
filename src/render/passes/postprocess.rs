//! Postprocess Pass
//!
//! Tone maps the HDR scene color onto the presentation surface.

use std::sync::Arc;

use crate::device::{ClearOps, PipelineState, RenderTarget};
use crate::errors::Result;
use crate::render::pass::{PassFrame, PassSlot, PassState, PassStats, RenderPass, ResourceFlow};
use crate::resources::primitives::create_fullscreen_triangle;
use crate::resources::{Geometry, ResourceRegistry, Texture, names};
use crate::settings::ToneMappingSettings;
use crate::shader::families::POSTPROCESS_INPUT_UNIT;
use crate::shader::{ShaderLibrary, ShaderVariant, ToneMapFeatures, ToneMapShader};

/// The HDR scene color the pass resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PostprocessFlow {
    pub input: Texture,
}

impl ResourceFlow for PostprocessFlow {
    fn from_registry(registry: &ResourceRegistry) -> Result<Self> {
        Ok(Self {
            input: registry.get(names::MAIN_COLOR)?,
        })
    }
}

/// Nothing per frame: the operator is fixed by the settings the pass was
/// built with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PostprocessContext;

/// Tone maps the HDR color onto the presentation surface with one
/// full-screen triangle.
pub struct PostprocessPass {
    slot: PassSlot<PostprocessFlow, PostprocessContext>,
    variant: Arc<ShaderVariant>,
    settings: ToneMappingSettings,
    triangle: Geometry,
}

impl PostprocessPass {
    pub fn new(library: &ShaderLibrary, settings: &ToneMappingSettings) -> Result<Self> {
        let variant = library
            .get::<ToneMapShader>()?
            .get_variant(ToneMapFeatures::from_settings(settings))?;
        Ok(Self {
            slot: PassSlot::new("Postprocess Pass"),
            variant,
            settings: settings.clone(),
            triangle: Geometry::new("fullscreen_triangle", create_fullscreen_triangle()),
        })
    }

    /// Name of the tone-mapping variant in use.
    #[must_use]
    pub fn variant_name(&self) -> &str {
        self.variant.name()
    }
}

impl RenderPass for PostprocessPass {
    type Flow = PostprocessFlow;
    type Context = PostprocessContext;

    fn name(&self) -> &'static str {
        "Postprocess Pass"
    }

    fn state(&self) -> PassState {
        self.slot.state()
    }

    fn set_resource_flow(&mut self, flow: PostprocessFlow) {
        self.slot.set_flow(flow);
    }

    fn set_context(&mut self, context: PostprocessContext) -> Result<()> {
        self.slot.set_context(context)
    }

    fn execute(&mut self, frame: &mut PassFrame<'_>) -> Result<PassStats> {
        let (flow, _) = self.slot.begin()?;

        let program = self.variant.link(frame.device)?;
        let triangle = self.triangle.ensure_uploaded(frame.device)?;

        frame.device.bind_render_target(
            RenderTarget::Surface,
            ClearOps {
                color: Some([0.0, 0.0, 0.0, 1.0]),
                ..ClearOps::NONE
            },
        );
        frame.device.apply_pipeline_state(&PipelineState::fullscreen());
        frame.device.use_program(program);
        frame.device.bind_texture(POSTPROCESS_INPUT_UNIT, flow.input.id);
        frame
            .device
            .set_uniform(program, "u_exposure", &self.settings.exposure.into());
        frame
            .device
            .set_uniform(program, "u_gamma", &self.settings.gamma.into());
        frame.device.draw(program, triangle, 1);

        log::debug!("{}: resolved with '{}'", self.name(), self.variant.name());
        self.slot.finish();
        Ok(PassStats {
            draw_calls: 1,
            program_binds: 1,
            state_changes: 1,
        })
    }
}
