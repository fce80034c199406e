//! Shadow Pass
//!
//! Depth-only rendering of shadow casters into the layered cascade map.

use std::sync::Arc;

use crate::device::{ClearOps, PipelineState, RenderTarget};
use crate::errors::Result;
use crate::render::pass::{PassFrame, PassSlot, PassState, PassStats, RenderPass, ResourceFlow};
use crate::render::swap::{FrameSwapData, ShadowCaster};
use crate::render::uniforms::SHADOW_BLOCK;
use crate::resources::material::MODEL_MATRIX_UNIFORM;
use crate::resources::{Buffer, Framebuffer, ResourceRegistry, Texture, names};
use crate::shader::{NoFeatures, ShaderLibrary, ShaderVariant, ShadowDepthShader};

/// Shadow pass resources: the layered depth map and its render target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShadowFlow {
    pub target: Framebuffer,
    pub shadow_map: Texture,
    pub shadow_block: Buffer,
}

impl ResourceFlow for ShadowFlow {
    fn from_registry(registry: &ResourceRegistry) -> Result<Self> {
        Ok(Self {
            target: registry.get(names::SHADOW_TARGET)?,
            shadow_map: registry.get(names::SHADOW_MAP)?,
            shadow_block: registry.get(names::SHADOW_BLOCK)?,
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShadowContext {
    pub casters: Vec<ShadowCaster>,
    pub cascade_count: u32,
}

impl ShadowContext {
    #[must_use]
    pub fn from_swap(swap: &FrameSwapData) -> Self {
        swap.shadow.as_ref().map_or_else(Self::default, |shadow| Self {
            casters: shadow.casters.clone(),
            cascade_count: shadow.cascade_count,
        })
    }
}

/// Renders every shadow caster into the cascade layers of the shadow map.
///
/// The target is always cleared so receivers never sample stale depth. Each
/// caster is drawn once with one instance per cascade; the geometry stage
/// routes instance `i` to layer `i`.
pub struct ShadowPass {
    slot: PassSlot<ShadowFlow, ShadowContext>,
    variant: Arc<ShaderVariant>,
}

impl ShadowPass {
    pub fn new(library: &ShaderLibrary) -> Result<Self> {
        let variant = library
            .get::<ShadowDepthShader>()?
            .get_variant(NoFeatures::empty())?;
        Ok(Self {
            slot: PassSlot::new("Shadow Pass"),
            variant,
        })
    }
}

impl RenderPass for ShadowPass {
    type Flow = ShadowFlow;
    type Context = ShadowContext;

    fn name(&self) -> &'static str {
        "Shadow Pass"
    }

    fn state(&self) -> PassState {
        self.slot.state()
    }

    fn set_resource_flow(&mut self, flow: ShadowFlow) {
        self.slot.set_flow(flow);
    }

    fn set_context(&mut self, context: ShadowContext) -> Result<()> {
        self.slot.set_context(context)
    }

    fn execute(&mut self, frame: &mut PassFrame<'_>) -> Result<PassStats> {
        let (flow, context) = self.slot.begin()?;
        let mut stats = PassStats::default();

        let mut geometries = Vec::with_capacity(context.casters.len());
        for caster in &context.casters {
            geometries.push(frame.geometries.ensure_uploaded(caster.geometry, frame.device)?);
        }

        frame
            .device
            .bind_render_target(RenderTarget::Offscreen(flow.target.id), ClearOps::depth_only(1.0));

        if !context.casters.is_empty() {
            let program = self.variant.link(frame.device)?;
            frame.device.apply_pipeline_state(&PipelineState::shadow_caster());
            frame.device.use_program(program);
            frame
                .device
                .bind_parameter_block(program, SHADOW_BLOCK, flow.shadow_block.id);
            stats.state_changes += 1;
            stats.program_binds += 1;

            let instances = context.cascade_count.max(1);
            for (caster, &geometry) in context.casters.iter().zip(&geometries) {
                frame
                    .device
                    .set_uniform(program, MODEL_MATRIX_UNIFORM, &caster.model.into());
                frame.device.draw(program, geometry, instances);
                stats.draw_calls += 1;
            }
        }

        log::debug!(
            "{}: {} casters x {} cascades",
            self.name(),
            stats.draw_calls,
            context.cascade_count
        );
        self.slot.finish();
        Ok(stats)
    }
}
