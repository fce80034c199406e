//! Main Pass
//!
//! Forward-lit rendering of the extracted draw list into the HDR target,
//! sampling the cascaded shadow map.

use std::sync::Arc;

use crate::device::{ClearOps, GeometryId, PipelineState, ProgramId, RenderTarget};
use crate::errors::Result;
use crate::render::pass::{PassFrame, PassSlot, PassState, PassStats, RenderPass, ResourceFlow};
use crate::render::swap::{DrawEntry, FrameSwapData};
use crate::render::uniforms::{CAMERA_BLOCK, LIGHTS_BLOCK, SHADOW_BLOCK};
use crate::resources::material::{MODEL_MATRIX_UNIFORM, NORMAL_MATRIX_UNIFORM};
use crate::resources::primitives::create_skybox_cube;
use crate::resources::{Buffer, Framebuffer, Geometry, ResourceRegistry, Texture, names};
use crate::shader::families::SKYBOX_UNIT;
use crate::shader::{NoFeatures, SHADOW_MAP_UNIT, ShaderLibrary, ShaderVariant, SkyboxShader};

/// Main pass resources: HDR color + depth output, shadow map input and the
/// three parameter blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MainFlow {
    pub target: Framebuffer,
    pub color: Texture,
    pub depth: Texture,
    pub shadow_map: Texture,
    pub camera_block: Buffer,
    pub lights_block: Buffer,
    pub shadow_block: Buffer,
}

impl ResourceFlow for MainFlow {
    fn from_registry(registry: &ResourceRegistry) -> Result<Self> {
        Ok(Self {
            target: registry.get(names::MAIN_TARGET)?,
            color: registry.get(names::MAIN_COLOR)?,
            depth: registry.get(names::MAIN_DEPTH)?,
            shadow_map: registry.get(names::SHADOW_MAP)?,
            camera_block: registry.get(names::CAMERA_BLOCK)?,
            lights_block: registry.get(names::LIGHTS_BLOCK)?,
            shadow_block: registry.get(names::SHADOW_BLOCK)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MainContext {
    pub clear_color: [f32; 4],
    pub skybox: Option<Texture>,
    pub draws: Vec<DrawEntry>,
}

impl MainContext {
    #[must_use]
    pub fn from_swap(swap: &FrameSwapData, clear_color: [f32; 4]) -> Self {
        Self {
            clear_color,
            skybox: swap.skybox,
            draws: swap.draws.clone(),
        }
    }
}

/// Forward-lit scene rendering into the HDR target.
///
/// Order: clear, optional skybox, opaque entries in submission order, then
/// translucent entries back to front. Program and pipeline-state binds are
/// skipped when unchanged from the previous draw.
pub struct MainPass {
    slot: PassSlot<MainFlow, MainContext>,
    skybox_variant: Arc<ShaderVariant>,
    skybox_cube: Geometry,
    order: Vec<usize>,
}

impl MainPass {
    pub fn new(library: &ShaderLibrary) -> Result<Self> {
        let skybox_variant = library.get::<SkyboxShader>()?.get_variant(NoFeatures::empty())?;
        Ok(Self {
            slot: PassSlot::new("Main Pass"),
            skybox_variant,
            skybox_cube: Geometry::new("skybox_cube", create_skybox_cube()),
            order: Vec::new(),
        })
    }
}

/// A draw entry with its handles already resolved against the device.
struct PreparedDraw {
    variant: Arc<ShaderVariant>,
    program: ProgramId,
    geometry: GeometryId,
}

/// Opaque indices first (stable), then translucent by descending distance.
fn sort_draws(draws: &[DrawEntry], translucent: &[bool], order: &mut Vec<usize>) {
    order.clear();
    order.extend((0..draws.len()).filter(|&i| !translucent[i]));
    let opaque = order.len();
    order.extend((0..draws.len()).filter(|&i| translucent[i]));
    order[opaque..].sort_by(|&a, &b| draws[b].distance_sq.total_cmp(&draws[a].distance_sq));
}

impl RenderPass for MainPass {
    type Flow = MainFlow;
    type Context = MainContext;

    fn name(&self) -> &'static str {
        "Main Pass"
    }

    fn state(&self) -> PassState {
        self.slot.state()
    }

    fn set_resource_flow(&mut self, flow: MainFlow) {
        self.slot.set_flow(flow);
    }

    fn set_context(&mut self, context: MainContext) -> Result<()> {
        self.slot.set_context(context)
    }

    fn execute(&mut self, frame: &mut PassFrame<'_>) -> Result<PassStats> {
        let (flow, context) = self.slot.begin()?;
        let mut stats = PassStats::default();

        // Resolve every handle, variant and program before the first draw.
        let mut prepared = Vec::with_capacity(context.draws.len());
        let mut translucent = Vec::with_capacity(context.draws.len());
        for entry in &context.draws {
            let material = frame.materials.resolve(entry.material)?;
            let variant = material.variant(frame.features)?;
            let program = variant.link(frame.device)?;
            let geometry = frame.geometries.ensure_uploaded(entry.geometry, frame.device)?;
            translucent.push(material.is_translucent());
            prepared.push(PreparedDraw {
                variant,
                program,
                geometry,
            });
        }

        frame.device.bind_render_target(
            RenderTarget::Offscreen(flow.target.id),
            ClearOps::color_depth(context.clear_color, 1.0),
        );

        if let Some(skybox) = context.skybox {
            let program = self.skybox_variant.link(frame.device)?;
            let cube = self.skybox_cube.ensure_uploaded(frame.device)?;
            frame.device.apply_pipeline_state(&PipelineState::skybox());
            frame.device.use_program(program);
            frame
                .device
                .bind_parameter_block(program, CAMERA_BLOCK, flow.camera_block.id);
            frame.device.bind_texture(SKYBOX_UNIT, skybox.id);
            frame.device.draw(program, cube, 1);
            stats.state_changes += 1;
            stats.program_binds += 1;
            stats.draw_calls += 1;
        }

        frame.device.bind_texture(SHADOW_MAP_UNIT, flow.shadow_map.id);

        sort_draws(&context.draws, &translucent, &mut self.order);

        let mut current_program: Option<ProgramId> = None;
        let mut current_state: Option<PipelineState> = None;

        for &index in &self.order {
            let entry = &context.draws[index];
            let PreparedDraw {
                variant,
                program,
                geometry,
            } = &prepared[index];
            let program = *program;
            let material = frame.materials.resolve(entry.material)?;

            if current_program != Some(program) {
                frame.device.use_program(program);
                frame
                    .device
                    .bind_parameter_block(program, CAMERA_BLOCK, flow.camera_block.id);
                frame
                    .device
                    .bind_parameter_block(program, LIGHTS_BLOCK, flow.lights_block.id);
                frame
                    .device
                    .bind_parameter_block(program, SHADOW_BLOCK, flow.shadow_block.id);
                current_program = Some(program);
                stats.program_binds += 1;
            }

            let state = material.pipeline_state();
            if current_state.as_ref() != Some(&state) {
                frame.device.apply_pipeline_state(&state);
                current_state = Some(state);
                stats.state_changes += 1;
            }

            for (unit, texture) in material.texture_bindings(frame.features) {
                frame.device.bind_texture(unit, texture);
            }

            let normal_matrix = entry.model.inverse().transpose();
            frame
                .device
                .set_uniform(program, MODEL_MATRIX_UNIFORM, &entry.model.into());
            frame
                .device
                .set_uniform(program, NORMAL_MATRIX_UNIFORM, &normal_matrix.into());
            material.push_parameters(frame.device, program, variant);

            frame.device.draw(program, *geometry, 1);
            stats.draw_calls += 1;

            log::trace!(
                "{}: drew '{}' [{}]",
                self.name(),
                variant.name(),
                material.describe_features(frame.features)
            );
        }

        log::debug!(
            "{}: {} draws, {} program binds, {} state changes",
            self.name(),
            stats.draw_calls,
            stats.program_binds,
            stats.state_changes
        );
        self.slot.finish();
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{GeometryHandle, MaterialHandle};
    use glam::Mat4;

    fn entry(distance_sq: f32) -> DrawEntry {
        DrawEntry {
            material: MaterialHandle::default(),
            geometry: GeometryHandle::default(),
            model: Mat4::IDENTITY,
            cast_shadows: true,
            distance_sq,
        }
    }

    #[test]
    fn translucent_draws_follow_opaque_back_to_front() {
        let draws = [entry(1.0), entry(4.0), entry(9.0), entry(2.0), entry(16.0)];
        let translucent = [false, true, false, true, true];
        let mut order = Vec::new();
        sort_draws(&draws, &translucent, &mut order);
        assert_eq!(order, vec![0, 2, 4, 1, 3]);
    }
}
