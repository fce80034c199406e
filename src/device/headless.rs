//! Recording device.
//!
//! [`HeadlessDevice`] implements the device boundary without a GPU. It hands
//! out monotonically increasing ids, keeps the descriptors of live objects and
//! records every command in submission order, which makes frame output easy to
//! assert on.
//!
//! A stage whose source contains a line starting with `#error` fails to
//! compile, mirroring what a real GLSL compiler does.

use rustc_hash::FxHashMap;

use super::{
    BufferId, ClearOps, GeometryId, GraphicsDevice, PipelineState, ProgramId, RenderTarget,
    RenderTargetId, ShaderStage, StageId, TextureDescriptor, TextureId,
};
use crate::errors::{LanternError, Result};
use crate::resources::geometry::MeshData;
use crate::shader::parameters::{ParamValue, ParameterTable};

/// One submitted draw call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawRecord {
    pub program: ProgramId,
    pub geometry: GeometryId,
    pub target: RenderTarget,
    pub instances: u32,
}

/// A command as seen by the device, in submission order.
#[derive(Clone, Debug, PartialEq)]
pub enum DeviceCommand {
    BindTarget { target: RenderTarget, clear: ClearOps },
    ApplyState(PipelineState),
    UseProgram(ProgramId),
    BindTexture { unit: u32, texture: TextureId },
    BindBlock { program: ProgramId, block: String, buffer: BufferId },
    SetUniform { program: ProgramId, name: String, value: ParamValue },
    WriteBuffer { buffer: BufferId, len: usize },
    Draw(DrawRecord),
    Present,
}

#[derive(Debug)]
struct ProgramInfo {
    label: String,
    parameters: ParameterTable,
}

#[derive(Debug)]
struct GeometryInfo {
    label: String,
    vertex_count: usize,
    index_count: usize,
}

/// A [`GraphicsDevice`] that records instead of rendering.
#[derive(Debug)]
pub struct HeadlessDevice {
    next_id: u64,
    stages: FxHashMap<StageId, (ShaderStage, String)>,
    programs: FxHashMap<ProgramId, ProgramInfo>,
    textures: FxHashMap<TextureId, TextureDescriptor>,
    targets: FxHashMap<RenderTargetId, (Vec<TextureId>, Option<TextureId>)>,
    buffers: FxHashMap<BufferId, Vec<u8>>,
    geometries: FxHashMap<GeometryId, GeometryInfo>,
    current_target: RenderTarget,
    commands: Vec<DeviceCommand>,
    stages_compiled: usize,
    programs_linked: usize,
    frames_presented: usize,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            stages: FxHashMap::default(),
            programs: FxHashMap::default(),
            textures: FxHashMap::default(),
            targets: FxHashMap::default(),
            buffers: FxHashMap::default(),
            geometries: FxHashMap::default(),
            current_target: RenderTarget::Surface,
            commands: Vec::new(),
            stages_compiled: 0,
            programs_linked: 0,
            frames_presented: 0,
        }
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // ── Inspection ────────────────────────────────────────────────────────

    /// All recorded commands since the last [`clear_commands`](Self::clear_commands).
    #[must_use]
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Drops recorded commands, keeping live objects.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Draws recorded since the last clear, in order.
    #[must_use]
    pub fn draws(&self) -> Vec<DrawRecord> {
        self.commands
            .iter()
            .filter_map(|cmd| match cmd {
                DeviceCommand::Draw(draw) => Some(*draw),
                _ => None,
            })
            .collect()
    }

    /// Draws that landed on `target`.
    #[must_use]
    pub fn draws_to(&self, target: RenderTarget) -> Vec<DrawRecord> {
        self.draws()
            .into_iter()
            .filter(|draw| draw.target == target)
            .collect()
    }

    #[must_use]
    pub fn stages_compiled(&self) -> usize {
        self.stages_compiled
    }

    #[must_use]
    pub fn programs_linked(&self) -> usize {
        self.programs_linked
    }

    #[must_use]
    pub fn frames_presented(&self) -> usize {
        self.frames_presented
    }

    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    #[must_use]
    pub fn texture(&self, id: TextureId) -> Option<&TextureDescriptor> {
        self.textures.get(&id)
    }

    #[must_use]
    pub fn render_target_attachments(
        &self,
        id: RenderTargetId,
    ) -> Option<(&[TextureId], Option<TextureId>)> {
        self.targets
            .get(&id)
            .map(|(color, depth)| (color.as_slice(), *depth))
    }

    #[must_use]
    pub fn buffer_contents(&self, id: BufferId) -> Option<&[u8]> {
        self.buffers.get(&id).map(Vec::as_slice)
    }

    #[must_use]
    pub fn program_label(&self, id: ProgramId) -> Option<&str> {
        self.programs.get(&id).map(|info| info.label.as_str())
    }

    #[must_use]
    pub fn program_parameters(&self, id: ProgramId) -> Option<&ParameterTable> {
        self.programs.get(&id).map(|info| &info.parameters)
    }

    #[must_use]
    pub fn geometry_counts(&self, id: GeometryId) -> Option<(usize, usize)> {
        self.geometries
            .get(&id)
            .map(|info| (info.vertex_count, info.index_count))
    }

    #[must_use]
    pub fn geometry_label(&self, id: GeometryId) -> Option<&str> {
        self.geometries.get(&id).map(|info| info.label.as_str())
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn compile_stage(&mut self, label: &str, stage: ShaderStage, source: &str) -> Result<StageId> {
        if let Some(line) = source
            .lines()
            .find(|line| line.trim_start().starts_with("#error"))
        {
            return Err(LanternError::ShaderCompileFailed {
                shader: label.to_string(),
                stage: stage.as_str(),
                log: line.trim().to_string(),
            });
        }

        let id = StageId(self.allocate());
        self.stages.insert(id, (stage, source.to_string()));
        self.stages_compiled += 1;
        Ok(id)
    }

    fn link_program(
        &mut self,
        label: &str,
        stages: &[StageId],
        parameters: &ParameterTable,
    ) -> Result<ProgramId> {
        let mut has_vertex = false;
        let mut has_fragment = false;
        for stage in stages {
            let Some((kind, _)) = self.stages.get(stage) else {
                return Err(LanternError::ProgramLinkFailed {
                    shader: label.to_string(),
                    log: format!("unknown stage {stage}"),
                });
            };
            has_vertex |= *kind == ShaderStage::Vertex;
            has_fragment |= *kind == ShaderStage::Fragment;
        }
        if !has_vertex || !has_fragment {
            return Err(LanternError::ProgramLinkFailed {
                shader: label.to_string(),
                log: "program needs a vertex and a fragment stage".to_string(),
            });
        }

        let id = ProgramId(self.allocate());
        self.programs.insert(
            id,
            ProgramInfo {
                label: label.to_string(),
                parameters: parameters.clone(),
            },
        );
        self.programs_linked += 1;
        Ok(id)
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<TextureId> {
        if desc.width == 0 || desc.height == 0 {
            return Err(LanternError::Device(format!(
                "texture '{}' has zero extent {}x{}",
                desc.label, desc.width, desc.height
            )));
        }
        let id = TextureId(self.allocate());
        self.textures.insert(id, desc.clone());
        Ok(id)
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
    }

    fn create_render_target(
        &mut self,
        label: &str,
        color: &[TextureId],
        depth: Option<TextureId>,
    ) -> Result<RenderTargetId> {
        let missing = color
            .iter()
            .copied()
            .chain(depth)
            .find(|texture| !self.textures.contains_key(texture));
        if let Some(texture) = missing {
            return Err(LanternError::Device(format!(
                "render target '{label}' references unknown {texture}"
            )));
        }
        let id = RenderTargetId(self.allocate());
        self.targets.insert(id, (color.to_vec(), depth));
        Ok(id)
    }

    fn destroy_render_target(&mut self, target: RenderTargetId) {
        self.targets.remove(&target);
    }

    fn create_buffer(&mut self, _label: &str, size: usize) -> Result<BufferId> {
        let id = BufferId(self.allocate());
        self.buffers.insert(id, vec![0; size]);
        Ok(id)
    }

    fn write_buffer(&mut self, buffer: BufferId, data: &[u8]) {
        if let Some(contents) = self.buffers.get_mut(&buffer) {
            contents.clear();
            contents.extend_from_slice(data);
        }
        self.commands.push(DeviceCommand::WriteBuffer {
            buffer,
            len: data.len(),
        });
    }

    fn create_geometry(&mut self, label: &str, mesh: &MeshData) -> Result<GeometryId> {
        let id = GeometryId(self.allocate());
        self.geometries.insert(
            id,
            GeometryInfo {
                label: label.to_string(),
                vertex_count: mesh.vertex_count(),
                index_count: mesh.indices.len(),
            },
        );
        Ok(id)
    }

    fn bind_render_target(&mut self, target: RenderTarget, clear: ClearOps) {
        self.current_target = target;
        self.commands
            .push(DeviceCommand::BindTarget { target, clear });
    }

    fn apply_pipeline_state(&mut self, state: &PipelineState) {
        self.commands.push(DeviceCommand::ApplyState(state.clone()));
    }

    fn use_program(&mut self, program: ProgramId) {
        self.commands.push(DeviceCommand::UseProgram(program));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.commands
            .push(DeviceCommand::BindTexture { unit, texture });
    }

    fn bind_parameter_block(&mut self, program: ProgramId, block: &str, buffer: BufferId) {
        self.commands.push(DeviceCommand::BindBlock {
            program,
            block: block.to_string(),
            buffer,
        });
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: &ParamValue) {
        self.commands.push(DeviceCommand::SetUniform {
            program,
            name: name.to_string(),
            value: *value,
        });
    }

    fn draw(&mut self, program: ProgramId, geometry: GeometryId, instances: u32) {
        self.commands.push(DeviceCommand::Draw(DrawRecord {
            program,
            geometry,
            target: self.current_target,
            instances,
        }));
    }

    fn present(&mut self) {
        self.frames_presented += 1;
        self.commands.push(DeviceCommand::Present);
    }
}
