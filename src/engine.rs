//! Engine Core Module
//!
//! [`Engine`] is the context object that owns everything a frame touches: the
//! graphics device, the shader library, the material and geometry stores, the
//! scene, the swap data and the render pipeline. There is no global state;
//! two engines never share a cache.
//!
//! # Frame
//!
//! A frame is one logic tick followed by one render tick:
//!
//! - [`tick_logic`](Engine::tick_logic) updates world matrices and
//!   repopulates the [`FrameSwapData`] from the scene
//! - [`tick_render`](Engine::tick_render) runs the pipeline against the swap
//!   data and presents
//!
//! # Example
//!
//! ```rust,ignore
//! use lantern::{Engine, HeadlessDevice, RendererSettings};
//!
//! let mut engine = Engine::new(HeadlessDevice::new(), RendererSettings::default(), 1280, 720)?;
//! let stats = engine.frame()?;
//! ```

use crate::device::GraphicsDevice;
use crate::errors::Result;
use crate::render::{FrameStats, FrameSwapData, RenderPipeline};
use crate::resources::{GeometryStore, MaterialStore};
use crate::scene::Scene;
use crate::settings::RendererSettings;
use crate::shader::ShaderLibrary;

/// The engine context, generic over the device backend.
pub struct Engine<D: GraphicsDevice> {
    pub device: D,
    pub library: ShaderLibrary,
    pub materials: MaterialStore,
    pub geometries: GeometryStore,
    pub scene: Scene,

    swap: FrameSwapData,
    pipeline: RenderPipeline,
    settings: RendererSettings,
}

impl<D: GraphicsDevice> Engine<D> {
    /// Creates an engine using the embedded shader sources.
    pub fn new(device: D, settings: RendererSettings, width: u32, height: u32) -> Result<Self> {
        Self::with_library(device, ShaderLibrary::embedded(), settings, width, height)
    }

    /// Creates an engine around an existing shader library.
    pub fn with_library(
        mut device: D,
        library: ShaderLibrary,
        settings: RendererSettings,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let pipeline = RenderPipeline::new(&mut device, &library, settings.clone(), width, height)?;
        Ok(Self {
            device,
            library,
            materials: MaterialStore::new(),
            geometries: GeometryStore::new(),
            scene: Scene::new(),
            swap: FrameSwapData::new(),
            pipeline,
            settings,
        })
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    /// The snapshot produced by the last logic tick.
    #[inline]
    #[must_use]
    pub fn swap_data(&self) -> &FrameSwapData {
        &self.swap
    }

    /// Surface size in pixels as `(width, height)`.
    #[inline]
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        self.pipeline.surface_size()
    }

    /// Handles a surface resize: attachments are reallocated on the next
    /// render tick and the active camera's aspect ratio follows.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.pipeline.resize(width, height);

        if width > 0
            && height > 0
            && let Some(handle) = self.scene.active_camera
            && let Some(camera) = self.scene.camera_mut(handle)
        {
            camera.set_aspect(width, height);
        }
    }

    /// Logic tick: world matrices, then swap-data extraction.
    pub fn tick_logic(&mut self) {
        self.scene.update_world_matrices();
        self.swap.extract(&self.scene, &self.settings);
    }

    /// Render tick: runs the pipeline on the current swap data and presents.
    pub fn tick_render(&mut self) -> Result<FrameStats> {
        self.pipeline.render_frame(
            &mut self.device,
            &self.materials,
            &mut self.geometries,
            &self.swap,
        )
    }

    /// One logic tick followed by one render tick.
    pub fn frame(&mut self) -> Result<FrameStats> {
        self.tick_logic();
        self.tick_render()
    }
}
