//! Fixed-function pipeline state presets.

/// Depth test configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub test: bool,
    pub write: bool,
    pub compare: wgpu::CompareFunction,
}

impl DepthState {
    pub const DISABLED: Self = Self {
        test: false,
        write: false,
        compare: wgpu::CompareFunction::Always,
    };
}

/// Blend / cull / depth / stencil state applied before a draw.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PipelineState {
    pub blend: Option<wgpu::BlendState>,
    pub cull_mode: Option<wgpu::Face>,
    pub depth: DepthState,
    pub stencil: wgpu::StencilState,
    pub color_write: bool,
}

impl PipelineState {
    /// Opaque geometry: no blending, back-face culling, depth test and write.
    #[must_use]
    pub fn opaque() -> Self {
        Self {
            blend: None,
            cull_mode: Some(wgpu::Face::Back),
            depth: DepthState {
                test: true,
                write: true,
                compare: wgpu::CompareFunction::Less,
            },
            stencil: wgpu::StencilState::default(),
            color_write: true,
        }
    }

    /// Translucent geometry: alpha blending, depth test without depth write.
    #[must_use]
    pub fn translucent() -> Self {
        Self {
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            cull_mode: None,
            depth: DepthState {
                test: true,
                write: false,
                compare: wgpu::CompareFunction::Less,
            },
            stencil: wgpu::StencilState::default(),
            color_write: true,
        }
    }

    /// Depth-only shadow casting. Front faces are culled to reduce acne.
    #[must_use]
    pub fn shadow_caster() -> Self {
        Self {
            blend: None,
            cull_mode: Some(wgpu::Face::Front),
            depth: DepthState {
                test: true,
                write: true,
                compare: wgpu::CompareFunction::LessEqual,
            },
            stencil: wgpu::StencilState::default(),
            color_write: false,
        }
    }

    /// Skybox at the far plane: test without write, less-or-equal so it only
    /// fills pixels nothing else covered.
    #[must_use]
    pub fn skybox() -> Self {
        Self {
            blend: None,
            cull_mode: None,
            depth: DepthState {
                test: true,
                write: false,
                compare: wgpu::CompareFunction::LessEqual,
            },
            stencil: wgpu::StencilState::default(),
            color_write: true,
        }
    }

    /// Full-screen postprocess: no depth, no culling, replace blending.
    #[must_use]
    pub fn fullscreen() -> Self {
        Self {
            blend: Some(wgpu::BlendState::REPLACE),
            cull_mode: None,
            depth: DepthState::DISABLED,
            stencil: wgpu::StencilState::default(),
            color_write: true,
        }
    }

    /// Disables culling (double-sided materials).
    #[must_use]
    pub fn double_sided(mut self) -> Self {
        self.cull_mode = None;
        self
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::opaque()
    }
}
