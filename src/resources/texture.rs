//! Device-backed texture, buffer and framebuffer handles.
//!
//! These are small `Copy` records pairing a device id with the metadata the
//! pipeline needs (extent, format, kind). They are what the render resource
//! registry stores; the device owns the actual memory.

use crate::device::{
    BufferId, GraphicsDevice, RenderTargetId, SamplerDescriptor, TextureDescriptor, TextureId,
    TextureKind,
};
use crate::errors::Result;

/// A texture living on the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Texture {
    pub id: TextureId,
    pub width: u32,
    pub height: u32,
    pub kind: TextureKind,
    pub format: wgpu::TextureFormat,
}

impl Texture {
    pub fn create(device: &mut dyn GraphicsDevice, desc: &TextureDescriptor) -> Result<Self> {
        let id = device.create_texture(desc)?;
        Ok(Self {
            id,
            width: desc.width,
            height: desc.height,
            kind: desc.kind,
            format: desc.format,
        })
    }

    /// A plain 2D texture with linear repeat sampling.
    pub fn create_2d(
        device: &mut dyn GraphicsDevice,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Result<Self> {
        Self::create(
            device,
            &TextureDescriptor {
                label: label.to_string(),
                width,
                height,
                kind: TextureKind::D2 { layers: 1 },
                format,
                sampler: SamplerDescriptor::LINEAR_REPEAT,
            },
        )
    }

    /// A cube map with square faces of `size` texels.
    pub fn create_cube(
        device: &mut dyn GraphicsDevice,
        label: &str,
        size: u32,
        format: wgpu::TextureFormat,
    ) -> Result<Self> {
        Self::create(
            device,
            &TextureDescriptor {
                label: label.to_string(),
                width: size,
                height: size,
                kind: TextureKind::Cube,
                format,
                sampler: SamplerDescriptor::LINEAR_CLAMP,
            },
        )
    }

    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        device.destroy_texture(self.id);
    }

    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn layers(&self) -> u32 {
        match self.kind {
            TextureKind::D2 { layers } => layers,
            TextureKind::Cube => 6,
        }
    }
}

/// A parameter-block buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Buffer {
    pub id: BufferId,
    pub size: usize,
}

impl Buffer {
    pub fn create(device: &mut dyn GraphicsDevice, label: &str, size: usize) -> Result<Self> {
        Ok(Self {
            id: device.create_buffer(label, size)?,
            size,
        })
    }

    /// Uploads a `Pod` value as the whole buffer contents.
    pub fn write<T: bytemuck::Pod>(&self, device: &mut dyn GraphicsDevice, value: &T) {
        device.write_buffer(self.id, bytemuck::bytes_of(value));
    }
}

/// An offscreen render target and its attachments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Framebuffer {
    pub id: RenderTargetId,
    pub width: u32,
    pub height: u32,
    pub color: Option<TextureId>,
    pub depth: Option<TextureId>,
}

impl Framebuffer {
    pub fn create(
        device: &mut dyn GraphicsDevice,
        label: &str,
        color: Option<&Texture>,
        depth: Option<&Texture>,
    ) -> Result<Self> {
        let colors: Vec<TextureId> = color.iter().map(|t| t.id).collect();
        let id = device.create_render_target(label, &colors, depth.map(|t| t.id))?;
        let (width, height) = color.or(depth).map_or((0, 0), Texture::size);
        Ok(Self {
            id,
            width,
            height,
            color: color.map(|t| t.id),
            depth: depth.map(|t| t.id),
        })
    }

    pub fn destroy(self, device: &mut dyn GraphicsDevice) {
        device.destroy_render_target(self.id);
    }
}
