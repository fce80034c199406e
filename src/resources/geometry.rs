//! Geometry
//!
//! [`MeshData`] is planar CPU vertex data (positions, normals, uvs, indices).
//! [`GeometryStore`] owns meshes behind slotmap handles and uploads each one
//! to the device the first time a pass asks for it.

use glam::Vec3;
use slotmap::{SlotMap, new_key_type};

use crate::device::{GeometryId, GraphicsDevice};
use crate::errors::{LanternError, Result};

new_key_type! {
    pub struct GeometryHandle;
}

/// Planar vertex data with a triangle-list index buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds `(min, max)`; `None` for an empty mesh.
    #[must_use]
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut iter = self.positions.iter().map(|p| Vec3::from_array(*p));
        let first = iter.next()?;
        Some(iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }
}

/// A mesh plus its device upload, if any.
#[derive(Debug)]
pub struct Geometry {
    pub label: String,
    pub mesh: MeshData,
    gpu: Option<GeometryId>,
}

impl Geometry {
    #[must_use]
    pub fn new(label: &str, mesh: MeshData) -> Self {
        Self {
            label: label.to_string(),
            mesh,
            gpu: None,
        }
    }

    #[must_use]
    pub fn gpu_id(&self) -> Option<GeometryId> {
        self.gpu
    }

    /// Uploads on first call; later calls return the cached id.
    pub fn ensure_uploaded(&mut self, device: &mut dyn GraphicsDevice) -> Result<GeometryId> {
        if let Some(id) = self.gpu {
            return Ok(id);
        }
        let id = device.create_geometry(&self.label, &self.mesh)?;
        log::trace!(
            "Uploaded geometry '{}' ({} vertices, {} indices)",
            self.label,
            self.mesh.vertex_count(),
            self.mesh.indices.len()
        );
        self.gpu = Some(id);
        Ok(id)
    }
}

/// Handle-addressed geometry storage.
#[derive(Debug, Default)]
pub struct GeometryStore {
    geometries: SlotMap<GeometryHandle, Geometry>,
}

impl GeometryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, label: &str, mesh: MeshData) -> GeometryHandle {
        self.geometries.insert(Geometry::new(label, mesh))
    }

    #[must_use]
    pub fn get(&self, handle: GeometryHandle) -> Option<&Geometry> {
        self.geometries.get(handle)
    }

    /// Like [`get`](Self::get), but a dead handle is an error.
    pub fn resolve(&self, handle: GeometryHandle) -> Result<&Geometry> {
        self.geometries.get(handle).ok_or_else(|| invalid(handle))
    }

    pub fn remove(&mut self, handle: GeometryHandle) -> Option<Geometry> {
        self.geometries.remove(handle)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    /// Device id for `handle`, uploading the mesh if needed.
    pub fn ensure_uploaded(
        &mut self,
        handle: GeometryHandle,
        device: &mut dyn GraphicsDevice,
    ) -> Result<GeometryId> {
        let geometry = self.geometries.get_mut(handle).ok_or_else(|| invalid(handle))?;
        geometry.ensure_uploaded(device)
    }
}

fn invalid(handle: GeometryHandle) -> LanternError {
    LanternError::InvalidHandle {
        kind: "geometry",
        handle: format!("{handle:?}"),
    }
}
