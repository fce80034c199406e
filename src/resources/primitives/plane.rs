use crate::resources::geometry::MeshData;

pub struct PlaneOptions {
    pub width: f32,
    pub depth: f32,
    pub width_segments: u32,
    pub depth_segments: u32,
}

impl Default for PlaneOptions {
    fn default() -> Self {
        Self {
            width: 1.0,
            depth: 1.0,
            width_segments: 1,
            depth_segments: 1,
        }
    }
}

/// Ground plane in the XZ plane facing +Y.
#[must_use]
pub fn create_plane(options: &PlaneOptions) -> MeshData {
    let grid_x = options.width_segments.max(1);
    let grid_z = options.depth_segments.max(1);
    let grid_x1 = grid_x + 1;
    let grid_z1 = grid_z + 1;

    let half_width = options.width / 2.0;
    let half_depth = options.depth / 2.0;
    let segment_width = options.width / grid_x as f32;
    let segment_depth = options.depth / grid_z as f32;

    let mut mesh = MeshData::default();

    for iz in 0..grid_z1 {
        let z = iz as f32 * segment_depth - half_depth;
        for ix in 0..grid_x1 {
            let x = ix as f32 * segment_width - half_width;
            mesh.positions.push([x, 0.0, z]);
            mesh.normals.push([0.0, 1.0, 0.0]);
            mesh.uvs
                .push([ix as f32 / grid_x as f32, iz as f32 / grid_z as f32]);
        }
    }

    for iz in 0..grid_z {
        for ix in 0..grid_x {
            let a = ix + grid_x1 * iz;
            let b = ix + grid_x1 * (iz + 1);
            let c = (ix + 1) + grid_x1 * (iz + 1);
            let d = (ix + 1) + grid_x1 * iz;

            mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    mesh
}
