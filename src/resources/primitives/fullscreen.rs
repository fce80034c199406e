use crate::resources::geometry::MeshData;

/// One triangle covering the whole viewport in clip space.
///
/// UVs run 0..1 over the visible area; the overhang is clipped.
#[must_use]
pub fn create_fullscreen_triangle() -> MeshData {
    MeshData {
        positions: vec![[-1.0, -1.0, 0.0], [3.0, -1.0, 0.0], [-1.0, 3.0, 0.0]],
        normals: vec![[0.0, 0.0, 1.0]; 3],
        uvs: vec![[0.0, 0.0], [2.0, 0.0], [0.0, 2.0]],
        indices: vec![0, 1, 2],
    }
}
