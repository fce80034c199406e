//! Scene Graph
//!
//! - [`Scene`]: slotmap arena of nodes with mesh / light / camera components
//! - [`Node`]: hierarchy links, transform, visibility
//! - [`Transform`]: TRS with cached local and world matrices
//! - [`Camera`], [`Light`]: components read when extracting swap data

pub mod camera;
pub mod light;
pub mod node;
#[allow(clippy::module_inception)]
pub mod scene;
pub mod transform;

pub use camera::Camera;
pub use light::{Light, LightKind};
pub use node::Node;
pub use scene::{Mesh, Scene};
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
}
