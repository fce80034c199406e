mod box_shape;
mod fullscreen;
mod plane;
mod sphere;

pub use box_shape::{create_box, create_skybox_cube};
pub use fullscreen::create_fullscreen_triangle;
pub use plane::{PlaneOptions, create_plane};
pub use sphere::{SphereOptions, create_sphere};
