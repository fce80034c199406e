//! The three forward passes, executed in this order every frame:
//!
//! 1. [`ShadowPass`]: casters into the layered shadow map
//! 2. [`MainPass`]: skybox and lit geometry into the HDR target
//! 3. [`PostprocessPass`]: tone mapping onto the surface

mod main;
mod postprocess;
mod shadow;

pub use main::{MainContext, MainFlow, MainPass};
pub use postprocess::{PostprocessContext, PostprocessFlow, PostprocessPass};
pub use shadow::{ShadowContext, ShadowFlow, ShadowPass};
