//! Forward Render Pipeline
//!
//! - [`swap`]: per-frame value snapshot extracted from the scene
//! - [`uniforms`]: std140 parameter blocks filled from the snapshot
//! - [`shadow_utils`]: cascade split and light-space projection math
//! - [`pass`]: the pass state machine and resource-flow contract
//! - [`passes`]: Shadow, Main and Postprocess
//! - [`pipeline`]: the orchestrator that runs them in order

pub mod pass;
pub mod passes;
pub mod pipeline;
pub mod shadow_utils;
pub mod swap;
pub mod uniforms;

pub use pass::{PassFrame, PassState, PassStats, RenderPass, ResourceFlow};
pub use passes::{MainPass, PostprocessPass, ShadowPass};
pub use pipeline::{FrameStats, RenderPipeline};
pub use swap::{DrawEntry, FrameSwapData, ShadowCaster, ShadowData};
