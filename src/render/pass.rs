//! Render Pass Contract
//!
//! Every pass is driven through the same per-frame sequence:
//!
//! ```text
//! Unconfigured ──set_resource_flow──▶ ResourceFlowSet ──set_context──▶ ContextSet ──execute──▶ Executed
//!                                            ▲                                                   │
//!                                            └──────────────── set_resource_flow ────────────────┘
//! ```
//!
//! The **resource flow** names the registry resources a pass reads and
//! writes; it is rebuilt from the registry every frame so resized attachments
//! are picked up. The **execution context** carries the per-frame data taken
//! from the swap data. Executing in any state but `ContextSet` is a
//! configuration error, raised before anything is drawn.

use crate::device::GraphicsDevice;
use crate::errors::{LanternError, Result};
use crate::resources::{FrameFeatures, GeometryStore, MaterialStore, ResourceRegistry};

/// Where a pass is in its per-frame sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PassState {
    #[default]
    Unconfigured,
    ResourceFlowSet,
    ContextSet,
    Executed,
}

/// Mutable engine state lent to a pass while it executes.
pub struct PassFrame<'a> {
    pub device: &'a mut dyn GraphicsDevice,
    pub materials: &'a MaterialStore,
    pub geometries: &'a mut GeometryStore,
    pub features: FrameFeatures,
}

/// Work a pass submitted during one execution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassStats {
    pub draw_calls: u32,
    pub program_binds: u32,
    pub state_changes: u32,
}

impl std::ops::AddAssign for PassStats {
    fn add_assign(&mut self, rhs: Self) {
        self.draw_calls += rhs.draw_calls;
        self.program_binds += rhs.program_binds;
        self.state_changes += rhs.state_changes;
    }
}

/// A resource flow resolvable from the registry.
pub trait ResourceFlow: Sized {
    /// Fails with `ResourceNotFound` / `ResourceTypeMismatch` when a required
    /// resource is absent or of the wrong kind.
    fn from_registry(registry: &ResourceRegistry) -> Result<Self>;
}

pub trait RenderPass {
    type Flow: ResourceFlow;
    type Context;

    fn name(&self) -> &'static str;

    fn state(&self) -> PassState;

    fn set_resource_flow(&mut self, flow: Self::Flow);

    fn set_context(&mut self, context: Self::Context) -> Result<()>;

    fn execute(&mut self, frame: &mut PassFrame<'_>) -> Result<PassStats>;
}

/// State machine plus storage shared by every pass implementation.
#[derive(Debug)]
pub struct PassSlot<F, C> {
    name: &'static str,
    state: PassState,
    flow: Option<F>,
    context: Option<C>,
}

impl<F, C> PassSlot<F, C> {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: PassState::Unconfigured,
            flow: None,
            context: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> PassState {
        self.state
    }

    /// Always allowed; starts a new frame and drops the previous context.
    pub fn set_flow(&mut self, flow: F) {
        self.flow = Some(flow);
        self.context = None;
        self.state = PassState::ResourceFlowSet;
    }

    pub fn set_context(&mut self, context: C) -> Result<()> {
        match self.state {
            PassState::ResourceFlowSet | PassState::ContextSet => {
                self.context = Some(context);
                self.state = PassState::ContextSet;
                Ok(())
            }
            state => Err(self.not_ready(format!(
                "context set in state {state:?}, resource flow must be set first"
            ))),
        }
    }

    /// Hands out flow and context for execution.
    pub fn begin(&self) -> Result<(&F, &C)> {
        if self.state != PassState::ContextSet {
            return Err(self.not_ready(format!("executed in state {:?}", self.state)));
        }
        match (&self.flow, &self.context) {
            (Some(flow), Some(context)) => Ok((flow, context)),
            _ => Err(self.not_ready("resource flow or context missing".to_string())),
        }
    }

    pub fn finish(&mut self) {
        self.state = PassState::Executed;
    }

    fn not_ready(&self, reason: String) -> LanternError {
        LanternError::PassNotReady {
            pass: self.name,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_follows_frame_order() {
        let mut slot: PassSlot<u32, u32> = PassSlot::new("test");
        assert_eq!(slot.state(), PassState::Unconfigured);
        assert!(slot.begin().is_err());
        assert!(slot.set_context(1).is_err());

        slot.set_flow(7);
        assert_eq!(slot.state(), PassState::ResourceFlowSet);
        assert!(slot.begin().is_err());

        slot.set_context(3).unwrap();
        assert_eq!(slot.begin().unwrap(), (&7, &3));
        slot.finish();
        assert_eq!(slot.state(), PassState::Executed);
    }

    #[test]
    fn executed_pass_needs_a_fresh_flow() {
        let mut slot: PassSlot<u32, u32> = PassSlot::new("test");
        slot.set_flow(1);
        slot.set_context(1).unwrap();
        slot.finish();

        let err = slot.set_context(2).unwrap_err();
        assert!(matches!(err, LanternError::PassNotReady { pass: "test", .. }));
        assert!(slot.begin().is_err());

        slot.set_flow(2);
        slot.set_context(2).unwrap();
        assert!(slot.begin().is_ok());
    }
}
