//! State management for the cycle simulation.
//!
//! Contains the follicle records and their lifecycle, the registry that owns
//! them, and the layout of the fixed hormone block of the state vector.

mod follicle;
pub mod hormone_state;
pub mod lifecycle;
mod registry;

pub use follicle::{Destiny, FollicleId, FollicleRecord, SizeSample};
pub use hormone_state::{default_hormone_state, HormoneSlot, FIXED_STATE_SIZE};
pub use lifecycle::{LifecycleThresholds, Transition, TransitionReason};
pub use registry::{
    ActiveIndexSet, FollicleRegistry, OvulationEvent, PopulationChange, Recruit,
    TransitionContext,
};
