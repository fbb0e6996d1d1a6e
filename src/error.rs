//! Error types for the simulation core.
//!
//! Every failure here is fatal for the run: they reflect bad input or an
//! internal invariant violation, never a transient condition, so nothing in
//! the core retries.

use std::fmt;

use thiserror::Error;

use crate::state::FollicleId;

/// Location of a derivative entry inside the state vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivativeSlot {
    /// Size slot of an active follicle
    Follicle(FollicleId),
    /// One of the fixed hormone/pituitary slots
    Hormone(&'static str),
}

impl fmt::Display for DerivativeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivativeSlot::Follicle(id) => write!(f, "follicle {}", id),
            DerivativeSlot::Hormone(name) => write!(f, "hormone slot '{}'", name),
        }
    }
}

/// Root error type of the simulation core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Wrong length or out-of-domain constant; rejected before integration.
    #[error("invalid parameter set: {0}")]
    InvalidParameterSet(String),

    /// Initial follicle sizes or hormone values are unusable.
    #[error("invalid initial state: {0}")]
    InvalidInitialState(String),

    /// Run settings (horizon, tolerances, step bounds) are unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// NaN/Inf produced by one of the right-hand-side components.
    #[error("non-finite derivative at t={time:.6} in {slot}")]
    NonFiniteDerivative { time: f64, slot: DerivativeSlot },

    /// The ActiveIndexSet and the follicle part of the state vector disagree.
    #[error("dimension mismatch: {active} active follicles but {slots} follicle slots")]
    DimensionMismatch { active: usize, slots: usize },

    /// Adaptive step control shrank the step below the configured minimum.
    #[error("step size underflow at t={time:.6} (h={step:.3e})")]
    StepSizeUnderflow { time: f64, step: f64 },

    /// The run did not reach its horizon within the step budget.
    #[error("exceeded {steps} steps at t={time:.6}")]
    MaxStepsExceeded { steps: u64, time: f64 },
}

impl SimulationError {
    /// Follicle implicated by a non-finite derivative, if any.
    pub fn follicle(&self) -> Option<FollicleId> {
        match self {
            SimulationError::NonFiniteDerivative {
                slot: DerivativeSlot::Follicle(id),
                ..
            } => Some(*id),
            _ => None,
        }
    }

    /// Simulation time attached to the failure, if any.
    pub fn time(&self) -> Option<f64> {
        match self {
            SimulationError::NonFiniteDerivative { time, .. }
            | SimulationError::StepSizeUnderflow { time, .. }
            | SimulationError::MaxStepsExceeded { time, .. } => Some(*time),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;
