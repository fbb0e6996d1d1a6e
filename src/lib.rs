//! Cycle Simulator - follicle population and hormone feedback model
//!
//! This library integrates a variable-dimension ODE system in which every
//! active ovarian follicle owns one size slot, coupled to a fixed block of
//! hypothalamic-pituitary hormone and receptor states.

// Allow non-snake-case for unit suffixes in field names (pg_per_mL, IU_per_L, etc.)
// This follows the project convention of including units in names.
#![allow(non_snake_case)]

pub mod config;
pub mod endocrine;
pub mod error;
pub mod export;
pub mod solver;
pub mod state;

pub use config::{ParameterSet, SimulationConfig};
pub use endocrine::{CycleOdeSystem, EvaluationMode, HormoneRhs, HormoneSnapshot};
pub use error::{Result, SimulationError};
pub use solver::{simulate, CycleSimulation, SimulationSummary, Trajectory};
pub use state::{ActiveIndexSet, Destiny, FollicleId, FollicleRecord, FollicleRegistry};
