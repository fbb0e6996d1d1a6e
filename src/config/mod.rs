//! Configuration module for model constants and run settings.
//!
//! Parameter provenance is documented next to the default table.

mod parameters;
mod simulation;

pub use parameters::{idx, ParameterSet, PARAMETER_COUNT};
pub use simulation::{InitialFollicle, InitialState, SimulationConfig};
