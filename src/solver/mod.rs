//! Time integration of the cycle model.
//!
//! - [`integrator`]: adaptive Dormand–Prince 5(4) stepping with resizable state
//! - [`driver`]: the step loop that applies lifecycle transitions and keeps
//!   the state vector and the ActiveIndexSet in lock-step
//! - [`trajectory`]: the sampled output handed to exporters

pub mod driver;
pub mod integrator;
pub mod trajectory;

pub use driver::{simulate, CycleSimulation, StepOutcome};
pub use integrator::{AdaptiveIntegrator, IntegratorConfig};
pub use trajectory::{SimulationSummary, Trajectory, TrajectorySample};
