//! Integrator driver for the variable-dimension cycle model.
//!
//! Each call to [`CycleSimulation::step`] performs one accepted integration
//! step and then, with the registry unfrozen:
//! 1. records the new follicle sizes,
//! 2. evaluates lifecycle transitions against the step's raw growth rates,
//! 3. rebuilds `y` and the ActiveIndexSet together if follicles were
//!    recruited or retired, and reseeds the integrator,
//! 4. appends an output sample.
//!
//! ## Usage
//! ```ignore
//! let trajectory = simulate(ParameterSet::default(), SimulationConfig::default())?;
//! println!("{}", trajectory.summary());
//! ```

use std::collections::BTreeSet;

use crate::config::{ParameterSet, SimulationConfig};
use crate::endocrine::CycleOdeSystem;
use crate::error::{Result, SimulationError};
use crate::state::{
    ActiveIndexSet, FollicleId, FollicleRegistry, HormoneSlot, PopulationChange, TransitionContext,
    FIXED_STATE_SIZE,
};

use super::integrator::AdaptiveIntegrator;
use super::trajectory::{Trajectory, TrajectorySample};

/// Result of one driver step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// One step accepted
    Advanced {
        time: f64,
        /// The state vector changed length
        resized: bool,
    },
    /// The horizon was already reached
    Finished,
}

/// One simulation run: parameters, registry, state vector and integrator
pub struct CycleSimulation {
    params: ParameterSet,
    config: SimulationConfig,
    registry: FollicleRegistry,
    /// Follicle sizes in ActiveIndexSet order, then the fixed block
    state: Vec<f64>,
    integrator: AdaptiveIntegrator,
    trajectory: Trajectory,
    growth: Vec<f64>,
}

impl CycleSimulation {
    /// Validate the inputs and set up the initial population
    pub fn new(params: ParameterSet, config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let start = config.start_day;
        let mut registry = FollicleRegistry::new(&params, config.initial_ovulation_day);
        let mut state = Vec::with_capacity(config.initial.follicles.len() + FIXED_STATE_SIZE);
        for follicle in &config.initial.follicles {
            registry.activate(start, follicle.size_mm, follicle.fsh_sensitivity);
            state.push(follicle.size_mm);
        }
        state.extend_from_slice(&config.initial.hormones);
        if config.enable_recruitment {
            registry.enable_recruitment(&params, config.seed, start)?;
        }

        let integrator = AdaptiveIntegrator::new(state.len(), start, config.integrator.clone());
        let mut sim = Self {
            params,
            config,
            registry,
            state,
            integrator,
            trajectory: Trajectory::new(),
            growth: Vec::new(),
        };
        sim.record_sample()?;

        log::info!(
            "Cycle simulation initialized: {} follicles, days {:.1}-{:.1}, mode {:?}",
            sim.registry.active().len(),
            sim.config.start_day,
            sim.config.horizon_days,
            sim.config.mode
        );
        Ok(sim)
    }

    pub fn time(&self) -> f64 {
        self.integrator.time
    }

    pub fn state(&self) -> &[f64] {
        &self.state
    }

    pub fn follicle_sizes(&self) -> &[f64] {
        &self.state[..self.registry.active().len()]
    }

    pub fn active(&self) -> &ActiveIndexSet {
        self.registry.active()
    }

    pub fn registry(&self) -> &FollicleRegistry {
        &self.registry
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn step_count(&self) -> u64 {
        self.integrator.step_count
    }

    pub fn is_finished(&self) -> bool {
        self.integrator.time >= self.config.horizon_days
    }

    /// Queue a follicle; it joins the tail of the active window after the
    /// next accepted step.
    pub fn schedule_recruitment(&mut self, size_mm: f64, fsh_sensitivity: f64) {
        self.registry.schedule_recruit(size_mm, fsh_sensitivity);
    }

    fn check_dimensions(&self) -> Result<()> {
        let active = self.registry.active().len();
        if self.state.len() != active + FIXED_STATE_SIZE {
            return Err(SimulationError::DimensionMismatch {
                active,
                slots: self.state.len().saturating_sub(FIXED_STATE_SIZE),
            });
        }
        Ok(())
    }

    /// Advance by one accepted step and apply population changes
    pub fn step(&mut self) -> Result<StepOutcome> {
        if self.is_finished() {
            return Ok(StepOutcome::Finished);
        }
        if self.integrator.step_count >= self.config.max_steps {
            return Err(SimulationError::MaxStepsExceeded {
                steps: self.integrator.step_count,
                time: self.integrator.time,
            });
        }
        self.check_dimensions()?;

        let mode = self.config.mode;
        let horizon = self.config.horizon_days;
        let n = self.registry.active().len();
        self.growth.resize(n, 0.0);
        {
            let system = CycleOdeSystem::new(&self.params, &self.registry, mode);
            self.integrator
                .step(&mut self.state, horizon, |t, y, dy| system.evaluate(t, y, dy))?;
            system.raw_growth(self.integrator.time, &self.state, &mut self.growth)?;
        }

        let t = self.integrator.time;
        self.registry.record_sizes(t, &self.state[..n])?;
        let change = self.registry.apply_transitions(TransitionContext {
            time: t,
            sizes: &self.state[..n],
            growth: &self.growth,
            lh_blood: self.state[n + HormoneSlot::LhBlood.offset()],
            fsh_residual: self.state[n + HormoneSlot::FshReceptorComplex.offset()],
            mode,
        })?;

        let resized = change.resizes();
        if resized {
            self.rebuild_state(&change)?;
            self.integrator.reseed(self.state.len());
        } else if !change.transitions.is_empty() {
            // Derivative formulas changed: the cached stage is stale
            self.integrator.restart();
        }

        self.record_sample()?;
        Ok(StepOutcome::Advanced { time: t, resized })
    }

    /// Replace `y` and the ActiveIndexSet together.
    ///
    /// Retired slots are dropped, survivors keep their order, and recruits
    /// are appended at the tail with their initial size.
    fn rebuild_state(&mut self, change: &PopulationChange) -> Result<()> {
        self.check_dimensions()?;
        let retired: BTreeSet<FollicleId> = change.retired.iter().copied().collect();
        let n = self.registry.active().len();
        let kept = n - retired.len().min(n);

        let mut ids = Vec::with_capacity(kept + change.recruited.len());
        let mut state = Vec::with_capacity(kept + change.recruited.len() + FIXED_STATE_SIZE);
        for (&id, &size) in self.registry.active().iter().zip(&self.state[..n]) {
            if !retired.contains(&id) {
                ids.push(id);
                state.push(size);
            }
        }
        for recruit in &change.recruited {
            ids.push(recruit.id);
            state.push(recruit.size_mm);
        }
        state.extend_from_slice(&self.state[n..]);

        log::debug!(
            "t={:.3}: active window {} -> {} follicles",
            self.integrator.time,
            n,
            ids.len()
        );
        self.registry.replace_active(ActiveIndexSet::new(ids));
        self.state = state;
        self.check_dimensions()
    }

    fn record_sample(&mut self) -> Result<()> {
        let t = self.integrator.time;
        let snapshot = CycleOdeSystem::new(&self.params, &self.registry, self.config.mode)
            .snapshot(t, &self.state)?;
        self.trajectory.push(TrajectorySample {
            time: t,
            active: self.registry.active().as_slice().to_vec(),
            state: self.state.clone(),
            e2_pg_per_mL: snapshot.e2_pg_per_mL,
            p4_ng_per_mL: snapshot.p4_ng_per_mL,
        });
        Ok(())
    }

    /// Step until the horizon
    pub fn run(&mut self) -> Result<()> {
        while let StepOutcome::Advanced { .. } = self.step()? {}
        Ok(())
    }

    /// Consume the run and return its output
    pub fn into_trajectory(mut self) -> Trajectory {
        self.trajectory.ovulations = self.registry.ovulations().to_vec();
        self.trajectory.follicles = self.registry.records().cloned().collect();
        self.trajectory.steps = self.integrator.step_count;
        self.trajectory
    }
}

/// Run one simulation from its parameters and configuration
pub fn simulate(params: ParameterSet, config: SimulationConfig) -> Result<Trajectory> {
    let mut sim = CycleSimulation::new(params, config)?;
    sim.run()?;
    log::info!(
        "Simulation finished at t={:.2} after {} steps ({} rejected)",
        sim.time(),
        sim.step_count(),
        sim.integrator.rejected_count
    );
    let trajectory = sim.into_trajectory();
    log::info!("{}", trajectory.summary());
    Ok(trajectory)
}
