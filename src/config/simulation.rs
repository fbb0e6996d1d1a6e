//! Run configuration and initial state.
//!
//! Passed by value into the simulation entry point; nothing in the core
//! reads process-wide settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::endocrine::EvaluationMode;
use crate::error::{Result, SimulationError};
use crate::solver::IntegratorConfig;
use crate::state::hormone_state::{default_hormone_state, FIXED_STATE_SIZE};

/// One follicle present at the start of the run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialFollicle {
    /// Diameter (mm)
    pub size_mm: f64,
    /// Individual FSH threshold of the sensitivity gate
    pub fsh_sensitivity: f64,
}

/// Initial follicle sizes plus the fixed hormone/pituitary block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialState {
    pub follicles: Vec<InitialFollicle>,
    /// Values for the fixed slots, in `HormoneSlot` order
    pub hormones: Vec<f64>,
}

impl InitialState {
    /// Fixed block only, no follicles
    pub fn without_follicles() -> Self {
        Self {
            follicles: Vec::new(),
            hormones: default_hormone_state().to_vec(),
        }
    }

    pub fn with_follicles(follicles: Vec<InitialFollicle>) -> Self {
        Self {
            follicles,
            hormones: default_hormone_state().to_vec(),
        }
    }

    /// Reject sizes and hormone values the integrator cannot start from.
    ///
    /// FSH sensitivities are taken as given.
    pub fn validate(&self) -> Result<()> {
        if self.hormones.len() != FIXED_STATE_SIZE {
            return Err(SimulationError::InvalidInitialState(format!(
                "expected {} hormone values, got {}",
                FIXED_STATE_SIZE,
                self.hormones.len()
            )));
        }
        if let Some((i, v)) = self
            .hormones
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(SimulationError::InvalidInitialState(format!(
                "hormone slot {} has value {}",
                i, v
            )));
        }
        if let Some((i, f)) = self
            .follicles
            .iter()
            .enumerate()
            .find(|(_, f)| !f.size_mm.is_finite() || f.size_mm <= 0.0)
        {
            return Err(SimulationError::InvalidInitialState(format!(
                "follicle {} has size {}",
                i, f.size_mm
            )));
        }
        Ok(())
    }
}

impl Default for InitialState {
    fn default() -> Self {
        // A small early-follicular cohort
        let follicles = [2.0, 2.5, 3.0, 3.5, 4.0, 4.5]
            .iter()
            .zip([0.52, 0.58, 0.55, 0.50, 0.60, 0.54])
            .map(|(&size_mm, fsh_sensitivity)| InitialFollicle {
                size_mm,
                fsh_sensitivity,
            })
            .collect();
        Self::with_follicles(follicles)
    }
}

/// Top-level run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulation start (days)
    pub start_day: f64,
    /// Simulation horizon (days)
    pub horizon_days: f64,
    /// Normal lifecycle handling or calibration of the bare growth law
    pub mode: EvaluationMode,
    /// Seed of the recruitment random stream
    pub seed: u64,
    /// Admit new follicles stochastically
    pub enable_recruitment: bool,
    /// Ovulation time assumed before the first simulated ovulation (days)
    pub initial_ovulation_day: f64,
    /// Accepted-step budget for one run
    pub max_steps: u64,
    /// Adaptive step control
    pub integrator: IntegratorConfig,
    /// Initial follicles and hormone block
    pub initial: InitialState,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_day: 0.0,
            horizon_days: 120.0,
            mode: EvaluationMode::Normal,
            seed: 42,
            enable_recruitment: true,
            initial_ovulation_day: -14.0,
            max_steps: 2_000_000,
            integrator: IntegratorConfig::default(),
            initial: InitialState::default(),
        }
    }
}

impl SimulationConfig {
    /// Load from JSON file or return defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("Loaded simulation config from {:?}", path.as_ref());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse simulation config: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Simulation config file not found, using defaults");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.start_day.is_finite() || !self.horizon_days.is_finite() {
            return Err(SimulationError::InvalidConfig(
                "start and horizon must be finite".into(),
            ));
        }
        if self.horizon_days <= self.start_day {
            return Err(SimulationError::InvalidConfig(format!(
                "horizon {} must be after start {}",
                self.horizon_days, self.start_day
            )));
        }
        if self.max_steps == 0 {
            return Err(SimulationError::InvalidConfig("max_steps must be > 0".into()));
        }
        self.integrator.validate()?;
        self.initial.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_initial_state_valid() {
        let state = InitialState::default();
        assert!(state.validate().is_ok());
        assert_eq!(state.hormones.len(), FIXED_STATE_SIZE);
        assert!(!state.follicles.is_empty());
    }

    #[test]
    fn test_negative_size_rejected() {
        let state = InitialState::with_follicles(vec![InitialFollicle {
            size_mm: -1.0,
            fsh_sensitivity: 0.5,
        }]);
        assert!(matches!(
            state.validate(),
            Err(SimulationError::InvalidInitialState(_))
        ));
    }

    #[test]
    fn test_short_hormone_block_rejected() {
        let mut state = InitialState::without_follicles();
        state.hormones.pop();
        assert!(state.validate().is_err());
    }

    #[test]
    fn test_horizon_before_start_rejected() {
        let config = SimulationConfig {
            start_day: 10.0,
            horizon_days: 5.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "horizon_days": 30.0, "seed": 7 }"#;
        let config: SimulationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.horizon_days, 30.0);
        assert_eq!(config.seed, 7);
        assert_eq!(config.mode, EvaluationMode::Normal);
        assert!(config.enable_recruitment);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = SimulationConfig::load_or_default("does/not/exist.json");
        assert_eq!(config.horizon_days, SimulationConfig::default().horizon_days);
    }
}
