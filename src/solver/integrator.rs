//! Adaptive ODE integration for the cycle model.
//!
//! Implements the Dormand–Prince 5(4) embedded Runge–Kutta pair with FSAL
//! (first same as last) and a clamped step-size controller. The state
//! dimension may change between steps: the driver calls
//! [`AdaptiveIntegrator::reseed`] after every population change, which drops
//! the cached first stage and restarts step-size selection.
//!
//! Reference: Dormand JR, Prince PJ. J Comput Appl Math. 1980;6:19-26

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};

// Dormand–Prince tableau
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// 5th-order weights (advancing solution)
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// 5th minus 4th order weights
const E1: f64 = B1 - 5179.0 / 57600.0;
const E3: f64 = B3 - 7571.0 / 16695.0;
const E4: f64 = B4 - 393.0 / 640.0;
const E5: f64 = B5 - -92097.0 / 339200.0;
const E6: f64 = B6 - 187.0 / 2100.0;
const E7: f64 = -1.0 / 40.0;

/// Step-size controller bounds
const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

/// Configuration for the adaptive integrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    /// Relative tolerance
    pub rtol: f64,
    /// Absolute tolerance
    pub atol: f64,
    /// First trial step after a start or reseed (days)
    pub initial_step: f64,
    /// Smallest step before giving up (days)
    pub min_step: f64,
    /// Largest accepted step (days)
    pub max_step: f64,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-6,
            atol: 1e-8,
            initial_step: 0.01,
            min_step: 1e-10,
            max_step: 0.5,
        }
    }
}

impl IntegratorConfig {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("rtol", self.rtol),
            ("atol", self.atol),
            ("initial_step", self.initial_step),
            ("min_step", self.min_step),
            ("max_step", self.max_step),
        ];
        if let Some((name, value)) = positive.iter().find(|(_, v)| !v.is_finite() || *v <= 0.0) {
            return Err(SimulationError::InvalidConfig(format!(
                "integrator {} must be finite and > 0, got {}",
                name, value
            )));
        }
        if self.min_step > self.max_step {
            return Err(SimulationError::InvalidConfig(format!(
                "integrator min_step {} exceeds max_step {}",
                self.min_step, self.max_step
            )));
        }
        Ok(())
    }
}

/// Dormand–Prince 5(4) integrator with resizable buffers
#[derive(Debug, Clone)]
pub struct AdaptiveIntegrator {
    /// Configuration
    pub config: IntegratorConfig,
    /// Current simulation time (days)
    pub time: f64,
    /// Accepted steps
    pub step_count: u64,
    /// Rejected trial steps
    pub rejected_count: u64,
    /// Next trial step
    h: f64,
    /// `k1` holds f(t, y) for the current state
    fsal: bool,
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    k5: Vec<f64>,
    k6: Vec<f64>,
    k7: Vec<f64>,
    y_tmp: Vec<f64>,
    y_new: Vec<f64>,
}

impl AdaptiveIntegrator {
    /// Create an integrator for `n_variables` starting at `t0`
    pub fn new(n_variables: usize, t0: f64, config: IntegratorConfig) -> Self {
        let h = config.initial_step;
        Self {
            config,
            time: t0,
            step_count: 0,
            rejected_count: 0,
            h,
            fsal: false,
            k1: vec![0.0; n_variables],
            k2: vec![0.0; n_variables],
            k3: vec![0.0; n_variables],
            k4: vec![0.0; n_variables],
            k5: vec![0.0; n_variables],
            k6: vec![0.0; n_variables],
            k7: vec![0.0; n_variables],
            y_tmp: vec![0.0; n_variables],
            y_new: vec![0.0; n_variables],
        }
    }

    /// Resize internal buffers if system size changes
    pub fn resize(&mut self, n_variables: usize) {
        if self.k1.len() != n_variables {
            for buf in [
                &mut self.k1,
                &mut self.k2,
                &mut self.k3,
                &mut self.k4,
                &mut self.k5,
                &mut self.k6,
                &mut self.k7,
                &mut self.y_tmp,
                &mut self.y_new,
            ] {
                buf.resize(n_variables, 0.0);
            }
            self.fsal = false;
        }
    }

    /// Restart after a discontinuity in the right-hand side
    pub fn restart(&mut self) {
        self.fsal = false;
    }

    /// Restart with a new dimension: no stage or step size survives
    pub fn reseed(&mut self, n_variables: usize) {
        self.resize(n_variables);
        self.fsal = false;
        self.h = self.config.initial_step;
    }

    /// Trial size of the next step
    pub fn step_size(&self) -> f64 {
        self.h
    }

    /// Advance `y` by one accepted step, never past `t_end`.
    ///
    /// Rejected trial steps are retried with a smaller step. Returns the
    /// accepted step size, or `0.0` when `t_end` was already reached.
    /// Errors from `derivatives` abort the step and leave `y` untouched.
    pub fn step<F>(&mut self, y: &mut [f64], t_end: f64, mut derivatives: F) -> Result<f64>
    where
        F: FnMut(f64, &[f64], &mut [f64]) -> Result<()>,
    {
        let n = y.len();
        self.resize(n);
        let t = self.time;
        if t >= t_end {
            return Ok(0.0);
        }

        if !self.fsal {
            derivatives(t, y, &mut self.k1)?;
            self.fsal = true;
        }

        loop {
            let remaining = t_end - t;
            let h = self.h.min(self.config.max_step).min(remaining);

            for i in 0..n {
                self.y_tmp[i] = y[i] + h * A21 * self.k1[i];
            }
            derivatives(t + C2 * h, &self.y_tmp, &mut self.k2)?;

            for i in 0..n {
                self.y_tmp[i] = y[i] + h * (A31 * self.k1[i] + A32 * self.k2[i]);
            }
            derivatives(t + C3 * h, &self.y_tmp, &mut self.k3)?;

            for i in 0..n {
                self.y_tmp[i] =
                    y[i] + h * (A41 * self.k1[i] + A42 * self.k2[i] + A43 * self.k3[i]);
            }
            derivatives(t + C4 * h, &self.y_tmp, &mut self.k4)?;

            for i in 0..n {
                self.y_tmp[i] = y[i]
                    + h * (A51 * self.k1[i] + A52 * self.k2[i] + A53 * self.k3[i] + A54 * self.k4[i]);
            }
            derivatives(t + C5 * h, &self.y_tmp, &mut self.k5)?;

            for i in 0..n {
                self.y_tmp[i] = y[i]
                    + h * (A61 * self.k1[i]
                        + A62 * self.k2[i]
                        + A63 * self.k3[i]
                        + A64 * self.k4[i]
                        + A65 * self.k5[i]);
            }
            derivatives(t + h, &self.y_tmp, &mut self.k6)?;

            for i in 0..n {
                self.y_new[i] = y[i]
                    + h * (B1 * self.k1[i]
                        + B3 * self.k3[i]
                        + B4 * self.k4[i]
                        + B5 * self.k5[i]
                        + B6 * self.k6[i]);
            }
            derivatives(t + h, &self.y_new, &mut self.k7)?;

            // Mixed absolute/relative RMS norm of the embedded error
            let mut err = 0.0;
            for i in 0..n {
                let e = h
                    * (E1 * self.k1[i]
                        + E3 * self.k3[i]
                        + E4 * self.k4[i]
                        + E5 * self.k5[i]
                        + E6 * self.k6[i]
                        + E7 * self.k7[i]);
                let scale = self.config.atol + self.config.rtol * y[i].abs().max(self.y_new[i].abs());
                err += (e / scale) * (e / scale);
            }
            let err = (err / n.max(1) as f64).sqrt();

            let factor = if !err.is_finite() {
                MIN_FACTOR
            } else if err == 0.0 {
                MAX_FACTOR
            } else {
                (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
            };

            if err <= 1.0 {
                y.copy_from_slice(&self.y_new);
                std::mem::swap(&mut self.k1, &mut self.k7);
                self.time = if h >= remaining { t_end } else { t + h };
                self.step_count += 1;
                self.h = (h * factor).clamp(self.config.min_step, self.config.max_step);
                log::trace!("step {} accepted: t={:.6} h={:.3e}", self.step_count, self.time, h);
                return Ok(h);
            }

            self.rejected_count += 1;
            if h <= self.config.min_step {
                return Err(SimulationError::StepSizeUnderflow { time: t, step: h });
            }
            self.h = (h * factor).max(self.config.min_step);
        }
    }

    /// Integrate until `t_end`
    pub fn run<F>(&mut self, y: &mut [f64], t_end: f64, mut derivatives: F) -> Result<()>
    where
        F: FnMut(f64, &[f64], &mut [f64]) -> Result<()>,
    {
        while self.time < t_end {
            self.step(y, t_end, &mut derivatives)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_decay() {
        // dy/dt = -y, y(0) = 1
        let mut integrator = AdaptiveIntegrator::new(1, 0.0, IntegratorConfig::default());
        let mut y = vec![1.0];
        integrator
            .run(&mut y, 1.0, |_, state, dydt| {
                dydt[0] = -state[0];
                Ok(())
            })
            .unwrap();

        let expected = (-1.0_f64).exp();
        assert!((y[0] - expected).abs() < 1e-5, "got {} vs {}", y[0], expected);
        assert_eq!(integrator.time, 1.0);
    }

    #[test]
    fn test_oscillator_half_period() {
        // y1' = y2, y2' = -y1; y1(π) = -1
        let mut integrator = AdaptiveIntegrator::new(2, 0.0, IntegratorConfig::default());
        let mut y = vec![1.0, 0.0];
        integrator
            .run(&mut y, std::f64::consts::PI, |_, s, d| {
                d[0] = s[1];
                d[1] = -s[0];
                Ok(())
            })
            .unwrap();
        assert!((y[0] + 1.0).abs() < 1e-4, "y1(pi) = {}", y[0]);
        assert!(y[1].abs() < 1e-4);
    }

    #[test]
    fn test_never_steps_past_end() {
        let mut integrator = AdaptiveIntegrator::new(1, 0.0, IntegratorConfig::default());
        let mut y = vec![0.0];
        let rhs = |_: f64, _: &[f64], d: &mut [f64]| {
            d[0] = 1.0;
            Ok(())
        };
        integrator.run(&mut y, 0.3, rhs).unwrap();
        assert_eq!(integrator.time, 0.3);
        assert_eq!(integrator.step(&mut y, 0.3, rhs).unwrap(), 0.0);
        assert!((y[0] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_step_count() {
        let mut integrator = AdaptiveIntegrator::new(1, 0.0, IntegratorConfig::default());
        let mut y = vec![1.0];
        let rhs = |_: f64, _: &[f64], d: &mut [f64]| {
            d[0] = 0.0;
            Ok(())
        };

        assert_eq!(integrator.step_count, 0);
        integrator.step(&mut y, 10.0, rhs).unwrap();
        assert_eq!(integrator.step_count, 1);
        integrator.step(&mut y, 10.0, rhs).unwrap();
        assert_eq!(integrator.step_count, 2);
    }

    #[test]
    fn test_step_grows_on_smooth_problem() {
        let mut integrator = AdaptiveIntegrator::new(1, 0.0, IntegratorConfig::default());
        let mut y = vec![1.0];
        let rhs = |_: f64, _: &[f64], d: &mut [f64]| {
            d[0] = 0.0;
            Ok(())
        };
        let first = integrator.step(&mut y, 10.0, rhs).unwrap();
        integrator.step(&mut y, 10.0, rhs).unwrap();
        assert!(integrator.step_size() > first);
        assert!(integrator.step_size() <= integrator.config.max_step);
    }

    #[test]
    fn test_error_propagates_untouched_state() {
        let mut integrator = AdaptiveIntegrator::new(1, 2.0, IntegratorConfig::default());
        let mut y = vec![1.0];
        let err = integrator
            .step(&mut y, 5.0, |t, _, _| {
                Err(SimulationError::NonFiniteDerivative {
                    time: t,
                    slot: crate::error::DerivativeSlot::Hormone("test"),
                })
            })
            .unwrap_err();
        assert_eq!(err.time(), Some(2.0));
        assert_eq!(y, vec![1.0]);
        assert_eq!(integrator.time, 2.0);
    }

    #[test]
    fn test_reseed_changes_dimension() {
        let mut integrator = AdaptiveIntegrator::new(2, 0.0, IntegratorConfig::default());
        let mut y = vec![1.0, 1.0];
        let rhs = |_: f64, s: &[f64], d: &mut [f64]| {
            for (di, si) in d.iter_mut().zip(s) {
                *di = -si;
            }
            Ok(())
        };
        integrator.step(&mut y, 1.0, rhs).unwrap();
        y.push(1.0);
        integrator.reseed(3);
        assert_eq!(integrator.step_size(), integrator.config.initial_step);
        integrator.step(&mut y, 1.0, rhs).unwrap();
        assert!(y.iter().all(|v| v.is_finite() && *v < 1.0));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = IntegratorConfig {
            rtol: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = IntegratorConfig {
            min_step: 1.0,
            max_step: 0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
