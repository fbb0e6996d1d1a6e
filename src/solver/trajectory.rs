//! Simulation output: one sample per accepted step.
//!
//! The state vector changes length whenever follicles are recruited or
//! retired, so every sample carries the ActiveIndexSet it was laid out with.

use std::fmt;

use serde::Serialize;

use crate::state::{FollicleId, FollicleRecord, HormoneSlot, OvulationEvent};

/// State at one accepted step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectorySample {
    /// Simulation time (days)
    pub time: f64,
    /// Follicle ids in slot order
    pub active: Vec<FollicleId>,
    /// Follicle sizes (mm) followed by the fixed hormone block
    pub state: Vec<f64>,
    /// Estradiol (pg/mL)
    pub e2_pg_per_mL: f64,
    /// Progesterone (ng/mL)
    pub p4_ng_per_mL: f64,
}

impl TrajectorySample {
    pub fn follicle_sizes(&self) -> &[f64] {
        &self.state[..self.active.len()]
    }

    pub fn hormone_block(&self) -> &[f64] {
        &self.state[self.active.len()..]
    }

    #[inline]
    pub fn hormone(&self, slot: HormoneSlot) -> f64 {
        self.state[self.active.len() + slot.offset()]
    }

    /// Size of a follicle if it was active at this sample
    pub fn size_of(&self, id: FollicleId) -> Option<f64> {
        self.active
            .iter()
            .position(|&a| a == id)
            .map(|slot| self.state[slot])
    }

    /// Largest active follicle (mm)
    pub fn largest_follicle(&self) -> Option<f64> {
        self.follicle_sizes().iter().copied().reduce(f64::max)
    }

    /// The FSH–receptor complex fed back to the growth law
    pub fn fsh_residual(&self) -> f64 {
        self.hormone(HormoneSlot::FshReceptorComplex)
    }
}

/// Complete output of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Trajectory {
    pub samples: Vec<TrajectorySample>,
    pub ovulations: Vec<OvulationEvent>,
    /// Every follicle ever created, retired ones included
    pub follicles: Vec<FollicleRecord>,
    /// Accepted integrator steps
    pub steps: u64,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: TrajectorySample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&TrajectorySample> {
        self.samples.last()
    }

    /// `(time, value)` series of one hormone slot
    pub fn hormone_series(&self, slot: HormoneSlot) -> Vec<(f64, f64)> {
        self.samples.iter().map(|s| (s.time, s.hormone(slot))).collect()
    }

    /// `(time, size)` series of one follicle while it was active
    pub fn follicle_series(&self, id: FollicleId) -> Vec<(f64, f64)> {
        self.samples
            .iter()
            .filter_map(|s| s.size_of(id).map(|size| (s.time, size)))
            .collect()
    }

    pub fn summary(&self) -> SimulationSummary {
        let ovulation_times: Vec<f64> = self.ovulations.iter().map(|o| o.time).collect();
        let cycle_lengths = ovulation_times.windows(2).map(|w| w[1] - w[0]).collect();
        SimulationSummary {
            steps: self.steps,
            samples: self.samples.len(),
            follicles_created: self.follicles.len(),
            max_active: self.samples.iter().map(|s| s.active.len()).max().unwrap_or(0),
            start_day: self.samples.first().map_or(0.0, |s| s.time),
            end_day: self.samples.last().map_or(0.0, |s| s.time),
            ovulation_times,
            cycle_lengths,
        }
    }
}

/// Run statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub steps: u64,
    pub samples: usize,
    pub follicles_created: usize,
    pub max_active: usize,
    pub start_day: f64,
    pub end_day: f64,
    pub ovulation_times: Vec<f64>,
    /// Differences of successive ovulation times (days)
    pub cycle_lengths: Vec<f64>,
}

impl SimulationSummary {
    pub fn mean_cycle_length(&self) -> Option<f64> {
        if self.cycle_lengths.is_empty() {
            None
        } else {
            Some(self.cycle_lengths.iter().sum::<f64>() / self.cycle_lengths.len() as f64)
        }
    }
}

impl fmt::Display for SimulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "days {:.1}-{:.1}: {} steps, {} follicles (max {} active), {} ovulations",
            self.start_day,
            self.end_day,
            self.steps,
            self.follicles_created,
            self.max_active,
            self.ovulation_times.len()
        )?;
        if let Some(mean) = self.mean_cycle_length() {
            write!(f, ", mean cycle {:.1} days", mean)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{default_hormone_state, FIXED_STATE_SIZE};

    fn sample(time: f64, ids: &[u32], sizes: &[f64]) -> TrajectorySample {
        let mut state = sizes.to_vec();
        state.extend_from_slice(&default_hormone_state());
        TrajectorySample {
            time,
            active: ids.iter().map(|&i| FollicleId(i)).collect(),
            state,
            e2_pg_per_mL: 20.0,
            p4_ng_per_mL: 0.5,
        }
    }

    #[test]
    fn test_sample_accessors() {
        let s = sample(1.0, &[4, 9], &[3.0, 11.0]);
        assert_eq!(s.follicle_sizes(), &[3.0, 11.0]);
        assert_eq!(s.hormone_block().len(), FIXED_STATE_SIZE);
        assert_eq!(s.size_of(FollicleId(9)), Some(11.0));
        assert_eq!(s.size_of(FollicleId(5)), None);
        assert_eq!(s.largest_follicle(), Some(11.0));
        assert_eq!(s.fsh_residual(), default_hormone_state()[0]);
    }

    #[test]
    fn test_follicle_series_skips_inactive_samples() {
        let mut traj = Trajectory::new();
        traj.push(sample(0.0, &[0], &[2.0]));
        traj.push(sample(1.0, &[0, 1], &[2.5, 2.0]));
        traj.push(sample(2.0, &[1], &[2.2]));
        assert_eq!(traj.follicle_series(FollicleId(0)), vec![(0.0, 2.0), (1.0, 2.5)]);
        assert_eq!(traj.follicle_series(FollicleId(1)).len(), 2);
    }

    #[test]
    fn test_summary_cycle_lengths() {
        let mut traj = Trajectory::new();
        traj.push(sample(0.0, &[], &[]));
        for (time, id) in [(14.0, 1), (42.0, 5), (71.0, 9)] {
            traj.ovulations.push(OvulationEvent {
                time,
                follicle: FollicleId(id),
                size_mm: 18.0,
            });
        }
        let summary = traj.summary();
        assert_eq!(summary.cycle_lengths, vec![28.0, 29.0]);
        assert_eq!(summary.mean_cycle_length(), Some(28.5));
        assert!(summary.to_string().contains("3 ovulations"));
    }
}
