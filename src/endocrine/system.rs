//! Full cycle ODE: follicle sizes followed by the fixed hormone block.

use crate::config::ParameterSet;
use crate::error::{DerivativeSlot, Result, SimulationError};
use crate::state::{FollicleRegistry, HormoneSlot, FIXED_STATE_SIZE};

use super::follicle_growth::{effective_size, EvaluationMode, FollicleGrowthRhs};
use super::hormones::{HormoneRhs, HormoneSnapshot};
use super::pituitary::PituitaryRhs;

/// Right-hand side of the cycle model over a frozen registry.
///
/// Built for one accepted step; the registry cannot change while this
/// borrows it.
pub struct CycleOdeSystem<'a> {
    registry: &'a FollicleRegistry,
    hormones: HormoneRhs,
    growth: FollicleGrowthRhs,
    pituitary: PituitaryRhs,
    mode: EvaluationMode,
}

impl<'a> CycleOdeSystem<'a> {
    pub fn new(params: &ParameterSet, registry: &'a FollicleRegistry, mode: EvaluationMode) -> Self {
        Self {
            registry,
            hormones: HormoneRhs::from_params(params),
            growth: FollicleGrowthRhs::from_params(params),
            pituitary: PituitaryRhs::from_params(params),
            mode,
        }
    }

    /// Number of state variables for the current active window
    pub fn ndim(&self) -> usize {
        self.registry.active().len() + FIXED_STATE_SIZE
    }

    fn check_dimensions(&self, len: usize) -> Result<()> {
        if len != self.ndim() {
            return Err(SimulationError::DimensionMismatch {
                active: self.registry.active().len(),
                slots: len.saturating_sub(FIXED_STATE_SIZE),
            });
        }
        Ok(())
    }

    /// E2 and P4 for state `y`
    pub fn snapshot(&self, t: f64, y: &[f64]) -> Result<HormoneSnapshot> {
        self.check_dimensions(y.len())?;
        let n = self.registry.active().len();
        let mut signal_sizes = Vec::with_capacity(n);
        for (slot, &size) in y[..n].iter().enumerate() {
            let record = self.registry.record_at(slot).ok_or(SimulationError::DimensionMismatch {
                active: n,
                slots: n,
            })?;
            signal_sizes.push(effective_size(record.destiny, size, self.mode));
        }
        let signal = self.hormones.secretion_signal(signal_sizes);
        Ok(self
            .hormones
            .from_signal(t, signal, self.registry.last_ovulation_time()))
    }

    /// Raw growth rate `X` of each active follicle
    pub fn raw_growth(&self, t: f64, y: &[f64], out: &mut [f64]) -> Result<()> {
        let snapshot = self.snapshot(t, y)?;
        let n = self.registry.active().len();
        let fsh_residual = y[n + HormoneSlot::FshReceptorComplex.offset()];
        self.growth
            .raw_growth(&y[..n], snapshot, fsh_residual, self.registry, self.mode, out)
    }

    /// Evaluate `dy/dt` at `(t, y)`.
    ///
    /// Fails on a length mismatch or on the first non-finite entry, naming
    /// the follicle or hormone slot it belongs to.
    pub fn evaluate(&self, t: f64, y: &[f64], dy: &mut [f64]) -> Result<()> {
        self.check_dimensions(y.len())?;
        self.check_dimensions(dy.len())?;

        let n = self.registry.active().len();
        let snapshot = self.snapshot(t, y)?;
        let (sizes, block) = y.split_at(n);
        let (d_sizes, d_block) = dy.split_at_mut(n);
        let fsh_residual = block[HormoneSlot::FshReceptorComplex.offset()];

        self.growth
            .compute(t, sizes, snapshot, fsh_residual, self.registry, self.mode, d_sizes)?;
        self.pituitary.compute(block, snapshot, d_block);

        if let Some(i) = dy.iter().position(|d| !d.is_finite()) {
            let slot = if i < n {
                DerivativeSlot::Follicle(self.registry.active().as_slice()[i])
            } else {
                let name = HormoneSlot::from_offset(i - n).map_or("unknown", |s| s.name());
                DerivativeSlot::Hormone(name)
            };
            return Err(SimulationError::NonFiniteDerivative { time: t, slot });
        }
        Ok(())
    }
}
