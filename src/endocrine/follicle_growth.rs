//! Follicle growth law with lifecycle overrides.
//!
//! For each active follicle `i` with size `s`:
//!
//! ```text
//! gamma = r · (hill_down(P4) + hill_up(f; 0.95, 5))
//! kappa = k_max · hill_down(f; 0.55, 10)
//! ffsh  = f^4 / (f^4 + sens_i^4)
//! X     = ffsh · (ξ - s) · s · (gamma - kappa · (ΣV - share · s^p))
//! ```
//!
//! where `f` is the FSH residual (FSH–receptor complex) and `ΣV = Σ_j s_j^p`
//! is the crowding term over all Growing and Dominant follicles. `X` is the derivative
//! of a Growing or Dominant follicle; declining, atretic and ovulated ones
//! follow fixed override formulas instead.

use serde::{Deserialize, Serialize};

use crate::config::{idx, ParameterSet};
use crate::error::{Result, SimulationError};
use crate::state::{Destiny, FollicleRecord, FollicleRegistry};

use super::hormones::HormoneSnapshot;
use super::{hill_down, hill_up, non_negative};

/// How destinies enter the RHS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    /// Lifecycle overrides and secretion zeroing apply
    #[default]
    Normal,
    /// Every follicle follows the raw growth law regardless of destiny
    Calibration,
}

/// Size a follicle contributes to secretion and crowding.
///
/// Only Growing and Dominant follicles count in normal mode.
#[inline]
pub fn effective_size(destiny: Destiny, size_mm: f64, mode: EvaluationMode) -> f64 {
    if mode == EvaluationMode::Normal && !destiny.secretes() {
        0.0
    } else {
        non_negative(size_mm)
    }
}

/// Population-wide factors shared by every follicle in one evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthTerms {
    /// Hormone-driven growth rate
    pub gamma: f64,
    /// Self-inhibition weight of the crowding term
    pub kappa: f64,
    /// `ΣV`, sum of effective `size^p`
    pub competition: f64,
}

/// Growth law constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollicleGrowthRhs {
    competition_exponent: f64,
    growth_rate: f64,
    max_size: f64,
    own_share: f64,
    max_self_harm: f64,
    p4_half: f64,
    p4_hill: f64,
    fsh_half: f64,
    fsh_hill: f64,
    harm_fsh_half: f64,
    harm_fsh_hill: f64,
    sensitivity_hill: f64,
    decline_acceleration: f64,
    self_destruct_rate: f64,
}

impl FollicleGrowthRhs {
    pub fn from_params(params: &ParameterSet) -> Self {
        Self {
            competition_exponent: params[idx::COMPETITION_EXPONENT],
            growth_rate: params[idx::GROWTH_RATE],
            max_size: params[idx::MAX_FOLLICLE_SIZE],
            own_share: params[idx::OWN_COMPETITION_SHARE],
            max_self_harm: params[idx::MAX_SELF_HARM],
            p4_half: params[idx::GROWTH_P4_HALF],
            p4_hill: params[idx::GROWTH_P4_HILL],
            fsh_half: params[idx::GROWTH_FSH_HALF],
            fsh_hill: params[idx::GROWTH_FSH_HILL],
            harm_fsh_half: params[idx::SELF_HARM_FSH_HALF],
            harm_fsh_hill: params[idx::SELF_HARM_FSH_HILL],
            sensitivity_hill: params[idx::SENSITIVITY_HILL],
            decline_acceleration: params[idx::DECLINE_ACCELERATION],
            self_destruct_rate: params[idx::SELF_DESTRUCT_RATE],
        }
    }

    #[inline]
    fn volume(&self, size_mm: f64) -> f64 {
        non_negative(size_mm).powf(self.competition_exponent)
    }

    /// Crowding term `ΣV` over effective sizes
    pub fn competition<I>(&self, effective_sizes: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        effective_sizes.into_iter().map(|s| self.volume(s)).sum()
    }

    /// `gamma` and `kappa` for this evaluation, with a precomputed `ΣV`
    pub fn shared_terms(&self, hormones: HormoneSnapshot, fsh_residual: f64, competition: f64) -> GrowthTerms {
        let gamma = self.growth_rate
            * (hill_down(hormones.p4_ng_per_mL, self.p4_half, self.p4_hill)
                + hill_up(fsh_residual, self.fsh_half, self.fsh_hill));
        let kappa = self.max_self_harm * hill_down(fsh_residual, self.harm_fsh_half, self.harm_fsh_hill);
        GrowthTerms {
            gamma,
            kappa,
            competition,
        }
    }

    /// FSH sensitivity gate of a follicle with the given threshold
    #[inline]
    pub fn sensitivity_gate(&self, fsh_residual: f64, fsh_sensitivity: f64) -> f64 {
        hill_up(fsh_residual, fsh_sensitivity, self.sensitivity_hill)
    }

    /// Raw growth rate `X`.
    ///
    /// `own_effective` is the size this follicle contributed to `ΣV`.
    pub fn raw_rate(
        &self,
        terms: &GrowthTerms,
        size_mm: f64,
        own_effective: f64,
        fsh_residual: f64,
        fsh_sensitivity: f64,
    ) -> f64 {
        let ffsh = self.sensitivity_gate(fsh_residual, fsh_sensitivity);
        let others = terms.competition - self.own_share * self.volume(own_effective);
        ffsh * (self.max_size - size_mm) * size_mm * (terms.gamma - terms.kappa * others)
    }

    /// Accelerating decay since the first decline mark
    fn decline_rate(&self, record: &FollicleRecord, t: f64, size_mm: f64) -> f64 {
        let elapsed = record.decline_duration(t).unwrap_or(0.0);
        -self.decline_acceleration * size_mm * elapsed
    }

    /// Apply the destiny override to a raw rate
    pub fn override_rate(&self, record: &FollicleRecord, t: f64, size_mm: f64, raw: f64) -> f64 {
        match record.destiny {
            Destiny::Growing | Destiny::Dominant => raw,
            Destiny::MarkedForDecline => self.decline_rate(record, t, size_mm),
            Destiny::Atretic if record.decline_expired => self.decline_rate(record, t, size_mm),
            Destiny::Atretic => -self.self_destruct_rate * size_mm,
            Destiny::Ovulated => 0.0,
        }
    }

    fn terms_for(
        &self,
        sizes: &[f64],
        hormones: HormoneSnapshot,
        fsh_residual: f64,
        registry: &FollicleRegistry,
        mode: EvaluationMode,
    ) -> Result<GrowthTerms> {
        let active = registry.active().len();
        if sizes.len() != active {
            return Err(SimulationError::DimensionMismatch {
                active,
                slots: sizes.len(),
            });
        }
        let mut competition = 0.0;
        for (slot, &size) in sizes.iter().enumerate() {
            let record = record_at(registry, slot, sizes.len())?;
            competition += self.volume(effective_size(record.destiny, size, mode));
        }
        Ok(self.shared_terms(hormones, fsh_residual, competition))
    }

    /// Raw `X` of every active follicle, without overrides.
    ///
    /// Lifecycle transitions are evaluated against these values.
    pub fn raw_growth(
        &self,
        sizes: &[f64],
        hormones: HormoneSnapshot,
        fsh_residual: f64,
        registry: &FollicleRegistry,
        mode: EvaluationMode,
        out: &mut [f64],
    ) -> Result<()> {
        let terms = self.terms_for(sizes, hormones, fsh_residual, registry, mode)?;
        if out.len() != sizes.len() {
            return Err(SimulationError::DimensionMismatch {
                active: sizes.len(),
                slots: out.len(),
            });
        }
        for (slot, (&size, x)) in sizes.iter().zip(out.iter_mut()).enumerate() {
            let record = record_at(registry, slot, sizes.len())?;
            let own = effective_size(record.destiny, size, mode);
            *x = self.raw_rate(&terms, size, own, fsh_residual, record.fsh_sensitivity);
        }
        Ok(())
    }

    /// Size derivatives of all active follicles, in ActiveIndexSet order
    #[allow(clippy::too_many_arguments)]
    pub fn compute(
        &self,
        t: f64,
        sizes: &[f64],
        hormones: HormoneSnapshot,
        fsh_residual: f64,
        registry: &FollicleRegistry,
        mode: EvaluationMode,
        out: &mut [f64],
    ) -> Result<()> {
        self.raw_growth(sizes, hormones, fsh_residual, registry, mode, out)?;
        if mode == EvaluationMode::Calibration {
            return Ok(());
        }
        for (slot, (&size, x)) in sizes.iter().zip(out.iter_mut()).enumerate() {
            let record = record_at(registry, slot, sizes.len())?;
            *x = self.override_rate(record, t, size, *x);
        }
        Ok(())
    }
}

fn record_at(registry: &FollicleRegistry, slot: usize, slots: usize) -> Result<&FollicleRecord> {
    registry
        .record_at(slot)
        .ok_or(SimulationError::DimensionMismatch {
            active: registry.active().len(),
            slots,
        })
}
