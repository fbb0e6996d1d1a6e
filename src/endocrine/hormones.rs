//! Ovarian secretion: estradiol and progesterone from follicle sizes.
//!
//! The follicular signal aggregates every secreting follicle:
//!
//! ```text
//! SF = π · Σ_i hill(size_i; K, n) · size_i²
//! E2 = E2_base + offset + c·SF + A_E2 · exp(-w · (t - (T_ovu + δ))²)
//! P4 = P4_base                 + A_P4 · exp(-w · (t - (T_ovu + δ))²)
//! ```
//!
//! The Gaussian bump models the corpus luteum, peaking `δ` (about a week)
//! after the last ovulation.

use std::f64::consts::PI;

use serde::Serialize;

use crate::config::{idx, ParameterSet};

use super::hill_up;

/// Instantaneous hormone levels of one RHS evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HormoneSnapshot {
    /// Estradiol (pg/mL)
    pub e2_pg_per_mL: f64,
    /// Progesterone (ng/mL)
    pub p4_ng_per_mL: f64,
}

/// Closed-form E2/P4 model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HormoneRhs {
    secretion_hill: f64,
    secretion_half_size: f64,
    e2_baseline: f64,
    e2_follicular_offset: f64,
    e2_per_secretion: f64,
    e2_luteal_amplitude: f64,
    p4_baseline: f64,
    p4_luteal_amplitude: f64,
    luteal_width: f64,
    luteal_delay: f64,
}

impl HormoneRhs {
    pub fn from_params(params: &ParameterSet) -> Self {
        Self {
            secretion_hill: params[idx::SECRETION_HILL],
            secretion_half_size: params[idx::SECRETION_HALF_SIZE],
            e2_baseline: params[idx::E2_BASELINE],
            e2_follicular_offset: params[idx::E2_FOLLICULAR_OFFSET],
            e2_per_secretion: params[idx::E2_PER_SECRETION],
            e2_luteal_amplitude: params[idx::E2_LUTEAL_AMPLITUDE],
            p4_baseline: params[idx::P4_BASELINE],
            p4_luteal_amplitude: params[idx::P4_LUTEAL_AMPLITUDE],
            luteal_width: params[idx::LUTEAL_WIDTH],
            luteal_delay: params[idx::LUTEAL_DELAY],
        }
    }

    /// Saturating secretion fraction of one follicle
    #[inline]
    pub fn hill_fraction(&self, size_mm: f64) -> f64 {
        hill_up(size_mm, self.secretion_half_size, self.secretion_hill)
    }

    /// Contribution `hill(size) · size²` of one follicle to `SF / π`
    #[inline]
    pub fn contribution(&self, size_mm: f64) -> f64 {
        let size = super::non_negative(size_mm);
        self.hill_fraction(size) * size * size
    }

    /// Aggregate follicular signal `SF`.
    ///
    /// Callers zero the sizes of follicles that no longer secrete.
    pub fn secretion_signal<I>(&self, sizes: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        PI * sizes.into_iter().map(|s| self.contribution(s)).sum::<f64>()
    }

    /// Luteal bump, 1 at `T_ovu + δ`
    #[inline]
    pub fn luteal_bump(&self, t: f64, ovulation_time: f64) -> f64 {
        let dt = t - (ovulation_time + self.luteal_delay);
        (-self.luteal_width * dt * dt).exp()
    }

    /// Levels from an already aggregated signal
    pub fn from_signal(&self, t: f64, signal: f64, ovulation_time: f64) -> HormoneSnapshot {
        let bump = self.luteal_bump(t, ovulation_time);
        HormoneSnapshot {
            e2_pg_per_mL: self.e2_baseline
                + self.e2_follicular_offset
                + self.e2_per_secretion * signal
                + self.e2_luteal_amplitude * bump,
            p4_ng_per_mL: self.p4_baseline + self.p4_luteal_amplitude * bump,
        }
    }

    /// Follicle-independent levels: the value of [`compute`](Self::compute)
    /// with no secreting follicle.
    pub fn baseline(&self, t: f64, ovulation_time: f64) -> HormoneSnapshot {
        self.from_signal(t, 0.0, ovulation_time)
    }

    /// E2 and P4 at time `t` for the given (already zeroed) active sizes
    pub fn compute(&self, t: f64, active_sizes: &[f64], ovulation_time: f64) -> HormoneSnapshot {
        let signal = self.secretion_signal(active_sizes.iter().copied());
        self.from_signal(t, signal, ovulation_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rhs() -> HormoneRhs {
        HormoneRhs::from_params(&ParameterSet::default())
    }

    #[test]
    fn test_empty_population_gives_baseline() {
        let rhs = rhs();
        for t in [0.0, 3.5, 7.0, 21.0] {
            let levels = rhs.compute(t, &[], 0.0);
            assert_eq!(levels, rhs.baseline(t, 0.0));
        }
    }

    #[test]
    fn test_far_from_ovulation_baseline_is_constant() {
        let params = ParameterSet::default();
        let levels = rhs().compute(200.0, &[], 0.0);
        assert!((levels.e2_pg_per_mL - params[idx::E2_BASELINE]).abs() < 1e-9);
        assert!((levels.p4_ng_per_mL - params[idx::P4_BASELINE]).abs() < 1e-9);
    }

    #[test]
    fn test_luteal_peak_a_week_after_ovulation() {
        let rhs = rhs();
        let peak = rhs.compute(17.0, &[], 10.0).p4_ng_per_mL;
        assert!(peak > rhs.compute(14.0, &[], 10.0).p4_ng_per_mL);
        assert!(peak > rhs.compute(20.0, &[], 10.0).p4_ng_per_mL);
        assert!((rhs.luteal_bump(17.0, 10.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zeroed_follicle_does_not_secrete() {
        let rhs = rhs();
        let with_zero = rhs.compute(5.0, &[12.0, 0.0], -14.0);
        let alone = rhs.compute(5.0, &[12.0], -14.0);
        assert_eq!(with_zero, alone);
    }

    #[test]
    fn test_larger_follicles_raise_e2() {
        let rhs = rhs();
        let small = rhs.compute(5.0, &[4.0], -14.0).e2_pg_per_mL;
        let large = rhs.compute(5.0, &[16.0], -14.0).e2_pg_per_mL;
        assert!(large > small);
    }
}
