//! Endocrine right-hand side of the cycle ODE.
//!
//! This module couples the follicle population to the hormone system:
//! - Ovarian secretion (E2, P4) from the active follicle sizes
//! - Follicle growth law with lifecycle overrides
//! - GnRH / LH / FSH pituitary dynamics and ovarian receptor binding
//!
//! Every component here is a pure function of `(t, y)` and the frozen
//! registry; nothing is cached across evaluations.
//!
//! References:
//! - Röblitz S et al. J Theor Biol. 2013;321:8-27 (GynCycle)
//! - Fischer-Holzhausen S, Röblitz S. J Theor Biol. 2022;547:111150

pub mod follicle_growth;
pub mod hormones;
pub mod pituitary;
pub mod system;

pub use follicle_growth::{effective_size, EvaluationMode, FollicleGrowthRhs, GrowthTerms};
pub use hormones::{HormoneRhs, HormoneSnapshot};
pub use pituitary::PituitaryRhs;
pub use system::CycleOdeSystem;

/// Clamp a concentration at zero without hiding NaN
#[inline]
pub(crate) fn non_negative(x: f64) -> f64 {
    if x < 0.0 {
        0.0
    } else {
        x
    }
}

/// Stimulatory Hill function `x^n / (x^n + k^n)`
#[inline]
pub fn hill_up(x: f64, k: f64, n: f64) -> f64 {
    let xn = non_negative(x).powf(n);
    xn / (xn + k.powf(n))
}

/// Inhibitory Hill function `k^n / (x^n + k^n)`
#[inline]
pub fn hill_down(x: f64, k: f64, n: f64) -> f64 {
    let kn = k.powf(n);
    kn / (non_negative(x).powf(n) + kn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hill_half_saturation() {
        assert!((hill_up(2.0, 2.0, 3.0) - 0.5).abs() < 1e-12);
        assert!((hill_down(2.0, 2.0, 3.0) - 0.5).abs() < 1e-12);
        assert!((hill_up(0.7, 0.3, 4.0) + hill_down(0.7, 0.3, 4.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_negative_input_clamped() {
        assert_eq!(hill_up(-1.0, 1.0, 2.5), 0.0);
        assert_eq!(hill_down(-1.0, 1.0, 2.5), 1.0);
    }

    #[test]
    fn test_nan_propagates() {
        assert!(hill_up(f64::NAN, 1.0, 2.0).is_nan());
        assert!(hill_up(1.0, f64::NAN, 2.0).is_nan());
    }
}
