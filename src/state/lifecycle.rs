//! Follicle lifecycle state machine.
//!
//! ```text
//! Growing ──┬──> MarkedForDecline ──> Atretic (terminal)
//! Dominant ─┤
//!           └──> Ovulated (terminal, registry-driven)
//! ```
//!
//! Evaluated once per accepted step for every active follicle, against the
//! raw growth rate `X` of that step. Thresholds are compared to the rate
//! rather than to size: size alone cannot tell a slow healthy follicle from
//! a stalled one. The age and grace-period conditions keep a single noisy
//! step from flipping a follicle's fate.

use std::fmt;

use crate::config::{idx, ParameterSet};

use super::follicle::{Destiny, FollicleId, FollicleRecord};

/// Threshold constants of the state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifecycleThresholds {
    /// `X` at or below this always starts decline (mm/day)
    pub low_growth: f64,
    /// `X` at or below this starts decline once the age/grace rules hold (mm/day)
    pub mid_growth: f64,
    /// Age after which a slow Growing follicle declines (days)
    pub decline_grace_period: f64,
    /// Age after which a slow Dominant follicle declines (days)
    pub max_dominant_age: f64,
    /// Decline duration after which the follicle turns Atretic (days)
    pub max_decline_duration: f64,
    /// Shrinkage (oldest minus newest size) that forces decline (mm)
    pub stagnation_span: f64,
}

impl LifecycleThresholds {
    pub fn from_params(params: &ParameterSet) -> Self {
        Self {
            low_growth: params[idx::LOW_GROWTH_THRESHOLD],
            mid_growth: params[idx::MID_GROWTH_THRESHOLD],
            decline_grace_period: params[idx::DECLINE_GRACE_PERIOD],
            max_dominant_age: params[idx::MAX_DOMINANT_AGE],
            max_decline_duration: params[idx::MAX_DECLINE_DURATION],
            stagnation_span: params[idx::STAGNATION_SPAN],
        }
    }
}

/// Why a follicle changed its destiny
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionReason {
    LowGrowth,
    DominantExhausted,
    GracePeriodElapsed,
    Stagnation,
    DeclineExpired,
    Superseded,
    Selected,
    Ovulation,
    Retired,
}

/// A recorded destiny change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub id: FollicleId,
    pub time: f64,
    pub from: Destiny,
    pub to: Destiny,
    pub reason: TransitionReason,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "follicle {} {:?} -> {:?} at t={:.3} ({:?})",
            self.id, self.from, self.to, self.time, self.reason
        )
    }
}

/// Which decline rule, if any, fires for a Growing/Dominant follicle
fn decline_reason(
    record: &FollicleRecord,
    t: f64,
    growth: f64,
    thresholds: &LifecycleThresholds,
) -> Option<TransitionReason> {
    if growth <= thresholds.low_growth {
        return Some(TransitionReason::LowGrowth);
    }
    if growth <= thresholds.mid_growth {
        match record.destiny {
            Destiny::Dominant if record.age(t) >= thresholds.max_dominant_age => {
                return Some(TransitionReason::DominantExhausted);
            }
            Destiny::Growing => {
                // Measured from a previous decline mark if one exists
                let reference = record.decline_start_time.unwrap_or(record.activation_time);
                if t - reference >= thresholds.decline_grace_period {
                    return Some(TransitionReason::GracePeriodElapsed);
                }
            }
            _ => {}
        }
    }
    if record.shrinkage() > thresholds.stagnation_span {
        return Some(TransitionReason::Stagnation);
    }
    None
}

/// Apply the decline rules to one follicle.
///
/// Terminal follicles are never touched.
pub fn evaluate(
    record: &mut FollicleRecord,
    t: f64,
    growth: f64,
    thresholds: &LifecycleThresholds,
) -> Option<Transition> {
    let from = record.destiny;
    let reason = match from {
        Destiny::Atretic | Destiny::Ovulated => return None,
        Destiny::MarkedForDecline => {
            let expired = record
                .decline_duration(t)
                .map_or(false, |d| d >= thresholds.max_decline_duration);
            if !expired || !record.expire_decline() {
                return None;
            }
            TransitionReason::DeclineExpired
        }
        Destiny::Growing | Destiny::Dominant => {
            let reason = decline_reason(record, t, growth, thresholds)?;
            record.mark_for_decline(t);
            reason
        }
    };

    Some(Transition {
        id: record.id,
        time: t,
        from,
        to: record.destiny,
        reason,
    })
}
