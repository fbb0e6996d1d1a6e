//! Follicle records and lifecycle tags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable follicle identity, assigned at creation and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FollicleId(pub u32);

impl fmt::Display for FollicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle tag selecting the derivative formula of a follicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Destiny {
    /// Follows the growth law
    #[default]
    Growing,
    /// Selected as the leading follicle of the cycle
    Dominant,
    /// Accelerating decay since `decline_start_time`
    MarkedForDecline,
    /// Terminal loss. Collapses at once unless it came from an expired
    /// decline, which keeps decaying at the accelerating rate.
    Atretic,
    /// Released at ovulation (terminal)
    Ovulated,
}

impl Destiny {
    /// Terminal tags are sticky
    pub fn is_terminal(self) -> bool {
        matches!(self, Destiny::Atretic | Destiny::Ovulated)
    }

    /// Whether the follicle still contributes to E2 secretion and crowding.
    ///
    /// Only Growing and Dominant follicles do.
    pub fn secretes(self) -> bool {
        matches!(self, Destiny::Growing | Destiny::Dominant)
    }
}

/// One (time, size) observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeSample {
    pub time: f64,
    pub size_mm: f64,
}

/// Bookkeeping for one follicle over its whole life
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollicleRecord {
    pub id: FollicleId,
    /// Time the follicle entered the active population (days)
    pub activation_time: f64,
    /// Append-only size history, one sample per accepted step while active
    size_history: Vec<SizeSample>,
    pub destiny: Destiny,
    /// Set once, on the first decline mark
    pub decline_start_time: Option<f64>,
    /// Individual threshold of the FSH sensitivity gate
    pub fsh_sensitivity: f64,
    /// Time the follicle left the active window
    pub retired_at: Option<f64>,
    /// Atretic because its decline ran out, not by self-destruct
    #[serde(default)]
    pub decline_expired: bool,
}

impl FollicleRecord {
    pub fn new(id: FollicleId, activation_time: f64, size_mm: f64, fsh_sensitivity: f64) -> Self {
        Self {
            id,
            activation_time,
            size_history: vec![SizeSample {
                time: activation_time,
                size_mm,
            }],
            destiny: Destiny::Growing,
            decline_start_time: None,
            fsh_sensitivity,
            retired_at: None,
            decline_expired: false,
        }
    }

    /// Time since activation
    #[inline]
    pub fn age(&self, t: f64) -> f64 {
        t - self.activation_time
    }

    /// Time since the first decline mark
    pub fn decline_duration(&self, t: f64) -> Option<f64> {
        self.decline_start_time.map(|start| t - start)
    }

    pub fn record_size(&mut self, time: f64, size_mm: f64) {
        self.size_history.push(SizeSample { time, size_mm });
    }

    pub fn size_history(&self) -> &[SizeSample] {
        &self.size_history
    }

    pub fn latest_size(&self) -> f64 {
        self.size_history.last().map(|s| s.size_mm).unwrap_or(0.0)
    }

    pub fn peak_size(&self) -> f64 {
        self.size_history
            .iter()
            .map(|s| s.size_mm)
            .fold(0.0, f64::max)
    }

    /// Oldest recorded size minus the newest one (positive when shrinking)
    pub fn shrinkage(&self) -> f64 {
        match (self.size_history.first(), self.size_history.last()) {
            (Some(first), Some(last)) => first.size_mm - last.size_mm,
            _ => 0.0,
        }
    }

    /// Move into decline. The start time is only recorded the first time.
    ///
    /// Returns `true` if the destiny changed.
    pub fn mark_for_decline(&mut self, t: f64) -> bool {
        if self.destiny.is_terminal() || self.destiny == Destiny::MarkedForDecline {
            return false;
        }
        if self.decline_start_time.is_none() {
            self.decline_start_time = Some(t);
        }
        self.destiny = Destiny::MarkedForDecline;
        true
    }

    /// Tag for immediate collapse. No-op on terminal follicles.
    pub fn self_destruct(&mut self) -> bool {
        if self.destiny.is_terminal() {
            return false;
        }
        self.destiny = Destiny::Atretic;
        true
    }

    /// End an expired decline. The follicle becomes Atretic but keeps its
    /// decline start, so its decay rate is unchanged.
    pub fn expire_decline(&mut self) -> bool {
        if self.destiny != Destiny::MarkedForDecline {
            return false;
        }
        self.destiny = Destiny::Atretic;
        self.decline_expired = true;
        true
    }

    pub fn make_dominant(&mut self) -> bool {
        if self.destiny != Destiny::Growing {
            return false;
        }
        self.destiny = Destiny::Dominant;
        true
    }

    pub fn ovulate(&mut self) -> bool {
        if self.destiny.is_terminal() {
            return false;
        }
        self.destiny = Destiny::Ovulated;
        true
    }
}
