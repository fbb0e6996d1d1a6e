//! Positional physiological parameter set.
//!
//! The model is driven by one flat, ordered vector of constants. Consumers
//! index into it read-only through the named constants in [`idx`]; the
//! vector is validated once at construction and never mutated afterwards.
//!
//! Values for the hormone block follow the GnRH/LH/FSH receptor model of
//! Röblitz et al. (J Theor Biol 2013;321:8-27); the follicle growth law and
//! lifecycle thresholds follow Fischer-Holzhausen & Röblitz
//! (J Theor Biol 2022;547:111150).

use std::ops::Index;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};

/// Number of entries in a [`ParameterSet`]
pub const PARAMETER_COUNT: usize = 76;

/// Named positions inside a [`ParameterSet`].
pub mod idx {
    // GnRH pulse generator and pituitary receptor
    pub const GNRH_PULSE_FREQUENCY: usize = 0;
    pub const GNRH_FREQ_P4_HALF: usize = 1;
    pub const GNRH_FREQ_P4_HILL: usize = 2;
    pub const GNRH_PULSE_MASS: usize = 3;
    pub const GNRH_CLEARANCE: usize = 4;
    pub const GNRH_BINDING: usize = 5;
    pub const GNRH_UNBINDING: usize = 6;
    pub const GNRH_RECEPTOR_ACTIVATION: usize = 7;
    pub const GNRH_RECEPTOR_INACTIVATION: usize = 8;
    pub const GNRH_COMPLEX_ACTIVATION: usize = 9;
    pub const GNRH_COMPLEX_INACTIVATION: usize = 10;

    // LH synthesis, release, clearance and ovarian receptor
    pub const LH_SYNTHESIS_BASE: usize = 11;
    pub const LH_SYNTHESIS_E2: usize = 12;
    pub const LH_E2_HALF: usize = 13;
    pub const LH_E2_HILL: usize = 14;
    pub const LH_P4_HALF: usize = 15;
    pub const LH_RELEASE_BASE: usize = 16;
    pub const LH_RELEASE_GNRH: usize = 17;
    pub const LH_GNRH_HALF: usize = 18;
    pub const LH_CLEARANCE: usize = 19;
    pub const LH_RECEPTOR_BINDING: usize = 20;
    pub const LH_RECEPTOR_DESENSITIZATION: usize = 21;
    pub const LH_RECEPTOR_RECYCLING: usize = 22;

    // FSH synthesis, release, clearance and ovarian receptor
    pub const FSH_SYNTHESIS: usize = 23;
    pub const FSH_E2_HALF: usize = 24;
    pub const FSH_E2_HILL: usize = 25;
    pub const FSH_P4_HALF: usize = 26;
    pub const FSH_RELEASE_BASE: usize = 27;
    pub const FSH_RELEASE_GNRH: usize = 28;
    pub const FSH_GNRH_HALF: usize = 29;
    pub const FSH_CLEARANCE: usize = 30;
    pub const FSH_RECEPTOR_BINDING: usize = 31;
    pub const FSH_RECEPTOR_DESENSITIZATION: usize = 32;
    pub const FSH_RECEPTOR_RECYCLING: usize = 33;

    pub const BLOOD_VOLUME: usize = 34;

    // Follicle growth law
    pub const COMPETITION_EXPONENT: usize = 35;
    pub const GROWTH_RATE: usize = 36;
    pub const MAX_FOLLICLE_SIZE: usize = 37;
    pub const OWN_COMPETITION_SHARE: usize = 38;
    pub const MAX_SELF_HARM: usize = 39;
    pub const GROWTH_P4_HALF: usize = 40;
    pub const GROWTH_P4_HILL: usize = 41;
    pub const GROWTH_FSH_HALF: usize = 42;
    pub const GROWTH_FSH_HILL: usize = 43;
    pub const SELF_HARM_FSH_HALF: usize = 44;
    pub const SELF_HARM_FSH_HILL: usize = 45;
    pub const SENSITIVITY_HILL: usize = 46;
    pub const DECLINE_ACCELERATION: usize = 47;
    pub const SELF_DESTRUCT_RATE: usize = 48;

    // Lifecycle thresholds
    pub const LOW_GROWTH_THRESHOLD: usize = 49;
    pub const MID_GROWTH_THRESHOLD: usize = 50;
    pub const DECLINE_GRACE_PERIOD: usize = 51;
    pub const MAX_DOMINANT_AGE: usize = 52;
    pub const MAX_DECLINE_DURATION: usize = 53;
    pub const STAGNATION_SPAN: usize = 54;
    pub const RETIREMENT_SIZE: usize = 55;

    // Ovarian secretion (E2, P4)
    pub const SECRETION_HILL: usize = 56;
    pub const SECRETION_HALF_SIZE: usize = 57;
    pub const E2_FOLLICULAR_OFFSET: usize = 58;
    pub const E2_PER_SECRETION: usize = 59;
    pub const E2_LUTEAL_AMPLITUDE: usize = 60;
    pub const LUTEAL_WIDTH: usize = 61;
    pub const P4_LUTEAL_AMPLITUDE: usize = 62;
    pub const LUTEAL_DELAY: usize = 63;

    // Registry rules: recruitment, dominance, ovulation
    pub const RECRUITMENT_RATE: usize = 64;
    pub const RECRUITMENT_SIZE: usize = 65;
    pub const RECRUITMENT_SIZE_SPREAD: usize = 66;
    pub const FSH_SENSITIVITY_MEAN: usize = 67;
    pub const FSH_SENSITIVITY_SPREAD: usize = 68;
    pub const DOMINANCE_SIZE: usize = 69;
    pub const OVULATION_SIZE: usize = 70;
    pub const OVULATION_LH_THRESHOLD: usize = 71;
    pub const SUPERSEDE_SIZE: usize = 72;
    pub const RECRUITMENT_FSH_THRESHOLD: usize = 73;

    pub const E2_BASELINE: usize = 74;
    pub const P4_BASELINE: usize = 75;
}

/// Name and default value of every entry, in positional order.
const TABLE: [(&str, f64); PARAMETER_COUNT] = [
    // GnRH (pulses/day, ng/mL, 1/day)
    ("gnrh_pulse_frequency", 16.0),
    ("gnrh_freq_p4_half", 2.0),
    ("gnrh_freq_p4_hill", 2.0),
    ("gnrh_pulse_mass", 0.2),
    ("gnrh_clearance", 20.0),
    ("gnrh_binding", 5.0),
    ("gnrh_unbinding", 1.0),
    ("gnrh_receptor_activation", 2.0),
    ("gnrh_receptor_inactivation", 1.0),
    ("gnrh_complex_activation", 1.0),
    ("gnrh_complex_inactivation", 2.0),
    // LH (IU/day, pg/mL, 1/day)
    ("lh_synthesis_base", 500.0),
    ("lh_synthesis_e2", 8000.0),
    ("lh_e2_half", 200.0),
    ("lh_e2_hill", 8.0),
    ("lh_p4_half", 1.0),
    ("lh_release_base", 0.5),
    ("lh_release_gnrh", 5.0),
    ("lh_gnrh_half", 0.2),
    ("lh_clearance", 14.0),
    ("lh_receptor_binding", 0.1),
    ("lh_receptor_desensitization", 1.0),
    ("lh_receptor_recycling", 0.5),
    // FSH (IU/day, pg/mL, ng/mL, 1/day)
    ("fsh_synthesis", 400.0),
    ("fsh_e2_half", 150.0),
    ("fsh_e2_hill", 2.0),
    ("fsh_p4_half", 2.0),
    ("fsh_release_base", 0.5),
    ("fsh_release_gnrh", 2.0),
    ("fsh_gnrh_half", 0.2),
    ("fsh_clearance", 8.0),
    ("fsh_receptor_binding", 0.3),
    ("fsh_receptor_desensitization", 0.5),
    ("fsh_receptor_recycling", 2.0),
    // Blood volume (L)
    ("blood_volume", 5.0),
    // Follicle growth (mm, 1/day)
    ("competition_exponent", 2.0),
    ("growth_rate", 0.02),
    ("max_follicle_size", 25.0),
    ("own_competition_share", 1.0),
    ("max_self_harm", 2.0e-4),
    ("growth_p4_half", 3.0),
    ("growth_p4_hill", 3.0),
    ("growth_fsh_half", 0.95),
    ("growth_fsh_hill", 5.0),
    ("self_harm_fsh_half", 0.55),
    ("self_harm_fsh_hill", 10.0),
    ("sensitivity_hill", 4.0),
    ("decline_acceleration", 0.05),
    ("self_destruct_rate", 1000.0),
    // Lifecycle thresholds (mm/day, days, mm)
    ("low_growth_threshold", 0.0),
    ("mid_growth_threshold", 0.05),
    ("decline_grace_period", 12.0),
    ("max_dominant_age", 25.0),
    ("max_decline_duration", 20.0),
    ("stagnation_span", 1.0),
    ("retirement_size", 0.1),
    // Secretion (E2 pg/mL, P4 ng/mL, days)
    ("secretion_hill", 5.0),
    ("secretion_half_size", 10.0),
    ("e2_follicular_offset", 0.0),
    ("e2_per_secretion", 0.2),
    ("e2_luteal_amplitude", 100.0),
    ("luteal_width", 0.05),
    ("p4_luteal_amplitude", 12.0),
    ("luteal_delay", 7.0),
    // Registry rules (1/day, mm, IU/L)
    ("recruitment_rate", 1.0),
    ("recruitment_size", 2.0),
    ("recruitment_size_spread", 0.2),
    ("fsh_sensitivity_mean", 0.55),
    ("fsh_sensitivity_spread", 0.05),
    ("dominance_size", 10.0),
    ("ovulation_size", 13.0),
    ("ovulation_lh_threshold", 20.0),
    ("supersede_size", 12.0),
    ("recruitment_fsh_threshold", 0.0),
    // Baselines
    ("e2_baseline", 20.0),
    ("p4_baseline", 0.5),
];

/// Entries that must be strictly positive (rates, half-saturation
/// constants, Hill exponents, physical sizes).
const STRICTLY_POSITIVE: &[usize] = &[
    idx::GNRH_FREQ_P4_HALF,
    idx::GNRH_FREQ_P4_HILL,
    idx::GNRH_CLEARANCE,
    idx::LH_E2_HALF,
    idx::LH_E2_HILL,
    idx::LH_P4_HALF,
    idx::LH_GNRH_HALF,
    idx::LH_CLEARANCE,
    idx::FSH_E2_HALF,
    idx::FSH_E2_HILL,
    idx::FSH_P4_HALF,
    idx::FSH_GNRH_HALF,
    idx::FSH_CLEARANCE,
    idx::BLOOD_VOLUME,
    idx::COMPETITION_EXPONENT,
    idx::MAX_FOLLICLE_SIZE,
    idx::GROWTH_P4_HALF,
    idx::GROWTH_P4_HILL,
    idx::GROWTH_FSH_HALF,
    idx::GROWTH_FSH_HILL,
    idx::SELF_HARM_FSH_HALF,
    idx::SELF_HARM_FSH_HILL,
    idx::SENSITIVITY_HILL,
    idx::RETIREMENT_SIZE,
    idx::SECRETION_HILL,
    idx::SECRETION_HALF_SIZE,
    idx::LUTEAL_WIDTH,
    idx::RECRUITMENT_SIZE,
    idx::FSH_SENSITIVITY_MEAN,
];

/// Entries allowed to be negative.
const SIGNED: &[usize] = &[idx::LOW_GROWTH_THRESHOLD, idx::MID_GROWTH_THRESHOLD];

/// Immutable, validated vector of model constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct ParameterSet {
    values: Vec<f64>,
}

impl ParameterSet {
    /// Validate and wrap a positional vector.
    pub fn new(values: Vec<f64>) -> Result<Self> {
        validate(&values)?;
        Ok(Self { values })
    }

    /// Copy of this set with one entry replaced, revalidated.
    pub fn with(&self, index: usize, value: f64) -> Result<Self> {
        if index >= PARAMETER_COUNT {
            return Err(SimulationError::InvalidParameterSet(format!(
                "index {} out of range (expected < {})",
                index, PARAMETER_COUNT
            )));
        }
        let mut values = self.values.clone();
        values[index] = value;
        Self::new(values)
    }

    /// Load a flat JSON array of constants. Invalid files are rejected.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading parameter file {:?}", path))?;
        let params: Self = serde_json::from_str(&contents)
            .with_context(|| format!("parsing parameter file {:?}", path))?;
        log::info!("Loaded {} parameters from {:?}", params.len(), path);
        Ok(params)
    }

    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        self.values[index]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Human-readable name of a position
    pub fn name(index: usize) -> &'static str {
        TABLE.get(index).map(|(name, _)| *name).unwrap_or("unknown")
    }

    /// Position of a named entry
    pub fn index_of(name: &str) -> Option<usize> {
        TABLE.iter().position(|(n, _)| *n == name)
    }
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            values: TABLE.iter().map(|(_, value)| *value).collect(),
        }
    }
}

impl Index<usize> for ParameterSet {
    type Output = f64;

    #[inline]
    fn index(&self, index: usize) -> &f64 {
        &self.values[index]
    }
}

impl TryFrom<Vec<f64>> for ParameterSet {
    type Error = SimulationError;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::new(values)
    }
}

impl From<ParameterSet> for Vec<f64> {
    fn from(params: ParameterSet) -> Self {
        params.values
    }
}

fn validate(values: &[f64]) -> Result<()> {
    if values.len() != PARAMETER_COUNT {
        return Err(SimulationError::InvalidParameterSet(format!(
            "expected {} entries, got {}",
            PARAMETER_COUNT,
            values.len()
        )));
    }

    for (i, &value) in values.iter().enumerate() {
        let name = ParameterSet::name(i);
        if !value.is_finite() {
            return Err(SimulationError::InvalidParameterSet(format!(
                "{} (#{}) is not finite: {}",
                name, i, value
            )));
        }
        if STRICTLY_POSITIVE.contains(&i) {
            if value <= 0.0 {
                return Err(SimulationError::InvalidParameterSet(format!(
                    "{} (#{}) must be > 0, got {}",
                    name, i, value
                )));
            }
        } else if !SIGNED.contains(&i) && value < 0.0 {
            return Err(SimulationError::InvalidParameterSet(format!(
                "{} (#{}) must be >= 0, got {}",
                name, i, value
            )));
        }
    }

    let low = values[idx::LOW_GROWTH_THRESHOLD];
    let mid = values[idx::MID_GROWTH_THRESHOLD];
    if low > mid {
        return Err(SimulationError::InvalidParameterSet(format!(
            "low_growth_threshold ({}) exceeds mid_growth_threshold ({})",
            low, mid
        )));
    }

    Ok(())
}
