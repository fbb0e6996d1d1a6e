//! GnRH / LH / FSH dynamics and ovarian receptor binding.
//!
//! Derivatives of the fixed state block (see [`HormoneSlot`]):
//!
//! - GnRH is released in pulses whose frequency is inhibited by P4. It binds
//!   pituitary receptors in an active and an inactive conformation; receptors
//!   and complexes switch between the two. Total receptor is conserved.
//! - LH synthesis is stimulated by E2 through a steep Hill switch (the surge)
//!   and inhibited by P4. FSH synthesis is inhibited by both.
//! - Release from the pituitary pools is basal plus a term saturating in the
//!   active GnRH–receptor complex; blood levels are the released mass over
//!   the blood volume, minus clearance and receptor binding.
//! - Ovarian LH and FSH receptors cycle free → bound → desensitised → free.
//!
//! All concentrations are clamped at zero before entering a Hill term.

use crate::config::{idx, ParameterSet};
use crate::state::{HormoneSlot, FIXED_STATE_SIZE};

use super::hormones::HormoneSnapshot;
use super::{hill_down, hill_up, non_negative};

/// Hill exponent of the GnRH-driven release terms
const RELEASE_GNRH_HILL: f64 = 2.0;

#[inline]
fn slot(block: &[f64], s: HormoneSlot) -> f64 {
    non_negative(block[s.offset()])
}

/// Kinetic constants of the hypothalamic-pituitary block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PituitaryRhs {
    gnrh_frequency: f64,
    gnrh_freq_p4_half: f64,
    gnrh_freq_p4_hill: f64,
    gnrh_pulse_mass: f64,
    gnrh_clearance: f64,
    gnrh_binding: f64,
    gnrh_unbinding: f64,
    receptor_activation: f64,
    receptor_inactivation: f64,
    complex_activation: f64,
    complex_inactivation: f64,

    lh_synthesis_base: f64,
    lh_synthesis_e2: f64,
    lh_e2_half: f64,
    lh_e2_hill: f64,
    lh_p4_half: f64,
    lh_release_base: f64,
    lh_release_gnrh: f64,
    lh_gnrh_half: f64,
    lh_clearance: f64,
    lh_binding: f64,
    lh_desensitization: f64,
    lh_recycling: f64,

    fsh_synthesis: f64,
    fsh_e2_half: f64,
    fsh_e2_hill: f64,
    fsh_p4_half: f64,
    fsh_release_base: f64,
    fsh_release_gnrh: f64,
    fsh_gnrh_half: f64,
    fsh_clearance: f64,
    fsh_binding: f64,
    fsh_desensitization: f64,
    fsh_recycling: f64,

    blood_volume: f64,
}

impl PituitaryRhs {
    pub fn from_params(params: &ParameterSet) -> Self {
        Self {
            gnrh_frequency: params[idx::GNRH_PULSE_FREQUENCY],
            gnrh_freq_p4_half: params[idx::GNRH_FREQ_P4_HALF],
            gnrh_freq_p4_hill: params[idx::GNRH_FREQ_P4_HILL],
            gnrh_pulse_mass: params[idx::GNRH_PULSE_MASS],
            gnrh_clearance: params[idx::GNRH_CLEARANCE],
            gnrh_binding: params[idx::GNRH_BINDING],
            gnrh_unbinding: params[idx::GNRH_UNBINDING],
            receptor_activation: params[idx::GNRH_RECEPTOR_ACTIVATION],
            receptor_inactivation: params[idx::GNRH_RECEPTOR_INACTIVATION],
            complex_activation: params[idx::GNRH_COMPLEX_ACTIVATION],
            complex_inactivation: params[idx::GNRH_COMPLEX_INACTIVATION],

            lh_synthesis_base: params[idx::LH_SYNTHESIS_BASE],
            lh_synthesis_e2: params[idx::LH_SYNTHESIS_E2],
            lh_e2_half: params[idx::LH_E2_HALF],
            lh_e2_hill: params[idx::LH_E2_HILL],
            lh_p4_half: params[idx::LH_P4_HALF],
            lh_release_base: params[idx::LH_RELEASE_BASE],
            lh_release_gnrh: params[idx::LH_RELEASE_GNRH],
            lh_gnrh_half: params[idx::LH_GNRH_HALF],
            lh_clearance: params[idx::LH_CLEARANCE],
            lh_binding: params[idx::LH_RECEPTOR_BINDING],
            lh_desensitization: params[idx::LH_RECEPTOR_DESENSITIZATION],
            lh_recycling: params[idx::LH_RECEPTOR_RECYCLING],

            fsh_synthesis: params[idx::FSH_SYNTHESIS],
            fsh_e2_half: params[idx::FSH_E2_HALF],
            fsh_e2_hill: params[idx::FSH_E2_HILL],
            fsh_p4_half: params[idx::FSH_P4_HALF],
            fsh_release_base: params[idx::FSH_RELEASE_BASE],
            fsh_release_gnrh: params[idx::FSH_RELEASE_GNRH],
            fsh_gnrh_half: params[idx::FSH_GNRH_HALF],
            fsh_clearance: params[idx::FSH_CLEARANCE],
            fsh_binding: params[idx::FSH_RECEPTOR_BINDING],
            fsh_desensitization: params[idx::FSH_RECEPTOR_DESENSITIZATION],
            fsh_recycling: params[idx::FSH_RECEPTOR_RECYCLING],

            blood_volume: params[idx::BLOOD_VOLUME],
        }
    }

    /// GnRH pulses per day under the given P4 level
    pub fn gnrh_frequency(&self, p4: f64) -> f64 {
        self.gnrh_frequency * hill_down(p4, self.gnrh_freq_p4_half, self.gnrh_freq_p4_hill)
    }

    /// LH synthesis rate (IU/day)
    pub fn lh_synthesis(&self, hormones: HormoneSnapshot) -> f64 {
        (self.lh_synthesis_base
            + self.lh_synthesis_e2 * hill_up(hormones.e2_pg_per_mL, self.lh_e2_half, self.lh_e2_hill))
            * hill_down(hormones.p4_ng_per_mL, self.lh_p4_half, 1.0)
    }

    /// FSH synthesis rate (IU/day)
    pub fn fsh_synthesis(&self, hormones: HormoneSnapshot) -> f64 {
        self.fsh_synthesis
            * hill_down(hormones.e2_pg_per_mL, self.fsh_e2_half, self.fsh_e2_hill)
            * hill_down(hormones.p4_ng_per_mL, self.fsh_p4_half, 1.0)
    }

    /// Derivatives of the fixed block.
    ///
    /// `block` and `out` are the `FIXED_STATE_SIZE` slots after the follicle sizes.
    pub fn compute(&self, block: &[f64], hormones: HormoneSnapshot, out: &mut [f64]) {
        debug_assert_eq!(block.len(), FIXED_STATE_SIZE);
        debug_assert_eq!(out.len(), FIXED_STATE_SIZE);
        use HormoneSlot::*;

        // GnRH and its pituitary receptor
        let g = slot(block, Gnrh);
        let ra = slot(block, GnrhReceptorActive);
        let ri = slot(block, GnrhReceptorInactive);
        let ca = slot(block, GnrhComplexActive);
        let ci = slot(block, GnrhComplexInactive);

        let production = self.gnrh_frequency(hormones.p4_ng_per_mL) * self.gnrh_pulse_mass;
        let bind_a = self.gnrh_binding * g * ra;
        let bind_i = self.gnrh_binding * g * ri;
        let unbind_a = self.gnrh_unbinding * ca;
        let unbind_i = self.gnrh_unbinding * ci;
        let r_switch = self.receptor_inactivation * ra - self.receptor_activation * ri;
        let c_switch = self.complex_inactivation * ca - self.complex_activation * ci;

        out[Gnrh.offset()] =
            production - self.gnrh_clearance * g - bind_a - bind_i + unbind_a + unbind_i;
        out[GnrhReceptorActive.offset()] = -bind_a + unbind_a - r_switch;
        out[GnrhReceptorInactive.offset()] = -bind_i + unbind_i + r_switch;
        out[GnrhComplexActive.offset()] = bind_a - unbind_a - c_switch;
        out[GnrhComplexInactive.offset()] = bind_i - unbind_i + c_switch;

        // LH
        let lh_pool = slot(block, LhPool);
        let lh_blood = slot(block, LhBlood);
        let lh_release = (self.lh_release_base
            + self.lh_release_gnrh * hill_up(ca, self.lh_gnrh_half, RELEASE_GNRH_HILL))
            * lh_pool;
        let lr_free = slot(block, LhReceptorFree);
        let lr_bound = slot(block, LhReceptorComplex);
        let lr_desens = slot(block, LhReceptorDesensitized);
        let lh_bind = self.lh_binding * lh_blood * lr_free;

        out[LhPool.offset()] = self.lh_synthesis(hormones) - lh_release;
        out[LhBlood.offset()] = lh_release / self.blood_volume - self.lh_clearance * lh_blood - lh_bind;
        out[LhReceptorFree.offset()] = -lh_bind + self.lh_recycling * lr_desens;
        out[LhReceptorComplex.offset()] = lh_bind - self.lh_desensitization * lr_bound;
        out[LhReceptorDesensitized.offset()] =
            self.lh_desensitization * lr_bound - self.lh_recycling * lr_desens;

        // FSH
        let fsh_pool = slot(block, FshPool);
        let fsh_blood = slot(block, FshBlood);
        let fsh_release = (self.fsh_release_base
            + self.fsh_release_gnrh * hill_up(ca, self.fsh_gnrh_half, RELEASE_GNRH_HILL))
            * fsh_pool;
        let fr_free = slot(block, FshReceptorFree);
        let fr_bound = slot(block, FshReceptorComplex);
        let fr_desens = slot(block, FshReceptorDesensitized);
        let fsh_bind = self.fsh_binding * fsh_blood * fr_free;

        out[FshPool.offset()] = self.fsh_synthesis(hormones) - fsh_release;
        out[FshBlood.offset()] =
            fsh_release / self.blood_volume - self.fsh_clearance * fsh_blood - fsh_bind;
        out[FshReceptorFree.offset()] = -fsh_bind + self.fsh_recycling * fr_desens;
        out[FshReceptorComplex.offset()] = fsh_bind - self.fsh_desensitization * fr_bound;
        out[FshReceptorDesensitized.offset()] =
            self.fsh_desensitization * fr_bound - self.fsh_recycling * fr_desens;
    }
}
