//! Layout of the fixed (non-follicle) part of the state vector.
//!
//! The state vector holds `N_active` follicle sizes followed by these
//! slots, in this order. The first slot is the FSH–receptor complex, the
//! "FSH residual" that gates follicle growth.

/// Number of hormone/pituitary/receptor slots after the follicle sizes
pub const FIXED_STATE_SIZE: usize = 15;

/// Named slot of the fixed block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HormoneSlot {
    FshReceptorComplex = 0,
    FshReceptorFree = 1,
    FshReceptorDesensitized = 2,
    LhPool = 3,
    LhBlood = 4,
    FshPool = 5,
    FshBlood = 6,
    LhReceptorFree = 7,
    LhReceptorComplex = 8,
    LhReceptorDesensitized = 9,
    Gnrh = 10,
    GnrhReceptorActive = 11,
    GnrhReceptorInactive = 12,
    GnrhComplexActive = 13,
    GnrhComplexInactive = 14,
}

impl HormoneSlot {
    pub const ALL: [HormoneSlot; FIXED_STATE_SIZE] = [
        HormoneSlot::FshReceptorComplex,
        HormoneSlot::FshReceptorFree,
        HormoneSlot::FshReceptorDesensitized,
        HormoneSlot::LhPool,
        HormoneSlot::LhBlood,
        HormoneSlot::FshPool,
        HormoneSlot::FshBlood,
        HormoneSlot::LhReceptorFree,
        HormoneSlot::LhReceptorComplex,
        HormoneSlot::LhReceptorDesensitized,
        HormoneSlot::Gnrh,
        HormoneSlot::GnrhReceptorActive,
        HormoneSlot::GnrhReceptorInactive,
        HormoneSlot::GnrhComplexActive,
        HormoneSlot::GnrhComplexInactive,
    ];

    /// Offset inside the fixed block
    #[inline]
    pub fn offset(self) -> usize {
        self as usize
    }

    pub fn from_offset(offset: usize) -> Option<Self> {
        Self::ALL.get(offset).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            HormoneSlot::FshReceptorComplex => "fsh_receptor_complex",
            HormoneSlot::FshReceptorFree => "fsh_receptor_free",
            HormoneSlot::FshReceptorDesensitized => "fsh_receptor_desensitized",
            HormoneSlot::LhPool => "lh_pool",
            HormoneSlot::LhBlood => "lh_blood",
            HormoneSlot::FshPool => "fsh_pool",
            HormoneSlot::FshBlood => "fsh_blood",
            HormoneSlot::LhReceptorFree => "lh_receptor_free",
            HormoneSlot::LhReceptorComplex => "lh_receptor_complex",
            HormoneSlot::LhReceptorDesensitized => "lh_receptor_desensitized",
            HormoneSlot::Gnrh => "gnrh",
            HormoneSlot::GnrhReceptorActive => "gnrh_receptor_active",
            HormoneSlot::GnrhReceptorInactive => "gnrh_receptor_inactive",
            HormoneSlot::GnrhComplexActive => "gnrh_complex_active",
            HormoneSlot::GnrhComplexInactive => "gnrh_complex_inactive",
        }
    }
}

/// Early-follicular starting values for the fixed block.
///
/// Receptor fractions sum to one per receptor species; pools in IU,
/// blood levels in IU/L.
pub fn default_hormone_state() -> [f64; FIXED_STATE_SIZE] {
    let mut block = [0.0; FIXED_STATE_SIZE];
    block[HormoneSlot::FshReceptorComplex.offset()] = 0.68;
    block[HormoneSlot::FshReceptorFree.offset()] = 0.15;
    block[HormoneSlot::FshReceptorDesensitized.offset()] = 0.17;
    block[HormoneSlot::LhPool.offset()] = 330.0;
    block[HormoneSlot::LhBlood.offset()] = 7.0;
    block[HormoneSlot::FshPool.offset()] = 330.0;
    block[HormoneSlot::FshBlood.offset()] = 7.5;
    block[HormoneSlot::LhReceptorFree.offset()] = 0.32;
    block[HormoneSlot::LhReceptorComplex.offset()] = 0.23;
    block[HormoneSlot::LhReceptorDesensitized.offset()] = 0.45;
    block[HormoneSlot::Gnrh.offset()] = 0.13;
    block[HormoneSlot::GnrhReceptorActive.offset()] = 0.5;
    block[HormoneSlot::GnrhReceptorInactive.offset()] = 0.3;
    block[HormoneSlot::GnrhComplexActive.offset()] = 0.1;
    block[HormoneSlot::GnrhComplexInactive.offset()] = 0.1;
    block
}
