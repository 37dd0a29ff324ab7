//! Optical constants and coefficient data
//!
//! Pure-water coefficients and the spectral shape of pigment absorption at the
//! wavelengths of the attenuation spectrum, plus the conversion constants of the
//! Case-2 model.

use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Water absorption coefficients at different wavelengths (nm)
/// Values represent absorption coefficient in m^-1
/// Data from Pope and Fry (1997)
/// https://oceancolor.gsfc.nasa.gov/docs/rsr/water_coef.txt
pub static AW: LazyLock<BTreeMap<u32, f64>> = LazyLock::new(|| {
    BTreeMap::from([
        (412, 0.00455056),
        (443, 0.00706914),
        (490, 0.015),
        (510, 0.0325),
        (560, 0.0619),
        (620, 0.2755),
        (664, 0.429),
        (680, 0.465),
    ])
});

/// Water backscattering coefficients at different wavelengths (nm)
/// Values represent backscattering coefficient in m^-1
/// Half the pure sea water scattering of Morel (1974), `0.00144 (500/λ)^4.32`
pub static BBW: LazyLock<BTreeMap<u32, f64>> = LazyLock::new(|| {
    BTreeMap::from([
        (412, 0.003325),
        (443, 0.002436175),
        (490, 0.001582255),
        (510, 0.001333585),
        (560, 0.00088255),
        (620, 0.00056857),
        (664, 0.00042281),
        (680, 0.00038148),
    ])
});

/// Pigment absorption relative to its value at 443 nm (dimensionless)
/// Derived from the specific absorption spectra of Bricaud et al. (1995, 1998)
pub static APH_NORMALIZED: LazyLock<BTreeMap<u32, f64>> = LazyLock::new(|| {
    BTreeMap::from([
        (412, 0.881642),
        (443, 1.0),
        (490, 0.625220),
        (510, 0.396904),
        (560, 0.140),
        (620, 0.130),
        (664, 0.305),
        (680, 0.386),
    ])
});

/// Reference wavelength of the Case-2 absorption outputs (nm)
pub const LAMBDA_0: u32 = 443;

/// Spectral slope for gelbstoff (CDOM) absorption (nm^-1)
/// Standard QAA algorithm parameter from Lee et al. (2002)
pub const S: f64 = 0.015;

/// Conversion from the network's particle scattering to `bb_spm`
pub const BTSM_TO_SPM_FACTOR: f64 = 0.01;

/// Sun zenith dependency of the Kd parameterisation (per degree)
pub const KD_SUN_ZENITH_COEF: f64 = 0.005;
/// Backscattering terms of the Kd parameterisation (Lee et al., 2005)
pub const KD_BB_SCALE: f64 = 4.18;
pub const KD_BB_AMPLITUDE: f64 = 0.52;
pub const KD_BB_DECAY: f64 = 10.8;

/// Turbidity index (FNU) from the particle scattering, `T_A * b_tsm^T_B`
pub const TURBIDITY_A: f64 = 26.910;
pub const TURBIDITY_B: f64 = 0.5996;
