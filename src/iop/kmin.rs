//! Diffuse attenuation from the retrieved inherent optical properties
//!
//! Total absorption and backscattering are rebuilt per wavelength from the pure
//! water tables and the three retrieved constituents, then turned into Kd with
//! the semi-analytical relation of Lee et al. (2005):
//!
//! ```text
//! a(λ)  = a_w(λ) + a_pig * a_ph(λ) / a_ph(443) + a_gelbstoff * exp(-S (λ - 443))
//! bb(λ) = b_bw(λ) + bb_spm * 443 / λ
//! Kd(λ) = (1 + 0.005 θs) a(λ) + 4.18 (1 - 0.52 exp(-10.8 a(λ))) bb(λ)
//! ```

use crate::iop::constants;

/// Constituents at 443 nm the attenuation model is driven by
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMin {
    pub b_tsm: f64,
    pub a_pig: f64,
    pub a_gelbstoff: f64,
}

/// Attenuation diagnostics of one pixel
#[derive(Debug, Clone, PartialEq)]
pub struct Attenuation {
    /// `(wavelength, Kd)` pairs in ascending wavelength order
    pub kd_spectrum: Vec<(u32, f64)>,
    pub k_min: f64,
    pub z90_max: f64,
    pub kd_490: f64,
    pub turbidity_index: f64,
}

impl KMin {
    pub fn new(b_tsm: f64, a_pig: f64, a_gelbstoff: f64) -> Self {
        Self {
            b_tsm,
            a_pig,
            a_gelbstoff,
        }
    }

    pub fn absorption(&self, wavelength: u32, aw: f64, aph_normalized: f64) -> f64 {
        let gelbstoff_shape =
            (-constants::S * (wavelength as f64 - constants::LAMBDA_0 as f64)).exp();
        aw + self.a_pig * aph_normalized + self.a_gelbstoff * gelbstoff_shape
    }

    pub fn backscattering(&self, wavelength: u32, bbw: f64) -> f64 {
        let bb_spm = self.b_tsm * constants::BTSM_TO_SPM_FACTOR;
        bbw + bb_spm * constants::LAMBDA_0 as f64 / wavelength as f64
    }

    /// Kd for every tabulated wavelength
    pub fn kd_spectrum(&self, sun_zenith: f64) -> Vec<(u32, f64)> {
        let sun_term = 1.0 + constants::KD_SUN_ZENITH_COEF * sun_zenith;

        constants::AW
            .iter()
            .zip(constants::BBW.values())
            .zip(constants::APH_NORMALIZED.values())
            .map(|(((&wavelength, &aw), &bbw), &aph)| {
                let a = self.absorption(wavelength, aw, aph);
                let bb = self.backscattering(wavelength, bbw);
                let kd = sun_term * a
                    + constants::KD_BB_SCALE
                        * (1.0 - constants::KD_BB_AMPLITUDE * (-constants::KD_BB_DECAY * a).exp())
                        * bb;
                (wavelength, kd)
            })
            .collect()
    }

    pub fn turbidity_index(&self) -> f64 {
        constants::TURBIDITY_A * self.b_tsm.powf(constants::TURBIDITY_B)
    }

    pub fn compute(&self, sun_zenith: f64) -> Attenuation {
        let kd_spectrum = self.kd_spectrum(sun_zenith);

        let k_min = kd_spectrum
            .iter()
            .map(|&(_, kd)| kd)
            .fold(f64::INFINITY, f64::min);
        let kd_490 = kd_spectrum
            .iter()
            .find(|&&(wavelength, _)| wavelength == 490)
            .map_or(f64::NAN, |&(_, kd)| kd);

        Attenuation {
            kd_spectrum,
            k_min,
            z90_max: 1.0 / k_min,
            kd_490,
            turbidity_index: self.turbidity_index(),
        }
    }
}
