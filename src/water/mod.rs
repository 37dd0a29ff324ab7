//! Case-2 water inversion
//!
//! A [`WaterAlgorithm`] decides how the networks are fed and how their outputs
//! are read; [`perform`] runs the shared pipeline around it: log reflectances,
//! inverse network, unit conversion, forward network consistency check and
//! attenuation diagnostics.

use std::fmt;

use crate::bands::{FORWARD_BAND_COUNT, INVERSE_BAND_INDICES, SOURCE_BAND_COUNT};
use crate::config::{AlgorithmVariant, WaterParameters};
use crate::flags::{QualityFlag, QualityFlags};
use crate::iop::KMin;
use crate::nn::NeuralNetwork;
use crate::pixel::{Concentrations, IopOutputs, SpectralSample};

pub mod eutrophic;
pub mod regional;

pub use eutrophic::EutrophicWater;
pub use regional::RegionalWater;

/// Number of biophysical state variables produced by the inverse network
pub const STATE_SIZE: usize = 5;

/// Inverse network output, all natural logarithms:
/// `[chl, a_part, a_gelbstoff, a_pig, b_tsm]`
pub type State = [f64; STATE_SIZE];

pub const LOG_CHL: usize = 0;
pub const LOG_A_PART: usize = 1;
pub const LOG_A_GELBSTOFF: usize = 2;
pub const LOG_A_PIG: usize = 3;
pub const LOG_B_TSM: usize = 4;

/// Geometry and environment inputs shared by both networks
pub const ENVIRONMENT_SIZE: usize = 5;

/// Inverse network input size
pub const INVERSE_INPUT_SIZE: usize = ENVIRONMENT_SIZE + INVERSE_BAND_INDICES.len();

/// Forward network input size
pub const FORWARD_INPUT_SIZE: usize = ENVIRONMENT_SIZE + STATE_SIZE;

/// Geometry and environment of one pixel as the networks see them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Environment {
    pub sun_zenith: f64,
    pub view_zenith: f64,
    pub azimuth_difference: f64,
    pub temperature: f64,
    pub salinity: f64,
}

impl Environment {
    pub fn as_inputs(&self) -> [f64; ENVIRONMENT_SIZE] {
        [
            self.sun_zenith,
            self.view_zenith,
            self.azimuth_difference,
            self.temperature,
            self.salinity,
        ]
    }
}

/// Strategy of one regional variant of the Case-2 retrieval
pub trait WaterAlgorithm: Send + Sync + fmt::Debug {
    fn variant(&self) -> AlgorithmVariant;

    /// Inverse network input: environment, then the log reflectances of
    /// [`INVERSE_BAND_INDICES`]
    fn inverse_input(
        &self,
        environment: &Environment,
        log_rlw: &[f64; SOURCE_BAND_COUNT],
    ) -> Vec<f64> {
        let mut input = Vec::with_capacity(INVERSE_INPUT_SIZE);
        input.extend(environment.as_inputs());
        input.extend(INVERSE_BAND_INDICES.iter().map(|&band| log_rlw[band]));
        input
    }

    /// Forward network input: environment, then the state in inverse output order
    fn forward_input(&self, environment: &Environment, state: &State) -> Vec<f64> {
        let mut input = Vec::with_capacity(FORWARD_INPUT_SIZE);
        input.extend(environment.as_inputs());
        input.extend(state);
        input
    }

    /// Measured band compared with each forward network output
    fn forward_band_mapping(&self) -> [usize; FORWARD_BAND_COUNT];

    /// Differences between forward modelled and measured log reflectances
    fn residuals(&self, forward_output: &[f64], log_rlw_cut: &[f64]) -> Vec<f64> {
        self.forward_band_mapping()
            .iter()
            .zip(forward_output)
            .map(|(&measured, modelled)| modelled - log_rlw_cut[measured])
            .collect()
    }

    fn chi_square(&self, forward_output: &[f64], log_rlw_cut: &[f64]) -> f64 {
        self.residuals(forward_output, log_rlw_cut)
            .iter()
            .map(|residual| residual * residual)
            .sum()
    }

    /// Converts the inverse network state into optical properties and concentrations
    fn fill_output(&self, state: &State) -> Concentrations;

    fn k_min(&self, concentrations: &Concentrations) -> KMin {
        KMin::new(
            concentrations.b_tsm,
            concentrations.a_pig,
            concentrations.a_gelbstoff,
        )
    }
}

pub fn create_algorithm(parameters: &WaterParameters) -> Box<dyn WaterAlgorithm> {
    match parameters.algorithm {
        AlgorithmVariant::Regional => Box::new(RegionalWater::new(parameters)),
        AlgorithmVariant::Eutrophic => Box::new(EutrophicWater::new(parameters)),
    }
}

/// Optical properties shared by every variant; only chlorophyll differs
pub(crate) fn base_concentrations(
    state: &State,
    tsm_conversion: &crate::config::PowerLaw,
    output_a_poc: bool,
    chl_conc: f64,
) -> Concentrations {
    let a_part = state[LOG_A_PART].exp();
    let a_gelbstoff = state[LOG_A_GELBSTOFF].exp();
    let a_pig = state[LOG_A_PIG].exp();
    let b_tsm = state[LOG_B_TSM].exp();

    Concentrations {
        a_part,
        a_gelbstoff,
        a_pig,
        a_total: a_pig + a_gelbstoff + a_part,
        a_poc: output_a_poc.then_some(a_part),
        b_tsm,
        bb_spm: b_tsm * crate::iop::constants::BTSM_TO_SPM_FACTOR,
        tsm: tsm_conversion.apply_log(state[LOG_B_TSM]),
        chl_conc,
    }
}

/// Result of the inversion pipeline for one pixel
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    pub outputs: IopOutputs,
    pub state: State,
    /// Measured log reflectances the forward network is compared against
    pub log_rlw_cut: [f64; FORWARD_BAND_COUNT],
}

/// Natural log of every reflectance, as radiance reflectance.
///
/// Non-positive values raise [`QualityFlag::WlrOutOfScope`] and are replaced by
/// the lower training bound of the inverse network input that reads them, or by
/// the smallest reflectance bound for bands the inverse network does not read.
pub fn log_reflectances(
    spectrum: &SpectralSample,
    parameters: &WaterParameters,
    inverse: &NeuralNetwork,
    flags: &mut QualityFlags,
) -> [f64; SOURCE_BAND_COUNT] {
    let reflectance_bounds = &inverse.input_bounds()[ENVIRONMENT_SIZE..];
    let floor = reflectance_bounds
        .iter()
        .map(|bounds| bounds.min)
        .fold(f64::INFINITY, f64::min);

    let mut log_rlw = [0.0; SOURCE_BAND_COUNT];
    for (band, (&reflectance, log_value)) in
        spectrum.values().iter().zip(log_rlw.iter_mut()).enumerate()
    {
        let rlw = parameters.input_reflectance.to_radiance(reflectance);
        *log_value = if rlw > 0.0 {
            rlw.ln()
        } else {
            flags.raise(QualityFlag::WlrOutOfScope);
            INVERSE_BAND_INDICES
                .iter()
                .position(|&idx| idx == band)
                .map_or(floor, |input| reflectance_bounds[input].min)
        };
    }
    log_rlw
}

/// Runs the inversion pipeline for one valid pixel.
///
/// Raises `WLR_OOR`, `CONC_OOR` and `OOTR` in `flags`; never fails.
pub fn perform(
    algorithm: &dyn WaterAlgorithm,
    parameters: &WaterParameters,
    inverse: &NeuralNetwork,
    forward: &NeuralNetwork,
    environment: &Environment,
    spectrum: &SpectralSample,
    flags: &mut QualityFlags,
) -> Retrieval {
    let log_rlw = log_reflectances(spectrum, parameters, inverse, flags);

    let inverse_input = algorithm.inverse_input(environment, &log_rlw);
    let out_of_scope = inverse_input
        .iter()
        .zip(inverse.input_bounds())
        .skip(ENVIRONMENT_SIZE)
        .any(|(&value, bounds)| !bounds.contains(value));
    flags.raise_if(QualityFlag::WlrOutOfScope, out_of_scope);

    let mut state = [0.0; STATE_SIZE];
    state.copy_from_slice(&inverse.calc(&inverse_input)[..STATE_SIZE]);

    let concentrations = algorithm.fill_output(&state);
    flags.raise_if(
        QualityFlag::ConcentrationOutOfRange,
        !parameters.chl_range.contains(concentrations.chl_conc)
            || !parameters.tsm_range.contains(concentrations.tsm),
    );

    let mut log_rlw_cut = [0.0; FORWARD_BAND_COUNT];
    log_rlw_cut.copy_from_slice(&log_rlw[..FORWARD_BAND_COUNT]);

    let forward_output = forward.calc(&algorithm.forward_input(environment, &state));
    let chi_square = algorithm.chi_square(&forward_output, &log_rlw_cut);
    flags.raise_if(
        QualityFlag::OutOfTrainingRange,
        chi_square > parameters.spectrum_out_of_scope_threshold,
    );

    let attenuation = algorithm
        .k_min(&concentrations)
        .compute(environment.sun_zenith);

    Retrieval {
        outputs: IopOutputs {
            concentrations,
            chi_square,
            attenuation,
        },
        state,
        log_rlw_cut,
    }
}
