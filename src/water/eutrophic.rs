use crate::bands::FORWARD_BAND_COUNT;
use crate::config::{AlgorithmVariant, PowerLaw, WaterParameters};
use crate::pixel::Concentrations;

use super::{LOG_A_PIG, State, WaterAlgorithm, base_concentrations};

/// Eutrophic lakes variant: chlorophyll follows from the pigment absorption
/// through `chl = factor * a_pig^exponent`
#[derive(Debug, Clone, PartialEq)]
pub struct EutrophicWater {
    tsm_conversion: PowerLaw,
    chl_conversion: PowerLaw,
    output_a_poc: bool,
}

impl EutrophicWater {
    pub fn new(parameters: &WaterParameters) -> Self {
        Self {
            tsm_conversion: parameters.tsm_conversion,
            chl_conversion: parameters.chl_conversion,
            output_a_poc: parameters.output_a_poc,
        }
    }
}

impl WaterAlgorithm for EutrophicWater {
    fn variant(&self) -> AlgorithmVariant {
        AlgorithmVariant::Eutrophic
    }

    fn forward_band_mapping(&self) -> [usize; FORWARD_BAND_COUNT] {
        std::array::from_fn(|band| band)
    }

    fn fill_output(&self, state: &State) -> Concentrations {
        let chl_conc = self.chl_conversion.apply_log(state[LOG_A_PIG]);
        base_concentrations(state, &self.tsm_conversion, self.output_a_poc, chl_conc)
    }
}
