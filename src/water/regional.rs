use crate::bands::FORWARD_BAND_COUNT;
use crate::config::{AlgorithmVariant, PowerLaw, WaterParameters};
use crate::pixel::Concentrations;

use super::{LOG_CHL, State, WaterAlgorithm, base_concentrations};

/// Measured band compared with each forward network output.
///
/// The forward network was trained with 681 and 708 nm in swapped order, so
/// outputs 7 and 8 are compared crosswise.
pub const REGIONAL_BAND_MAPPING: [usize; FORWARD_BAND_COUNT] = [0, 1, 2, 3, 4, 5, 6, 8, 7, 9];

/// Coastal waters variant: chlorophyll is read directly from the inverse network
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalWater {
    tsm_conversion: PowerLaw,
    output_a_poc: bool,
}

impl RegionalWater {
    pub fn new(parameters: &WaterParameters) -> Self {
        Self {
            tsm_conversion: parameters.tsm_conversion,
            output_a_poc: parameters.output_a_poc,
        }
    }
}

impl WaterAlgorithm for RegionalWater {
    fn variant(&self) -> AlgorithmVariant {
        AlgorithmVariant::Regional
    }

    fn forward_band_mapping(&self) -> [usize; FORWARD_BAND_COUNT] {
        REGIONAL_BAND_MAPPING
    }

    fn fill_output(&self, state: &State) -> Concentrations {
        base_concentrations(
            state,
            &self.tsm_conversion,
            self.output_a_poc,
            state[LOG_CHL].exp(),
        )
    }
}
