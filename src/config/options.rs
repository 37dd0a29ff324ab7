use serde::Deserialize;
use std::fmt;

/// Regional flavour of the Case-2 retrieval
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlgorithmVariant {
    #[default]
    #[serde(rename(deserialize = "regional"))]
    Regional,
    #[serde(rename(deserialize = "eutrophic"))]
    Eutrophic,
}

impl AlgorithmVariant {
    pub fn name(&self) -> &'static str {
        match self {
            AlgorithmVariant::Regional => "regional",
            AlgorithmVariant::Eutrophic => "eutrophic",
        }
    }

    pub fn default_tsm_conversion(&self) -> PowerLaw {
        PowerLaw::new(1.0, 1.73)
    }

    pub fn default_chl_conversion(&self) -> PowerLaw {
        match self {
            AlgorithmVariant::Regional => PowerLaw::new(1.04, 21.0),
            AlgorithmVariant::Eutrophic => PowerLaw::new(1.0, 0.0318),
        }
    }

    /// File names searched for when no explicit network path is configured
    pub fn network_file_names(&self) -> (String, String) {
        (
            format!("{}_inverse.net", self.name()),
            format!("{}_forward.net", self.name()),
        )
    }
}

impl fmt::Display for AlgorithmVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlgorithmVariant::Regional => write!(f, "Regional"),
            AlgorithmVariant::Eutrophic => write!(f, "Eutrophic"),
        }
    }
}

/// Kind of reflectance delivered by the atmospheric correction
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReflectanceKind {
    #[default]
    #[serde(rename(deserialize = "radiance"))]
    Radiance,
    #[serde(rename(deserialize = "irradiance"))]
    Irradiance,
}

impl ReflectanceKind {
    /// Converts a reflectance of this kind to a radiance reflectance
    pub fn to_radiance(&self, reflectance: f64) -> f64 {
        match self {
            ReflectanceKind::Radiance => reflectance,
            ReflectanceKind::Irradiance => reflectance / std::f64::consts::PI,
        }
    }
}

/// `factor * x^exponent`, evaluated in log space as `exp(ln(factor) + exponent * ln(x))`
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct PowerLaw {
    pub exponent: f64,
    pub factor: f64,
}

impl PowerLaw {
    pub fn new(exponent: f64, factor: f64) -> Self {
        Self { exponent, factor }
    }

    /// Applies the law to a value given by its natural logarithm
    pub fn apply_log(&self, log_value: f64) -> f64 {
        (self.factor.ln() + self.exponent * log_value).exp()
    }

    pub fn apply(&self, value: f64) -> f64 {
        self.factor * value.powf(self.exponent)
    }
}

/// Closed interval a derived concentration is expected in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Iteration limits of the chi-square refinement
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct FitSettings {
    pub max_iterations: usize,
    pub parameter_tolerance: f64,
    pub chi_square_tolerance: f64,
    pub initial_damping: f64,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            parameter_tolerance: 1e-4,
            chi_square_tolerance: 1e-6,
            initial_damping: 1e-3,
        }
    }
}

/// Everything the per-pixel retrieval needs, fixed for a whole run
#[derive(Debug, Clone, PartialEq)]
pub struct WaterParameters {
    pub algorithm: AlgorithmVariant,
    pub perform_chi_square_fit: bool,
    pub output_kd_spectrum: bool,
    pub output_a_poc: bool,
    pub input_reflectance: ReflectanceKind,
    pub spectrum_out_of_scope_threshold: f64,
    pub tsm_conversion: PowerLaw,
    pub chl_conversion: PowerLaw,
    pub average_salinity: f64,
    pub average_temperature: f64,
    pub chl_range: ValueRange,
    pub tsm_range: ValueRange,
    pub fit: FitSettings,
}

impl WaterParameters {
    pub fn for_variant(algorithm: AlgorithmVariant) -> Self {
        Self {
            algorithm,
            perform_chi_square_fit: false,
            output_kd_spectrum: false,
            output_a_poc: false,
            input_reflectance: ReflectanceKind::Radiance,
            spectrum_out_of_scope_threshold: 4.0,
            tsm_conversion: algorithm.default_tsm_conversion(),
            chl_conversion: algorithm.default_chl_conversion(),
            average_salinity: 35.0,
            average_temperature: 15.0,
            chl_range: ValueRange::new(0.0, 100.0),
            tsm_range: ValueRange::new(0.0, 100.0),
            fit: FitSettings::default(),
        }
    }
}

impl Default for WaterParameters {
    fn default() -> Self {
        Self::for_variant(AlgorithmVariant::default())
    }
}

impl fmt::Display for WaterParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} water (fit: {}, kd spectrum: {}, salinity: {} PSU, temperature: {} °C)",
            self.algorithm,
            self.perform_chi_square_fit,
            self.output_kd_spectrum,
            self.average_salinity,
            self.average_temperature
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tsm_conversion_at_unit_scattering() {
        let tsm = PowerLaw::new(1.0, 1.73);
        assert!((tsm.apply_log(0.0) - 1.73).abs() < 1e-12);
        assert!((tsm.apply(1.0) - 1.73).abs() < 1e-12);
    }

    #[test]
    fn test_log_and_linear_forms_agree() {
        let law = PowerLaw::new(1.04, 21.0);
        let value: f64 = 0.37;
        assert!((law.apply_log(value.ln()) - law.apply(value)).abs() < 1e-12);
    }

    #[test]
    fn test_variant_defaults() {
        let regional = WaterParameters::for_variant(AlgorithmVariant::Regional);
        assert_eq!(regional.chl_conversion, PowerLaw::new(1.04, 21.0));
        assert_eq!(regional.tsm_conversion, PowerLaw::new(1.0, 1.73));

        let eutrophic = WaterParameters::for_variant(AlgorithmVariant::Eutrophic);
        assert_eq!(eutrophic.chl_conversion, PowerLaw::new(1.0, 0.0318));
        assert_eq!(
            AlgorithmVariant::Eutrophic.network_file_names().0,
            "eutrophic_inverse.net"
        );
    }

    #[test]
    fn test_irradiance_conversion() {
        let value = ReflectanceKind::Irradiance.to_radiance(std::f64::consts::PI);
        assert!((value - 1.0).abs() < 1e-15);
        assert_eq!(ReflectanceKind::Radiance.to_radiance(0.25), 0.25);
    }

    #[test]
    fn test_deserialize_variants() {
        let variant: AlgorithmVariant = serde_json::from_str("\"eutrophic\"").unwrap();
        assert_eq!(variant, AlgorithmVariant::Eutrophic);
        assert!(serde_json::from_str::<AlgorithmVariant>("\"coastal\"").is_err());

        let fit: FitSettings = serde_json::from_str(r#"{"max_iterations": 5}"#).unwrap();
        assert_eq!(fit.max_iterations, 5);
        assert_eq!(fit.initial_damping, 1e-3);
    }
}
