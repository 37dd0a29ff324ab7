use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub mod error;
pub use error::ConfigError;

pub mod options;
pub use options::{
    AlgorithmVariant, FitSettings, PowerLaw, ReflectanceKind, ValueRange, WaterParameters,
};

const DEFAULT_NETWORK_DIRECTORY: &str = "auxdata";
const DEFAULT_OUTPUT_DIRECTORY: &str = "output";

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RasterFile {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    parameters: WaterParameters,
    inverse_network: Option<PathBuf>,
    forward_network: Option<PathBuf>,
    network_directory: PathBuf,
    full_resolution: bool,
    nadir_column: Option<usize>,
    raster_files: Option<Vec<RasterFile>>,
    valid_mask: Option<PathBuf>,
    output_directory: PathBuf,
}

// Deserializes a Config, filling conversion constants with the defaults of the
// selected algorithm and rejecting ranges, factors and fit limits that cannot work.
impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct ConfigHelper {
            #[serde(default)]
            algorithm: AlgorithmVariant,
            #[serde(default)]
            perform_chi_square_fit: bool,
            #[serde(default)]
            output_kd_spectrum: bool,
            #[serde(default)]
            output_a_poc: bool,
            #[serde(default)]
            input_reflectance: ReflectanceKind,
            spectrum_out_of_scope_threshold: Option<f64>,
            tsm_conversion_exponent: Option<f64>,
            tsm_conversion_factor: Option<f64>,
            chl_conversion_exponent: Option<f64>,
            chl_conversion_factor: Option<f64>,
            average_salinity: Option<f64>,
            average_temperature: Option<f64>,
            chl_range: Option<[f64; 2]>,
            tsm_range: Option<[f64; 2]>,
            #[serde(default)]
            fit: FitSettings,
            inverse_network: Option<PathBuf>,
            forward_network: Option<PathBuf>,
            network_directory: Option<PathBuf>,
            #[serde(default)]
            full_resolution: bool,
            nadir_column: Option<usize>,
            raster_files: Option<Vec<RasterFile>>,
            valid_mask: Option<PathBuf>,
            output_directory: Option<PathBuf>,
        }

        fn range(
            key: &'static str,
            value: Option<[f64; 2]>,
            default: ValueRange,
        ) -> Result<ValueRange, ConfigError> {
            match value {
                None => Ok(default),
                Some([min, max]) if min < max => Ok(ValueRange::new(min, max)),
                Some(_) => Err(ConfigError::Range(key)),
            }
        }

        fn positive(key: &'static str, value: f64) -> Result<f64, ConfigError> {
            if value > 0.0 && value.is_finite() {
                Ok(value)
            } else {
                Err(ConfigError::NonPositive(key))
            }
        }

        let helper = ConfigHelper::deserialize(deserializer)?;

        let mut parameters = WaterParameters::for_variant(helper.algorithm);
        parameters.perform_chi_square_fit = helper.perform_chi_square_fit;
        parameters.output_kd_spectrum = helper.output_kd_spectrum;
        parameters.output_a_poc = helper.output_a_poc;
        parameters.input_reflectance = helper.input_reflectance;

        if let Some(threshold) = helper.spectrum_out_of_scope_threshold {
            parameters.spectrum_out_of_scope_threshold =
                positive("spectrum_out_of_scope_threshold", threshold).map_err(D::Error::custom)?;
        }

        if let Some(exponent) = helper.tsm_conversion_exponent {
            parameters.tsm_conversion.exponent = exponent;
        }
        if let Some(factor) = helper.tsm_conversion_factor {
            parameters.tsm_conversion.factor =
                positive("tsm_conversion_factor", factor).map_err(D::Error::custom)?;
        }
        if let Some(exponent) = helper.chl_conversion_exponent {
            parameters.chl_conversion.exponent = exponent;
        }
        if let Some(factor) = helper.chl_conversion_factor {
            parameters.chl_conversion.factor =
                positive("chl_conversion_factor", factor).map_err(D::Error::custom)?;
        }

        if let Some(salinity) = helper.average_salinity {
            parameters.average_salinity = salinity;
        }
        if let Some(temperature) = helper.average_temperature {
            parameters.average_temperature = temperature;
        }

        parameters.chl_range =
            range("chl_range", helper.chl_range, parameters.chl_range).map_err(D::Error::custom)?;
        parameters.tsm_range =
            range("tsm_range", helper.tsm_range, parameters.tsm_range).map_err(D::Error::custom)?;

        // Validate fit settings
        let fit = helper.fit;
        if fit.max_iterations == 0 {
            return Err(D::Error::custom(ConfigError::Fit(
                "max_iterations must be at least 1".to_string(),
            )));
        }
        if fit.parameter_tolerance < 0.0 || fit.chi_square_tolerance < 0.0 {
            return Err(D::Error::custom(ConfigError::Fit(
                "tolerances cannot be negative".to_string(),
            )));
        }
        parameters.fit = fit;
        parameters.fit.initial_damping =
            positive("fit.initial_damping", fit.initial_damping).map_err(D::Error::custom)?;

        Ok(Config {
            parameters,
            inverse_network: helper.inverse_network,
            forward_network: helper.forward_network,
            network_directory: helper
                .network_directory
                .unwrap_or_else(|| PathBuf::from(DEFAULT_NETWORK_DIRECTORY)),
            full_resolution: helper.full_resolution,
            nadir_column: helper.nadir_column,
            raster_files: helper.raster_files,
            valid_mask: helper.valid_mask,
            output_directory: helper
                .output_directory
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIRECTORY)),
        })
    }
}

impl Config {
    pub fn new(parameters: WaterParameters) -> Self {
        Self {
            parameters,
            inverse_network: None,
            forward_network: None,
            network_directory: PathBuf::from(DEFAULT_NETWORK_DIRECTORY),
            full_resolution: false,
            nadir_column: None,
            raster_files: None,
            valid_mask: None,
            output_directory: PathBuf::from(DEFAULT_OUTPUT_DIRECTORY),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: Config = serde_json::from_reader(reader).map_err(ConfigError::from)?;

        Ok(config)
    }

    pub fn parameters(&self) -> &WaterParameters {
        &self.parameters
    }

    pub fn algorithm(&self) -> AlgorithmVariant {
        self.parameters.algorithm
    }

    pub fn inverse_network(&self) -> Option<&Path> {
        self.inverse_network.as_deref()
    }

    pub fn forward_network(&self) -> Option<&Path> {
        self.forward_network.as_deref()
    }

    pub fn network_directory(&self) -> &Path {
        &self.network_directory
    }

    pub fn full_resolution(&self) -> bool {
        self.full_resolution
    }

    pub fn nadir_column(&self) -> Option<usize> {
        self.nadir_column
    }

    pub fn raster_files(&self) -> Option<&Vec<RasterFile>> {
        self.raster_files.as_ref()
    }

    pub fn valid_mask(&self) -> Option<&Path> {
        self.valid_mask.as_deref()
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn with_networks<P: Into<PathBuf>>(mut self, inverse: P, forward: P) -> Self {
        self.inverse_network = Some(inverse.into());
        self.forward_network = Some(forward.into());
        self
    }

    pub fn set_network_directory<P: Into<PathBuf>>(&mut self, directory: P) {
        self.network_directory = directory.into();
    }

    pub fn set_output_directory<P: Into<PathBuf>>(&mut self, directory: P) {
        self.output_directory = directory.into();
    }
}
