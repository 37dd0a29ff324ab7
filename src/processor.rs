use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use walkdir::WalkDir;

use crate::bands::FORWARD_BAND_COUNT;
use crate::config::{Config, WaterParameters};
use crate::error::ProcessingError;
use crate::fit::ChiSquareFitting;
use crate::flags::{QualityFlag, QualityFlags};
use crate::geometry::ViewCorrection;
use crate::nn::NeuralNetwork;
use crate::pixel::{PixelInput, PixelResult};
use crate::scene::{Scene, SceneOutput};
use crate::water::{
    self, Environment, FORWARD_INPUT_SIZE, INVERSE_INPUT_SIZE, STATE_SIZE, WaterAlgorithm,
    create_algorithm,
};

/// Wind speed (m s^-1) above which whitecaps are assumed
pub const WINDSPEED_THRESHOLD: f64 = 12.0;

/// Scan lines processed in parallel before their results are written out
const ROWS_PER_BLOCK: usize = 64;

/// Case-2 water processor: loaded networks, the selected algorithm and the
/// optional refinement, applied pixel by pixel.
#[derive(Debug)]
pub struct WaterProcessor {
    inverse: Arc<NeuralNetwork>,
    forward: Arc<NeuralNetwork>,
    algorithm: Box<dyn WaterAlgorithm>,
    fitting: Option<ChiSquareFitting>,
    parameters: WaterParameters,
}

impl WaterProcessor {
    /// Loads the networks of the configured algorithm.
    ///
    /// Explicit network paths win; otherwise the variant's file names are looked
    /// up in the network directory and below it.
    pub fn new(config: &Config) -> Result<Self, ProcessingError> {
        let (inverse_name, forward_name) = config.algorithm().network_file_names();
        let directory = config.network_directory();

        let inverse_path = resolve_network(config.inverse_network(), directory, &inverse_name)?;
        let forward_path = resolve_network(config.forward_network(), directory, &forward_name)?;

        let inverse = load_network(&inverse_path)?;
        let forward = load_network(&forward_path)?;

        Self::from_networks(config.parameters().clone(), Arc::new(inverse), Arc::new(forward))
    }

    /// Builds a processor around already loaded networks, checking their shapes.
    pub fn from_networks(
        parameters: WaterParameters,
        inverse: Arc<NeuralNetwork>,
        forward: Arc<NeuralNetwork>,
    ) -> Result<Self, ProcessingError> {
        check_shape("inverse", "inputs", INVERSE_INPUT_SIZE, inverse.input_count())?;
        if inverse.output_count() < STATE_SIZE {
            return Err(ProcessingError::NetworkShape {
                network: "inverse",
                what: "outputs",
                expected: STATE_SIZE,
                found: inverse.output_count(),
            });
        }
        check_shape("forward", "inputs", FORWARD_INPUT_SIZE, forward.input_count())?;
        check_shape("forward", "outputs", FORWARD_BAND_COUNT, forward.output_count())?;

        let fitting = parameters
            .perform_chi_square_fit
            .then(|| ChiSquareFitting::new(&parameters));

        Ok(Self {
            inverse,
            forward,
            algorithm: create_algorithm(&parameters),
            fitting,
            parameters,
        })
    }

    pub fn parameters(&self) -> &WaterParameters {
        &self.parameters
    }

    /// Network environment of a pixel, with the configured average temperature and salinity
    pub fn environment(
        &self,
        sun_zenith: f64,
        view_zenith: f64,
        azimuth_difference: f64,
    ) -> Environment {
        Environment {
            sun_zenith,
            view_zenith,
            azimuth_difference,
            temperature: self.parameters.average_temperature,
            salinity: self.parameters.average_salinity,
        }
    }

    /// Processes a single pixel at `column` of its scan line.
    ///
    /// An invalid pixel only carries [`QualityFlag::Invalid`].
    pub fn process_pixel(
        &self,
        input: &PixelInput,
        column: usize,
        correction: &ViewCorrection,
        valid: bool,
    ) -> PixelResult {
        if !valid {
            return PixelResult::invalid();
        }

        let geometry = input.geometry.derive(column, correction);
        let mut flags = QualityFlags::new();
        flags.raise_if(
            QualityFlag::Whitecaps,
            geometry.wind_speed > WINDSPEED_THRESHOLD,
        );

        let environment = self.environment(
            geometry.sun_zenith,
            geometry.view_zenith,
            geometry.azimuth_difference,
        );
        let retrieval = water::perform(
            self.algorithm.as_ref(),
            &self.parameters,
            &self.inverse,
            &self.forward,
            &environment,
            &input.spectrum,
            &mut flags,
        );

        let fit = self.fitting.as_ref().map(|fitting| {
            let result = fitting.perform(
                self.algorithm.as_ref(),
                &self.forward,
                &environment,
                &retrieval.log_rlw_cut,
                &retrieval.state,
            );
            flags.raise_if(QualityFlag::FitFailed, !result.converged);
            result
        });

        PixelResult {
            flags,
            outputs: Some(retrieval.outputs),
            fit,
        }
    }

    /// Processes every pixel of `scene` in parallel.
    pub fn process_scene(&self, scene: &Scene, correction: &ViewCorrection) -> SceneOutput {
        let width = scene.width();
        let height = scene.height();
        log::info!(
            "Processing {}x{} pixels ({} valid) with {}",
            width,
            height,
            scene.valid_count(),
            self.algorithm.variant()
        );

        let mut output = SceneOutput::new(&self.parameters, width, height);
        let mut counts = [0usize; QualityFlag::ALL.len()];

        // results are held for one block of rows at a time
        for first_row in (0..height).step_by(ROWS_PER_BLOCK) {
            let start = first_row * width;
            let end = (first_row + ROWS_PER_BLOCK).min(height) * width;

            let results: Vec<PixelResult> = (start..end)
                .into_par_iter()
                .map(|index| {
                    self.process_pixel(
                        &scene.pixel(index),
                        index % width,
                        correction,
                        scene.is_valid(index),
                    )
                })
                .collect();

            for (index, result) in (start..end).zip(&results) {
                result.write_to(&mut output.pixel(index), self.parameters.output_kd_spectrum);
                for flag in result.flags.iter() {
                    counts[flag.bit_index() as usize] += 1;
                }
            }
        }

        for (flag, count) in QualityFlag::ALL.iter().zip(counts) {
            if count > 0 {
                log::info!("{} ({}): {} pixels", flag.name(), flag.description(), count);
            }
        }

        output
    }
}

impl Display for WaterProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Algorithm: {}", self.algorithm.variant())?;
        writeln!(
            f,
            "Inverse network: {} -> {}",
            self.inverse.input_count(),
            self.inverse.output_count()
        )?;
        writeln!(
            f,
            "Forward network: {} -> {}",
            self.forward.input_count(),
            self.forward.output_count()
        )?;
        match &self.fitting {
            Some(fitting) => write!(
                f,
                "Chi-square fit: at most {} iterations",
                fitting.settings().max_iterations
            ),
            None => write!(f, "Chi-square fit: disabled"),
        }
    }
}

fn check_shape(
    network: &'static str,
    what: &'static str,
    expected: usize,
    found: usize,
) -> Result<(), ProcessingError> {
    if expected == found {
        Ok(())
    } else {
        Err(ProcessingError::NetworkShape {
            network,
            what,
            expected,
            found,
        })
    }
}

fn load_network(path: &Path) -> Result<NeuralNetwork, ProcessingError> {
    let network = NeuralNetwork::from_file(path).map_err(|source| ProcessingError::Network {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "Loaded network {} ({} -> {})",
        path.display(),
        network.input_count(),
        network.output_count()
    );
    Ok(network)
}

fn resolve_network(
    explicit: Option<&Path>,
    directory: &Path,
    file_name: &str,
) -> Result<PathBuf, ProcessingError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let candidate = directory.join(file_name);
    if candidate.is_file() {
        return Ok(candidate);
    }

    search_file_recursively(directory, file_name)
        .ok_or_else(|| ProcessingError::NetworkNotFound(file_name.to_string()))
}

fn search_file_recursively(base_dir: &Path, filename: &str) -> Option<PathBuf> {
    if !base_dir.exists() {
        return None;
    }

    for entry in WalkDir::new(base_dir).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file()
            && let Some(file_name) = entry.path().file_name()
            && file_name.to_string_lossy() == filename
        {
            return Some(entry.path().to_path_buf());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::bands::KD_WAVELENGTHS;
    use crate::config::AlgorithmVariant;
    use crate::geometry::Geometry;
    use crate::water::regional::REGIONAL_BAND_MAPPING;
    use crate::water::tests::{forward_net, inverse_net, spectrum};

    fn matched_forward_net() -> NeuralNetwork {
        let values = spectrum();
        let centres: [f64; FORWARD_BAND_COUNT] =
            std::array::from_fn(|i| values.values()[REGIONAL_BAND_MAPPING[i]].ln());
        forward_net(&centres)
    }

    fn processor(parameters: WaterParameters) -> WaterProcessor {
        WaterProcessor::from_networks(
            parameters,
            Arc::new(inverse_net()),
            Arc::new(matched_forward_net()),
        )
        .unwrap()
    }

    fn input(zonal_wind: f64) -> PixelInput {
        PixelInput {
            spectrum: spectrum(),
            geometry: Geometry {
                sun_zenith: 23.25591,
                sun_azimuth: 283.79,
                view_zenith: 16.840723,
                view_azimuth: 89.83,
                zonal_wind,
                meridional_wind: 0.0,
            },
        }
    }

    const CORRECTION: ViewCorrection = ViewCorrection {
        nadir_column: 0,
        full_resolution: false,
    };

    #[test]
    fn test_clean_pixel() {
        let result = processor(WaterParameters::default()).process_pixel(
            &input(3.0),
            0,
            &CORRECTION,
            true,
        );

        assert!(result.flags.is_empty(), "{}", result.flags);
        let outputs = result.outputs.unwrap();
        assert!(outputs.chi_square < 1e-9);
        assert!((outputs.concentrations.chl_conc - 1.0).abs() < 1e-4);
        assert!(result.fit.is_none());
    }

    #[test]
    fn test_whitecaps_threshold_is_exclusive() {
        let processor = processor(WaterParameters::default());

        let at = processor.process_pixel(&input(12.0), 0, &CORRECTION, true);
        assert!(!at.flags.contains(QualityFlag::Whitecaps));

        let above = processor.process_pixel(&input(12.000001), 0, &CORRECTION, true);
        assert!(above.flags.contains(QualityFlag::Whitecaps));
        assert!(above.outputs.is_some());
    }

    #[test]
    fn test_invalid_pixel_has_no_outputs() {
        let mut parameters = WaterParameters::default();
        parameters.perform_chi_square_fit = true;
        let result = processor(parameters).process_pixel(&input(3.0), 0, &CORRECTION, false);

        assert_eq!(result.flags.bits(), QualityFlag::Invalid.mask());
        assert!(result.outputs.is_none());
        assert!(result.fit.is_none());
    }

    #[test]
    fn test_fit_failed_when_iterations_run_out() {
        let mut parameters = WaterParameters::default();
        parameters.perform_chi_square_fit = true;
        parameters.fit.max_iterations = 1;
        parameters.fit.parameter_tolerance = 0.0;
        parameters.fit.chi_square_tolerance = 0.0;

        let result = processor(parameters).process_pixel(&input(3.0), 0, &CORRECTION, true);
        let fit = result.fit.unwrap();
        assert!(!fit.converged);
        assert_eq!(fit.iterations, 1);
        assert!(result.flags.contains(QualityFlag::FitFailed));
    }

    #[test]
    fn test_converged_fit_keeps_flags_clear() {
        let mut parameters = WaterParameters::default();
        parameters.perform_chi_square_fit = true;

        let result = processor(parameters).process_pixel(&input(3.0), 0, &CORRECTION, true);
        assert!(result.fit.unwrap().converged);
        assert!(!result.flags.contains(QualityFlag::FitFailed));
    }

    #[test]
    fn test_network_shape_is_checked() {
        let result = WaterProcessor::from_networks(
            WaterParameters::default(),
            Arc::new(matched_forward_net()),
            Arc::new(matched_forward_net()),
        );
        assert!(matches!(
            result,
            Err(ProcessingError::NetworkShape {
                network: "inverse",
                expected: 14,
                found: 10,
                ..
            })
        ));
    }

    #[test]
    fn test_process_scene() {
        let processor = processor(WaterParameters::default());
        let values = *spectrum().values();
        let geometry = [23.25591, 283.79, 16.840723, 89.83, 3.0, 0.0];
        let mut bands = crate::scene::tests::constant_bands(3, 2, &values, &geometry);
        bands[0].1.buffer[5] = f32::NAN;
        let scene = Scene::from_data(bands, None).unwrap();

        let output = processor.process_scene(&scene, &CORRECTION);
        let chl = output.band("chl_conc").unwrap();
        assert!(chl[0].is_finite());
        assert!(chl[5].is_nan());
        assert_eq!(output.flags()[5], QualityFlag::Invalid.mask());
        assert_eq!(output.flags()[0], 0);
    }

    #[test]
    fn test_scene_spanning_several_row_blocks() {
        let processor = processor(WaterParameters::default());
        let values = *spectrum().values();
        let geometry = [23.25591, 283.79, 16.840723, 89.83, 3.0, 0.0];
        let height = 2 * ROWS_PER_BLOCK as u32 + 3;
        let scene = Scene::from_data(
            crate::scene::tests::constant_bands(2, height, &values, &geometry),
            None,
        )
        .unwrap();

        let output = processor.process_scene(&scene, &CORRECTION);
        let chl = output.band("chl_conc").unwrap();
        assert_eq!(chl.len(), scene.pixel_count());
        assert!(chl.iter().all(|value| value.is_finite()));
        assert!(output.flags().iter().all(|&flags| flags == 0));
    }

    #[test]
    fn test_kd_spectrum_output() {
        let mut parameters = WaterParameters::default();
        parameters.output_kd_spectrum = true;
        let result = processor(parameters).process_pixel(&input(3.0), 0, &CORRECTION, true);

        let mut sink: BTreeMap<String, f64> = BTreeMap::new();
        result.write_to(&mut sink, true);

        for wavelength in KD_WAVELENGTHS {
            let kd = sink[&format!("Kd_{wavelength}")];
            assert!(kd.is_finite() && kd > 0.0, "Kd_{wavelength} = {kd}");
        }
        let attenuation = &result.outputs.unwrap().attenuation;
        assert_eq!(sink["Kd_490"], attenuation.kd_490);
        assert_eq!(
            attenuation.kd_spectrum.iter().find(|(wl, _)| *wl == 490).map(|&(_, kd)| kd),
            Some(attenuation.kd_490)
        );
        assert_eq!(sink["K_min"], attenuation.k_min);
    }

    #[test]
    fn test_eutrophic_pixel() {
        let mut parameters = WaterParameters::for_variant(AlgorithmVariant::Eutrophic);
        parameters.perform_chi_square_fit = true;

        // identity mapping: the forward net reproduces the measured bands in order
        let values = spectrum();
        let centres: [f64; FORWARD_BAND_COUNT] = std::array::from_fn(|i| values.values()[i].ln());
        let processor = WaterProcessor::from_networks(
            parameters,
            Arc::new(inverse_net()),
            Arc::new(forward_net(&centres)),
        )
        .unwrap();

        let result = processor.process_pixel(&input(3.0), 0, &CORRECTION, true);
        assert!(result.flags.is_empty(), "{}", result.flags);

        let outputs = result.outputs.unwrap();
        assert!(outputs.chi_square < 1e-9);
        let c = outputs.concentrations;
        // chl = 0.0318 * a_pig with a_pig at 0.05
        assert!((c.chl_conc - 0.0318 * c.a_pig).abs() < 1e-12);
        assert!((c.a_pig - 0.05).abs() < 1e-5);

        let fit = result.fit.unwrap();
        assert!(fit.converged);
        assert!((fit.chl_conc - 0.0318 * fit.a_pig().0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_network() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::new(WaterParameters::default());
        config.set_network_directory(dir.path());

        match WaterProcessor::new(&config) {
            Err(ProcessingError::NetworkNotFound(name)) => {
                assert_eq!(name, "regional_inverse.net")
            }
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_unreadable_explicit_network() {
        let config = Config::new(WaterParameters::default())
            .with_networks("missing/inverse.net", "missing/forward.net");

        match WaterProcessor::new(&config) {
            Err(ProcessingError::Network { path, .. }) => {
                assert_eq!(path, Path::new("missing/inverse.net"))
            }
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_network_found_below_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nets").join("v1");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("regional_inverse.net"), "").unwrap();

        let found = resolve_network(None, dir.path(), "regional_inverse.net").unwrap();
        assert_eq!(found, nested.join("regional_inverse.net"));

        let explicit = Path::new("elsewhere/inverse.net");
        assert_eq!(
            resolve_network(Some(explicit), dir.path(), "regional_inverse.net").unwrap(),
            explicit
        );
    }
}
