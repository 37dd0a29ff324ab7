//! Per-pixel inputs, results and the named values written for them.

use std::collections::BTreeMap;

use crate::bands::SOURCE_BAND_COUNT;
use crate::config::WaterParameters;
use crate::fit::FitResult;
use crate::flags::QualityFlags;
use crate::geometry::Geometry;
use crate::iop::Attenuation;

pub const FLAGS_BAND: &str = "case2_flags";

/// Reflectances of one pixel in [`crate::bands::REFLECTANCE_BANDS`] order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralSample([f64; SOURCE_BAND_COUNT]);

impl SpectralSample {
    pub fn new(reflectances: [f64; SOURCE_BAND_COUNT]) -> Self {
        Self(reflectances)
    }

    pub fn values(&self) -> &[f64; SOURCE_BAND_COUNT] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelInput {
    pub spectrum: SpectralSample,
    pub geometry: Geometry,
}

/// Optical properties and concentrations converted from the inverse network state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Concentrations {
    pub a_part: f64,
    pub a_gelbstoff: f64,
    pub a_pig: f64,
    pub a_total: f64,
    pub a_poc: Option<f64>,
    pub b_tsm: f64,
    pub bb_spm: f64,
    pub tsm: f64,
    pub chl_conc: f64,
}

/// Primary outputs of a successfully inverted pixel
#[derive(Debug, Clone, PartialEq)]
pub struct IopOutputs {
    pub concentrations: Concentrations,
    pub chi_square: f64,
    pub attenuation: Attenuation,
}

/// Everything computed for one pixel.
///
/// `outputs` and `fit` stay `None` for an invalid pixel; `fit` is also `None`
/// when refinement is disabled.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PixelResult {
    pub flags: QualityFlags,
    pub outputs: Option<IopOutputs>,
    pub fit: Option<FitResult>,
}

/// Destination of the named values of a pixel
pub trait OutputSink {
    fn write(&mut self, name: &str, value: f64);

    fn write_flags(&mut self, flags: QualityFlags);
}

impl OutputSink for BTreeMap<String, f64> {
    fn write(&mut self, name: &str, value: f64) {
        self.insert(name.to_string(), value);
    }

    fn write_flags(&mut self, flags: QualityFlags) {
        self.insert(FLAGS_BAND.to_string(), flags.bits() as f64);
    }
}

fn kd_band_name(wavelength: u32) -> String {
    format!("Kd_{wavelength}")
}

const FIT_STATE_BANDS: [&str; 3] = ["a_gelbstoff", "a_pig", "b_tsm"];

/// Names of all float outputs produced under `parameters`, in writing order.
///
/// The flag band [`FLAGS_BAND`] comes on top of these.
pub fn output_band_names(parameters: &WaterParameters) -> Vec<String> {
    let mut names: Vec<String> = ["a_gelbstoff", "a_pig", "a_total"]
        .iter()
        .map(|name| name.to_string())
        .collect();
    if parameters.output_a_poc {
        names.push("a_poc".to_string());
    }
    names.extend(
        ["bb_spm", "tsm", "chl_conc", "chiSquare", "K_min"]
            .iter()
            .map(|name| name.to_string()),
    );
    if parameters.output_kd_spectrum {
        names.extend(crate::bands::KD_WAVELENGTHS.iter().map(|&wl| kd_band_name(wl)));
    } else {
        names.push(kd_band_name(490));
    }
    names.push("Z90_max".to_string());
    names.push("turbidity_index".to_string());

    if parameters.perform_chi_square_fit {
        for name in FIT_STATE_BANDS {
            names.push(format!("{name}Fit"));
            names.push(format!("{name}Fit_min"));
            names.push(format!("{name}Fit_max"));
        }
        names.extend(
            ["tsmFit", "chl_concFit", "chiSquareFit", "nIter", "paramChange"]
                .iter()
                .map(|name| name.to_string()),
        );
    }

    names
}

impl PixelResult {
    pub fn invalid() -> Self {
        Self {
            flags: crate::flags::QualityFlag::Invalid.into(),
            outputs: None,
            fit: None,
        }
    }

    /// Writes every defined value to `sink`, followed by the flags.
    ///
    /// `kd_spectrum` selects between the full attenuation spectrum and `Kd_490`.
    pub fn write_to<S: OutputSink + ?Sized>(&self, sink: &mut S, kd_spectrum: bool) {
        if let Some(outputs) = &self.outputs {
            let c = &outputs.concentrations;
            sink.write("a_gelbstoff", c.a_gelbstoff);
            sink.write("a_pig", c.a_pig);
            sink.write("a_total", c.a_total);
            if let Some(a_poc) = c.a_poc {
                sink.write("a_poc", a_poc);
            }
            sink.write("bb_spm", c.bb_spm);
            sink.write("tsm", c.tsm);
            sink.write("chl_conc", c.chl_conc);
            sink.write("chiSquare", outputs.chi_square);

            let attenuation = &outputs.attenuation;
            sink.write("K_min", attenuation.k_min);
            if kd_spectrum {
                for &(wavelength, kd) in &attenuation.kd_spectrum {
                    sink.write(&kd_band_name(wavelength), kd);
                }
            } else {
                sink.write(&kd_band_name(490), attenuation.kd_490);
            }
            sink.write("Z90_max", attenuation.z90_max);
            sink.write("turbidity_index", attenuation.turbidity_index);
        }

        if let Some(fit) = &self.fit {
            let values = [fit.a_gelbstoff(), fit.a_pig(), fit.b_tsm()];
            for (name, (value, min, max)) in FIT_STATE_BANDS.iter().zip(values) {
                sink.write(&format!("{name}Fit"), value);
                sink.write(&format!("{name}Fit_min"), min);
                sink.write(&format!("{name}Fit_max"), max);
            }
            sink.write("tsmFit", fit.tsm);
            sink.write("chl_concFit", fit.chl_conc);
            sink.write("chiSquareFit", fit.chi_square);
            sink.write("nIter", fit.iterations as f64);
            sink.write("paramChange", fit.parameter_change);
        }

        sink.write_flags(self.flags);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlgorithmVariant;

    #[test]
    fn test_default_band_names() {
        let names = output_band_names(&WaterParameters::default());
        assert_eq!(
            names,
            vec![
                "a_gelbstoff",
                "a_pig",
                "a_total",
                "bb_spm",
                "tsm",
                "chl_conc",
                "chiSquare",
                "K_min",
                "Kd_490",
                "Z90_max",
                "turbidity_index"
            ]
        );
    }

    #[test]
    fn test_optional_band_names() {
        let mut parameters = WaterParameters::for_variant(AlgorithmVariant::Eutrophic);
        parameters.output_a_poc = true;
        parameters.output_kd_spectrum = true;
        parameters.perform_chi_square_fit = true;

        let names = output_band_names(&parameters);
        assert_eq!(names[3], "a_poc");
        assert!(names.contains(&"Kd_664".to_string()));
        assert!(names.contains(&"b_tsmFit_max".to_string()));
        assert_eq!(names.last().map(String::as_str), Some("paramChange"));
        assert_eq!(names.len(), 3 + 1 + 5 + 8 + 2 + 9 + 5);
    }

    #[test]
    fn test_invalid_pixel_writes_only_flags() {
        let mut sink: BTreeMap<String, f64> = BTreeMap::new();
        PixelResult::invalid().write_to(&mut sink, false);

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.get(FLAGS_BAND), Some(&32.0));
    }
}
