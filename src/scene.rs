//! Band rasters of one scene and the product rasters written for it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::bands::{GEOMETRY_BANDS, REFLECTANCE_BANDS, SOURCE_BAND_COUNT, required_band_names};
use crate::config::{Config, WaterParameters};
use crate::error::ProcessingError;
use crate::flags::QualityFlags;
use crate::geometry::{Geometry, find_nadir_column};
use crate::pixel::{FLAGS_BAND, OutputSink, PixelInput, SpectralSample, output_band_names};
use crate::raster::{Data, DataWriter, GeoTiffWriter, create_reader};

/// Reflectance and geometry rasters sharing one grid.
///
/// Bands are kept in [`REFLECTANCE_BANDS`] then [`GEOMETRY_BANDS`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    width: usize,
    height: usize,
    bands: Vec<Vec<f32>>,
    valid: Vec<bool>,
}

impl Scene {
    /// Reads every required band listed in the configuration, and the valid
    /// mask if one is given.
    pub fn from_config(config: &Config) -> Result<Scene, ProcessingError> {
        let raster_files = config.raster_files().ok_or(ProcessingError::NoRasterFiles)?;

        let files = required_band_names()
            .map(|name| {
                raster_files
                    .iter()
                    .find(|file| file.name == name)
                    .ok_or_else(|| ProcessingError::MissingBand(name.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut bands = Vec::with_capacity(files.len());
        for file in files {
            log::debug!("Reading {} from {}", file.name, file.path);
            let data = create_reader(file.path.clone())?.read_data()?;
            log::debug!("{}:\n{}", file.name, data);
            bands.push((file.name.clone(), data));
        }

        let mask = match config.valid_mask() {
            Some(path) => Some(create_reader(path.display().to_string())?.read_data()?),
            None => None,
        };

        let scene = Scene::from_data(bands, mask)?;
        log::info!(
            "Scene of {}x{} pixels, {} valid",
            scene.width,
            scene.height,
            scene.valid_count()
        );
        Ok(scene)
    }

    /// Builds a scene from bands in required order.
    ///
    /// A pixel is invalid where the mask is non-zero or any band is not finite.
    pub fn from_data(
        bands: Vec<(String, Data)>,
        mask: Option<Data>,
    ) -> Result<Scene, ProcessingError> {
        let mut required = required_band_names();
        let (width, height) = match bands.first() {
            Some((_, data)) => (data.width, data.height),
            None => return Err(ProcessingError::NoRasterFiles),
        };

        let mut buffers = Vec::with_capacity(bands.len());
        for (name, data) in bands {
            if let Some(expected) = required.next()
                && expected != name
            {
                return Err(ProcessingError::MissingBand(expected.to_string()));
            }
            data.check_dimensions(&name, width, height)?;
            buffers.push(data.buffer);
        }
        if let Some(missing) = required.next() {
            return Err(ProcessingError::MissingBand(missing.to_string()));
        }

        let pixel_count = width as usize * height as usize;
        let mut valid: Vec<bool> = (0..pixel_count)
            .map(|i| buffers.iter().all(|band| band[i].is_finite()))
            .collect();

        if let Some(mask) = mask {
            mask.check_dimensions("valid mask", width, height)?;
            for (valid, &value) in valid.iter_mut().zip(&mask.buffer) {
                *valid &= value == 0.0;
            }
        }

        Ok(Scene {
            width: width as usize,
            height: height as usize,
            bands: buffers,
            valid,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn is_valid(&self, index: usize) -> bool {
        self.valid[index]
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|&&valid| valid).count()
    }

    pub fn pixel(&self, index: usize) -> PixelInput {
        let value = |band: usize| self.bands[band][index] as f64;
        let spectrum: [f64; SOURCE_BAND_COUNT] = std::array::from_fn(value);
        let geometry = |offset: usize| value(REFLECTANCE_BANDS.len() + offset);

        PixelInput {
            spectrum: SpectralSample::new(spectrum),
            geometry: Geometry {
                sun_zenith: geometry(0),
                sun_azimuth: geometry(1),
                view_zenith: geometry(2),
                view_azimuth: geometry(3),
                zonal_wind: geometry(4),
                meridional_wind: geometry(5),
            },
        }
    }

    /// Column of minimum view zenith on the centre scan line
    pub fn nadir_column(&self) -> Option<usize> {
        let view_zenith = REFLECTANCE_BANDS.len()
            + GEOMETRY_BANDS
                .iter()
                .position(|&name| name == crate::bands::VIEW_ZENITH)?;
        let start = (self.height / 2) * self.width;
        let line: Vec<f64> = self.bands[view_zenith][start..start + self.width]
            .iter()
            .map(|&zenith| zenith as f64)
            .collect();
        find_nadir_column(&line)
    }
}

/// Product rasters of a scene, filled pixel by pixel.
///
/// Float bands start as NaN so undefined outputs stay no-data.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneOutput {
    width: usize,
    height: usize,
    names: Vec<String>,
    index: BTreeMap<String, usize>,
    bands: Vec<Vec<f32>>,
    flags: Vec<u8>,
}

/// Writes the values of a single pixel into a [`SceneOutput`]
pub struct PixelSink<'a> {
    output: &'a mut SceneOutput,
    pixel: usize,
}

impl OutputSink for PixelSink<'_> {
    fn write(&mut self, name: &str, value: f64) {
        if let Some(&band) = self.output.index.get(name) {
            self.output.bands[band][self.pixel] = value as f32;
        }
    }

    fn write_flags(&mut self, flags: QualityFlags) {
        self.output.flags[self.pixel] = flags.bits();
    }
}

impl SceneOutput {
    pub fn new(parameters: &WaterParameters, width: usize, height: usize) -> Self {
        let names = output_band_names(parameters);
        let index = names
            .iter()
            .enumerate()
            .map(|(band, name)| (name.clone(), band))
            .collect();
        let bands = vec![vec![f32::NAN; width * height]; names.len()];

        Self {
            width,
            height,
            names,
            index,
            bands,
            flags: vec![0; width * height],
        }
    }

    pub fn pixel(&mut self, pixel: usize) -> PixelSink<'_> {
        PixelSink {
            output: self,
            pixel,
        }
    }

    pub fn band_names(&self) -> &[String] {
        &self.names
    }

    pub fn band(&self, name: &str) -> Option<&[f32]> {
        self.index.get(name).map(|&band| self.bands[band].as_slice())
    }

    pub fn flags(&self) -> &[u8] {
        &self.flags
    }

    /// Writes one `<band>.tif` per output band plus the flag raster.
    pub fn write_all(&self, directory: &Path) -> Result<Vec<PathBuf>, ProcessingError> {
        std::fs::create_dir_all(directory).map_err(|source| {
            ProcessingError::OutputDirectory {
                path: directory.to_path_buf(),
                source,
            }
        })?;

        let width = self.width as u32;
        let height = self.height as u32;
        let mut written = Vec::with_capacity(self.names.len() + 1);

        for (name, buffer) in self.names.iter().zip(&self.bands) {
            let path = directory.join(format!("{name}.tif"));
            let data = Data {
                width,
                height,
                buffer: buffer.clone(),
            };
            GeoTiffWriter {
                file_name: path.display().to_string(),
            }
            .write_f32(&data)?;
            written.push(path);
        }

        let path = directory.join(format!("{FLAGS_BAND}.tif"));
        GeoTiffWriter {
            file_name: path.display().to_string(),
        }
        .write_u8(width, height, &self.flags)?;
        written.push(path);

        log::info!(
            "Wrote {} rasters to {}",
            written.len(),
            directory.display()
        );
        Ok(written)
    }
}
