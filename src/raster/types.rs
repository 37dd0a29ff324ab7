use std::fmt;
use thiserror::Error;

pub trait DataReader {
    fn read_data(&self) -> Result<Data, ReadError>;
}

pub trait DataWriter {
    fn write_f32(&self, data: &Data) -> Result<(), ReadError>;

    fn write_u8(&self, width: u32, height: u32, buffer: &[u8]) -> Result<(), ReadError>;
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("GeoTIFF error: {0}")]
    GeoTiff(String),

    #[error("{name} is {found_width}x{found_height}, expected {width}x{height}")]
    DimensionMismatch {
        name: String,
        width: u32,
        height: u32,
        found_width: u32,
        found_height: u32,
    },

    #[error("buffer of {found} values does not fill a {width}x{height} raster")]
    BufferSize { width: u32, height: u32, found: usize },
}

#[derive(Debug, Error)]
pub enum FileError {
    #[error("unknown raster file type: {0}")]
    UnknownFileType(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Data {
    pub width: u32,
    pub height: u32,
    pub buffer: Vec<f32>,
}

pub enum FileType {
    GeoTiff,
}

impl Data {
    pub fn check_dimensions(&self, name: &str, width: u32, height: u32) -> Result<(), ReadError> {
        if self.width == width && self.height == height {
            Ok(())
        } else {
            Err(ReadError::DimensionMismatch {
                name: name.to_string(),
                width,
                height,
                found_width: self.width,
                found_height: self.height,
            })
        }
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let valid = self.buffer.iter().filter(|x| !x.is_nan());
        let min_value = valid.clone().fold(f32::NAN, |a, &b| a.min(b));
        let max_value = valid.fold(f32::NAN, |a, &b| a.max(b));

        write!(
            f,
            "Width: {}\nHeight: {}\nBuffer Length: {}\nMin value: {}\nMax value: {}",
            self.width,
            self.height,
            self.buffer.len(),
            min_value,
            max_value,
        )
    }
}
