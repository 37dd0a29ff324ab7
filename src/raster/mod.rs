//! GeoTIFF band input and output used by the command line processor

use std::path::Path;

pub mod geotiff;
pub mod types;
pub mod utils;

pub use geotiff::{GeoTiffReader, GeoTiffWriter};
pub use types::{Data, DataReader, DataWriter, FileError, FileType, ReadError};
pub use utils::reader_from_filetype;

pub fn create_reader(file_name: String) -> Result<Box<dyn DataReader>, FileError> {
    match reader_from_filetype(Path::new(&file_name)) {
        Ok(FileType::GeoTiff) => Ok(Box::new(GeoTiffReader { file_name })),
        Err(e) => Err(e),
    }
}
