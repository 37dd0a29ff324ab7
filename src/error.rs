use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::nn::FormatError;
use crate::raster::{FileError, ReadError};

/// Failure to set up or run the processor on a scene
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("failed to load network {}: {source}", .path.display())]
    Network {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    #[error("network file {0} not found")]
    NetworkNotFound(String),

    #[error("{network} network has {found} {what}, expected {expected}")]
    NetworkShape {
        network: &'static str,
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Raster(#[from] ReadError),

    #[error(transparent)]
    File(#[from] FileError),

    #[error("required band {0} is missing from the configuration")]
    MissingBand(String),

    #[error("no raster files configured")]
    NoRasterFiles,

    #[error("failed to create output directory {}: {source}", .path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
