//! MERIS Case-2 water retrieval
//!
//! Water-leaving reflectances are inverted into inherent optical properties and
//! concentrations by a pair of pre-trained neural networks, checked against a
//! forward model and optionally refined by a chi-square fit.

pub mod bands;
pub mod config;
pub mod error;
pub mod fit;
pub mod flags;
pub mod geometry;
pub mod iop;
pub mod nn;
pub mod pixel;
pub mod processor;
pub mod raster;
pub mod scene;
pub mod utils;
pub mod water;

pub use config::{Config, WaterParameters};
pub use error::ProcessingError;
pub use processor::WaterProcessor;
