//! Inherent Optical Properties (IOP) module
//!
//! Pure water optical constants and the attenuation model applied to the
//! retrieved absorption and scattering coefficients.

pub mod constants;
pub mod kmin;

pub use kmin::{Attenuation, KMin};
