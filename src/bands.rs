use std::fmt::Display;

/// Number of reflectance bands a pixel carries
pub const SOURCE_BAND_COUNT: usize = 12;

/// Number of bands the forward network predicts
pub const FORWARD_BAND_COUNT: usize = 10;

/// MERIS water-leaving reflectance bands used by the retrieval.
///
/// Bands 11 (oxygen absorption) and 14/15 are not used.
pub const REFLECTANCE_BANDS: [MerisBand; SOURCE_BAND_COUNT] = [
    MerisBand::new("reflec_1", 412),
    MerisBand::new("reflec_2", 443),
    MerisBand::new("reflec_3", 490),
    MerisBand::new("reflec_4", 510),
    MerisBand::new("reflec_5", 560),
    MerisBand::new("reflec_6", 620),
    MerisBand::new("reflec_7", 665),
    MerisBand::new("reflec_8", 681),
    MerisBand::new("reflec_9", 708),
    MerisBand::new("reflec_10", 753),
    MerisBand::new("reflec_12", 778),
    MerisBand::new("reflec_13", 865),
];

/// Indices into [`REFLECTANCE_BANDS`] fed to the inverse network.
///
/// 681 nm carries the chlorophyll fluorescence peak and is left out.
pub const INVERSE_BAND_INDICES: [usize; 9] = [0, 1, 2, 3, 4, 5, 6, 8, 9];

/// Wavelengths (nm) of the attenuation spectrum
pub const KD_WAVELENGTHS: [u32; 8] = [412, 443, 490, 510, 560, 620, 664, 680];

pub const SUN_ZENITH: &str = "sun_zenith";
pub const SUN_AZIMUTH: &str = "sun_azimuth";
pub const VIEW_ZENITH: &str = "view_zenith";
pub const VIEW_AZIMUTH: &str = "view_azimuth";
pub const ZONAL_WIND: &str = "zonal_wind";
pub const MERIDIONAL_WIND: &str = "merid_wind";

/// Tie-point style bands carrying geometry and wind, in [`crate::geometry::Geometry`] order
pub const GEOMETRY_BANDS: [&str; 6] = [
    SUN_ZENITH,
    SUN_AZIMUTH,
    VIEW_ZENITH,
    VIEW_AZIMUTH,
    ZONAL_WIND,
    MERIDIONAL_WIND,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MerisBand {
    name: &'static str,
    wavelength: u32,
}

impl MerisBand {
    pub const fn new(name: &'static str, wavelength: u32) -> Self {
        Self { name, wavelength }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn wavelength(&self) -> u32 {
        self.wavelength
    }
}

impl Display for MerisBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} nm)", self.name, self.wavelength)
    }
}

/// Every band name a scene must provide: reflectances first, then geometry
pub fn required_band_names() -> impl Iterator<Item = &'static str> {
    REFLECTANCE_BANDS
        .iter()
        .map(MerisBand::name)
        .chain(GEOMETRY_BANDS)
}
