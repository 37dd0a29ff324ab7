//! Sun/view geometry and wind preprocessing for one pixel.

/// Offset of the view zenith correction (degree)
pub const VIEW_ZENITH_OFFSET: f64 = -0.004793;
/// View zenith increase per column away from nadir on a reduced resolution scan line (degree)
pub const VIEW_ZENITH_SLOPE: f64 = 0.0093247;
/// Full resolution scan lines have four times as many columns
pub const FULL_RESOLUTION_SLOPE: f64 = VIEW_ZENITH_SLOPE / 4.0;

/// Raw geometry and wind as delivered with the reflectances.
///
/// Angles are in degree, wind components in m s^-1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub sun_zenith: f64,
    pub sun_azimuth: f64,
    pub view_zenith: f64,
    pub view_azimuth: f64,
    pub zonal_wind: f64,
    pub meridional_wind: f64,
}

/// Where the sub-satellite track lies on a scan line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewCorrection {
    pub nadir_column: usize,
    pub full_resolution: bool,
}

/// Geometry as seen by the networks, computed once per pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedGeometry {
    pub sun_zenith: f64,
    pub view_zenith: f64,
    pub azimuth_difference: f64,
    pub wind_speed: f64,
}

impl Geometry {
    pub fn derive(&self, column: usize, correction: &ViewCorrection) -> DerivedGeometry {
        DerivedGeometry {
            sun_zenith: self.sun_zenith,
            view_zenith: correct_view_zenith(
                self.view_zenith,
                column,
                correction.nadir_column,
                correction.full_resolution,
            ),
            azimuth_difference: azimuth_difference(self.view_azimuth, self.sun_azimuth),
            wind_speed: wind_speed(self.zonal_wind, self.meridional_wind),
        }
    }
}

/// Difference of satellite and solar azimuth in degree, within [0, 180].
///
/// The result is mirrored (`180 - d`) because the sensor counts azimuth from the
/// opposite direction than the radiative transfer simulations the networks were
/// trained on.
pub fn azimuth_difference(view_azimuth: f64, sun_azimuth: f64) -> f64 {
    let mut diff = (view_azimuth - sun_azimuth).abs() % 360.0;
    if diff > 180.0 {
        diff = 360.0 - diff;
    }
    180.0 - diff
}

/// View zenith corrected for the longer path away from the sub-satellite track.
pub fn correct_view_zenith(
    view_zenith: f64,
    column: usize,
    nadir_column: usize,
    full_resolution: bool,
) -> f64 {
    let slope = if full_resolution {
        FULL_RESOLUTION_SLOPE
    } else {
        VIEW_ZENITH_SLOPE
    };
    view_zenith + column.abs_diff(nadir_column) as f64 * slope + VIEW_ZENITH_OFFSET
}

pub fn wind_speed(zonal: f64, meridional: f64) -> f64 {
    zonal.hypot(meridional)
}

/// Column of minimum view zenith along one scan line.
///
/// Returns `None` for an empty line or when no finite zenith is present.
pub fn find_nadir_column(view_zenith_line: &[f64]) -> Option<usize> {
    view_zenith_line
        .iter()
        .enumerate()
        .filter(|(_, zenith)| zenith.is_finite())
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(column, _)| column)
}
