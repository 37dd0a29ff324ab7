//! Tabulated logistic activation used on the network hot path.
//!
//! The logistic curve is sampled once per process on a fixed grid and evaluated
//! by linear interpolation between the two neighbouring samples. Arguments
//! outside the tabulated domain saturate to the edge values.

use std::sync::LazyLock;

/// Lower edge of the tabulated domain
pub const DOMAIN_MIN: f64 = -10.0;
/// Upper edge of the tabulated domain
pub const DOMAIN_MAX: f64 = 10.0;
/// Distance between two table samples
pub const STEP: f64 = 1.0e-3;
/// Worst relative deviation from [`logistic`] inside the domain
pub const MAX_RELATIVE_ERROR: f64 = 1.0e-4;

const TABLE_LEN: usize = 20_001;

static SIGMOID_TABLE: LazyLock<Box<[f64]>> = LazyLock::new(|| {
    (0..TABLE_LEN)
        .map(|i| logistic(DOMAIN_MIN + i as f64 * STEP))
        .collect()
});

/// Exact logistic function `1 / (1 + e^-x)`.
pub fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Tabulated logistic function.
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    let table = &*SIGMOID_TABLE;

    if x.is_nan() {
        return f64::NAN;
    }
    if x <= DOMAIN_MIN {
        return table[0];
    }

    let position = (x - DOMAIN_MIN) / STEP;
    let idx = position as usize;
    if idx >= TABLE_LEN - 1 {
        return table[TABLE_LEN - 1];
    }

    let frac = position - idx as f64;
    table[idx] + frac * (table[idx + 1] - table[idx])
}
