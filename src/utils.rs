use crate::scene::SceneOutput;

/// Summary of the defined values of one band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandStatistics {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub valid: usize,
}

/// Statistics over the non-NaN values of `buffer`, `None` when there are none
pub fn band_statistics(buffer: &[f32]) -> Option<BandStatistics> {
    let valid_values: Vec<f32> = buffer.iter().filter(|&&v| !v.is_nan()).cloned().collect();

    if valid_values.is_empty() {
        return None;
    }

    Some(BandStatistics {
        min: valid_values.iter().fold(f32::INFINITY, |a, &b| a.min(b)),
        max: valid_values.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b)),
        mean: valid_values.iter().sum::<f32>() / valid_values.len() as f32,
        valid: valid_values.len(),
    })
}

pub fn print_output_statistics(output: &SceneOutput) {
    for name in output.band_names() {
        let Some(buffer) = output.band(name) else {
            continue;
        };
        match band_statistics(buffer) {
            Some(stats) => log::info!(
                "  {}: min {:.4}, max {:.4}, mean {:.4} ({} pixels)",
                name,
                stats.min,
                stats.max,
                stats.mean,
                stats.valid
            ),
            None => log::info!("  {}: no valid pixels", name),
        }
    }
}
