//! k·σ outlier rejection over the valid pixels of a sample.
use crate::extract::DepthSample;

/// Mark every valid pixel farther than `std_factor · σ` from the valid mean as
/// invalid. Values are kept; only the mask changes. Returns the number of
/// pixels rejected.
///
/// `σ` is the population standard deviation of the currently-valid pixels.
pub fn reject_outliers(sample: &mut DepthSample, std_factor: f64) -> usize {
    let Some(mean) = sample.mean() else {
        return 0;
    };
    let n = sample.valid_count() as f64;
    let var = sample
        .valid_values()
        .map(|v| (v - mean) * (v - mean))
        .sum::<f64>()
        / n;
    let limit = std_factor * var.sqrt();

    let mut rejected = 0usize;
    for (v, ok) in sample.values.iter().zip(sample.valid.iter_mut()) {
        if *ok && (*v - mean).abs() > limit {
            *ok = false;
            rejected += 1;
        }
    }
    rejected
}
