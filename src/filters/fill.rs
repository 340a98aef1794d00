//! Invalid-pixel fill used ahead of the neighbourhood filters.
//!
//! Neighbourhood filters read across invalid positions. Filling those with
//! zero drags the median/Gaussian response towards zero next to every hole
//! (dark borders around invalid regions); filling with the mean of the valid
//! pixels keeps the response at the surface level.
use crate::extract::DepthSample;
use crate::image::ImageF64;

/// Dense copy of `sample` with invalid entries replaced by the valid mean.
///
/// Returns the grid and the fill value, or `None` when nothing is valid.
pub fn fill_invalid(sample: &DepthSample) -> Option<(ImageF64, f64)> {
    let mean = sample.mean()?;
    let data = sample
        .values
        .iter()
        .zip(&sample.valid)
        .map(|(&v, &ok)| if ok { v } else { mean })
        .collect();
    Some((ImageF64::from_vec(sample.width, sample.height, data), mean))
}

/// Write filtered values back under the original mask.
pub(crate) fn restore_mask(sample: &DepthSample, filtered: ImageF64) -> DepthSample {
    let values = filtered
        .data
        .into_iter()
        .zip(&sample.valid)
        .map(|(v, &ok)| if ok { v } else { 0.0 })
        .collect();
    DepthSample {
        width: sample.width,
        height: sample.height,
        values,
        valid: sample.valid.clone(),
    }
}

/// Mirror an out-of-range index back into `[0, n)` (`d c b a | a b c d | d c b a`).
#[inline]
pub(crate) fn reflect_index(idx: isize, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let n = n as isize;
    let period = 2 * n;
    let m = idx.rem_euclid(period);
    (if m >= n { period - m - 1 } else { m }) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_uses_valid_mean_not_zero() {
        let sample = DepthSample::from_options(3, 1, &[Some(2.0), None, Some(4.0)]);
        let (grid, mean) = fill_invalid(&sample).unwrap();
        assert_eq!(mean, 3.0);
        assert_eq!(grid.data, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn fill_without_valid_pixels_is_none() {
        let sample = DepthSample::from_options(2, 1, &[None, None]);
        assert!(fill_invalid(&sample).is_none());
    }

    #[test]
    fn reflect_mirrors_half_sample() {
        let n = 4;
        let mapped: Vec<usize> = (-3..7).map(|i| reflect_index(i, n)).collect();
        assert_eq!(mapped, vec![2, 1, 0, 0, 1, 2, 3, 3, 2, 1]);
        assert_eq!(reflect_index(-1, 1), 0);
        assert_eq!(reflect_index(5, 1), 0);
    }
}
