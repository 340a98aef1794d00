//! Square-window median filter with mean-fill of invalid pixels.
use super::fill::{fill_invalid, reflect_index, restore_mask};
use crate::extract::DepthSample;
use crate::image::{ImageF64, ImageView, ImageViewMut};

/// Median filter of `size × size` applied to the filled grid, mask re-applied.
///
/// Samples without valid pixels and `size <= 1` pass through unchanged.
pub fn median_filter(sample: &DepthSample, size: usize) -> DepthSample {
    if size <= 1 {
        return sample.clone();
    }
    match median_filter_filled(sample, size) {
        Some(filtered) => restore_mask(sample, filtered),
        None => sample.clone(),
    }
}

/// Filter output before the mask is re-applied.
pub fn median_filter_filled(sample: &DepthSample, size: usize) -> Option<ImageF64> {
    let (filled, _) = fill_invalid(sample)?;
    Some(median_grid(&filled, size.max(1)))
}

/// Window offsets run from `-(size / 2)` to `size - size / 2 - 1`; for an
/// even-sized window the upper median is taken.
pub(crate) fn median_grid(src: &ImageF64, size: usize) -> ImageF64 {
    let mut out = ImageF64::new(src.w, src.h);
    let lo = -((size / 2) as isize);
    let hi = (size - size / 2) as isize;
    let mut window = Vec::with_capacity(size * size);
    for y in 0..src.h {
        let dst = out.row_mut(y);
        for (x, dst_px) in dst.iter_mut().enumerate() {
            window.clear();
            for dy in lo..hi {
                let row = src.row(reflect_index(y as isize + dy, src.h));
                for dx in lo..hi {
                    window.push(row[reflect_index(x as isize + dx, src.w)]);
                }
            }
            let mid = window.len() / 2;
            let (_, median, _) = window.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
            *dst_px = *median;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_isolated_spike() {
        let mut values = vec![Some(2.0); 25];
        values[12] = Some(9.0);
        let sample = DepthSample::from_options(5, 5, &values);
        let out = median_filter(&sample, 3);
        assert!(out.values.iter().all(|&v| (v - 2.0).abs() < 1e-12));
    }

    #[test]
    fn holes_do_not_darken_neighbours() {
        // Constant surface with a hole; zero-fill would pull the border down.
        let mut values = vec![Some(7.0); 36];
        for i in [14, 15, 20, 21] {
            values[i] = None;
        }
        let sample = DepthSample::from_options(6, 6, &values);
        let filled = median_filter_filled(&sample, 3).unwrap();
        assert!(filled.data.iter().all(|&v| (v - 7.0).abs() < 1e-12));
        let out = median_filter(&sample, 3);
        assert_eq!(out.valid, sample.valid);
        for (v, ok) in out.values.iter().zip(&out.valid) {
            if *ok {
                assert!((v - 7.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn size_one_is_identity() {
        let sample = DepthSample::from_options(3, 1, &[Some(1.0), Some(5.0), Some(2.0)]);
        assert_eq!(median_filter(&sample, 1), sample);
    }
}
