//! Separable Gaussian smoothing with mean-fill of invalid pixels.
use super::fill::{fill_invalid, reflect_index, restore_mask};
use crate::extract::DepthSample;
use crate::image::{ImageF64, ImageView, ImageViewMut};

/// Kernel extent in standard deviations.
pub const TRUNCATE: f64 = 4.0;

/// Trait implemented by separable 1D filters.
pub trait SeparableFilter {
    /// Return the 1D taps (in left-to-right order). The kernel is assumed to be
    /// centred on `taps().len() / 2`.
    fn taps(&self) -> &[f64];
}

/// Normalised sampled Gaussian with radius `⌊TRUNCATE·σ + 0.5⌋`.
#[derive(Clone, Debug)]
pub struct GaussianKernel {
    taps: Vec<f64>,
}

impl GaussianKernel {
    /// A non-positive or non-finite `sigma` gives the identity kernel.
    pub fn new(sigma: f64) -> Self {
        if !is_active_sigma(sigma) {
            return Self { taps: vec![1.0] };
        }
        let radius = (TRUNCATE * sigma + 0.5) as usize;
        let inv = -0.5 / (sigma * sigma);
        let mut taps: Vec<f64> = (0..=2 * radius)
            .map(|i| {
                let d = i as f64 - radius as f64;
                (inv * d * d).exp()
            })
            .collect();
        let sum: f64 = taps.iter().sum();
        for t in &mut taps {
            *t /= sum;
        }
        Self { taps }
    }

    pub fn radius(&self) -> usize {
        self.taps.len() / 2
    }
}

impl SeparableFilter for GaussianKernel {
    #[inline]
    fn taps(&self) -> &[f64] {
        &self.taps
    }
}

/// Gaussian filter applied to the filled grid, mask re-applied.
///
/// Samples without valid pixels and a non-positive or non-finite `sigma` pass
/// through unchanged.
pub fn gaussian_filter(sample: &DepthSample, sigma: f64) -> DepthSample {
    if !is_active_sigma(sigma) {
        return sample.clone();
    }
    match gaussian_filter_filled(sample, sigma) {
        Some(filtered) => restore_mask(sample, filtered),
        None => sample.clone(),
    }
}

/// Filter output before the mask is re-applied.
pub fn gaussian_filter_filled(sample: &DepthSample, sigma: f64) -> Option<ImageF64> {
    let (filled, _) = fill_invalid(sample)?;
    if !is_active_sigma(sigma) {
        return Some(filled);
    }
    Some(convolve_separable(&filled, &GaussianKernel::new(sigma)))
}

#[inline]
pub(crate) fn is_active_sigma(sigma: f64) -> bool {
    sigma > 0.0 && sigma.is_finite()
}

/// Horizontal pass followed by a vertical pass, reflect boundary.
pub(crate) fn convolve_separable<F: SeparableFilter>(src: &ImageF64, filter: &F) -> ImageF64 {
    let taps = filter.taps();
    let radius = (taps.len() / 2) as isize;

    let mut horiz = ImageF64::new(src.w, src.h);
    for y in 0..src.h {
        let row = src.row(y);
        let dst = horiz.row_mut(y);
        for (x, dst_px) in dst.iter_mut().enumerate() {
            let mut acc = 0.0f64;
            for (k, &tap) in taps.iter().enumerate() {
                let sx = reflect_index(x as isize + k as isize - radius, src.w);
                acc += tap * row[sx];
            }
            *dst_px = acc;
        }
    }

    let mut out = ImageF64::new(src.w, src.h);
    for y in 0..src.h {
        let dst = out.row_mut(y);
        for (k, &tap) in taps.iter().enumerate() {
            let sy = reflect_index(y as isize + k as isize - radius, src.h);
            let src_row = horiz.row(sy);
            for (d, &s) in dst.iter_mut().zip(src_row) {
                *d += tap * s;
            }
        }
    }
    out
}
