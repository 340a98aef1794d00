//! Interpolating B-splines in knot/coefficient form.
//!
//! Knot placement reproduces an `s = 0` smoothing fit: each boundary knot is
//! repeated `k + 1` times and the interior knots sit on the data abscissae
//! (odd `k`) or on midpoints between them (even `k`), so the spline has
//! exactly as many coefficients as data points. The collocation system is
//! solved with a dense LU factorisation; calibration sets are small.
use crate::error::{CompensationError, Result};
use nalgebra::{DMatrix, DVector};

/// Highest supported degree; basis evaluation works in fixed-size buffers.
pub const MAX_DEGREE: usize = 5;

fn check_degree(k: usize) -> Result<()> {
    if k > MAX_DEGREE {
        return Err(CompensationError::InvalidData(format!(
            "spline degree {k} exceeds the supported maximum {MAX_DEGREE}"
        )));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub struct BSpline {
    knots: Vec<f64>,
    coefficients: Vec<f64>,
    k: usize,
}

impl BSpline {
    /// Wrap an existing knot vector and coefficient set.
    ///
    /// Requires `knots.len() == coefficients.len() + k + 1`, at least `k + 1`
    /// coefficients, finite values and non-decreasing knots.
    pub fn from_parts(knots: Vec<f64>, coefficients: Vec<f64>, k: usize) -> Result<Self> {
        check_degree(k)?;
        if coefficients.len() < k + 1 {
            return Err(CompensationError::InvalidData(format!(
                "spline of degree {k} needs at least {} coefficients, got {}",
                k + 1,
                coefficients.len()
            )));
        }
        if knots.len() != coefficients.len() + k + 1 {
            return Err(CompensationError::InvalidData(format!(
                "knot count {} does not match {} coefficients of degree {k}",
                knots.len(),
                coefficients.len()
            )));
        }
        if knots.iter().chain(&coefficients).any(|v| !v.is_finite()) {
            return Err(CompensationError::InvalidData(
                "spline knots and coefficients must be finite".into(),
            ));
        }
        if knots.windows(2).any(|w| w[1] < w[0]) {
            return Err(CompensationError::InvalidData(
                "spline knots must be non-decreasing".into(),
            ));
        }
        if knots[k] >= knots[coefficients.len()] {
            return Err(CompensationError::InvalidData(
                "spline domain is empty".into(),
            ));
        }
        Ok(Self {
            knots,
            coefficients,
            k,
        })
    }

    /// Interpolate `(x[i], y[i])` with a spline of degree `k`.
    ///
    /// `x` must be strictly increasing and hold at least `k + 1` entries.
    pub fn interpolate(x: &[f64], y: &[f64], k: usize) -> Result<Self> {
        let m = x.len();
        if y.len() != m {
            return Err(CompensationError::InvalidData(format!(
                "abscissa/ordinate length mismatch: {m} vs {}",
                y.len()
            )));
        }
        if k == 0 {
            return Err(CompensationError::InvalidData(
                "spline degree must be at least 1".into(),
            ));
        }
        check_degree(k)?;
        if m < k + 1 {
            return Err(CompensationError::InsufficientData {
                needed: k + 1,
                got: m,
            });
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(CompensationError::InvalidData(
                "interpolation abscissae must be strictly increasing".into(),
            ));
        }

        let knots = interpolation_knots(x, k);
        let mut a = DMatrix::<f64>::zeros(m, m);
        for (row, &xi) in x.iter().enumerate() {
            let span = find_span(&knots, m, k, xi);
            let basis = basis_funs(&knots, span, k, xi);
            for (r, &b) in basis[..=k].iter().enumerate() {
                a[(row, span - k + r)] = b;
            }
        }
        let rhs = DVector::from_column_slice(y);
        let sol = a.lu().solve(&rhs).ok_or_else(|| {
            CompensationError::InvalidData("spline collocation system is singular".into())
        })?;

        Ok(Self {
            knots,
            coefficients: sol.iter().copied().collect(),
            k,
        })
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn degree(&self) -> usize {
        self.k
    }

    /// Interval `[t_k, t_n]` on which the spline is defined by its data.
    pub fn domain(&self) -> (f64, f64) {
        (self.knots[self.k], self.knots[self.coefficients.len()])
    }

    /// Value at `x`. Outside the domain the boundary polynomial piece is
    /// continued.
    pub fn evaluate(&self, x: f64) -> f64 {
        let n = self.coefficients.len();
        let span = find_span(&self.knots, n, self.k, x);
        let basis = basis_funs(&self.knots, span, self.k, x);
        basis[..=self.k]
            .iter()
            .enumerate()
            .map(|(r, b)| b * self.coefficients[span - self.k + r])
            .sum()
    }

    /// Spline of degree `k - 1` representing the first derivative.
    pub fn derivative_spline(&self) -> BSpline {
        let k = self.k;
        let n = self.coefficients.len();
        if k == 0 {
            return BSpline {
                knots: self.knots.clone(),
                coefficients: vec![0.0; n],
                k: 0,
            };
        }
        let t = &self.knots;
        let c = &self.coefficients;
        let coefficients = (0..n - 1)
            .map(|i| {
                let dt = t[i + k + 1] - t[i + 1];
                if dt > 0.0 {
                    k as f64 * (c[i + 1] - c[i]) / dt
                } else {
                    0.0
                }
            })
            .collect();
        BSpline {
            knots: t[1..t.len() - 1].to_vec(),
            coefficients,
            k: k - 1,
        }
    }

    /// First derivative at `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        self.derivative_spline().evaluate(x)
    }
}

fn interpolation_knots(x: &[f64], k: usize) -> Vec<f64> {
    let m = x.len();
    let mut knots = Vec::with_capacity(m + k + 1);
    knots.extend(std::iter::repeat(x[0]).take(k + 1));
    for l in 0..m - k - 1 {
        let t = if k % 2 == 1 {
            x[(k + 1) / 2 + l]
        } else {
            0.5 * (x[k / 2 + l] + x[k / 2 + 1 + l])
        };
        knots.push(t);
    }
    knots.extend(std::iter::repeat(x[m - 1]).take(k + 1));
    knots
}

/// Index `mu` in `[k, n - 1]` with `t[mu] <= x < t[mu + 1]`; the right end of
/// the domain and anything outside map to the boundary spans.
fn find_span(t: &[f64], n: usize, k: usize, x: f64) -> usize {
    if x >= t[n] {
        return n - 1;
    }
    if x <= t[k] {
        return k;
    }
    let upper = t.partition_point(|&v| v <= x);
    upper.saturating_sub(1).clamp(k, n - 1)
}

/// Non-zero basis functions `N_{span-k..=span, k}(x)` (Cox–de Boor) in the
/// first `k + 1` slots.
fn basis_funs(t: &[f64], span: usize, k: usize, x: f64) -> [f64; MAX_DEGREE + 1] {
    let mut n = [0.0f64; MAX_DEGREE + 1];
    let mut left = [0.0f64; MAX_DEGREE + 1];
    let mut right = [0.0f64; MAX_DEGREE + 1];
    n[0] = 1.0;
    for j in 1..=k {
        left[j] = x - t[span + 1 - j];
        right[j] = t[span + j] - x;
        let mut saved = 0.0;
        for r in 0..j {
            let denom = right[r + 1] + left[j - r];
            let temp = if denom != 0.0 { n[r] / denom } else { 0.0 };
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n[j] = saved;
    }
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cubic(x: f64) -> f64 {
        0.5 * x * x * x - 2.0 * x * x + x - 3.0
    }

    fn cubic_prime(x: f64) -> f64 {
        1.5 * x * x - 4.0 * x + 1.0
    }

    #[test]
    fn cubic_knots_follow_not_a_knot_layout() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let y: Vec<f64> = x.iter().map(|&v| cubic(v)).collect();
        let s = BSpline::interpolate(&x, &y, 3).unwrap();
        assert_eq!(
            s.knots(),
            &[0.0, 0.0, 0.0, 0.0, 2.0, 3.0, 5.0, 5.0, 5.0, 5.0]
        );
        assert_eq!(s.coefficients().len(), 6);
        assert_eq!(s.domain(), (0.0, 5.0));
    }

    #[test]
    fn reproduces_cubic_polynomial_between_samples() {
        let x = [0.0, 0.7, 1.5, 2.0, 3.1, 4.0, 4.4];
        let y: Vec<f64> = x.iter().map(|&v| cubic(v)).collect();
        let s = BSpline::interpolate(&x, &y, 3).unwrap();
        for i in 0..=44 {
            let v = i as f64 * 0.1;
            assert!((s.evaluate(v) - cubic(v)).abs() < 1e-9, "x={v}");
            assert!((s.derivative(v) - cubic_prime(v)).abs() < 1e-8, "x={v}");
        }
    }

    #[test]
    fn passes_through_data_points() {
        let x = [0.05, 5.02, 10.01, 15.03, 19.98];
        let y = [0.0, 5.0, 10.0, 15.0, 20.0];
        let s = BSpline::interpolate(&x, &y, 3).unwrap();
        for (xi, yi) in x.iter().zip(&y) {
            assert!((s.evaluate(*xi) - yi).abs() < 1e-9);
        }
    }

    #[test]
    fn even_degree_uses_midpoint_knots() {
        let x = [0.0, 1.0, 2.0, 4.0];
        let y = [1.0, 3.0, 2.0, 5.0];
        let s = BSpline::interpolate(&x, &y, 2).unwrap();
        assert_eq!(s.knots(), &[0.0, 0.0, 0.0, 1.5, 4.0, 4.0, 4.0]);
        for (xi, yi) in x.iter().zip(&y) {
            assert!((s.evaluate(*xi) - yi).abs() < 1e-10);
        }
    }

    #[test]
    fn linear_spline_is_piecewise_linear() {
        let s = BSpline::interpolate(&[0.0, 2.0], &[1.0, 5.0], 1).unwrap();
        assert!((s.evaluate(0.5) - 2.0).abs() < 1e-12);
        assert!((s.derivative(1.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn quintic_reproduces_polynomial_and_caps_degree() {
        let x: Vec<f64> = (0..9).map(|i| i as f64 * 0.5).collect();
        let f = |v: f64| v.powi(5) * 0.01 - v.powi(3) + 2.0;
        let y: Vec<f64> = x.iter().map(|&v| f(v)).collect();
        let s = BSpline::interpolate(&x, &y, MAX_DEGREE).unwrap();
        for v in [0.3, 1.7, 2.25, 3.9] {
            assert!((s.evaluate(v) - f(v)).abs() < 1e-8, "x={v}");
        }

        let err = BSpline::interpolate(&x, &y, MAX_DEGREE + 1).unwrap_err();
        assert!(matches!(err, CompensationError::InvalidData(_)));
        let knots = vec![0.0; 7].into_iter().chain(vec![1.0; 7]).collect();
        assert!(BSpline::from_parts(knots, vec![0.0; 7], 6).is_err());
    }

    #[test]
    fn from_parts_rejects_inconsistent_lengths() {
        assert!(BSpline::from_parts(vec![0.0, 0.0, 1.0, 1.0], vec![1.0, 2.0, 3.0], 1).is_err());
        assert!(BSpline::from_parts(vec![0.0, 0.0, 1.0, 1.0], vec![1.0, 2.0], 1).is_ok());
    }

    #[test]
    fn rejects_unsorted_abscissae() {
        let err = BSpline::interpolate(&[0.0, 2.0, 1.0], &[0.0, 1.0, 2.0], 2).unwrap_err();
        assert!(matches!(err, CompensationError::InvalidData(_)));
    }
}
