//! Calibration model: measured→actual inverse spline plus an optional forward
//! spline, built once from calibration pairs and then shared read-only.
use super::bspline::BSpline;
use crate::error::{CompensationError, Result};
use log::debug;
use serde::Serialize;

/// Format version written with every model.
pub const MODEL_VERSION: &str = "2.2";
/// Model family tag written with every model.
pub const MODEL_TYPE: &str = "cubic_spline";

/// One `(actual, measured)` calibration pair, both in millimetres.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CalibrationPoint {
    pub actual: f64,
    pub measured: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompensationModel {
    pub(crate) inverse: BSpline,
    pub(crate) forward: Option<BSpline>,
    pub(crate) x_range: (f64, f64),
    pub(crate) y_range: (f64, f64),
    pub(crate) calibration_points: usize,
    pub(crate) version: String,
    pub(crate) actual_values: Option<Vec<f64>>,
    pub(crate) measured_values: Option<Vec<f64>>,
}

impl CompensationModel {
    /// Fit forward and inverse splines through the calibration pairs.
    ///
    /// The degree is `min(spline_order, n - 1)`. Lengths must match, values
    /// must be finite, and neither axis may contain duplicates.
    pub fn build(actual: &[f64], measured: &[f64], spline_order: usize) -> Result<Self> {
        if actual.len() != measured.len() {
            return Err(CompensationError::InvalidData(format!(
                "actual/measured length mismatch: {} vs {}",
                actual.len(),
                measured.len()
            )));
        }
        let n = actual.len();
        if n < 2 {
            return Err(CompensationError::InsufficientData { needed: 2, got: n });
        }
        if actual.iter().chain(measured).any(|v| !v.is_finite()) {
            return Err(CompensationError::InvalidData(
                "calibration values must be finite".into(),
            ));
        }
        let k = spline_order.min(n - 1);
        if k == 0 {
            return Err(CompensationError::InvalidData(
                "spline order must be at least 1".into(),
            ));
        }
        let needed = (k + 1).max(2);
        if n < needed {
            return Err(CompensationError::InsufficientData { needed, got: n });
        }

        let mut pairs: Vec<(f64, f64)> = actual
            .iter()
            .copied()
            .zip(measured.iter().copied())
            .collect();

        pairs.sort_by(|a, b| a.1.total_cmp(&b.1));
        reject_duplicates(pairs.iter().map(|p| p.1), "measured")?;
        let (m_sorted, a_by_m): (Vec<f64>, Vec<f64>) = pairs.iter().map(|&(a, m)| (m, a)).unzip();
        let inverse = BSpline::interpolate(&m_sorted, &a_by_m, k)?;

        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        reject_duplicates(pairs.iter().map(|p| p.0), "actual")?;
        let (a_sorted, m_by_a): (Vec<f64>, Vec<f64>) = pairs.iter().copied().unzip();
        let forward = BSpline::interpolate(&a_sorted, &m_by_a, k)?;

        let x_range = (m_sorted[0], m_sorted[n - 1]);
        let y_range = (a_sorted[0], a_sorted[n - 1]);
        debug!(
            "model built: n={n} k={k} measured=[{:.4}, {:.4}] actual=[{:.4}, {:.4}]",
            x_range.0, x_range.1, y_range.0, y_range.1
        );

        Ok(Self {
            inverse,
            forward: Some(forward),
            x_range,
            y_range,
            calibration_points: n,
            version: MODEL_VERSION.to_string(),
            actual_values: Some(actual.to_vec()),
            measured_values: Some(measured.to_vec()),
        })
    }

    pub fn from_points(points: &[CalibrationPoint], spline_order: usize) -> Result<Self> {
        let actual: Vec<f64> = points.iter().map(|p| p.actual).collect();
        let measured: Vec<f64> = points.iter().map(|p| p.measured).collect();
        Self::build(&actual, &measured, spline_order)
    }

    /// Measured→actual spline.
    pub fn inverse(&self) -> &BSpline {
        &self.inverse
    }

    /// Actual→measured spline; absent for models loaded from the minimal format.
    pub fn forward(&self) -> Option<&BSpline> {
        self.forward.as_ref()
    }

    pub fn k(&self) -> usize {
        self.inverse.degree()
    }

    /// Calibrated measured-axis interval.
    pub fn x_range(&self) -> (f64, f64) {
        self.x_range
    }

    /// Calibrated actual-axis interval.
    pub fn y_range(&self) -> (f64, f64) {
        self.y_range
    }

    pub fn calibration_points(&self) -> usize {
        self.calibration_points
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn actual_values(&self) -> Option<&[f64]> {
        self.actual_values.as_deref()
    }

    pub fn measured_values(&self) -> Option<&[f64]> {
        self.measured_values.as_deref()
    }

    /// Raw inverse spline value, no range handling.
    pub fn predict_actual(&self, measured: f64) -> f64 {
        self.inverse.evaluate(measured)
    }

    /// Raw forward spline value, when the model carries one.
    pub fn predict_measured(&self, actual: f64) -> Option<f64> {
        self.forward.as_ref().map(|f| f.evaluate(actual))
    }
}

fn reject_duplicates(sorted: impl Iterator<Item = f64>, axis: &str) -> Result<()> {
    let mut prev: Option<f64> = None;
    for v in sorted {
        if prev == Some(v) {
            return Err(CompensationError::InvalidData(format!(
                "duplicate {axis} value {v} in calibration data"
            )));
        }
        prev = Some(v);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTUAL: [f64; 5] = [0.0, 5.0, 10.0, 15.0, 20.0];
    const MEASURED: [f64; 5] = [0.05, 5.02, 10.01, 15.03, 19.98];

    #[test]
    fn builds_cubic_model_from_five_points() {
        let model = CompensationModel::build(&ACTUAL, &MEASURED, 3).unwrap();
        assert_eq!(model.k(), 3);
        assert_eq!(model.calibration_points(), 5);
        assert_eq!(model.x_range(), (0.05, 19.98));
        assert_eq!(model.y_range(), (0.0, 20.0));
        assert_eq!(model.version(), MODEL_VERSION);
        for (a, m) in ACTUAL.iter().zip(&MEASURED) {
            let back = model.predict_actual(*m);
            assert!((back - a).abs() <= 1e-6 * a.abs().max(1.0), "{m} -> {back}");
        }
    }

    #[test]
    fn forward_and_inverse_are_consistent() {
        let model = CompensationModel::build(&ACTUAL, &MEASURED, 3).unwrap();
        for i in 0..=40 {
            let a = i as f64 * 0.5;
            let m = model.predict_measured(a).unwrap();
            let back = model.predict_actual(m);
            assert!((back - a).abs() < 5e-3, "a={a} m={m} back={back}");
        }
    }

    #[test]
    fn order_is_reduced_for_short_sets() {
        let model = CompensationModel::build(&[0.0, 10.0, 20.0], &[0.1, 10.0, 19.9], 3).unwrap();
        assert_eq!(model.k(), 2);
        let model = CompensationModel::build(&[0.0, 10.0], &[0.1, 10.2], 3).unwrap();
        assert_eq!(model.k(), 1);
    }

    #[test]
    fn unsorted_input_is_accepted() {
        let model =
            CompensationModel::build(&[10.0, 0.0, 20.0, 5.0], &[10.1, 0.2, 19.7, 5.0], 3).unwrap();
        assert!((model.predict_actual(5.0) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_bad_calibration_sets() {
        assert!(matches!(
            CompensationModel::build(&[1.0], &[1.0], 3),
            Err(CompensationError::InsufficientData { needed: 2, got: 1 })
        ));
        assert!(matches!(
            CompensationModel::build(&[1.0, 2.0], &[1.0], 3),
            Err(CompensationError::InvalidData(_))
        ));
        assert!(matches!(
            CompensationModel::build(&[0.0, 1.0, 2.0], &[0.0, f64::NAN, 2.0], 3),
            Err(CompensationError::InvalidData(_))
        ));
        assert!(matches!(
            CompensationModel::build(&[0.0, 1.0, 2.0], &[0.0, 1.0, 1.0], 3),
            Err(CompensationError::InvalidData(_))
        ));
        assert!(matches!(
            CompensationModel::build(&[0.0, 0.0, 2.0], &[0.0, 1.0, 2.0], 3),
            Err(CompensationError::InvalidData(_))
        ));
        assert!(matches!(
            CompensationModel::build(&[0.0, 1.0], &[0.0, 1.0], 0),
            Err(CompensationError::InvalidData(_))
        ));
    }
}
