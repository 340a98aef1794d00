//! JSON persistence for [`CompensationModel`].
//!
//! Two layouts are written:
//! - minimal: the inverse spline (`knots`, `coefficients`, `k`) plus ranges;
//!   enough to compensate, nothing else.
//! - full: nested `inverse_model`/`forward_model` (`t`, `c`, `k`), both ranges
//!   and the calibration values.
//!
//! Coefficients are written padded with trailing zeros to the knot count and
//! accepted padded or unpadded. Loading rebuilds the splines from the stored
//! knots and coefficients; nothing is refitted.
use super::bspline::BSpline;
use super::model::{CompensationModel, MODEL_TYPE, MODEL_VERSION};
use crate::error::{CompensationError, Result};
use crate::image::io::ensure_parent_dir;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveFormat {
    #[default]
    Minimal,
    Full,
}

/// Flat inverse-only layout.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MinimalDocument {
    #[serde(default = "default_model_type")]
    pub model_type: String,
    #[serde(default)]
    pub version: Option<String>,
    pub knots: Vec<f64>,
    pub coefficients: Vec<f64>,
    pub k: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_range: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_range: Option<[f64; 2]>,
    #[serde(default)]
    pub calibration_points: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SplineDocument {
    pub t: Vec<f64>,
    pub c: Vec<f64>,
    pub k: usize,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CalibrationDataDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_points: Option<usize>,
    #[serde(default)]
    pub actual_values: Vec<f64>,
    #[serde(default)]
    pub measured_values: Vec<f64>,
}

/// Nested layout carrying both splines and the calibration values.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FullDocument {
    #[serde(default = "default_model_type")]
    pub model_type: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub inverse_model: SplineDocument,
    pub actual_range: [f64; 2],
    pub measured_range: [f64; 2],
    #[serde(default)]
    pub calibration_data: CalibrationDataDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_model: Option<SplineDocument>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum ModelDocument {
    Minimal(MinimalDocument),
    Full(FullDocument),
}

fn default_model_type() -> String {
    MODEL_TYPE.to_string()
}

fn padded(spline: &BSpline) -> Vec<f64> {
    let mut c = spline.coefficients().to_vec();
    c.resize(spline.knots().len(), 0.0);
    c
}

fn spline_document(spline: &BSpline) -> SplineDocument {
    SplineDocument {
        t: spline.knots().to_vec(),
        c: padded(spline),
        k: spline.degree(),
    }
}

/// Rebuild a spline from stored parts, trimming FITPACK-style padding.
fn restore_spline(
    knots: Vec<f64>,
    mut coefficients: Vec<f64>,
    k: usize,
    what: &str,
) -> Result<BSpline> {
    let n = knots.len().checked_sub(k + 1).ok_or_else(|| {
        CompensationError::ModelLoad(format!("{what}: {} knots too few for k={k}", knots.len()))
    })?;
    if coefficients.len() == knots.len() {
        coefficients.truncate(n);
    }
    BSpline::from_parts(knots, coefficients, k)
        .map_err(|e| CompensationError::ModelLoad(format!("{what}: {e}")))
}

impl ModelDocument {
    pub fn from_model(model: &CompensationModel, format: SaveFormat) -> Self {
        let (x0, x1) = model.x_range();
        let (y0, y1) = model.y_range();
        match format {
            SaveFormat::Minimal => ModelDocument::Minimal(MinimalDocument {
                model_type: default_model_type(),
                version: Some(model.version().to_string()),
                knots: model.inverse().knots().to_vec(),
                coefficients: padded(model.inverse()),
                k: model.k(),
                x_range: Some([x0, x1]),
                y_range: Some([y0, y1]),
                calibration_points: model.calibration_points(),
            }),
            SaveFormat::Full => ModelDocument::Full(FullDocument {
                model_type: default_model_type(),
                version: Some(model.version().to_string()),
                description: Some("depth compensation spline model (full format)".into()),
                inverse_model: spline_document(model.inverse()),
                actual_range: [y0, y1],
                measured_range: [x0, x1],
                calibration_data: CalibrationDataDocument {
                    num_points: Some(model.calibration_points()),
                    actual_values: model.actual_values().map(<[f64]>::to_vec).unwrap_or_default(),
                    measured_values: model
                        .measured_values()
                        .map(<[f64]>::to_vec)
                        .unwrap_or_default(),
                },
                forward_model: model.forward().map(spline_document),
            }),
        }
    }

    /// Dispatch on the layout: `knots` marks the minimal form, `inverse_model`
    /// the full one.
    pub fn from_value(value: Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| CompensationError::ModelLoad("model JSON is not an object".into()))?;
        if let Some(tag) = obj.get("model_type") {
            if tag.as_str() != Some(MODEL_TYPE) {
                return Err(CompensationError::ModelLoad(format!(
                    "unsupported model_type {tag}, expected \"{MODEL_TYPE}\""
                )));
            }
        }
        let parse_err = |e: serde_json::Error| CompensationError::ModelLoad(e.to_string());
        if obj.contains_key("knots") {
            serde_json::from_value(value).map(ModelDocument::Minimal).map_err(parse_err)
        } else if obj.contains_key("inverse_model") {
            serde_json::from_value(value).map(ModelDocument::Full).map_err(parse_err)
        } else {
            Err(CompensationError::ModelLoad(
                "unrecognised model layout: neither `knots` nor `inverse_model` present".into(),
            ))
        }
    }

    pub fn into_model(self) -> Result<CompensationModel> {
        match self {
            ModelDocument::Minimal(doc) => {
                let inverse = restore_spline(doc.knots, doc.coefficients, doc.k, "inverse spline")?;
                let x_range = match doc.x_range {
                    Some([a, b]) => (a, b),
                    None => inverse.domain(),
                };
                let y_range = match doc.y_range {
                    Some([a, b]) => (a, b),
                    None => x_range,
                };
                Ok(CompensationModel {
                    inverse,
                    forward: None,
                    x_range,
                    y_range,
                    calibration_points: doc.calibration_points,
                    version: doc.version.unwrap_or_else(|| "2.0".into()),
                    actual_values: None,
                    measured_values: None,
                })
            }
            ModelDocument::Full(doc) => {
                let inv = doc.inverse_model;
                let inverse = restore_spline(inv.t, inv.c, inv.k, "inverse spline")?;
                let forward = doc
                    .forward_model
                    .map(|f| restore_spline(f.t, f.c, f.k, "forward spline"))
                    .transpose()?;
                let calib = doc.calibration_data;
                let non_empty = |v: Vec<f64>| (!v.is_empty()).then_some(v);
                Ok(CompensationModel {
                    inverse,
                    forward,
                    x_range: (doc.measured_range[0], doc.measured_range[1]),
                    y_range: (doc.actual_range[0], doc.actual_range[1]),
                    calibration_points: calib.num_points.unwrap_or(calib.actual_values.len()),
                    version: doc.version.unwrap_or_else(|| "2.1".into()),
                    actual_values: non_empty(calib.actual_values),
                    measured_values: non_empty(calib.measured_values),
                })
            }
        }
    }
}

pub fn to_json(model: &CompensationModel, format: SaveFormat) -> Result<String> {
    serde_json::to_string_pretty(&ModelDocument::from_model(model, format))
        .map_err(|e| CompensationError::InvalidData(format!("failed to serialize model: {e}")))
}

pub fn from_json(json: &str) -> Result<CompensationModel> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| CompensationError::ModelLoad(format!("malformed model JSON: {e}")))?;
    ModelDocument::from_value(value)?.into_model()
}

/// Write the model as JSON. A missing or different extension is replaced by
/// `.json`; the path actually written is returned.
pub fn save_model(model: &CompensationModel, path: &Path, format: SaveFormat) -> Result<PathBuf> {
    let path = match path.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("json") => path.to_path_buf(),
        _ => path.with_extension("json"),
    };
    ensure_parent_dir(&path)?;
    fs::write(&path, to_json(model, format)?)?;
    debug!("model saved to {} ({format:?})", path.display());
    Ok(path)
}

pub fn load_model(path: &Path) -> Result<CompensationModel> {
    if !path.is_file() {
        return Err(CompensationError::not_found("model file", path));
    }
    let json = fs::read_to_string(path)?;
    let model = from_json(&json)?;
    debug!(
        "model loaded from {}: k={} points={} version={}",
        path.display(),
        model.k(),
        model.calibration_points(),
        model.version()
    );
    Ok(model)
}
