//! Batch compensation of a directory of depth frames.
use crate::dataset::{frame_name, list_images};
use crate::error::{CompensationError, Result};
use crate::image::io::{load_depth_image, save_depth_image};
use crate::image::DepthImage;
use crate::params::DepthConversionConfig;
use crate::spline::{CompensationResult, Compensator};
use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize)]
pub struct ImageRecord {
    pub name: String,
    pub output: PathBuf,
    pub result: CompensationResult,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchProcessResult {
    pub total_images: usize,
    pub processed_images: usize,
    pub failed_images: usize,
    pub total_pixels: usize,
    pub compensated_pixels: usize,
    /// Pixel-weighted: `compensated_pixels / total_pixels × 100`.
    pub avg_compensation_rate: f64,
    pub results: Vec<ImageRecord>,
    /// `(file name, error message)` for every frame that failed.
    pub failures: Vec<(String, String)>,
}

/// Compensate every frame in `input_dir` and write it under the same file
/// name into `output_dir`.
pub fn compensate_directory<P>(
    compensator: &Compensator,
    depth: &DepthConversionConfig,
    input_dir: &Path,
    output_dir: &Path,
    progress: P,
) -> Result<BatchProcessResult>
where
    P: FnMut(usize, usize, &str),
{
    let inputs = list_images(input_dir)?;
    if inputs.is_empty() {
        return Err(CompensationError::not_found("depth images", input_dir));
    }
    fs::create_dir_all(output_dir)?;
    compensate_files(
        compensator,
        depth,
        &inputs,
        output_dir,
        load_depth_image,
        |img, path| save_depth_image(img, path),
        progress,
    )
}

/// Per-file failures are recorded and the batch continues.
pub fn compensate_files<L, S, P>(
    compensator: &Compensator,
    depth: &DepthConversionConfig,
    inputs: &[PathBuf],
    output_dir: &Path,
    mut load: L,
    mut save: S,
    mut progress: P,
) -> Result<BatchProcessResult>
where
    L: FnMut(&Path) -> Result<DepthImage>,
    S: FnMut(&DepthImage, &Path) -> Result<()>,
    P: FnMut(usize, usize, &str),
{
    let total = inputs.len();
    let mut batch = BatchProcessResult {
        total_images: total,
        ..Default::default()
    };

    progress(0, total, &format!("compensating {total} images"));
    for (i, path) in inputs.iter().enumerate() {
        let name = frame_name(path);
        progress(i + 1, total, &name);
        let output = output_dir.join(&name);

        let outcome = load(path).and_then(|img| {
            let out = compensator.compensate_image(&img, depth);
            save(&out.image, &output)?;
            Ok(out.result)
        });
        match outcome {
            Ok(result) => {
                batch.total_pixels += result.total_pixels;
                batch.compensated_pixels += result.compensated_pixels;
                batch.results.push(ImageRecord {
                    name,
                    output,
                    result,
                });
            }
            Err(err) => {
                warn!("batch: {name} failed: {err}");
                batch.failures.push((name, err.to_string()));
            }
        }
    }

    batch.processed_images = batch.results.len();
    batch.failed_images = batch.failures.len();
    batch.avg_compensation_rate = if batch.total_pixels > 0 {
        batch.compensated_pixels as f64 / batch.total_pixels as f64 * 100.0
    } else {
        0.0
    };
    info!(
        "batch: {}/{} images compensated, average rate {:.2}%",
        batch.processed_images, total, batch.avg_compensation_rate
    );
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ExtrapolateConfig, NormalizeConfig};
    use crate::spline::CompensationModel;
    use std::sync::Arc;

    fn compensator() -> Compensator {
        let model = CompensationModel::build(
            &[0.0, 5.0, 10.0, 15.0, 20.0],
            &[0.05, 5.02, 10.01, 15.03, 19.98],
            3,
        )
        .unwrap();
        Compensator::new(
            Arc::new(model),
            ExtrapolateConfig::default(),
            &NormalizeConfig::default(),
        )
    }

    #[test]
    fn failures_are_recorded_and_batch_completes() {
        let depth = DepthConversionConfig::default();
        let inputs: Vec<PathBuf> = ["a.png", "bad.png", "c.png"]
            .iter()
            .map(PathBuf::from)
            .collect();
        let mut saved = Vec::new();
        let batch = compensate_files(
            &compensator(),
            &depth,
            &inputs,
            Path::new("out"),
            |p| {
                if p.ends_with("bad.png") {
                    Err(CompensationError::Image("truncated stream".into()))
                } else {
                    Ok(DepthImage::filled(4, 4, depth.mm_to_pixel(10.0)))
                }
            },
            |_, path| {
                saved.push(path.to_path_buf());
                Ok(())
            },
            |_, _, _: &str| {},
        )
        .unwrap();
        assert_eq!(batch.total_images, 3);
        assert_eq!(batch.processed_images, 2);
        assert_eq!(batch.failed_images, 1);
        assert_eq!(batch.failures[0].0, "bad.png");
        assert!(batch.failures[0].1.contains("truncated"));
        assert_eq!(batch.total_pixels, 32);
        assert_eq!(batch.compensated_pixels, 32);
        assert!((batch.avg_compensation_rate - 100.0).abs() < 1e-12);
        assert_eq!(saved, vec![PathBuf::from("out/a.png"), PathBuf::from("out/c.png")]);
    }

    #[test]
    fn missing_input_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = compensate_directory(
            &compensator(),
            &DepthConversionConfig::default(),
            &dir.path().join("missing"),
            &dir.path().join("out"),
            |_, _, _: &str| {},
        )
        .unwrap_err();
        assert!(matches!(err, CompensationError::NotFound { .. }));
    }
}
