use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use depth_compensation::config::{calibrate, compensate, linearity};
use depth_compensation::dataset::Dataset;
use depth_compensation::diagnostics::{
    CalibrationReport, CompensationReport, LinearityReport, ModelSummary,
};
use depth_compensation::image::io::write_json_file;
use depth_compensation::pipeline::{
    calibrate_dataset, compensate_directory, evaluate_dataset, ModelSlot,
};
use depth_compensation::spline::{save_model, Compensator};
use log::info;

/// Depth camera calibration, compensation and linearity evaluation.
#[derive(Debug, Parser)]
#[command(author, version, about = "Spline-based depth compensation tools")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a compensation model from a calibration dataset.
    Calibrate {
        /// Path to the JSON tool config.
        #[arg(long)]
        config: PathBuf,
    },
    /// Compensate every frame of a directory with a saved model.
    Compensate {
        #[arg(long)]
        config: PathBuf,
    },
    /// Evaluate BFSL linearity of a test dataset, optionally after compensation.
    Linearity {
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let slot = ModelSlot::new();
    match args.command {
        Command::Calibrate { config } => run_calibrate(&config),
        Command::Compensate { config } => run_compensate(&config, &slot),
        Command::Linearity { config } => run_linearity(&config, &slot),
    }
}

fn print_progress(current: usize, total: usize, message: &str) {
    eprintln!("[{current}/{total}] {message}");
}

fn run_calibrate(path: &Path) -> Result<(), Box<dyn Error>> {
    let cfg = calibrate::load_config(path)?;
    let dataset = Dataset::discover(&cfg.input)?;
    let outcome = calibrate_dataset(&dataset, &cfg.settings(), print_progress)?;

    let model_path = save_model(&outcome.model, &cfg.model_path(), cfg.model_format)?;
    println!("Calibration summary");
    println!("  images: {}", outcome.total_images);
    println!("  used: {}", outcome.accepted.len());
    println!("  skipped: {}", outcome.skipped.len());
    for s in &outcome.skipped {
        println!("    {}: {}", s.name, s.reason);
    }
    let (x0, x1) = outcome.model.x_range();
    println!("  measured range: [{x0:.4}, {x1:.4}] mm");
    println!("  spline order: {}", outcome.model.k());
    println!("  model: {}", model_path.display());

    if let Some(report_path) = cfg.report_path() {
        let report = CalibrationReport::new(
            &cfg.input,
            &outcome,
            Some(cfg.defaults.full_scale),
            Some(model_path),
        );
        write_json_file(&report_path, &report)?;
        println!("  report: {}", report_path.display());
    }
    Ok(())
}

fn run_compensate(path: &Path, slot: &ModelSlot) -> Result<(), Box<dyn Error>> {
    let cfg = compensate::load_config(path)?;
    let model = slot.load(&cfg.model)?;
    let depth = cfg.depth();
    let compensator = Compensator::new(Arc::clone(&model), cfg.extrapolate.clone(), &cfg.normalize);

    let batch = compensate_directory(
        &compensator,
        &depth,
        &cfg.input,
        &cfg.output.dir,
        print_progress,
    )?;
    println!("Compensation summary");
    println!(
        "  images: {} processed, {} failed of {}",
        batch.processed_images, batch.failed_images, batch.total_images
    );
    println!("  average compensation rate: {:.2}%", batch.avg_compensation_rate);
    for (name, msg) in &batch.failures {
        println!("    {name}: {msg}");
    }

    if let Some(report_path) = cfg.report_path() {
        let report = CompensationReport {
            input_dir: cfg.input.clone(),
            output_dir: cfg.output.dir.clone(),
            model: ModelSummary::of(&model),
            normalize_offset: compensator.normalize_offset(),
            batch,
        };
        write_json_file(&report_path, &report)?;
        println!("  report: {}", report_path.display());
    }
    Ok(())
}

fn run_linearity(path: &Path, slot: &ModelSlot) -> Result<(), Box<dyn Error>> {
    let cfg = linearity::load_config(path)?;
    let dataset = Dataset::discover(&cfg.input)?;
    let sampler = cfg.measurement.resolve(&cfg.defaults);
    let full_scale = cfg.full_scale();

    let compensator = match &cfg.model {
        Some(model_path) => {
            let model = slot.load(model_path)?;
            Some(Compensator::new(model, cfg.extrapolate.clone(), &cfg.normalize))
        }
        None => None,
    };
    let result = evaluate_dataset(
        &dataset,
        &sampler,
        compensator.as_ref(),
        Some(full_scale),
        print_progress,
    )?;

    println!("Linearity summary (full scale {full_scale} mm)");
    println!("  points: {}", result.points.len());
    println!(
        "  before: {:.4}% (max dev {:.6} mm, R² {:.8})",
        result.before.linearity, result.before.abs_max_deviation, result.before.r_squared
    );
    if let (Some(after), Some(improvement)) = (&result.after, result.improvement) {
        println!(
            "  after: {:.4}% (max dev {:.6} mm), improvement {:.2}%",
            after.linearity, after.abs_max_deviation, improvement
        );
    }

    let report_path = cfg.report_path();
    let report = LinearityReport::new(&cfg.input, full_scale, cfg.model.clone(), result);
    write_json_file(&report_path, &report)?;
    info!("linearity report written to {}", report_path.display());
    println!("  report: {}", report_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use depth_compensation::spline::{CompensationModel, SaveFormat};
    use std::fs;

    #[test]
    fn parses_subcommand_with_config() {
        let args =
            Args::try_parse_from(["depthcomp", "compensate", "--config", "c.json"]).unwrap();
        match args.command {
            Command::Compensate { config } => assert_eq!(config, PathBuf::from("c.json")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn compensate_loads_model_into_shared_slot() {
        let tmp = tempfile::tempdir().unwrap();
        let raw = tmp.path().join("raw");
        fs::create_dir_all(&raw).unwrap();
        let model = CompensationModel::build(&[0.0, 5.0, 10.0, 15.0], &[0.1, 5.0, 10.2, 15.1], 3)
            .unwrap();
        let model_path =
            save_model(&model, &tmp.path().join("model.json"), SaveFormat::Minimal).unwrap();

        let write_config = |model: &Path| {
            let path = tmp.path().join("compensate.json");
            let json = serde_json::json!({
                "input": raw,
                "model": model,
                "output": {"dir": tmp.path().join("out")},
            });
            fs::write(&path, json.to_string()).unwrap();
            path
        };

        let slot = ModelSlot::new();
        let missing = write_config(&tmp.path().join("missing.json"));
        assert!(run_compensate(&missing, &slot).is_err());
        assert!(!slot.is_loaded());

        // The raw directory is empty, so the run fails after the model is installed.
        let present = write_config(&model_path);
        assert!(run_compensate(&present, &slot).is_err());
        assert_eq!(slot.current().unwrap().calibration_points(), 4);
    }
}
