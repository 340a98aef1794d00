use depth_compensation::image::io::save_depth_image;
use depth_compensation::image::DepthImage;
use depth_compensation::params::DepthConversionConfig;
use std::fs;
use std::path::{Path, PathBuf};

pub const FRAME_W: usize = 48;
pub const FRAME_H: usize = 36;

/// Smooth, non-linear sensor response used by the synthetic datasets.
pub fn sensor_response(actual: f64) -> f64 {
    1.0 + 1.01 * actual + 0.15 * (0.4 * actual).sin()
}

/// Tilted planar frame whose level at pixel (0, 0) is `level_mm`.
pub fn tilted_frame(level_mm: f64, w: usize, h: usize) -> DepthImage {
    let depth = DepthConversionConfig::default();
    let mut img = DepthImage::filled(w, h, 0);
    for y in 0..h {
        for x in 0..w {
            let mm = level_mm + 0.002 * x as f64 - 0.001 * y as f64;
            img.set(x, y, depth.mm_to_pixel(mm));
        }
    }
    img
}

/// Same frame with everything but a thin top strip invalidated.
pub fn mostly_invalid_frame(level_mm: f64, w: usize, h: usize) -> DepthImage {
    let depth = DepthConversionConfig::default();
    let mut img = tilted_frame(level_mm, w, h);
    for y in 2..h {
        for x in 0..w {
            img.set(x, y, depth.invalid_value);
        }
    }
    img
}

/// Write `frame_NNN.png` files plus a `displacement.csv` table into `dir`.
pub fn write_dataset(dir: &Path, frames: &[(f64, DepthImage)]) -> Vec<PathBuf> {
    fs::create_dir_all(dir).expect("create dataset dir");
    let mut table = String::from("index,displacement\n");
    let mut paths = Vec::with_capacity(frames.len());
    for (i, (actual, img)) in frames.iter().enumerate() {
        let path = dir.join(format!("frame_{:03}.png", i + 1));
        save_depth_image(img, &path).expect("write frame");
        table.push_str(&format!("{},{}\n", i + 1, actual));
        paths.push(path);
    }
    fs::write(dir.join("displacement.csv"), table).expect("write table");
    paths
}

/// Dataset of clean frames following [`sensor_response`].
pub fn write_response_dataset(dir: &Path, actuals: &[f64]) -> Vec<PathBuf> {
    let frames: Vec<(f64, DepthImage)> = actuals
        .iter()
        .map(|&a| (a, tilted_frame(sensor_response(a), FRAME_W, FRAME_H)))
        .collect();
    write_dataset(dir, &frames)
}
