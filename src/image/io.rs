//! I/O helpers for 16-bit depth frames and JSON documents.
//!
//! - `load_depth_image`: read a 16-bit PNG/TIFF into an owned [`DepthImage`].
//! - `save_depth_image`: write a [`DepthImage`] as a 16-bit grayscale PNG/TIFF.
//! - `write_json_file`: pretty-print a serializable value to disk.
//!
//! Decoding itself is delegated to the `image` crate.
use super::DepthImage;
use crate::error::{CompensationError, Result};
use image::{ImageBuffer, Luma};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load a depth frame from disk, converting any gray/colour layout to 16-bit luma.
pub fn load_depth_image(path: &Path) -> Result<DepthImage> {
    if !path.is_file() {
        return Err(CompensationError::not_found("depth image", path));
    }
    let img = image::open(path)
        .map_err(|e| CompensationError::Image(format!("failed to open {}: {e}", path.display())))?
        .into_luma16();
    let (w, h) = (img.width() as usize, img.height() as usize);
    DepthImage::from_raw(w, h, img.into_raw()).ok_or_else(|| {
        CompensationError::Image(format!("decoded buffer size mismatch for {}", path.display()))
    })
}

/// Save a depth frame as 16-bit grayscale; the format follows the file extension.
pub fn save_depth_image(image: &DepthImage, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    let buffer: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_raw(image.w as u32, image.h as u32, image.data.clone())
            .ok_or_else(|| CompensationError::Image("failed to create image buffer".into()))?;
    buffer
        .save(path)
        .map_err(|e| CompensationError::Image(format!("failed to save {}: {e}", path.display())))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        CompensationError::InvalidData(format!(
            "failed to serialize JSON for {}: {e}",
            path.display()
        ))
    })?;
    fs::write(path, json)?;
    Ok(())
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
