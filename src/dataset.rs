//! Calibration/test dataset layout on disk.
//!
//! A dataset directory holds one displacement table (`*.csv`) and a series of
//! 16-bit depth frames (`png`, `tif`, `tiff`). Frames are ordered by the last
//! run of digits in their file stem and matched to table rows by position.
use crate::error::{CompensationError, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Header names recognised as the displacement column, in priority order.
pub const DISPLACEMENT_COLUMNS: &[&str] = &[
    "实际累计位移(mm)",
    "actual cumulative displacement (mm)",
    "实际累计位移",
    "位移(mm)",
    "位移",
    "displacement",
    "Displacement",
];

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "tif", "tiff"];

/// Displacements (mm) read from the table text.
///
/// The header row picks the column; rows whose cell does not parse as a
/// number are skipped. A leading UTF-8 BOM is ignored.
pub fn parse_displacements(text: &str) -> Result<Vec<f64>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header_line = lines
        .next()
        .ok_or_else(|| CompensationError::InvalidData("displacement table is empty".into()))?;
    let delimiter = detect_delimiter(header_line);
    let header = split_record(header_line, delimiter);

    let columns: Vec<usize> = DISPLACEMENT_COLUMNS
        .iter()
        .filter_map(|name| header.iter().position(|h| h == name))
        .collect();
    if columns.is_empty() {
        return Err(CompensationError::InvalidData(format!(
            "no displacement column in header {header:?}"
        )));
    }

    let mut out = Vec::new();
    for (row_idx, line) in lines.enumerate() {
        let cells = split_record(line, delimiter);
        let value = columns
            .iter()
            .filter_map(|&c| cells.get(c))
            .find_map(|cell| cell.parse::<f64>().ok());
        match value {
            Some(v) => out.push(v),
            None => debug!("displacement table: skipping row {}", row_idx + 2),
        }
    }
    Ok(out)
}

pub fn read_displacements(path: &Path) -> Result<Vec<f64>> {
    if !path.is_file() {
        return Err(CompensationError::not_found("displacement table", path));
    }
    let bytes = fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    parse_displacements(&text)
}

fn detect_delimiter(header: &str) -> char {
    [',', ';', '\t']
        .into_iter()
        .find(|d| header.contains(*d))
        .unwrap_or(',')
}

/// Split one record, honouring double-quoted cells (`""` escapes a quote).
fn split_record(line: &str, delimiter: char) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                cur.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => {
                cells.push(cur.trim().to_string());
                cur.clear();
            }
            c => cur.push(c),
        }
    }
    cells.push(cur.trim().to_string());
    cells
}

/// Last run of ASCII digits in the file stem, `0` when there is none.
pub fn trailing_number(path: &Path) -> u64 {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let bytes = stem.as_bytes();
    let Some(end) = bytes.iter().rposition(u8::is_ascii_digit) else {
        return 0;
    };
    let start = bytes[..end]
        .iter()
        .rposition(|b| !b.is_ascii_digit())
        .map_or(0, |p| p + 1);
    stem[start..=end].parse().unwrap_or(u64::MAX)
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| allowed.iter().any(|a| e.eq_ignore_ascii_case(a)))
}

fn files_with_extension(dir: &Path, allowed: &[&str]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, allowed) {
            files.push(path);
        }
    }
    Ok(files)
}

/// Depth frames in `dir`, naturally ordered by their trailing number.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(CompensationError::not_found("image directory", dir));
    }
    let mut images = files_with_extension(dir, IMAGE_EXTENSIONS)?;
    images.sort_by(|a, b| {
        trailing_number(a)
            .cmp(&trailing_number(b))
            .then_with(|| a.file_name().cmp(&b.file_name()))
    });
    Ok(images)
}

/// Display name of a frame (file name, lossy).
pub fn frame_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// A discovered dataset: table, ordered frames and their displacements.
#[derive(Clone, Debug)]
pub struct Dataset {
    pub dir: PathBuf,
    pub table: PathBuf,
    pub images: Vec<PathBuf>,
    pub displacements: Vec<f64>,
}

impl Dataset {
    pub fn discover(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(CompensationError::not_found("dataset directory", dir));
        }
        let mut tables = files_with_extension(dir, &["csv"])?;
        tables.sort();
        let table = tables
            .into_iter()
            .next()
            .ok_or_else(|| CompensationError::not_found("displacement table (*.csv)", dir))?;
        let displacements = read_displacements(&table)?;
        let images = list_images(dir)?;
        if images.is_empty() {
            return Err(CompensationError::not_found("depth images", dir));
        }
        if images.len() != displacements.len() {
            warn!(
                "dataset {}: {} images but {} displacement rows; extra entries are ignored",
                dir.display(),
                images.len(),
                displacements.len()
            );
        }
        debug!(
            "dataset {}: table={} images={}",
            dir.display(),
            table.display(),
            images.len()
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            table,
            images,
            displacements,
        })
    }

    /// Frames paired with their displacement; unmatched trailing entries are dropped.
    pub fn entries(&self) -> Vec<(PathBuf, f64)> {
        self.images
            .iter()
            .cloned()
            .zip(self.displacements.iter().copied())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.images.len().min(self.displacements.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chinese_header_with_bom() {
        let text = concat!(
            "\u{feff}序号,实际累计位移(mm),备注\n",
            "1,0.0,a\n2,5.0,b\n3,oops,c\n4,10.5,\n"
        );
        assert_eq!(parse_displacements(text).unwrap(), vec![0.0, 5.0, 10.5]);
    }

    #[test]
    fn falls_back_through_candidate_columns() {
        let text = "index;displacement;Displacement\n0;x;1.5\n1;2.5;9\n";
        assert_eq!(parse_displacements(text).unwrap(), vec![1.5, 2.5]);
    }

    #[test]
    fn quoted_cells_are_unwrapped() {
        let text = "\"name, with comma\",\"位移\"\n\"a,b\",\"3.25\"\n";
        assert_eq!(parse_displacements(text).unwrap(), vec![3.25]);
    }

    #[test]
    fn missing_column_is_invalid() {
        assert!(matches!(
            parse_displacements("a,b\n1,2\n"),
            Err(CompensationError::InvalidData(_))
        ));
    }

    #[test]
    fn trailing_number_uses_last_digit_run() {
        assert_eq!(trailing_number(Path::new("cam2_frame_0010.png")), 10);
        assert_eq!(trailing_number(Path::new("depth.tif")), 0);
        assert_eq!(trailing_number(Path::new("x7y")), 7);
    }

    #[test]
    fn discover_orders_frames_naturally() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["img_10.png", "img_2.PNG", "img_1.tiff", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::write(dir.path().join("data.csv"), "displacement\n0\n1\n2\n").unwrap();
        let ds = Dataset::discover(dir.path()).unwrap();
        let names: Vec<String> = ds.images.iter().map(|p| frame_name(p)).collect();
        assert_eq!(names, vec!["img_1.tiff", "img_2.PNG", "img_10.png"]);
        assert_eq!(ds.displacements, vec![0.0, 1.0, 2.0]);
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn discover_reports_missing_pieces() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Dataset::discover(&dir.path().join("nope")),
            Err(CompensationError::NotFound { .. })
        ));
        assert!(matches!(
            Dataset::discover(dir.path()),
            Err(CompensationError::NotFound { .. })
        ));
        fs::write(dir.path().join("d.csv"), "displacement\n1\n").unwrap();
        assert!(matches!(
            Dataset::discover(dir.path()),
            Err(CompensationError::NotFound { what: "depth images", .. })
        ));
    }
}
