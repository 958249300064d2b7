/// CHELSA V2.1 climatology directory layout.
///
/// ```text
/// {base}/1981-2010/bio/CHELSA_kg2_1981-2010_V.2.1.tif
/// {base}/{time_slice}/{MODEL}/{scenario}/bio/CHELSA_kg2_{time_slice}_{model}_{scenario}_V.2.1.tif
/// ```
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Reference period of the baseline classification.
pub const HISTORICAL_SLICE: &str = "1981-2010";
/// CHELSA product version suffix.
pub const PRODUCT_VERSION: &str = "V.2.1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChelsaLayout {
    base_dir: PathBuf,
}

impl ChelsaLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Baseline (1981–2010) Köppen–Geiger raster.
    pub fn historical_path(&self) -> PathBuf {
        self.base_dir
            .join(HISTORICAL_SLICE)
            .join("bio")
            .join(format!("CHELSA_kg2_{HISTORICAL_SLICE}_{PRODUCT_VERSION}.tif"))
    }

    /// Directory holding one model's rasters for a scenario and time slice.
    pub fn model_dir(&self, time_slice: &str, model: &str, scenario: &str) -> PathBuf {
        self.base_dir.join(time_slice).join(model).join(scenario).join("bio")
    }

    /// Canonical file name of one model's raster. File names use the
    /// lower-cased model id, directories the upper-case one.
    pub fn model_file(&self, time_slice: &str, model: &str, scenario: &str) -> PathBuf {
        self.model_dir(time_slice, model, scenario).join(format!(
            "CHELSA_kg2_{time_slice}_{}_{scenario}_{PRODUCT_VERSION}.tif",
            model.to_lowercase()
        ))
    }

    /// All Köppen–Geiger rasters in a model directory, sorted by name.
    ///
    /// Returns `Ok(None)` if the directory does not exist.
    pub fn discover(&self, time_slice: &str, model: &str, scenario: &str) -> io::Result<Option<Vec<PathBuf>>> {
        let dir = self.model_dir(time_slice, model, scenario);
        if !dir.is_dir() {
            return Ok(None);
        }
        let mut found = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            let is_raster = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(is_kg2_raster);
            if is_raster && path.is_file() {
                found.push(path);
            }
        }
        found.sort();
        Ok(Some(found))
    }
}

/// True for CHELSA Köppen–Geiger GeoTIFF names (`*_kg2_*.tif`).
pub fn is_kg2_raster(file_name: &str) -> bool {
    file_name.contains("_kg2_") && file_name.ends_with(".tif")
}
