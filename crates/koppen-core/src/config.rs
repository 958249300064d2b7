//! Run configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! reproduces the classic five-model CHELSA V2.1 run over the Alps. Tools
//! layer their command-line flags on top.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classes::{ClassCode, ClassTable, ET};
use crate::ensemble::ZeroPolicy;
use crate::error::ConfigError;
use crate::geo::BoundingBox;
use crate::layout::ChelsaLayout;
use crate::slices::{DEFAULT_MIN_SLICE_PCT, DEFAULT_MIN_UNCHANGED_PCT};

pub const DEFAULT_SCENARIOS: [&str; 3] = ["ssp126", "ssp370", "ssp585"];
pub const DEFAULT_TIME_SLICES: [&str; 3] = ["2011-2040", "2041-2070", "2071-2100"];
pub const DEFAULT_MODELS: [&str; 5] = ["GFDL-ESM4", "IPSL-CM6A-LR", "MPI-ESM1-2-HR", "MRI-ESM2-0", "UKESM1-0-LL"];

/// Chart thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayThresholds {
    /// Bars drawn in the migration chart.
    pub top_n: usize,
    /// Upper x-axis limit of the bar chart, in pixels.
    pub x_max: f64,
    /// Pie slices at or below this share of changed pixels are dropped.
    pub min_slice_pct: f64,
    /// The unchanged slice is drawn only above this share of origin pixels.
    pub min_unchanged_pct: f64,
}

impl Default for DisplayThresholds {
    fn default() -> Self {
        Self {
            top_n: 20,
            x_max: 400_000.0,
            min_slice_pct: DEFAULT_MIN_SLICE_PCT,
            min_unchanged_pct: DEFAULT_MIN_UNCHANGED_PCT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Root of the CHELSA `climatologies` tree.
    pub base_dir: PathBuf,
    pub scenarios: Vec<String>,
    pub time_slices: Vec<String>,
    /// Model ids as used in directory names (upper case).
    pub models: Vec<String>,
    /// Short region name used in output file names.
    pub region: String,
    pub bbox: BoundingBox,
    pub origin_class: ClassCode,
    pub zero_policy: ZeroPolicy,
    /// Overrides on top of the built-in Köppen–Geiger table.
    pub classes: ClassTable,
    pub display: DisplayThresholds,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("climatologies"),
            scenarios: DEFAULT_SCENARIOS.iter().map(|s| s.to_string()).collect(),
            time_slices: DEFAULT_TIME_SLICES.iter().map(|s| s.to_string()).collect(),
            models: DEFAULT_MODELS.iter().map(|s| s.to_string()).collect(),
            region: "ALPS".to_owned(),
            bbox: BoundingBox::ALPS,
            origin_class: ET,
            zero_policy: ZeroPolicy::ZeroFill,
            classes: ClassTable::empty(),
            display: DisplayThresholds::default(),
        }
    }
}

impl RunConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config: Self =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in class table with this config's overrides applied.
    pub fn class_table(&self) -> ClassTable {
        ClassTable::default().merged_with(&self.classes)
    }

    pub fn layout(&self) -> ChelsaLayout {
        ChelsaLayout::new(&self.base_dir)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, list) in [
            ("scenarios", &self.scenarios),
            ("time_slices", &self.time_slices),
            ("models", &self.models),
        ] {
            if list.is_empty() {
                return Err(ConfigError::Invalid(format!("{name} must not be empty")));
            }
        }
        self.bbox.validate().map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let classes = self.class_table();
        if !classes.contains(self.origin_class) {
            return Err(ConfigError::Invalid(format!(
                "origin class {} is not in the class table",
                self.origin_class
            )));
        }
        if let Some((code, color)) = classes.invalid_colors().into_iter().next() {
            return Err(ConfigError::Invalid(format!("class {code}: malformed colour '{color}'")));
        }

        let d = &self.display;
        if d.top_n == 0 {
            return Err(ConfigError::Invalid("display.top_n must be at least 1".into()));
        }
        if !(d.x_max.is_finite() && d.x_max > 0.0) {
            return Err(ConfigError::Invalid("display.x_max must be positive".into()));
        }
        if !(0.0..100.0).contains(&d.min_slice_pct) || !(0.0..100.0).contains(&d.min_unchanged_pct) {
            return Err(ConfigError::Invalid("display percentages must lie in [0, 100)".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reproduces_classic_run() {
        let c = RunConfig::default();
        assert_eq!(c.scenarios, vec!["ssp126", "ssp370", "ssp585"]);
        assert_eq!(c.models.len(), 5);
        assert_eq!(c.origin_class, ET);
        assert_eq!(c.display.top_n, 20);
        assert_eq!(c.zero_policy, ZeroPolicy::ZeroFill);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c: RunConfig = serde_json::from_str(
            r#"{"region": "CENTRAL_ASIA", "bbox": [45, 34, 90, 56], "display": {"top_n": 5}}"#,
        )
        .unwrap();
        assert_eq!(c.bbox, BoundingBox::CENTRAL_ASIA);
        assert_eq!(c.display.top_n, 5);
        assert_eq!(c.display.x_max, 400_000.0);
        assert_eq!(c.time_slices.len(), 3);
    }

    #[test]
    fn class_overrides_merge_over_builtin_table() {
        let c: RunConfig =
            serde_json::from_str(r##"{"classes": {"30": {"label": "Tundra", "color": "#000000"}}}"##).unwrap();
        let table = c.class_table();
        assert_eq!(table.label(30), "Tundra");
        assert_eq!(table.label(31), "EF");
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut c = RunConfig { models: vec![], ..RunConfig::default() };
        assert!(matches!(c.validate(), Err(ConfigError::Invalid(m)) if m.contains("models")));

        c = RunConfig { bbox: BoundingBox::new(16.0, 43.5, 4.5, 50.0), ..RunConfig::default() };
        assert!(c.validate().is_err());

        c = RunConfig { origin_class: 200, ..RunConfig::default() };
        assert!(c.validate().is_err());

        c = RunConfig::default();
        c.classes.insert(19, "Dfb", "blue");
        assert!(c.validate().is_err());
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(&path, "{ not json").unwrap();
        let err = RunConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("run.json"));
    }

    #[test]
    fn load_missing_file() {
        let err = RunConfig::load("/nonexistent/run.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
