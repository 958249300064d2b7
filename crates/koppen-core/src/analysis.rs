//! Baseline loading and per-model tally collection.
//!
//! The historical raster is cropped once; every future raster is read
//! through the same pixel window and compared cell by cell.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::classes::ClassCode;
use crate::error::{AnalysisError, RasterError};
use crate::geo::{BoundingBox, GeoTransform, PixelWindow};
use crate::grid::ClassGrid;
use crate::layout::ChelsaLayout;
use crate::progress::ModelProgress;
use crate::raster::ClassRaster;
use crate::transition::{tally_transitions, TransitionTally};

/// Cropped historical classification.
#[derive(Debug, Clone)]
pub struct Baseline {
    pub path: PathBuf,
    pub bbox: BoundingBox,
    pub window: PixelWindow,
    pub transform: GeoTransform,
    pub grid: ClassGrid,
}

impl Baseline {
    /// Open the historical raster and crop it to `bbox`.
    pub fn load(path: impl AsRef<Path>, bbox: BoundingBox) -> Result<Self, RasterError> {
        bbox.validate()?;
        let mut raster = ClassRaster::open(path)?;
        let (window, grid) = raster.read_bbox(&bbox)?;
        info!(path = %raster.path().display(), %window, "loaded baseline");
        Ok(Self {
            path: raster.path().to_path_buf(),
            bbox,
            window,
            transform: *raster.transform(),
            grid,
        })
    }

    /// Historical pixels of `origin` inside the window.
    pub fn origin_count(&self, origin: ClassCode) -> u64 {
        self.grid.count(origin)
    }

    /// Read a future raster through the baseline window and tally transitions
    /// away from `origin`.
    pub fn tally_future(&self, path: impl AsRef<Path>, origin: ClassCode) -> Result<TransitionTally, AnalysisError> {
        let mut raster = ClassRaster::open(path)?;
        if raster.transform() != &self.transform {
            warn!(
                path = %raster.path().display(),
                "geo-transform differs from baseline; comparing by pixel window"
            );
        }
        let future = raster.read_window(self.window)?;
        let tally = tally_transitions(&self.grid, &future, origin)
            .map_err(|source| AnalysisError::Transition { path: raster.path().to_path_buf(), source })?;
        debug!(path = %raster.path().display(), pairs = tally.len(), changed = tally.total(), "tallied");
        Ok(tally)
    }
}

/// Where a model's future rasters come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSource {
    /// The canonical file name per model; a missing file is an error.
    Named,
    /// Every `*_kg2_*.tif` in the model directory; missing directories are skipped.
    Discover,
}

/// Per-raster tallies for one scenario × time slice.
#[derive(Debug, Clone, Default)]
pub struct EnsembleInputs {
    pub tallies: Vec<TransitionTally>,
    /// One label per tally: the model id, plus the file name when a model
    /// directory holds several rasters.
    pub contributors: Vec<String>,
}

impl EnsembleInputs {
    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }

    fn push(&mut self, label: String, tally: TransitionTally) {
        self.contributors.push(label);
        self.tallies.push(tally);
    }
}

/// Collect tallies for every model of one scenario × time slice.
#[allow(clippy::too_many_arguments)]
pub fn collect_ensemble(
    layout: &ChelsaLayout,
    baseline: &Baseline,
    scenario: &str,
    time_slice: &str,
    models: &[String],
    origin: ClassCode,
    source: ModelSource,
    progress: &ModelProgress,
) -> Result<EnsembleInputs, AnalysisError> {
    let bar = progress.cell(scenario, time_slice, models.len());
    let mut inputs = EnsembleInputs::default();

    for model in models {
        bar.start_model(model);
        match source {
            ModelSource::Named => {
                let path = layout.model_file(time_slice, model, scenario);
                let tally = baseline.tally_future(&path, origin)?;
                inputs.push(model.clone(), tally);
            }
            ModelSource::Discover => {
                let dir = layout.model_dir(time_slice, model, scenario);
                let files = layout
                    .discover(time_slice, model, scenario)
                    .map_err(|source| AnalysisError::Discover { dir: dir.clone(), source })?;
                let Some(files) = files else {
                    warn!(dir = %dir.display(), "model directory missing, skipping");
                    bar.advance();
                    continue;
                };
                if files.is_empty() {
                    warn!(dir = %dir.display(), "no Köppen-Geiger rasters found, skipping");
                }
                let several = files.len() > 1;
                for path in files {
                    let tally = baseline.tally_future(&path, origin)?;
                    let label = match path.file_name().and_then(|n| n.to_str()) {
                        Some(name) if several => format!("{model} ({name})"),
                        _ => model.clone(),
                    };
                    inputs.push(label, tally);
                }
            }
        }
        bar.advance();
    }

    bar.finish(inputs.tallies.len());
    if inputs.is_empty() {
        warn!(scenario, time_slice, "no contributing models");
    } else {
        info!(scenario, time_slice, rasters = inputs.tallies.len(), "collected ensemble");
    }
    Ok(inputs)
}
