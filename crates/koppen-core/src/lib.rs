//! Köppen–Geiger climate-class transition analysis over CHELSA rasters.
//!
//! Crop a historical classification and a set of model projections to a
//! bounding box, count origin-class pixels that change class, and summarise
//! the counts across the model ensemble.

pub mod analysis;
pub mod classes;
pub mod config;
pub mod ensemble;
pub mod error;
pub mod geo;
pub mod grid;
pub mod layout;
pub mod logging;
pub mod progress;
pub mod raster;
pub mod slices;
pub mod summary;
pub mod transition;

pub use analysis::{collect_ensemble, Baseline, EnsembleInputs, ModelSource};
pub use classes::{ClassCode, ClassTable};
pub use config::RunConfig;
pub use ensemble::{aggregate, aggregate_over_models, EnsembleSummary, PairStats, ZeroPolicy};
pub use error::{AnalysisError, ConfigError, RasterError, TransitionError};
pub use geo::{BoundingBox, GeoTransform, PixelWindow};
pub use transition::{tally_transitions, TransitionPair, TransitionTally};
