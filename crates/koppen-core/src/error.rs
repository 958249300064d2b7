use std::path::PathBuf;

use thiserror::Error;

use crate::geo::{BoundingBox, PixelWindow};

/// Failures while locating, opening or cropping a classification raster.
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TIFF error in {}: {source}", .path.display())]
    Tiff {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },

    #[error("{}: no geo-transform (needs ModelTiepointTag + ModelPixelScaleTag or ModelTransformationTag)", .path.display())]
    MissingGeoTransform { path: PathBuf },

    #[error("{}: unsupported sample format {format}", .path.display())]
    UnsupportedSampleFormat { path: PathBuf, format: String },

    #[error("{}: chunk {index} decoded to {got} samples, expected {expected}", .path.display())]
    ChunkSize {
        path: PathBuf,
        index: u32,
        got: usize,
        expected: usize,
    },

    #[error("invalid bounding box {bbox}: {reason}")]
    InvalidBoundingBox { bbox: BoundingBox, reason: &'static str },

    #[error("bounding box {bbox} is outside the raster extent ({width}x{height} px): {reason}")]
    OutOfExtent {
        bbox: BoundingBox,
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("window {window} exceeds raster size {width}x{height}")]
    WindowOutOfBounds {
        window: PixelWindow,
        width: u32,
        height: u32,
    },
}

/// Failures while comparing two class grids.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("grid shapes differ: historical {historical:?} vs future {future:?} (width, height)")]
    ShapeMismatch {
        historical: (usize, usize),
        future: (usize, usize),
    },
}

/// Invalid or unreadable run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failures while assembling an ensemble from rasters on disk.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error("{}: {source}", .path.display())]
    Transition {
        path: PathBuf,
        #[source]
        source: TransitionError,
    },

    #[error("cannot list {}: {source}", .dir.display())]
    Discover {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
