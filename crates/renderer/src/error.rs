//! Error types for rendering, encoding and worker pooling.

use thiserror::Error;
use tile_common::TileError;

/// Failure of a source to provide data for a (timepoint, level).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("timepoint {timepoint} not present in source '{source_name}'")]
    MissingTimepoint { source_name: String, timepoint: usize },

    #[error("mipmap level {level} not present in source '{source_name}' ({available} levels)")]
    MissingLevel {
        source_name: String,
        level: usize,
        available: usize,
    },

    #[error("volume data has {actual} samples, dimensions {dims:?} need {expected}")]
    ShapeMismatch {
        dims: [usize; 3],
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("cannot encode an empty {width}x{height} raster")]
    EmptyRaster { width: u32, height: u32 },

    #[error("JPEG encoding failed: {0}")]
    Jpeg(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    /// A newer render (or an explicit cancel) superseded this one before the
    /// raster was complete. No output is produced.
    #[error("render cancelled (generation {generation} superseded)")]
    Cancelled { generation: u64 },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("raster fill failed: {0}")]
    FillFailed(String),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("invalid tile size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("view transform is not invertible or not finite")]
    InvalidTransform,

    #[error("failed to build fill thread pool: {0}")]
    ThreadPool(String),
}

impl RenderError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RenderError::Cancelled { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("worker pool is closed")]
    Closed,
}

impl From<RenderError> for TileError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Cancelled { .. } => TileError::RenderCancelled,
            RenderError::Encode(e) => TileError::EncodeError(e.to_string()),
            other => TileError::RenderError(other.to_string()),
        }
    }
}

impl From<PoolError> for TileError {
    fn from(err: PoolError) -> Self {
        TileError::ServiceUnavailable(err.to_string())
    }
}
