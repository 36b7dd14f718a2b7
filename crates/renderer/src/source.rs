//! Source capability: sampled voxel data plus its placement in world space.
//!
//! Sources hide their native sample type behind [`RealSampler`]; together
//! with a [`Converter`] this is everything the compositor needs, so it never
//! touches concrete numeric types.

use std::sync::Arc;

use tile_common::{Affine3D, Interpolation, ViewSetup};

use crate::converter::Converter;
use crate::error::SourceError;
use crate::mipmap;

/// Continuous sampler over one (timepoint, level) of a source, addressed in
/// that level's voxel coordinates. Positions outside the data sample as 0.
pub trait RealSampler: Send + Sync {
    fn sample(&self, position: [f64; 3]) -> f64;
}

/// A multi-resolution, multi-timepoint volume registered into world space.
pub trait Source: Send + Sync {
    fn name(&self) -> &str;

    fn num_mipmap_levels(&self) -> usize;

    fn is_present(&self, timepoint: usize) -> bool;

    /// Voxel-to-world transform of `level` at `timepoint`.
    fn source_transform(&self, timepoint: usize, level: usize) -> Affine3D;

    fn interpolated(
        &self,
        timepoint: usize,
        level: usize,
        interpolation: Interpolation,
    ) -> Result<Box<dyn RealSampler + '_>, SourceError>;

    /// Coarsest level whose voxels project to at most one raster pixel under
    /// `screen_transform` (world to raster).
    fn best_mipmap_level(&self, screen_transform: &Affine3D, timepoint: usize) -> usize {
        mipmap::best_mipmap_level(screen_transform, self, timepoint)
    }
}

/// A source paired with the converter that displays it.
#[derive(Clone)]
pub struct SourceAndConverter {
    pub setup: ViewSetup,
    pub source: Arc<dyn Source>,
    pub converter: Arc<dyn Converter>,
}

impl SourceAndConverter {
    pub fn new(setup: ViewSetup, source: Arc<dyn Source>, converter: Arc<dyn Converter>) -> Self {
        Self {
            setup,
            source,
            converter,
        }
    }
}

impl std::fmt::Debug for SourceAndConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceAndConverter")
            .field("setup", &self.setup)
            .field("source", &self.source.name())
            .field("levels", &self.source.num_mipmap_levels())
            .finish()
    }
}
