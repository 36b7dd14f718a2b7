//! Projectors: pull-based pixel producers over the visible sources.
//!
//! A projector is built once per render from the viewer state and the chosen
//! mipmap levels, then queried row by row by the fill threads. Building one
//! writes no pixels.

use std::sync::Arc;

use tile_common::Affine3D;

use crate::accumulate::Accumulator;
use crate::converter::Converter;
use crate::error::RenderError;
use crate::source::RealSampler;
use crate::state::ViewerState;

/// Color of raster pixels when no source is visible.
pub const BLANK_COLOR: u32 = 0x0000_0000;

/// One source, resampled into raster space and converted to ARGB.
pub struct SourceProjector<'a> {
    sampler: Box<dyn RealSampler + 'a>,
    converter: Arc<dyn Converter>,
    /// Raster pixel to source voxel.
    screen_to_source: Affine3D,
}

impl SourceProjector<'_> {
    pub fn color_at(&self, x: f64, y: f64) -> u32 {
        let p = self.screen_to_source.apply([x, y, 0.0]);
        self.converter.convert(self.sampler.sample(p))
    }

    /// Fill `row` with raster row `y`, stepping along x in source space.
    pub fn fill_row(&self, y: usize, row: &mut [u32]) {
        let mut p = self.screen_to_source.apply([0.0, y as f64, 0.0]);
        let step = self.screen_to_source.apply_direction(0);
        for (x, pixel) in row.iter_mut().enumerate() {
            if x > 0 {
                p[0] += step[0];
                p[1] += step[1];
                p[2] += step[2];
            }
            *pixel = self.converter.convert(self.sampler.sample(p));
        }
    }
}

pub enum Projector<'a> {
    /// No visible source: every pixel is the same color.
    Constant(u32),
    /// Exactly one visible source.
    Single(SourceProjector<'a>),
    /// Two or more visible sources, combined in source order.
    Accumulated {
        sources: Vec<SourceProjector<'a>>,
        accumulator: Arc<dyn Accumulator>,
    },
}

impl Projector<'_> {
    pub fn num_sources(&self) -> usize {
        match self {
            Projector::Constant(_) => 0,
            Projector::Single(_) => 1,
            Projector::Accumulated { sources, .. } => sources.len(),
        }
    }

    pub fn fill_row(&self, y: usize, row: &mut [u32]) {
        match self {
            Projector::Constant(color) => row.fill(*color),
            Projector::Single(source) => source.fill_row(y, row),
            Projector::Accumulated {
                sources,
                accumulator,
            } => {
                let width = row.len();
                let mut layers = vec![0u32; width * sources.len()];
                for (source, layer) in sources.iter().zip(layers.chunks_mut(width)) {
                    source.fill_row(y, layer);
                }
                let mut colors = Vec::with_capacity(sources.len());
                for (x, pixel) in row.iter_mut().enumerate() {
                    colors.clear();
                    colors.extend((0..sources.len()).map(|s| layers[s * width + x]));
                    *pixel = accumulator.accumulate(&colors);
                }
            }
        }
    }
}

/// Build the projector for `state` at the given per-source levels (as
/// returned by [`crate::mipmap::select_levels`]).
pub fn create_projector<'a>(
    state: &'a ViewerState,
    levels: &[Option<usize>],
    accumulator: &Arc<dyn Accumulator>,
) -> Result<Projector<'a>, RenderError> {
    let visible = state.visible_source_indices();
    match visible.as_slice() {
        [] => Ok(Projector::Constant(BLANK_COLOR)),
        [index] => Ok(Projector::Single(source_projector(state, *index, levels)?)),
        indices => {
            let sources = indices
                .iter()
                .map(|&i| source_projector(state, i, levels))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Projector::Accumulated {
                sources,
                accumulator: Arc::clone(accumulator),
            })
        }
    }
}

fn source_projector<'a>(
    state: &'a ViewerState,
    index: usize,
    levels: &[Option<usize>],
) -> Result<SourceProjector<'a>, RenderError> {
    let sac = state
        .source(index)
        .ok_or_else(|| RenderError::FillFailed(format!("no source at index {index}")))?;
    let timepoint = state.current_timepoint();
    let level = levels.get(index).copied().flatten().unwrap_or(0);

    let source_to_screen = state
        .viewer_transform()
        .concatenate(&sac.source.source_transform(timepoint, level));
    let screen_to_source = source_to_screen
        .inverse()
        .filter(Affine3D::is_finite)
        .ok_or(RenderError::InvalidTransform)?;

    let sampler = sac
        .source
        .interpolated(timepoint, level, state.interpolation())?;

    Ok(SourceProjector {
        sampler,
        converter: Arc::clone(&sac.converter),
        screen_to_source,
    })
}
