//! Resolution level selection.
//!
//! Levels are chosen per visible source on every render: sources at
//! different physical scales may land on different levels for the same
//! transform, and the transform changes between requests.

use tile_common::Affine3D;

use crate::source::Source;
use crate::state::ViewerState;

/// Largest on-screen (xy) length of a unit voxel step along any source axis.
pub fn voxel_screen_size(source_to_screen: &Affine3D) -> f64 {
    (0..3)
        .map(|axis| {
            let d = source_to_screen.apply_direction(axis);
            d[0].hypot(d[1])
        })
        .fold(0.0, f64::max)
}

/// Coarsest level whose voxel footprint is at most one raster pixel, or 0 if
/// even the finest level is larger than a pixel.
pub fn best_mipmap_level<S: Source + ?Sized>(
    screen_transform: &Affine3D,
    source: &S,
    timepoint: usize,
) -> usize {
    for level in (0..source.num_mipmap_levels()).rev() {
        let source_to_screen = screen_transform.concatenate(&source.source_transform(timepoint, level));
        if voxel_screen_size(&source_to_screen) <= 1.0 {
            return level;
        }
    }
    0
}

/// Level per source of `state`, using its current viewer transform and
/// timepoint. Hidden sources get `None`.
pub fn select_levels(state: &ViewerState) -> Vec<Option<usize>> {
    let visible = state.visible_source_indices();
    let transform = state.viewer_transform();
    let timepoint = state.current_timepoint();
    state
        .sources()
        .iter()
        .enumerate()
        .map(|(i, sac)| {
            visible
                .contains(&i)
                .then(|| sac.source.best_mipmap_level(&transform, timepoint))
        })
        .collect()
}
