//! Per-worker viewer state.
//!
//! Each renderer worker owns exactly one `ViewerState`; it is never shared
//! between workers, so it needs no locking of its own.

use tile_common::{Affine3D, Interpolation};

use crate::source::SourceAndConverter;

/// Which sources take part in rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Only the current source, regardless of visibility flags.
    Single,
    /// Every source flagged visible, in configured order.
    #[default]
    Fused,
}

#[derive(Debug, Clone)]
struct SourceState {
    source: SourceAndConverter,
    visible: bool,
}

#[derive(Debug, Clone)]
pub struct ViewerState {
    sources: Vec<SourceState>,
    num_timepoints: usize,
    current_timepoint: usize,
    current_source: usize,
    interpolation: Interpolation,
    viewer_transform: Affine3D,
    display_mode: DisplayMode,
}

impl ViewerState {
    /// All sources visible, fused display, timepoint 0, identity transform.
    pub fn new(sources: Vec<SourceAndConverter>, num_timepoints: usize) -> Self {
        Self {
            sources: sources
                .into_iter()
                .map(|source| SourceState {
                    source,
                    visible: true,
                })
                .collect(),
            num_timepoints: num_timepoints.max(1),
            current_timepoint: 0,
            current_source: 0,
            interpolation: Interpolation::default(),
            viewer_transform: Affine3D::identity(),
            display_mode: DisplayMode::default(),
        }
    }

    pub fn num_sources(&self) -> usize {
        self.sources.len()
    }

    pub fn num_timepoints(&self) -> usize {
        self.num_timepoints
    }

    pub fn sources(&self) -> Vec<&SourceAndConverter> {
        self.sources.iter().map(|s| &s.source).collect()
    }

    pub fn source(&self, index: usize) -> Option<&SourceAndConverter> {
        self.sources.get(index).map(|s| &s.source)
    }

    pub fn current_timepoint(&self) -> usize {
        self.current_timepoint
    }

    /// Set the timepoint, clamped to the available range.
    pub fn set_current_timepoint(&mut self, timepoint: usize) {
        self.current_timepoint = timepoint.min(self.num_timepoints - 1);
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
    }

    pub fn viewer_transform(&self) -> Affine3D {
        self.viewer_transform
    }

    pub fn set_viewer_transform(&mut self, transform: Affine3D) {
        self.viewer_transform = transform;
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.display_mode = mode;
    }

    pub fn current_source(&self) -> usize {
        self.current_source
    }

    /// Ignored if `index` is out of range.
    pub fn set_current_source(&mut self, index: usize) {
        if index < self.sources.len() {
            self.current_source = index;
        }
    }

    pub fn is_visible(&self, index: usize) -> bool {
        self.sources.get(index).is_some_and(|s| s.visible)
    }

    pub fn set_visible(&mut self, index: usize, visible: bool) {
        if let Some(s) = self.sources.get_mut(index) {
            s.visible = visible;
        }
    }

    /// Indices of the sources to render, in configured order. Sources absent
    /// at the current timepoint are skipped.
    pub fn visible_source_indices(&self) -> Vec<usize> {
        let present = |i: usize| self.sources[i].source.source.is_present(self.current_timepoint);
        match self.display_mode {
            DisplayMode::Single => {
                if self.current_source < self.sources.len() && present(self.current_source) {
                    vec![self.current_source]
                } else {
                    Vec::new()
                }
            }
            DisplayMode::Fused => (0..self.sources.len())
                .filter(|&i| self.sources[i].visible && present(i))
                .collect(),
        }
    }
}
