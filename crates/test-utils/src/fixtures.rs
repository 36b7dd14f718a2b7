//! Common test fixtures: sources, converters, viewer states and workers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use renderer::{
    BlendMode, Converter, LinearRangeConverter, RealSampler, Source, SourceAndConverter,
    SourceError, TileRenderer, ViewerState, Volume, VolumePyramid,
};
use tile_common::{Affine3D, Interpolation, ViewSetup};

/// Display colors used by the fixtures.
pub mod colors {
    pub const WHITE: u32 = 0xFF_FF_FF;
    pub const RED: u32 = 0xFF_00_00;
    pub const GREEN: u32 = 0x00_FF_00;
    pub const BLUE: u32 = 0x00_00_FF;
}

/// Converter mapping 0..255 linearly onto the tint color.
pub fn byte_converter(color: u32) -> Arc<dyn Converter> {
    Arc::new(LinearRangeConverter::new(0.0, 255.0).with_color(color))
}

/// Source with the same value everywhere, at every level and timepoint.
#[derive(Debug, Clone)]
pub struct ConstantSource {
    name: String,
    value: f64,
    num_levels: usize,
}

impl ConstantSource {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            num_levels: 1,
        }
    }

    pub fn with_levels(mut self, num_levels: usize) -> Self {
        self.num_levels = num_levels.max(1);
        self
    }
}

struct ConstantSampler(f64);

impl RealSampler for ConstantSampler {
    fn sample(&self, _position: [f64; 3]) -> f64 {
        self.0
    }
}

impl Source for ConstantSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_mipmap_levels(&self) -> usize {
        self.num_levels
    }

    fn is_present(&self, _timepoint: usize) -> bool {
        true
    }

    fn source_transform(&self, _timepoint: usize, level: usize) -> Affine3D {
        renderer::volume::mipmap_transform(level)
    }

    fn interpolated(
        &self,
        _timepoint: usize,
        _level: usize,
        _interpolation: Interpolation,
    ) -> Result<Box<dyn RealSampler + '_>, SourceError> {
        Ok(Box::new(ConstantSampler(self.value)))
    }
}

/// Source whose sampler panics, for fill failure tests.
#[derive(Debug, Clone, Default)]
pub struct PanickingSource;

struct PanickingSampler;

impl RealSampler for PanickingSampler {
    fn sample(&self, _position: [f64; 3]) -> f64 {
        panic!("sampler exploded")
    }
}

impl Source for PanickingSource {
    fn name(&self) -> &str {
        "panicking"
    }

    fn num_mipmap_levels(&self) -> usize {
        1
    }

    fn is_present(&self, _timepoint: usize) -> bool {
        true
    }

    fn source_transform(&self, _timepoint: usize, _level: usize) -> Affine3D {
        Affine3D::identity()
    }

    fn interpolated(
        &self,
        _timepoint: usize,
        _level: usize,
        _interpolation: Interpolation,
    ) -> Result<Box<dyn RealSampler + '_>, SourceError> {
        Ok(Box::new(PanickingSampler))
    }
}

/// Source whose samplers block until the gate is opened.
///
/// `entered()` turns true as soon as any fill thread is waiting, which lets a
/// test cancel a render that is known to be in flight.
#[derive(Debug, Clone, Default)]
pub struct GatedSource {
    gate: Arc<Gate>,
}

#[derive(Debug, Default)]
pub struct Gate {
    entered: AtomicBool,
    open: AtomicBool,
}

impl GatedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gate(&self) -> Arc<Gate> {
        Arc::clone(&self.gate)
    }
}

impl Gate {
    pub fn entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::Release);
    }

    /// Spin until a fill thread reaches the gate. Panics after `timeout`.
    pub fn wait_entered(&self, timeout: Duration) {
        let start = std::time::Instant::now();
        while !self.entered() {
            if start.elapsed() > timeout {
                panic!("no fill thread reached the gate");
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

struct GatedSampler<'a> {
    gate: &'a Gate,
}

impl RealSampler for GatedSampler<'_> {
    fn sample(&self, _position: [f64; 3]) -> f64 {
        self.gate.entered.store(true, Ordering::Release);
        while !self.gate.open.load(Ordering::Acquire) {
            std::thread::sleep(Duration::from_micros(200));
        }
        128.0
    }
}

impl Source for GatedSource {
    fn name(&self) -> &str {
        "gated"
    }

    fn num_mipmap_levels(&self) -> usize {
        1
    }

    fn is_present(&self, _timepoint: usize) -> bool {
        true
    }

    fn source_transform(&self, _timepoint: usize, _level: usize) -> Affine3D {
        Affine3D::identity()
    }

    fn interpolated(
        &self,
        _timepoint: usize,
        _level: usize,
        _interpolation: Interpolation,
    ) -> Result<Box<dyn RealSampler + '_>, SourceError> {
        Ok(Box::new(GatedSampler { gate: &self.gate }))
    }
}

/// Pair `source` with a 0..255 converter tinted `color`.
pub fn sac(id: usize, source: Arc<dyn Source>, color: u32) -> SourceAndConverter {
    SourceAndConverter::new(
        ViewSetup::new(id, format!("setup {id}")),
        source,
        byte_converter(color),
    )
}

/// Constant-valued source tinted `color`.
pub fn constant_sac(id: usize, value: f64, color: u32) -> SourceAndConverter {
    sac(
        id,
        Arc::new(ConstantSource::new(format!("constant {id}"), value)),
        color,
    )
}

/// Single-timepoint pyramid over `volume`, placed in world space by
/// `registration`.
pub fn pyramid_sac(
    id: usize,
    volume: Volume<u16>,
    registration: Affine3D,
    num_levels: usize,
    color: u32,
) -> SourceAndConverter {
    let pyramid = VolumePyramid::build(format!("pyramid {id}"), registration, vec![Some(volume)], num_levels);
    sac(id, Arc::new(pyramid), color)
}

/// Viewer state over `sources` with a single timepoint.
pub fn viewer_state(sources: Vec<SourceAndConverter>) -> ViewerState {
    ViewerState::new(sources, 1)
}

/// Worker with two fill threads and additive blending.
pub fn renderer(state: ViewerState) -> TileRenderer {
    renderer_with(state, 2, BlendMode::Additive)
}

pub fn renderer_with(state: ViewerState, threads: usize, blend: BlendMode) -> TileRenderer {
    TileRenderer::new(0, state, threads, blend).expect("fill thread pool")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_source_samples_everywhere() {
        let source = ConstantSource::new("c", 42.0).with_levels(3);
        let sampler = source.interpolated(0, 2, Interpolation::NLinear).unwrap();
        assert_eq!(sampler.sample([-100.0, 5.0, 1e6]), 42.0);
        assert_eq!(source.num_mipmap_levels(), 3);
    }

    #[test]
    fn test_gate_opens() {
        let source = GatedSource::new();
        let gate = source.gate();
        gate.open();
        let sampler = source
            .interpolated(0, 0, Interpolation::NearestNeighbor)
            .unwrap();
        assert_eq!(sampler.sample([0.0, 0.0, 0.0]), 128.0);
        assert!(gate.entered());
    }

    #[test]
    fn test_viewer_state_all_visible() {
        let state = viewer_state(vec![
            constant_sac(0, 10.0, colors::RED),
            constant_sac(1, 20.0, colors::GREEN),
        ]);
        assert_eq!(state.visible_source_indices(), vec![0, 1]);
    }
}
