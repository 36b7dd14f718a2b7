//! Converters from real-valued samples to display colors.

/// Maps a source's native sample value (widened to `f64`) to a packed ARGB
/// display color.
pub trait Converter: Send + Sync {
    fn convert(&self, value: f64) -> u32;
}

/// Linear display range with a tint color.
///
/// `min` maps to black and `max` to the full tint color; values outside the
/// range clamp. Output is always opaque.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRangeConverter {
    pub min: f64,
    pub max: f64,
    /// Tint as `0xRRGGBB`; white gives grayscale.
    pub color: u32,
}

impl LinearRangeConverter {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            color: 0xFF_FF_FF,
        }
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color & 0xFF_FF_FF;
        self
    }
}

impl Default for LinearRangeConverter {
    fn default() -> Self {
        Self::new(0.0, 6000.0)
    }
}

impl Converter for LinearRangeConverter {
    fn convert(&self, value: f64) -> u32 {
        let range = self.max - self.min;
        let t = if range > 0.0 {
            ((value - self.min) / range).clamp(0.0, 1.0)
        } else if value >= self.max {
            1.0
        } else {
            0.0
        };
        // NaN samples display as black
        let t = if t.is_nan() { 0.0 } else { t };

        let channel = |shift: u32| {
            let tint = ((self.color >> shift) & 0xFF) as f64;
            ((t * tint).round() as u32).min(255)
        };
        crate::raster::argb(255, channel(16), channel(8), channel(0))
    }
}
