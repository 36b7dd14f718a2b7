//! Policies for combining the colors of several visible sources into one
//! pixel.

use std::str::FromStr;
use std::sync::Arc;

use crate::raster::{alpha, argb, blue, green, red};

/// Combines per-source ARGB colors, given in source order, into one color.
pub trait Accumulator: Send + Sync {
    fn accumulate(&self, colors: &[u32]) -> u32;
}

/// Channel-wise sum, clamped to 255. Order independent.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdditiveArgb;

impl Accumulator for AdditiveArgb {
    fn accumulate(&self, colors: &[u32]) -> u32 {
        let (mut a, mut r, mut g, mut b) = (0u32, 0u32, 0u32, 0u32);
        for &c in colors {
            a += alpha(c);
            r += red(c);
            g += green(c);
            b += blue(c);
        }
        argb(a.min(255), r.min(255), g.min(255), b.min(255))
    }
}

/// Front-to-back "over" compositing; the first source is in front.
/// Order dependent.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlphaOver;

impl Accumulator for AlphaOver {
    fn accumulate(&self, colors: &[u32]) -> u32 {
        let (mut a_acc, mut r_acc, mut g_acc, mut b_acc) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
        for &c in colors {
            let a = alpha(c) as f64 / 255.0;
            let w = (1.0 - a_acc) * a;
            r_acc += w * red(c) as f64;
            g_acc += w * green(c) as f64;
            b_acc += w * blue(c) as f64;
            a_acc += w;
            if a_acc >= 1.0 {
                break;
            }
        }
        if a_acc <= 0.0 {
            return 0;
        }
        let channel = |v: f64| ((v / a_acc).round() as u32).min(255);
        argb(
            ((a_acc * 255.0).round() as u32).min(255),
            channel(r_acc),
            channel(g_acc),
            channel(b_acc),
        )
    }
}

/// Configurable choice of accumulation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Additive,
    Over,
}

impl BlendMode {
    pub fn accumulator(&self) -> Arc<dyn Accumulator> {
        match self {
            BlendMode::Additive => Arc::new(AdditiveArgb),
            BlendMode::Over => Arc::new(AlphaOver),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlendMode::Additive => "additive",
            BlendMode::Over => "over",
        }
    }
}

impl FromStr for BlendMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "additive" | "add" => Ok(BlendMode::Additive),
            "over" | "alpha" => Ok(BlendMode::Over),
            other => Err(format!("unknown blend mode '{other}' (expected additive or over)")),
        }
    }
}
