//! Shared test utilities for the tile server workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Synthetic volume generators
//! - Ready-made sources, converters and viewer states
//! - Raw volume files on disk for dataset loading tests
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, ramp_volume};
//! ```

pub mod files;
pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use files::*;
pub use fixtures::*;
pub use generators::*;

/// Assert that two floating-point values are within `epsilon` of each other.
///
/// Without an epsilon the tolerance is `1e-9`, enough for the rounding of a
/// few chained affine products.
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(0.1 + 0.2, 0.3);
/// assert_approx_eq!(1.0001, 1.0, 1e-3);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr $(,)?) => {
        $crate::assert_approx_eq!($left, $right, 1e-9)
    };
    ($left:expr, $right:expr, $epsilon:expr $(,)?) => {{
        let (left, right, epsilon): (f64, f64, f64) = ($left as f64, $right as f64, $epsilon as f64);
        if !((left - right).abs() <= epsilon) {
            panic!(
                "assertion failed: `{} ≈ {}`\n  left: {:?}\n right: {:?}\n  |diff| > {:?}",
                stringify!($left),
                stringify!($right),
                left,
                right,
                epsilon
            );
        }
    }};
}

/// Assert that two ARGB colors differ by at most `tolerance` per channel.
///
/// ```ignore
/// use test_utils::assert_color_near;
///
/// assert_color_near!(0xFF_80_80_80u32, 0xFF_81_7F_80u32, 1);
/// ```
#[macro_export]
macro_rules! assert_color_near {
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let left: u32 = $left;
        let right: u32 = $right;
        let tolerance: i32 = $tolerance;
        for shift in [24u32, 16, 8, 0] {
            let a = ((left >> shift) & 0xFF) as i32;
            let b = ((right >> shift) & 0xFF) as i32;
            if (a - b).abs() > tolerance {
                panic!(
                    "assertion failed: colors differ\n  left: `{:#010X}`,\n right: `{:#010X}`,\n  tolerance: {}",
                    left, right, tolerance
                );
            }
        }
    }};
}
