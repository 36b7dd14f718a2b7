//! Synthetic volume generators.
//!
//! These generators create predictable, verifiable voxel patterns that can
//! be used across the test suite.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use renderer::Volume;

/// Creates a volume whose voxel value encodes its position.
///
/// Each voxel is `x + 10 * y + 100 * z`, so a sample can be traced back to
/// the voxel it came from as long as every dimension is at most 10.
///
/// # Example
///
/// ```
/// use test_utils::ramp_volume;
///
/// let volume = ramp_volume([4, 3, 2]);
/// assert_eq!(volume.get(1, 2, 1), 121);
/// ```
pub fn ramp_volume(dims: [usize; 3]) -> Volume<u16> {
    Volume::from_fn(dims, |x, y, z| (x + 10 * y + 100 * z) as u16)
}

/// Creates a volume filled with one value.
pub fn constant_volume(dims: [usize; 3], value: u16) -> Volume<u16> {
    Volume::from_fn(dims, |_, _, _| value)
}

/// Creates a bright sphere centered in the volume on a zero background.
///
/// The radius is 40% of the smallest dimension.
pub fn sphere_volume(dims: [usize; 3], value: u16) -> Volume<u16> {
    let center = dims.map(|d| (d as f64 - 1.0) / 2.0);
    let radius = 0.4 * dims.iter().copied().min().unwrap_or(0) as f64;
    Volume::from_fn(dims, |x, y, z| {
        let d2 = (x as f64 - center[0]).powi(2)
            + (y as f64 - center[1]).powi(2)
            + (z as f64 - center[2]).powi(2);
        if d2 <= radius * radius {
            value
        } else {
            0
        }
    })
}

/// Creates a volume of uniform noise in `0..max`, reproducible from `seed`.
pub fn noise_volume(dims: [usize; 3], max: u16, seed: u64) -> Volume<u16> {
    let mut rng = StdRng::seed_from_u64(seed);
    Volume::from_fn(dims, |_, _, _| rng.gen_range(0..max.max(1)))
}

/// Creates an `f32` volume with a linear gradient along x from 0 to 1.
pub fn gradient_volume_f32(dims: [usize; 3]) -> Volume<f32> {
    let span = (dims[0].max(2) - 1) as f32;
    Volume::from_fn(dims, |x, _, _| x as f32 / span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_volume_values() {
        let volume = ramp_volume([3, 3, 3]);
        assert_eq!(volume.dims(), [3, 3, 3]);
        assert_eq!(volume.get(0, 0, 0), 0);
        assert_eq!(volume.get(2, 1, 2), 212);
    }

    #[test]
    fn test_sphere_volume_center_and_corner() {
        let volume = sphere_volume([9, 9, 9], 1000);
        assert_eq!(volume.get(4, 4, 4), 1000);
        assert_eq!(volume.get(0, 0, 0), 0);
    }

    #[test]
    fn test_noise_volume_reproducible() {
        let a = noise_volume([4, 4, 4], 100, 7);
        let b = noise_volume([4, 4, 4], 100, 7);
        for z in 0..4 {
            for y in 0..4 {
                for x in 0..4 {
                    assert_eq!(a.get(x, y, z), b.get(x, y, z));
                    assert!(a.get(x, y, z) < 100);
                }
            }
        }
    }

    #[test]
    fn test_gradient_volume_f32_range() {
        let volume = gradient_volume_f32([5, 1, 1]);
        assert_eq!(volume.get(0, 0, 0), 0.0);
        assert_eq!(volume.get(4, 0, 0), 1.0);
    }
}
