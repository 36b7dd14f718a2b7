//! In-memory volume pyramids.
//!
//! Level 0 holds the full-resolution volume; each further level halves every
//! dimension by averaging 2×2×2 blocks. The voxel grid of level `l` is placed
//! so that voxel centers line up with level 0: scale `2^l`, offset
//! `(2^l − 1) / 2`.

use std::sync::Arc;

use tile_common::{Affine3D, Interpolation};

use crate::error::SourceError;
use crate::source::{RealSampler, Source};

/// Native sample types a volume can hold.
pub trait Voxel: Copy + Send + Sync + 'static {
    fn to_f64(self) -> f64;
    fn from_f64(value: f64) -> Self;
}

impl Voxel for u8 {
    fn to_f64(self) -> f64 {
        self as f64
    }
    fn from_f64(value: f64) -> Self {
        value.round().clamp(0.0, u8::MAX as f64) as u8
    }
}

impl Voxel for u16 {
    fn to_f64(self) -> f64 {
        self as f64
    }
    fn from_f64(value: f64) -> Self {
        value.round().clamp(0.0, u16::MAX as f64) as u16
    }
}

impl Voxel for f32 {
    fn to_f64(self) -> f64 {
        self as f64
    }
    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

/// Dense 3D array, x fastest.
#[derive(Debug, Clone)]
pub struct Volume<T> {
    dims: [usize; 3],
    data: Arc<[T]>,
}

impl<T: Voxel> Volume<T> {
    pub fn new(dims: [usize; 3], data: Vec<T>) -> Result<Self, SourceError> {
        let expected = dims[0] * dims[1] * dims[2];
        if data.len() != expected || expected == 0 {
            return Err(SourceError::ShapeMismatch {
                dims,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            dims,
            data: data.into(),
        })
    }

    /// Volume with `f(x, y, z)` at every voxel.
    pub fn from_fn(dims: [usize; 3], mut f: impl FnMut(usize, usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(dims[0] * dims[1] * dims[2]);
        for z in 0..dims[2] {
            for y in 0..dims[1] {
                for x in 0..dims[0] {
                    data.push(f(x, y, z));
                }
            }
        }
        Self {
            dims,
            data: data.into(),
        }
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> T {
        self.data[x + self.dims[0] * (y + self.dims[1] * z)]
    }

    /// Value at integer coordinates; 0 outside the volume.
    #[inline]
    fn get_or_zero(&self, x: i64, y: i64, z: i64) -> f64 {
        let [dx, dy, dz] = self.dims;
        if x < 0 || y < 0 || z < 0 || x >= dx as i64 || y >= dy as i64 || z >= dz as i64 {
            return 0.0;
        }
        self.get(x as usize, y as usize, z as usize).to_f64()
    }

    /// Average 2×2×2 blocks; odd edges reuse the last voxel.
    pub fn downsample(&self) -> Self {
        let [dx, dy, dz] = self.dims;
        let half = |d: usize| d.div_ceil(2).max(1);
        let out_dims = [half(dx), half(dy), half(dz)];
        Volume::from_fn(out_dims, |x, y, z| {
            let mut sum = 0.0;
            for oz in 0..2 {
                for oy in 0..2 {
                    for ox in 0..2 {
                        let sx = (2 * x + ox).min(dx - 1);
                        let sy = (2 * y + oy).min(dy - 1);
                        let sz = (2 * z + oz).min(dz - 1);
                        sum += self.get(sx, sy, sz).to_f64();
                    }
                }
            }
            T::from_f64(sum / 8.0)
        })
    }
}

/// Nearest-neighbor sampler; coordinates round to the closest voxel.
struct NearestNeighborSampler<'a, T> {
    volume: &'a Volume<T>,
}

impl<T: Voxel> RealSampler for NearestNeighborSampler<'_, T> {
    fn sample(&self, p: [f64; 3]) -> f64 {
        if !p.iter().all(|v| v.is_finite()) {
            return 0.0;
        }
        let round = |v: f64| (v + 0.5).floor() as i64;
        self.volume.get_or_zero(round(p[0]), round(p[1]), round(p[2]))
    }
}

/// Trilinear sampler; neighbors outside the volume contribute 0.
struct NLinearSampler<'a, T> {
    volume: &'a Volume<T>,
}

impl<T: Voxel> RealSampler for NLinearSampler<'_, T> {
    fn sample(&self, p: [f64; 3]) -> f64 {
        if !p.iter().all(|v| v.is_finite()) {
            return 0.0;
        }
        let (x0, y0, z0) = (p[0].floor(), p[1].floor(), p[2].floor());
        let (fx, fy, fz) = (p[0] - x0, p[1] - y0, p[2] - z0);
        let (x0, y0, z0) = (x0 as i64, y0 as i64, z0 as i64);

        let mut value = 0.0;
        for dz in 0..2 {
            let wz = if dz == 0 { 1.0 - fz } else { fz };
            if wz == 0.0 {
                continue;
            }
            for dy in 0..2 {
                let wy = if dy == 0 { 1.0 - fy } else { fy };
                if wy == 0.0 {
                    continue;
                }
                for dx in 0..2 {
                    let wx = if dx == 0 { 1.0 - fx } else { fx };
                    if wx == 0.0 {
                        continue;
                    }
                    value += wx * wy * wz * self.volume.get_or_zero(
                        x0.saturating_add(dx),
                        y0.saturating_add(dy),
                        z0.saturating_add(dz),
                    );
                }
            }
        }
        value
    }
}

/// Voxel-to-voxel transform from `level` to level 0 grid coordinates.
pub fn mipmap_transform(level: usize) -> Affine3D {
    let factor = (1u64 << level) as f64;
    let offset = 0.5 * (factor - 1.0);
    Affine3D::from_row_major([
        factor, 0.0, 0.0, offset, //
        0.0, factor, 0.0, offset, //
        0.0, 0.0, factor, offset,
    ])
}

/// A [`Source`] over in-memory pyramids, one per timepoint.
#[derive(Debug, Clone)]
pub struct VolumePyramid<T> {
    name: String,
    /// Level-0 voxel grid to world.
    registration: Affine3D,
    /// `timepoints[t][level]`; `None` where the view was not acquired.
    timepoints: Vec<Option<Vec<Volume<T>>>>,
    num_levels: usize,
}

impl<T: Voxel> VolumePyramid<T> {
    /// Build pyramids with `num_levels` levels from full-resolution volumes,
    /// one entry per timepoint.
    pub fn build(
        name: impl Into<String>,
        registration: Affine3D,
        full_resolution: Vec<Option<Volume<T>>>,
        num_levels: usize,
    ) -> Self {
        let num_levels = num_levels.max(1);
        let timepoints = full_resolution
            .into_iter()
            .map(|volume| {
                volume.map(|level0| {
                    let mut levels = Vec::with_capacity(num_levels);
                    levels.push(level0);
                    while levels.len() < num_levels {
                        let next = levels[levels.len() - 1].downsample();
                        levels.push(next);
                    }
                    levels
                })
            })
            .collect();
        Self {
            name: name.into(),
            registration,
            timepoints,
            num_levels,
        }
    }

    pub fn registration(&self) -> &Affine3D {
        &self.registration
    }

    pub fn num_timepoints(&self) -> usize {
        self.timepoints.len()
    }

    pub fn level(&self, timepoint: usize, level: usize) -> Result<&Volume<T>, SourceError> {
        let levels = self
            .timepoints
            .get(timepoint)
            .and_then(|t| t.as_ref())
            .ok_or_else(|| SourceError::MissingTimepoint {
                source_name: self.name.clone(),
                timepoint,
            })?;
        levels.get(level).ok_or_else(|| SourceError::MissingLevel {
            source_name: self.name.clone(),
            level,
            available: levels.len(),
        })
    }
}

impl<T: Voxel> Source for VolumePyramid<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn num_mipmap_levels(&self) -> usize {
        self.num_levels
    }

    fn is_present(&self, timepoint: usize) -> bool {
        matches!(self.timepoints.get(timepoint), Some(Some(_)))
    }

    fn source_transform(&self, _timepoint: usize, level: usize) -> Affine3D {
        self.registration.concatenate(&mipmap_transform(level))
    }

    fn interpolated(
        &self,
        timepoint: usize,
        level: usize,
        interpolation: Interpolation,
    ) -> Result<Box<dyn RealSampler + '_>, SourceError> {
        let volume = self.level(timepoint, level)?;
        Ok(match interpolation {
            Interpolation::NearestNeighbor => Box::new(NearestNeighborSampler { volume }),
            Interpolation::NLinear => Box::new(NLinearSampler { volume }),
        })
    }
}
