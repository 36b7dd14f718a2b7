//! 3D affine transforms.
//!
//! An [`Affine3D`] is the top 3×4 block of a homogeneous 4×4 matrix. Points
//! are column vectors, so `a.concatenate(&b)` yields the transform that applies
//! `b` first and then `a`, while `a.pre_concatenate(&b)` applies `a` first and
//! then `b`.

use nalgebra::{Matrix4, Vector4};
use serde::{Deserialize, Serialize};

/// A 3D affine transform stored as a homogeneous matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 12]", into = "[f64; 12]")]
pub struct Affine3D {
    matrix: Matrix4<f64>,
}

impl Default for Affine3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Affine3D {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Build from 12 values in row-major order:
    /// `m00 m01 m02 m03 m10 m11 m12 m13 m20 m21 m22 m23`.
    pub fn from_row_major(values: [f64; 12]) -> Self {
        let v = values;
        Self {
            matrix: Matrix4::new(
                v[0], v[1], v[2], v[3], //
                v[4], v[5], v[6], v[7], //
                v[8], v[9], v[10], v[11], //
                0.0, 0.0, 0.0, 1.0,
            ),
        }
    }

    pub fn to_row_major(&self) -> [f64; 12] {
        let mut out = [0.0; 12];
        for row in 0..3 {
            for col in 0..4 {
                out[row * 4 + col] = self.matrix[(row, col)];
            }
        }
        out
    }

    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        Self::from_row_major([
            1.0, 0.0, 0.0, x, //
            0.0, 1.0, 0.0, y, //
            0.0, 0.0, 1.0, z,
        ])
    }

    pub fn scaling(sx: f64, sy: f64, sz: f64) -> Self {
        Self::from_row_major([
            sx, 0.0, 0.0, 0.0, //
            0.0, sy, 0.0, 0.0, //
            0.0, 0.0, sz, 0.0,
        ])
    }

    /// Element at `row` (0..3) and `col` (0..4).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.matrix[(row, col)]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(row < 3 && col < 4, "affine index out of range: ({row}, {col})");
        self.matrix[(row, col)] = value;
    }

    /// `self ∘ other`: apply `other`, then `self`.
    pub fn concatenate(&self, other: &Affine3D) -> Affine3D {
        Affine3D {
            matrix: self.matrix * other.matrix,
        }
    }

    /// `other ∘ self`: apply `self`, then `other`.
    pub fn pre_concatenate(&self, other: &Affine3D) -> Affine3D {
        Affine3D {
            matrix: other.matrix * self.matrix,
        }
    }

    /// Inverse transform, or `None` if the linear part is singular.
    pub fn inverse(&self) -> Option<Affine3D> {
        self.matrix.try_inverse().map(|matrix| Affine3D { matrix })
    }

    pub fn apply(&self, point: [f64; 3]) -> [f64; 3] {
        let v = self.matrix * Vector4::new(point[0], point[1], point[2], 1.0);
        [v.x, v.y, v.z]
    }

    /// Image of the unit vector along `axis`, without translation.
    pub fn apply_direction(&self, axis: usize) -> [f64; 3] {
        [
            self.matrix[(0, axis)],
            self.matrix[(1, axis)],
            self.matrix[(2, axis)],
        ]
    }

    pub fn is_finite(&self) -> bool {
        self.matrix.iter().all(|v| v.is_finite())
    }
}

impl From<[f64; 12]> for Affine3D {
    fn from(values: [f64; 12]) -> Self {
        Affine3D::from_row_major(values)
    }
}

impl From<Affine3D> for [f64; 12] {
    fn from(affine: Affine3D) -> Self {
        affine.to_row_major()
    }
}
