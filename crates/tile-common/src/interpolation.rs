//! Sampling interpolation modes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Interpolation {
    #[default]
    NearestNeighbor,
    /// Linear in each dimension (trilinear for volumes).
    NLinear,
}

impl Interpolation {
    /// Parse the `interpolation` query value. Only `NLINEAR` selects linear
    /// interpolation; anything else means nearest-neighbor.
    pub fn from_query(value: &str) -> Self {
        if value == "NLINEAR" {
            Interpolation::NLinear
        } else {
            Interpolation::NearestNeighbor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interpolation::NearestNeighbor => "NEARESTNEIGHBOR",
            Interpolation::NLinear => "NLINEAR",
        }
    }
}
