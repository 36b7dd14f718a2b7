//! Common types shared by the volume tile renderer and the tile server.

pub mod affine;
pub mod error;
pub mod interpolation;
pub mod sequence;

pub use affine::Affine3D;
pub use error::{TileError, TileResult};
pub use interpolation::Interpolation;
pub use sequence::{SequenceDescription, ViewSetup};
