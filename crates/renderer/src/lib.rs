//! Tile rendering for registered multi-view volume acquisitions.
//!
//! The pipeline for one tile:
//! - compose the caller's view transform with the screen-scale transform
//!   ([`transform`])
//! - pick a mipmap level per visible source ([`mipmap`])
//! - build a projector over the visible sources ([`projector`])
//! - fill an ARGB raster in parallel row bands and encode it ([`worker`])
//!
//! Workers are handed out by a fixed-size [`pool::WorkerPool`], which bounds
//! the number of renders in flight.

pub mod accumulate;
pub mod converter;
pub mod encode;
pub mod error;
pub mod jpeg;
pub mod mipmap;
pub mod png;
pub mod pool;
pub mod projector;
pub mod raster;
pub mod source;
pub mod state;
pub mod transform;
pub mod volume;
pub mod worker;

pub use accumulate::{Accumulator, AdditiveArgb, AlphaOver, BlendMode};
pub use converter::{Converter, LinearRangeConverter};
pub use encode::{OutputFormat, TileEncoder};
pub use error::{EncodeError, PoolError, RenderError, SourceError};
pub use pool::{PooledRenderer, WorkerPool};
pub use raster::ArgbRaster;
pub use source::{RealSampler, Source, SourceAndConverter};
pub use state::{DisplayMode, ViewerState};
pub use volume::{Volume, VolumePyramid, Voxel};
pub use worker::{CancelHandle, RenderStats, RenderedTile, TileRenderer, TileRequest};
