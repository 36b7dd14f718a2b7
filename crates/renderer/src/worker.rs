//! The renderer worker: one viewer state, one raster, one encoder per format.
//!
//! A worker renders one tile at a time (`&mut self`). Every call to
//! [`TileRenderer::paint`] bumps the worker's generation counter; the fill
//! threads compare the counter against the generation captured at the start
//! of the call before each row and abandon the fill once it moved on.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tile_common::{Affine3D, Interpolation};
use tracing::{debug, warn};

use crate::accumulate::{Accumulator, BlendMode};
use crate::encode::{OutputFormat, TileEncoder};
use crate::error::RenderError;
use crate::jpeg::JpegEncoder;
use crate::mipmap::select_levels;
use crate::png::PngEncoder;
use crate::projector::create_projector;
use crate::raster::ArgbRaster;
use crate::state::ViewerState;
use crate::transform::{compose_view_transform, raster_dimensions};

/// Parameters of one tile render.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRequest {
    /// Caller world-to-view transform.
    pub view_transform: Affine3D,
    /// Requested tile size in destination pixels.
    pub width: u32,
    pub height: u32,
    pub timepoint: usize,
    pub screen_scale: f64,
    pub interpolation: Interpolation,
    pub format: OutputFormat,
}

impl TileRequest {
    /// A full-resolution (screen scale 1) nearest-neighbor JPEG tile at
    /// timepoint 0.
    pub fn new(view_transform: Affine3D, width: u32, height: u32) -> Self {
        Self {
            view_transform,
            width,
            height,
            timepoint: 0,
            screen_scale: 1.0,
            interpolation: Interpolation::NearestNeighbor,
            format: OutputFormat::Jpeg,
        }
    }

    pub fn with_timepoint(mut self, timepoint: usize) -> Self {
        self.timepoint = timepoint;
        self
    }

    pub fn with_screen_scale(mut self, screen_scale: f64) -> Self {
        self.screen_scale = screen_scale;
        self
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Size of the raster actually rendered and encoded.
    pub fn raster_dimensions(&self) -> (u32, u32) {
        raster_dimensions(self.width, self.height, self.screen_scale)
    }
}

/// Timings and choices of the last completed render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderStats {
    pub generation: u64,
    /// Chosen mipmap level per source; `None` for sources not drawn.
    pub levels: Vec<Option<usize>>,
    pub visible_sources: usize,
    pub fill_time: Duration,
    pub encode_time: Duration,
}

/// An encoded tile.
#[derive(Debug, Clone)]
pub struct RenderedTile {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub width: u32,
    pub height: u32,
    pub stats: RenderStats,
}

/// Cancels the next render of the worker it was taken from.
///
/// The handle is bound to one generation: the one the worker's next
/// [`paint`](TileRenderer::paint) will run under. Once a later render has
/// started, or the worker went back to its pool, cancelling is a no-op, so a
/// stale handle can never abort somebody else's render. Cloneable and usable
/// from any thread while the worker itself is borrowed by the render.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    worker_id: usize,
    counter: Arc<AtomicU64>,
    generation: u64,
}

impl CancelHandle {
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Generation of the render this handle cancels.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Abort the bound render if it is in flight. Returns whether the bound
    /// generation was still current.
    ///
    /// Before that render starts, and after it was superseded, nothing
    /// happens.
    pub fn cancel(&self) -> bool {
        self.counter
            .compare_exchange(
                self.generation,
                self.generation + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

pub struct TileRenderer {
    id: usize,
    state: ViewerState,
    raster: ArgbRaster,
    generation: Arc<AtomicU64>,
    fill_pool: rayon::ThreadPool,
    accumulator: Arc<dyn Accumulator>,
    jpeg: Box<dyn TileEncoder>,
    png: Box<dyn TileEncoder>,
    last_stats: RenderStats,
}

impl TileRenderer {
    /// Create a worker owning `state`, filling rasters on `render_threads`
    /// private threads.
    pub fn new(
        id: usize,
        state: ViewerState,
        render_threads: usize,
        blend: BlendMode,
    ) -> Result<Self, RenderError> {
        let fill_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(render_threads.max(1))
            .thread_name(move |i| format!("tile-fill-{id}-{i}"))
            .build()
            .map_err(|e| RenderError::ThreadPool(e.to_string()))?;

        Ok(Self {
            id,
            state,
            raster: ArgbRaster::new(0, 0),
            generation: Arc::new(AtomicU64::new(0)),
            fill_pool,
            accumulator: blend.accumulator(),
            jpeg: Box::new(JpegEncoder::new()),
            png: Box::new(PngEncoder::new()),
            last_stats: RenderStats::default(),
        })
    }

    /// Replace the encoder used for `format`.
    pub fn with_encoder(mut self, format: OutputFormat, encoder: Box<dyn TileEncoder>) -> Self {
        match format {
            OutputFormat::Jpeg => self.jpeg = encoder,
            OutputFormat::Png => self.png = encoder,
        }
        self
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ViewerState {
        &mut self.state
    }

    /// The raster of the last render. Only complete after a successful
    /// [`paint`](Self::paint).
    pub fn raster(&self) -> &ArgbRaster {
        &self.raster
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn last_stats(&self) -> &RenderStats {
        &self.last_stats
    }

    /// Handle cancelling the next render on this worker.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            worker_id: self.id,
            counter: Arc::clone(&self.generation),
            generation: self.generation() + 1,
        }
    }

    /// Invalidate every handle taken so far. Called when the worker goes back
    /// to its pool.
    pub(crate) fn retire_cancel_handles(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Render `request` into the worker's raster without encoding it.
    pub fn paint(&mut self, request: &TileRequest) -> Result<&ArgbRaster, RenderError> {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        if request.width == 0 || request.height == 0 {
            return Err(RenderError::InvalidSize {
                width: request.width,
                height: request.height,
            });
        }
        if !request.screen_scale.is_finite() || request.screen_scale <= 0.0 {
            return Err(RenderError::InvalidTransform);
        }

        let effective = compose_view_transform(&request.view_transform, request.screen_scale);
        if !effective.is_finite() {
            return Err(RenderError::InvalidTransform);
        }

        self.state.set_current_timepoint(request.timepoint);
        self.state.set_interpolation(request.interpolation);
        self.state.set_viewer_transform(effective);

        let (width, height) = request.raster_dimensions();
        if self.raster.resize(width, height) {
            debug!(worker = self.id, width, height, "Resized raster");
        }

        let levels = select_levels(&self.state);

        let fill_start = Instant::now();
        let Self {
            state,
            raster,
            generation: counter,
            fill_pool,
            accumulator,
            ..
        } = self;
        let counter: &AtomicU64 = counter;
        let projector = create_projector(state, &levels, accumulator)?;
        let visible_sources = projector.num_sources();

        let row_len = width as usize;
        let pixels = raster.pixels_mut();
        let filled = panic::catch_unwind(AssertUnwindSafe(|| {
            fill_pool.install(|| {
                pixels
                    .par_chunks_mut(row_len)
                    .enumerate()
                    .try_for_each(|(y, row)| {
                        if counter.load(Ordering::Acquire) != generation {
                            return Err(());
                        }
                        projector.fill_row(y, row);
                        Ok(())
                    })
            })
        }));
        let fill_time = fill_start.elapsed();

        match filled {
            Ok(Ok(())) => {}
            Ok(Err(())) => {
                warn!(worker = self.id, generation, "Render cancelled");
                return Err(RenderError::Cancelled { generation });
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(worker = self.id, generation, error = %message, "Raster fill panicked");
                return Err(RenderError::FillFailed(message));
            }
        }

        self.last_stats = RenderStats {
            generation,
            levels,
            visible_sources,
            fill_time,
            encode_time: Duration::ZERO,
        };
        Ok(&self.raster)
    }

    /// Render and encode one tile.
    pub fn render(&mut self, request: &TileRequest) -> Result<RenderedTile, RenderError> {
        self.paint(request)?;

        let encode_start = Instant::now();
        let encoder = match request.format {
            OutputFormat::Jpeg => &mut self.jpeg,
            OutputFormat::Png => &mut self.png,
        };
        let content_type = encoder.content_type();
        let bytes = encoder.encode(&self.raster)?;
        self.last_stats.encode_time = encode_start.elapsed();

        let (width, height) = self.raster.dimensions();
        debug!(
            worker = self.id,
            generation = self.last_stats.generation,
            width,
            height,
            format = request.format.as_str(),
            levels = ?self.last_stats.levels,
            visible = self.last_stats.visible_sources,
            fill_ms = self.last_stats.fill_time.as_secs_f64() * 1000.0,
            encode_ms = self.last_stats.encode_time.as_secs_f64() * 1000.0,
            bytes = bytes.len(),
            "Rendered tile"
        );

        Ok(RenderedTile {
            bytes,
            content_type,
            width,
            height,
            stats: self.last_stats.clone(),
        })
    }
}

impl std::fmt::Debug for TileRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileRenderer")
            .field("id", &self.id)
            .field("sources", &self.state.num_sources())
            .field("raster", &self.raster.dimensions())
            .field("generation", &self.generation())
            .field("fill_threads", &self.fill_pool.current_num_threads())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
