//! Tile rendering handler.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use axum::{
    extract::{Extension, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use renderer::{CancelHandle, PoolError, RenderedTile, TileRequest};
use tile_common::{TileError, TileResult};
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use crate::params::parse_tile_request;
use crate::state::AppState;

/// GET / and GET /img - render one tile.
#[instrument(skip(state, params), fields(request_id = %Uuid::new_v4()))]
pub async fn tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    metrics::counter!("tile_requests_total").increment(1);

    let request = match parse_tile_request(&params, &state.config, state.sequence.num_timepoints()) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "Rejected tile request");
            return error_response(&e);
        }
    };

    match render_tile(&state, request).await {
        Ok(tile) => tile_response(tile, state.config.cache_max_age),
        Err(e) => {
            metrics::counter!("tile_render_errors_total", "kind" => e.kind()).increment(1);
            if e.http_status_code() >= 500 {
                error!(error = %e, "Tile render failed");
            }
            error_response(&e)
        }
    }
}

/// Acquire a worker, render `request` on it and give the worker back.
///
/// Requests queue on an async semaphore with one permit per worker. The
/// permit holder then acquires, renders and releases inside a single blocking
/// task, so a held worker never waits behind queued acquirers for a blocking
/// thread. If the returned future is dropped, the render is cancelled (or
/// skipped when it has not started) and the worker still goes back to the
/// pool.
pub async fn render_tile(state: &AppState, request: TileRequest) -> TileResult<RenderedTile> {
    let wait_start = Instant::now();
    let permit = Arc::clone(&state.render_permits)
        .acquire_owned()
        .await
        .map_err(|_| TileError::from(PoolError::Closed))?;

    let ticket = Arc::new(RenderTicket::default());
    let guard = CancelOnDrop::new(Arc::clone(&ticket));
    let pool = state.pool.clone();
    let rendered = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        let mut worker = pool.acquire()?;
        metrics::histogram!("tile_pool_wait_seconds").record(wait_start.elapsed().as_secs_f64());
        metrics::gauge!("tile_pool_busy_workers").set(pool.busy() as f64);

        if !ticket.attach(worker.cancel_handle()) {
            metrics::counter!("tile_renders_cancelled_total").increment(1);
            return Err(TileError::RenderCancelled);
        }
        worker.render(&request).map_err(|e| {
            if e.is_cancelled() {
                metrics::counter!("tile_renders_cancelled_total").increment(1);
            }
            TileError::from(e)
        })
    })
    .await;
    guard.disarm();
    metrics::gauge!("tile_pool_busy_workers").set(state.pool.busy() as f64);

    let tile = rendered.map_err(|e| TileError::InternalError(format!("render task failed: {e}")))??;

    metrics::counter!("tile_renders_total").increment(1);
    metrics::histogram!("tile_render_seconds").record(tile.stats.fill_time.as_secs_f64());
    metrics::histogram!("tile_encode_seconds").record(tile.stats.encode_time.as_secs_f64());
    Ok(tile)
}

/// Links a request to the blocking task rendering it.
#[derive(Debug, Default)]
pub struct RenderTicket {
    inner: Mutex<TicketState>,
}

#[derive(Debug, Default)]
struct TicketState {
    handle: Option<CancelHandle>,
    abandoned: bool,
}

impl RenderTicket {
    fn lock(&self) -> MutexGuard<'_, TicketState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the cancel handle of the worker about to render. Returns
    /// `false` if the request was already abandoned; the render must then be
    /// skipped.
    pub fn attach(&self, handle: CancelHandle) -> bool {
        let mut state = self.lock();
        if state.abandoned {
            return false;
        }
        state.handle = Some(handle);
        true
    }

    /// Mark the request abandoned and cancel its render if one is attached.
    pub fn abandon(&self) {
        let mut state = self.lock();
        state.abandoned = true;
        if let Some(handle) = state.handle.take() {
            if handle.cancel() {
                warn!(worker = handle.worker_id(), "Client went away, cancelled render");
            }
        }
    }

    pub fn is_abandoned(&self) -> bool {
        self.lock().abandoned
    }
}

/// Abandons a [`RenderTicket`] when dropped, unless disarmed.
pub struct CancelOnDrop {
    ticket: Option<Arc<RenderTicket>>,
}

impl CancelOnDrop {
    pub fn new(ticket: Arc<RenderTicket>) -> Self {
        Self {
            ticket: Some(ticket),
        }
    }

    /// The render finished; dropping no longer cancels.
    pub fn disarm(mut self) {
        self.ticket = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            ticket.abandon();
        }
    }
}

fn tile_response(tile: RenderedTile, cache_max_age: u32) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, tile.content_type.to_string()),
            (header::CACHE_CONTROL, format!("max-age={cache_max_age}")),
        ],
        tile.bytes,
    )
        .into_response()
}

/// Plain-text error response with the error's status code.
pub fn error_response(err: &TileError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        err.to_string(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_status() {
        let response = error_response(&TileError::MissingParameter("width".into()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = error_response(&TileError::ServiceUnavailable("closed".into()));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = error_response(&TileError::RenderCancelled);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    fn worker() -> renderer::TileRenderer {
        renderer::TileRenderer::new(
            3,
            renderer::ViewerState::new(Vec::new(), 1),
            1,
            renderer::BlendMode::Additive,
        )
        .unwrap()
    }

    #[test]
    fn test_abandoned_ticket_refuses_attach() {
        let ticket = Arc::new(RenderTicket::default());
        drop(CancelOnDrop::new(Arc::clone(&ticket)));
        assert!(ticket.is_abandoned());
        assert!(!ticket.attach(worker().cancel_handle()));
    }

    #[test]
    fn test_disarmed_guard_leaves_render_alone() {
        let mut worker = worker();
        let ticket = Arc::new(RenderTicket::default());
        let guard = CancelOnDrop::new(Arc::clone(&ticket));
        assert!(ticket.attach(worker.cancel_handle()));
        worker
            .paint(&TileRequest::new(tile_common::Affine3D::identity(), 2, 2))
            .unwrap();

        guard.disarm();
        assert!(!ticket.is_abandoned());
        assert_eq!(worker.generation(), 1);
    }

    #[test]
    fn test_dropped_guard_cancels_attached_render() {
        let mut worker = worker();
        let ticket = Arc::new(RenderTicket::default());
        let guard = CancelOnDrop::new(Arc::clone(&ticket));
        assert!(ticket.attach(worker.cancel_handle()));
        worker
            .paint(&TileRequest::new(tile_common::Affine3D::identity(), 2, 2))
            .unwrap();

        drop(guard);
        // the generation the render ran under was superseded
        assert_eq!(worker.generation(), 2);
    }
}
