//! Application state and shared resources.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use renderer::{RenderError, TileRenderer, WorkerPool};
use tile_common::SequenceDescription;
use tokio::sync::Semaphore;
use tracing::info;

use crate::config::ServerConfig;
use crate::dataset::Dataset;

/// Shared application state.
pub struct AppState {
    pub config: ServerConfig,
    pub dataset_name: String,
    pub sequence: SequenceDescription,
    pub pool: WorkerPool,
    /// One permit per worker. Requests wait here, not on a blocking thread.
    pub render_permits: Arc<Semaphore>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Build `config.workers` renderer workers, each with its own viewer
    /// state over `dataset`.
    pub fn new(config: ServerConfig, dataset: &Dataset) -> Result<Self, RenderError> {
        let pool = WorkerPool::build(config.workers, |id| {
            TileRenderer::new(id, dataset.viewer_state(), config.render_threads, config.blend)
        })?;
        info!(
            workers = config.workers,
            render_threads = config.render_threads,
            blend = config.blend.as_str(),
            "Renderer workers ready"
        );

        let render_permits = Arc::new(Semaphore::new(pool.size()));
        Ok(Self {
            config,
            dataset_name: dataset.name.clone(),
            sequence: dataset.sequence.clone(),
            pool,
            render_permits,
            started_at: Utc::now(),
        })
    }

    /// Stop handing out workers. Waiting and future tile requests fail with
    /// 503; renders in flight finish normally.
    pub fn shutdown(&self) {
        self.render_permits.close();
        self.pool.close();
    }
}
