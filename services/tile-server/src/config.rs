//! Server configuration from command-line flags and environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use renderer::BlendMode;
use serde::{Serialize, Serializer};

/// Default number of renderer workers.
pub const DEFAULT_WORKERS: usize = 16;
/// Default fill threads per worker.
pub const DEFAULT_RENDER_THREADS: usize = 4;
/// Default `Cache-Control: max-age` in seconds.
pub const DEFAULT_CACHE_MAX_AGE: u32 = 20;
/// Default screen scale when a request does not give one.
pub const DEFAULT_SCREEN_SCALE: f64 = 0.5;
/// Default maximum requested tile edge.
pub const DEFAULT_MAX_TILE_SIZE: u32 = 4096;

#[derive(Parser, Debug)]
#[command(name = "tile-server")]
#[command(about = "Tile server for registered multi-view volume acquisitions")]
pub struct ServerArgs {
    /// Listen address
    #[arg(short, long, env = "TILE_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Dataset manifest (YAML). Without one a synthetic demo dataset is served.
    #[arg(short, long, env = "TILE_DATASET")]
    pub dataset: Option<PathBuf>,

    /// Number of renderer workers (concurrent renders)
    #[arg(long, env = "TILE_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Raster fill threads per worker
    #[arg(long, env = "TILE_RENDER_THREADS", default_value_t = DEFAULT_RENDER_THREADS)]
    pub render_threads: usize,

    /// Cache-Control max-age of tile responses, in seconds
    #[arg(long, env = "TILE_CACHE_MAX_AGE", default_value_t = DEFAULT_CACHE_MAX_AGE)]
    pub cache_max_age: u32,

    /// Screen scale used when a request does not specify `screenscale`
    #[arg(long, env = "TILE_SCREEN_SCALE", default_value_t = DEFAULT_SCREEN_SCALE)]
    pub screen_scale: f64,

    /// Blending of overlapping sources: additive or over
    #[arg(long, env = "TILE_BLEND", default_value = "additive")]
    pub blend: String,

    /// Largest accepted tile width or height
    #[arg(long, env = "TILE_MAX_TILE_SIZE", default_value_t = DEFAULT_MAX_TILE_SIZE)]
    pub max_tile_size: u32,

    /// Log level
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Number of tokio worker threads (default: number of CPU cores)
    #[arg(long)]
    pub worker_threads: Option<usize>,
}

/// Effective settings of a running server.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub dataset: Option<PathBuf>,
    pub workers: usize,
    pub render_threads: usize,
    pub cache_max_age: u32,
    pub screen_scale: f64,
    #[serde(serialize_with = "serialize_blend")]
    pub blend: BlendMode,
    pub max_tile_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            dataset: None,
            workers: DEFAULT_WORKERS,
            render_threads: DEFAULT_RENDER_THREADS,
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            screen_scale: DEFAULT_SCREEN_SCALE,
            blend: BlendMode::default(),
            max_tile_size: DEFAULT_MAX_TILE_SIZE,
        }
    }
}

impl ServerConfig {
    /// Validate command-line arguments into a configuration.
    pub fn from_args(args: &ServerArgs) -> Result<Self> {
        let listen: SocketAddr = args
            .listen
            .parse()
            .with_context(|| format!("invalid listen address '{}'", args.listen))?;
        let blend = args
            .blend
            .parse::<BlendMode>()
            .map_err(anyhow::Error::msg)
            .context("invalid blend mode")?;

        let config = Self {
            listen,
            dataset: args.dataset.clone(),
            workers: args.workers,
            render_threads: args.render_threads,
            cache_max_age: args.cache_max_age,
            screen_scale: args.screen_scale,
            blend,
            max_tile_size: args.max_tile_size,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("at least one renderer worker is required");
        }
        if self.render_threads == 0 {
            bail!("at least one render thread per worker is required");
        }
        if !(self.screen_scale.is_finite() && self.screen_scale > 0.0 && self.screen_scale <= 1.0) {
            bail!("default screen scale must be in (0, 1], got {}", self.screen_scale);
        }
        if self.max_tile_size == 0 {
            bail!("maximum tile size must be positive");
        }
        Ok(())
    }
}

/// Size of the tokio blocking pool for `workers` renderer workers. Renders
/// take at most one blocking thread per worker; the rest is headroom for file
/// I/O.
pub fn max_blocking_threads(workers: usize) -> usize {
    workers.max(1) * 2 + 16
}

fn serialize_blend<S: Serializer>(blend: &BlendMode, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(blend.as_str())
}
