//! HTTP request handlers.
//!
//! This module is organized into submodules:
//! - `tile`: tile rendering (`/` and `/img`)
//! - `metrics`: health checks, readiness and Prometheus metrics

pub mod metrics;
pub mod tile;

pub use metrics::{health_handler, metrics_handler, ready_handler};
pub use tile::{error_response, render_tile, tile_handler, CancelOnDrop, RenderTicket};
