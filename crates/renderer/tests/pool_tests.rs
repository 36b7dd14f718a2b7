//! Tests for the worker pool under concurrent load.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use renderer::{
    ArgbRaster, BlendMode, EncodeError, OutputFormat, PoolError, RenderError, TileEncoder,
    TileRenderer, TileRequest, WorkerPool,
};
use test_utils::{colors, constant_sac, pyramid_sac, sac, sphere_volume, viewer_state, GatedSource};
use tile_common::Affine3D;

fn pool(size: usize) -> WorkerPool {
    let state = viewer_state(vec![
        pyramid_sac(0, sphere_volume([32, 32, 4], 200), Affine3D::identity(), 3, colors::GREEN),
        constant_sac(1, 30.0, colors::RED),
    ]);
    WorkerPool::build(size, |id| TileRenderer::new(id, state.clone(), 2, BlendMode::Additive))
        .unwrap()
}

struct FailingEncoder;

impl TileEncoder for FailingEncoder {
    fn content_type(&self) -> &'static str {
        "image/jpeg"
    }

    fn encode(&mut self, _raster: &ArgbRaster) -> Result<Vec<u8>, EncodeError> {
        Err(EncodeError::Jpeg("broken".to_string()))
    }
}

// ============================================================================
// Backpressure
// ============================================================================

#[test]
fn test_concurrency_never_exceeds_pool_size() {
    let pool = pool(4);
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));
    let start = Arc::new(Barrier::new(100));

    let handles: Vec<_> = (0..100)
        .map(|i| {
            let pool = pool.clone();
            let in_flight = Arc::clone(&in_flight);
            let max_seen = Arc::clone(&max_seen);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                let mut worker = pool.acquire()?;
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);

                let request = TileRequest::new(Affine3D::translation(-(i as f64 % 8.0), 0.0, -1.0), 48, 32)
                    .with_screen_scale(0.5);
                let result = worker.render(&request).map(|tile| tile.bytes.len());

                in_flight.fetch_sub(1, Ordering::SeqCst);
                pool.release(worker);
                Ok::<_, PoolError>(result)
            })
        })
        .collect();

    for handle in handles {
        let rendered = handle.join().unwrap().unwrap();
        assert!(rendered.unwrap() > 0);
    }

    assert!(max_seen.load(Ordering::SeqCst) <= 4);
    assert!(pool.peak_busy() <= 4);
    assert_eq!(pool.busy(), 0);
}

#[test]
fn test_worker_never_handed_out_twice() {
    let pool = pool(3);
    let held: Vec<_> = (0..3).map(|_| pool.acquire().unwrap()).collect();
    let mut ids: Vec<_> = held.iter().map(|w| w.id()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1, 2]);
    assert!(pool.acquire_timeout(Duration::from_millis(10)).unwrap().is_none());
}

// ============================================================================
// Release on failure
// ============================================================================

#[test]
fn test_encode_failure_returns_worker() {
    let state = viewer_state(vec![constant_sac(0, 30.0, colors::WHITE)]);
    let worker = TileRenderer::new(0, state, 1, BlendMode::Additive)
        .unwrap()
        .with_encoder(OutputFormat::Jpeg, Box::new(FailingEncoder));
    let pool = WorkerPool::new(vec![worker]);
    let request = TileRequest::new(Affine3D::identity(), 8, 8);

    {
        let mut worker = pool.acquire().unwrap();
        assert!(matches!(worker.render(&request), Err(RenderError::Encode(_))));
    }
    assert_eq!(pool.busy(), 0);

    let mut worker = pool
        .acquire_timeout(Duration::from_secs(1))
        .unwrap()
        .expect("worker was returned");
    let tile = worker.render(&request.with_format(OutputFormat::Png)).unwrap();
    assert_eq!(tile.content_type, "image/png");
}

// ============================================================================
// Cancel handles across loans
// ============================================================================

fn gated_pool() -> (WorkerPool, Arc<test_utils::Gate>) {
    let gated = GatedSource::new();
    let gate = gated.gate();
    let state = viewer_state(vec![sac(0, Arc::new(gated), colors::WHITE)]);
    let worker = TileRenderer::new(0, state, 2, BlendMode::Additive).unwrap();
    (WorkerPool::new(vec![worker]), gate)
}

#[test]
fn test_handle_from_unused_loan_spares_next_borrower() {
    let (pool, gate) = gated_pool();

    // First borrower takes a handle and gives the worker back without rendering.
    let stale = {
        let worker = pool.acquire().unwrap();
        worker.cancel_handle()
    };

    let p = pool.clone();
    let render = thread::spawn(move || {
        let mut worker = p.acquire().unwrap();
        worker
            .render(&TileRequest::new(Affine3D::identity(), 8, 16))
            .map(|tile| tile.width)
    });

    gate.wait_entered(Duration::from_secs(10));
    assert!(!stale.cancel());
    gate.open();

    assert_eq!(render.join().unwrap().unwrap(), 8);
    assert_eq!(pool.busy(), 0);
}

#[test]
fn test_handle_from_finished_loan_spares_next_borrower() {
    let (pool, gate) = gated_pool();
    let request = TileRequest::new(Affine3D::identity(), 4, 4);

    gate.open();
    let stale = {
        let mut worker = pool.acquire().unwrap();
        let handle = worker.cancel_handle();
        worker.render(&request).unwrap();
        handle
    };

    let mut worker = pool.acquire().unwrap();
    assert!(!stale.cancel());
    assert!(worker.render(&request).is_ok());
}

#[test]
fn test_handle_cancels_its_own_loan() {
    let (pool, gate) = gated_pool();

    let mut worker = pool.acquire().unwrap();
    let handle = worker.cancel_handle();
    let render = thread::spawn(move || {
        let result = worker.render(&TileRequest::new(Affine3D::identity(), 8, 16));
        drop(worker);
        result.map(|tile| tile.width)
    });

    gate.wait_entered(Duration::from_secs(10));
    assert!(handle.cancel());
    gate.open();

    assert!(matches!(
        render.join().unwrap(),
        Err(RenderError::Cancelled { generation: 1 })
    ));
    assert_eq!(pool.busy(), 0);
}

// ============================================================================
// Shutdown
// ============================================================================

#[test]
fn test_close_wakes_all_waiters() {
    let pool = pool(1);
    let held = pool.acquire().unwrap();

    let waiters: Vec<_> = (0..5)
        .map(|_| {
            let pool = pool.clone();
            thread::spawn(move || pool.acquire().map(|w| w.id()))
        })
        .collect();
    thread::sleep(Duration::from_millis(50));
    pool.close();

    for waiter in waiters {
        assert_eq!(waiter.join().unwrap(), Err(PoolError::Closed));
    }
    drop(held);
    assert!(matches!(pool.acquire(), Err(PoolError::Closed)));
}
