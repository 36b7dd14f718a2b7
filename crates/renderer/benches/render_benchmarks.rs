//! Benchmarks for the renderer crate - raster fill, blending and encoding.
//!
//! Run with: cargo bench --package renderer -- fill
//! Or: cargo bench --package renderer --bench render_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use renderer::jpeg::JpegEncoder;
use renderer::png::PngEncoder;
use renderer::{ArgbRaster, BlendMode, OutputFormat, TileEncoder, TileRequest, ViewerState};
use test_utils::{colors, noise_volume, pyramid_sac, renderer_with, sphere_volume};
use tile_common::{Affine3D, Interpolation};

/// Three overlapping views of a 128³ acquisition.
fn three_view_state() -> ViewerState {
    let views = [
        (Affine3D::identity(), colors::RED),
        (Affine3D::translation(8.0, -4.0, 2.0), colors::GREEN),
        (Affine3D::translation(-6.0, 5.0, -3.0), colors::BLUE),
    ];
    let sources = views
        .into_iter()
        .enumerate()
        .map(|(id, (registration, color))| {
            pyramid_sac(id, sphere_volume([128, 128, 128], 220), registration, 4, color)
        })
        .collect();
    ViewerState::new(sources, 1)
}

fn tile_request(size: u32) -> TileRequest {
    TileRequest::new(Affine3D::translation(0.0, 0.0, -64.0), size, size)
}

fn noise_raster(size: u32) -> ArgbRaster {
    let volume = noise_volume([size as usize, size as usize, 1], 0xFFFF, 42);
    let mut raster = ArgbRaster::new(size, size);
    for (i, p) in raster.pixels_mut().iter_mut().enumerate() {
        let s = size as usize;
        let v = volume.get(i % s, i / s, 0) as u32;
        *p = 0xFF00_0000 | (v << 8) | (v >> 8);
    }
    raster
}

// =============================================================================
// RASTER FILL BENCHMARKS
// =============================================================================

fn bench_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill");

    for size in [256u32, 512] {
        for (name, interpolation) in [
            ("nearest", Interpolation::NearestNeighbor),
            ("nlinear", Interpolation::NLinear),
        ] {
            let mut worker = renderer_with(three_view_state(), 4, BlendMode::Additive);
            let request = tile_request(size).with_interpolation(interpolation);

            group.throughput(Throughput::Elements((size * size) as u64));
            group.bench_with_input(BenchmarkId::new(name, size), &request, |b, request| {
                b.iter(|| {
                    worker.paint(black_box(request)).map(|r| r.width()).unwrap_or(0)
                });
            });
        }
    }

    group.finish();
}

// =============================================================================
// FILL THREAD SCALING BENCHMARKS
// =============================================================================

fn bench_fill_threads(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_threads");
    let request = tile_request(512).with_screen_scale(0.5);

    for threads in [1usize, 2, 4, 8] {
        let mut worker = renderer_with(three_view_state(), threads, BlendMode::Over);
        group.bench_with_input(BenchmarkId::from_parameter(threads), &request, |b, request| {
            b.iter(|| worker.paint(black_box(request)).is_ok());
        });
    }

    group.finish();
}

// =============================================================================
// ENCODING BENCHMARKS
// =============================================================================

fn bench_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding");

    for size in [256u32, 512, 1024] {
        let raster = noise_raster(size);
        group.throughput(Throughput::Bytes((size * size * 4) as u64));

        let mut png = PngEncoder::new();
        group.bench_with_input(BenchmarkId::new("png_stored", size), &raster, |b, raster| {
            b.iter(|| png.encode(black_box(raster)).map(|bytes| bytes.len()));
        });

        let mut jpeg = JpegEncoder::new();
        group.bench_with_input(BenchmarkId::new("jpeg_q100", size), &raster, |b, raster| {
            b.iter(|| jpeg.encode(black_box(raster)).map(|bytes| bytes.len()));
        });
    }

    group.finish();
}

// =============================================================================
// END-TO-END BENCHMARKS
// =============================================================================

fn bench_render_tile(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_tile");
    let mut worker = renderer_with(three_view_state(), 4, BlendMode::Additive);

    for format in [OutputFormat::Jpeg, OutputFormat::Png] {
        let request = tile_request(256).with_format(format);
        group.bench_with_input(BenchmarkId::from_parameter(format.as_str()), &request, |b, request| {
            b.iter(|| worker.render(black_box(request)).map(|tile| tile.bytes.len()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_fill,
    bench_fill_threads,
    bench_encoding,
    bench_render_tile,
);
criterion_main!(benches);
