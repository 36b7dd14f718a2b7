//! Tests for projector construction and rendered pixel content.

use std::sync::Arc;

use renderer::accumulate::AdditiveArgb;
use renderer::projector::{create_projector, Projector, BLANK_COLOR};
use renderer::transform::compose_view_transform;
use renderer::{BlendMode, OutputFormat, TileRequest, ViewerState};
use test_utils::{
    byte_converter, colors, constant_sac, pyramid_sac, ramp_volume, renderer, renderer_with,
    sphere_volume, viewer_state,
};
use tile_common::{Affine3D, Interpolation};

fn accumulator() -> Arc<dyn renderer::Accumulator> {
    Arc::new(AdditiveArgb)
}

// ============================================================================
// Projector construction
// ============================================================================

#[test]
fn test_no_visible_sources_is_constant() {
    let state = viewer_state(vec![constant_sac(0, 10.0, colors::RED)]);
    let mut hidden = state.clone();
    hidden.set_visible(0, false);
    let projector = create_projector(&hidden, &[None], &accumulator()).unwrap();
    assert!(matches!(projector, Projector::Constant(BLANK_COLOR)));
    assert_eq!(projector.num_sources(), 0);
}

#[test]
fn test_one_visible_source_is_direct() {
    let state = viewer_state(vec![
        constant_sac(0, 10.0, colors::RED),
        constant_sac(1, 20.0, colors::GREEN),
    ]);
    let mut one = state.clone();
    one.set_visible(0, false);
    let projector = create_projector(&one, &[None, Some(0)], &accumulator()).unwrap();
    assert!(matches!(projector, Projector::Single(_)));

    let mut row = vec![0u32; 4];
    projector.fill_row(0, &mut row);
    assert_eq!(row, vec![0xFF_00_14_00; 4]);
}

#[test]
fn test_many_visible_sources_accumulate() {
    let state = viewer_state(vec![
        constant_sac(0, 10.0, colors::RED),
        constant_sac(1, 20.0, colors::GREEN),
        constant_sac(2, 30.0, colors::BLUE),
    ]);
    let projector = create_projector(&state, &[Some(0); 3], &accumulator()).unwrap();
    assert_eq!(projector.num_sources(), 3);

    let mut row = vec![0u32; 3];
    projector.fill_row(5, &mut row);
    assert_eq!(row, vec![0xFF_0A_14_1E; 3]);
}

#[test]
fn test_singular_transform_rejected() {
    let mut state = viewer_state(vec![constant_sac(0, 10.0, colors::RED)]);
    state.set_viewer_transform(Affine3D::scaling(1.0, 0.0, 1.0));
    let result = create_projector(&state, &[Some(0)], &accumulator());
    assert!(matches!(result, Err(renderer::RenderError::InvalidTransform)));
}

// ============================================================================
// Rendered output
// ============================================================================

#[test]
fn test_blank_render_has_requested_size() {
    let mut worker = renderer(ViewerState::new(Vec::new(), 1));
    for (w, h) in [(1, 1), (17, 5), (256, 256)] {
        let raster = worker.paint(&TileRequest::new(Affine3D::identity(), w, h)).unwrap();
        assert_eq!(raster.dimensions(), (w, h));
        assert!(raster.pixels().iter().all(|&p| p == BLANK_COLOR));
    }
}

#[test]
fn test_single_source_matches_direct_sampling() {
    let volume = ramp_volume([8, 8, 2]);
    let cases = [
        (Affine3D::identity(), 1.0, Interpolation::NearestNeighbor),
        (Affine3D::scaling(2.0, 2.0, 1.0), 1.0, Interpolation::NLinear),
        (Affine3D::translation(-1.5, 2.0, -1.0), 0.5, Interpolation::NearestNeighbor),
        (Affine3D::scaling(4.0, 4.0, 1.0), 0.5, Interpolation::NLinear),
    ];

    for (view, screen_scale, interpolation) in cases {
        let sac = pyramid_sac(0, volume.clone(), Affine3D::identity(), 2, colors::WHITE);
        let source = Arc::clone(&sac.source);
        let mut worker = renderer(viewer_state(vec![sac]));

        let request = TileRequest::new(view, 16, 12)
            .with_screen_scale(screen_scale)
            .with_interpolation(interpolation);
        worker.paint(&request).unwrap();
        let level = worker.last_stats().levels[0].unwrap();

        let screen = compose_view_transform(&view, screen_scale);
        let to_source = screen
            .concatenate(&source.source_transform(0, level))
            .inverse()
            .unwrap();
        let sampler = source.interpolated(0, level, interpolation).unwrap();
        let converter = byte_converter(colors::WHITE);

        let raster = worker.raster();
        for y in 0..raster.height() {
            for x in 0..raster.width() {
                let p = to_source.apply([x as f64, y as f64, 0.0]);
                let expected = converter.convert(sampler.sample(p));
                assert_eq!(
                    raster.pixel(x, y),
                    expected,
                    "pixel ({x}, {y}) for {view:?} at {screen_scale} with {interpolation:?}"
                );
            }
        }
    }
}

#[test]
fn test_single_source_ignores_hidden_sources() {
    let volume = ramp_volume([8, 8, 1]);
    let alone = viewer_state(vec![pyramid_sac(0, volume.clone(), Affine3D::identity(), 1, colors::WHITE)]);
    let mut with_hidden = viewer_state(vec![
        constant_sac(1, 200.0, colors::RED),
        pyramid_sac(0, volume, Affine3D::identity(), 1, colors::WHITE),
    ]);
    with_hidden.set_visible(0, false);

    let request = TileRequest::new(Affine3D::identity(), 8, 8);
    let a = renderer(alone).paint(&request).unwrap().clone();
    let b = renderer(with_hidden).paint(&request).unwrap().clone();
    assert_eq!(a, b);
}

#[test]
fn test_additive_blend_is_order_independent() {
    let volume = sphere_volume([12, 12, 3], 180);
    let make = |order: [usize; 3]| {
        let all = [
            constant_sac(0, 40.0, colors::RED),
            pyramid_sac(1, volume.clone(), Affine3D::identity(), 2, colors::GREEN),
            pyramid_sac(2, ramp_volume([10, 10, 3]), Affine3D::translation(1.0, 1.0, 0.0), 2, colors::WHITE),
        ];
        viewer_state(order.iter().map(|&i| all[i].clone()).collect())
    };

    let request = TileRequest::new(Affine3D::translation(0.0, 0.0, -1.0), 24, 20)
        .with_screen_scale(0.5)
        .with_interpolation(Interpolation::NLinear);
    let reference = renderer(make([0, 1, 2])).paint(&request).unwrap().clone();
    for order in [[2, 1, 0], [1, 2, 0], [2, 0, 1]] {
        let raster = renderer(make(order)).paint(&request).unwrap().clone();
        assert_eq!(raster.pixels(), reference.pixels(), "order {order:?}");
    }
}

#[test]
fn test_alpha_over_is_repeatable_and_ordered() {
    let state = viewer_state(vec![
        constant_sac(0, 100.0, colors::RED),
        constant_sac(1, 200.0, colors::GREEN),
    ]);
    let mut worker = renderer_with(state, 3, BlendMode::Over);
    let request = TileRequest::new(Affine3D::identity(), 9, 7);

    let first = worker.paint(&request).unwrap().clone();
    let second = worker.paint(&request).unwrap().clone();
    assert_eq!(first, second);
    // Opaque front source hides everything behind it.
    assert!(first.pixels().iter().all(|&p| p == 0xFF_64_00_00));
}

#[test]
fn test_png_and_jpeg_tiles_share_raster() {
    let mut worker = renderer(viewer_state(vec![constant_sac(0, 90.0, colors::WHITE)]));
    let request = TileRequest::new(Affine3D::identity(), 20, 10);
    let jpeg = worker.render(&request).unwrap();
    let png = worker.render(&request.clone().with_format(OutputFormat::Png)).unwrap();
    assert_eq!(jpeg.content_type, "image/jpeg");
    assert_eq!(png.content_type, "image/png");
    assert_eq!((jpeg.width, jpeg.height), (png.width, png.height));
}
