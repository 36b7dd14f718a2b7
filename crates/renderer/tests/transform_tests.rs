//! Tests for view transform composition.

use renderer::transform::{
    compose_view_transform, pan_zoom_transform, raster_dimensions, screen_scale_transform,
};
use test_utils::assert_approx_eq;
use tile_common::Affine3D;

fn caller_transform() -> Affine3D {
    Affine3D::from_row_major([
        0.8, -0.6, 0.0, 12.0, //
        0.6, 0.8, 0.0, -4.0, //
        0.0, 0.0, 3.0, 7.5,
    ])
}

/// Plain 3x4 affine product `a ∘ b` (b applied first).
fn product(a: &Affine3D, b: &Affine3D) -> [f64; 12] {
    let mut out = [0.0; 12];
    for r in 0..3 {
        for c in 0..4 {
            let mut v: f64 = (0..3).map(|k| a.get(r, k) * b.get(k, c)).sum();
            if c == 3 {
                v += a.get(r, 3);
            }
            out[r * 4 + c] = v;
        }
    }
    out
}

// ============================================================================
// Composition order
// ============================================================================

#[test]
fn test_composition_equals_screen_after_caller() {
    let t = caller_transform();
    for s in [0.25, 0.5, 1.0, 2.0] {
        let composed = compose_view_transform(&t, s);
        let expected = product(&screen_scale_transform(s), &t);
        assert_eq!(composed.to_row_major(), expected, "screen scale {s}");
    }
}

#[test]
fn test_composition_differs_from_reverse_order() {
    let t = caller_transform();
    let s = screen_scale_transform(0.5);
    let composed = compose_view_transform(&t, 0.5);
    assert_ne!(composed.to_row_major(), product(&t, &s));
}

#[test]
fn test_unit_screen_scale_is_identity() {
    let t = caller_transform();
    assert_eq!(screen_scale_transform(1.0), Affine3D::identity());
    assert_eq!(compose_view_transform(&t, 1.0).to_row_major(), t.to_row_major());
}

#[test]
fn test_half_pixel_offset_centers_samples() {
    // Raster pixel 0 at scale 0.5 covers view pixels 0 and 1; its center maps
    // back to their midpoint.
    let s = screen_scale_transform(0.5);
    let back = s.inverse().unwrap().apply([0.0, 0.0, 0.0]);
    assert_eq!(back, [0.5, 0.5, 0.0]);
}

#[test]
fn test_composed_transform_round_trips() {
    let composed = compose_view_transform(&caller_transform(), 0.5);
    let inverse = composed.inverse().unwrap();
    let point = [1.5, -2.0, 8.0];
    let back = inverse.apply(composed.apply(point));
    for (got, want) in back.into_iter().zip(point) {
        assert_approx_eq!(got, want, 1e-12);
    }
}

#[test]
fn test_z_is_not_screen_scaled() {
    let composed = compose_view_transform(&caller_transform(), 0.25);
    assert_eq!(composed.get(2, 2), 3.0);
    assert_eq!(composed.get(2, 3), 7.5);
}

// ============================================================================
// Pan/zoom and raster size
// ============================================================================

#[test]
fn test_pan_zoom_layout() {
    let t = pan_zoom_transform(10.0, 20.0, 3.0, 2.0);
    assert_eq!(
        t.to_row_major(),
        [2.0, 0.0, 0.0, -10.0, 0.0, 2.0, 0.0, -20.0, 0.0, 0.0, 2.0, -6.0]
    );
    assert_eq!(t.apply([5.0, 10.0, 3.0]), [0.0, 0.0, 0.0]);
}

#[test]
fn test_raster_dimensions() {
    assert_eq!(raster_dimensions(256, 256, 1.0), (256, 256));
    assert_eq!(raster_dimensions(256, 100, 0.5), (128, 50));
    assert_eq!(raster_dimensions(3, 3, 0.5), (1, 1));
    assert_eq!(raster_dimensions(10, 10, 0.01), (1, 1));
}
