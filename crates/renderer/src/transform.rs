//! Composition of caller view transforms with the screen-scale transform.
//!
//! A tile is rendered into a raster that is `screen_scale` times the
//! requested tile size. The screen-scale transform maps view coordinates to
//! raster pixel coordinates; its half-pixel offset keeps downscaled samples on
//! pixel centers.

use tile_common::Affine3D;

/// Screen-scale transform: diagonal `(s, s, 1)` with translation
/// `(0.5·s − 0.5, 0.5·s − 0.5, 0)`.
pub fn screen_scale_transform(screen_scale: f64) -> Affine3D {
    let offset = 0.5 * screen_scale - 0.5;
    Affine3D::from_row_major([
        screen_scale, 0.0, 0.0, offset, //
        0.0, screen_scale, 0.0, offset, //
        0.0, 0.0, 1.0, 0.0,
    ])
}

/// Effective world-to-raster transform: the caller transform is applied
/// first, then the screen scale (`S ∘ T`).
///
/// The order matters: `T ∘ S` would also scale the caller's z translation
/// and change how anisotropic z scaling behaves.
pub fn compose_view_transform(view: &Affine3D, screen_scale: f64) -> Affine3D {
    view.pre_concatenate(&screen_scale_transform(screen_scale))
}

/// Caller transform for the pan/zoom request style:
///
/// ```text
/// [ scale 0     0     -x       ]
/// [ 0     scale 0     -y       ]
/// [ 0     0     scale -z*scale ]
/// ```
pub fn pan_zoom_transform(x: f64, y: f64, z: f64, scale: f64) -> Affine3D {
    Affine3D::from_row_major([
        scale, 0.0, 0.0, -x, //
        0.0, scale, 0.0, -y, //
        0.0, 0.0, scale, -z * scale,
    ])
}

/// Dimensions of the raster rendered for a `width`×`height` tile at the given
/// screen scale. Never smaller than 1×1.
pub fn raster_dimensions(width: u32, height: u32, screen_scale: f64) -> (u32, u32) {
    let scaled = |v: u32| ((screen_scale * v as f64).floor() as u32).max(1);
    (scaled(width), scaled(height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_scale_half() {
        let s = screen_scale_transform(0.5);
        assert_eq!(
            s.to_row_major(),
            [0.5, 0.0, 0.0, -0.25, 0.0, 0.5, 0.0, -0.25, 0.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn test_unit_scale_is_identity() {
        assert_eq!(screen_scale_transform(1.0), Affine3D::identity());
    }

    #[test]
    fn test_pixel_centers_are_preserved() {
        // The center of a 2x2 block of view pixels lands on the center of the
        // single raster pixel that covers it.
        let s = screen_scale_transform(0.5);
        let p = s.apply([0.5, 0.5, 0.0]);
        assert_eq!(p, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_raster_dimensions() {
        assert_eq!(raster_dimensions(256, 256, 1.0), (256, 256));
        assert_eq!(raster_dimensions(256, 200, 0.5), (128, 100));
        assert_eq!(raster_dimensions(3, 3, 0.25), (1, 1));
        assert_eq!(raster_dimensions(1, 1, 0.01), (1, 1));
    }

    #[test]
    fn test_pan_zoom() {
        let t = pan_zoom_transform(10.0, 20.0, 3.0, 2.0);
        assert_eq!(t.apply([10.0, 20.0, 3.0]), [10.0, 20.0, 0.0]);
    }
}
