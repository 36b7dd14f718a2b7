//! Tile request query parsing.
//!
//! Two styles select the view:
//! - `a00`..`a23`: a full 3×4 row-major affine. If any of the twelve is
//!   present, all are required.
//! - `x`, `y`, `z`, `scale`: pan/zoom, each optional (0, 0, 0, 1).
//!
//! Malformed values are rejected, never coerced.

use std::collections::HashMap;
use std::str::FromStr;

use renderer::transform::pan_zoom_transform;
use renderer::{OutputFormat, TileRequest};
use tile_common::{Affine3D, Interpolation, TileError, TileResult};

use crate::config::ServerConfig;

/// Names of the affine parameters in row-major order.
pub fn affine_param_names() -> impl Iterator<Item = String> {
    (0..3).flat_map(|row| (0..4).map(move |col| format!("a{row}{col}")))
}

/// Parse a tile request from query parameters.
pub fn parse_tile_request(
    params: &HashMap<String, String>,
    config: &ServerConfig,
    num_timepoints: usize,
) -> TileResult<TileRequest> {
    let view_transform = parse_view_transform(params)?;

    let width = required_dimension(params, "width")?;
    let height = required_dimension(params, "height")?;
    if width > config.max_tile_size || height > config.max_tile_size {
        return Err(TileError::TileTooLarge {
            width,
            height,
            max: config.max_tile_size,
        });
    }

    let timepoint = optional::<usize>(params, "timepoint")?.unwrap_or(0);
    if timepoint >= num_timepoints {
        return Err(TileError::invalid(
            "timepoint",
            format!("{timepoint} is out of range (dataset has {num_timepoints} timepoints)"),
        ));
    }

    let screen_scale = optional_f64(params, "screenscale")?.unwrap_or(config.screen_scale);
    if !(screen_scale > 0.0 && screen_scale <= 1.0) {
        return Err(TileError::invalid(
            "screenscale",
            format!("{screen_scale} is not in (0, 1]"),
        ));
    }

    let interpolation = params
        .get("interpolation")
        .map(|v| Interpolation::from_query(v))
        .unwrap_or_default();

    let format = match params.get("format") {
        Some(value) => OutputFormat::from_str(value).map_err(TileError::UnsupportedFormat)?,
        None => OutputFormat::default(),
    };

    Ok(TileRequest::new(view_transform, width, height)
        .with_timepoint(timepoint)
        .with_screen_scale(screen_scale)
        .with_interpolation(interpolation)
        .with_format(format))
}

/// The caller transform, from either request style.
pub fn parse_view_transform(params: &HashMap<String, String>) -> TileResult<Affine3D> {
    let names: Vec<String> = affine_param_names().collect();
    if names.iter().any(|name| params.contains_key(name)) {
        let mut values = [0.0; 12];
        for (value, name) in values.iter_mut().zip(&names) {
            *value = optional_f64(params, name)?
                .ok_or_else(|| TileError::MissingParameter(name.clone()))?;
        }
        let transform = Affine3D::from_row_major(values);
        if transform.inverse().is_none() {
            return Err(TileError::invalid("a00..a23", "affine transform is not invertible"));
        }
        return Ok(transform);
    }

    let x = optional_f64(params, "x")?.unwrap_or(0.0);
    let y = optional_f64(params, "y")?.unwrap_or(0.0);
    let z = optional_f64(params, "z")?.unwrap_or(0.0);
    let scale = optional_f64(params, "scale")?.unwrap_or(1.0);
    if scale == 0.0 {
        return Err(TileError::invalid("scale", "must not be zero"));
    }
    Ok(pan_zoom_transform(x, y, z, scale))
}

fn required_dimension(params: &HashMap<String, String>, name: &str) -> TileResult<u32> {
    let value = optional::<u32>(params, name)?
        .ok_or_else(|| TileError::MissingParameter(name.to_string()))?;
    if value == 0 {
        return Err(TileError::invalid(name, "must be at least 1"));
    }
    Ok(value)
}

fn optional<T: FromStr>(params: &HashMap<String, String>, name: &str) -> TileResult<Option<T>> {
    params
        .get(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| TileError::invalid(name, format!("expected an integer, got '{raw}'")))
        })
        .transpose()
}

fn optional_f64(params: &HashMap<String, String>, name: &str) -> TileResult<Option<f64>> {
    match params.get(name) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(TileError::invalid(name, format!("expected a finite number, got '{raw}'"))),
        },
    }
}
