//! Error types for tile requests.

use thiserror::Error;

/// Result type alias using TileError.
pub type TileResult<T> = Result<T, TileError>;

/// Request-level error taxonomy of the tile service.
#[derive(Debug, Error)]
pub enum TileError {
    // === Request Errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Requested format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Requested tile {width}x{height} exceeds the maximum edge of {max}")]
    TileTooLarge { width: u32, height: u32, max: u32 },

    // === Rendering Errors ===
    #[error("Render cancelled before completion")]
    RenderCancelled,

    #[error("Rendering failed: {0}")]
    RenderError(String),

    #[error("Encoding failed: {0}")]
    EncodeError(String),

    // === Infrastructure Errors ===
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl TileError {
    pub fn invalid(param: impl Into<String>, message: impl Into<String>) -> Self {
        TileError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            TileError::MissingParameter(_)
            | TileError::InvalidParameter { .. }
            | TileError::UnsupportedFormat(_)
            | TileError::TileTooLarge { .. } => 400,

            TileError::ServiceUnavailable(_) => 503,

            _ => 500,
        }
    }

    /// Short label used for error metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            TileError::MissingParameter(_) => "missing_parameter",
            TileError::InvalidParameter { .. } => "invalid_parameter",
            TileError::UnsupportedFormat(_) => "unsupported_format",
            TileError::TileTooLarge { .. } => "tile_too_large",
            TileError::RenderCancelled => "cancelled",
            TileError::RenderError(_) => "render",
            TileError::EncodeError(_) => "encode",
            TileError::ServiceUnavailable(_) => "unavailable",
            TileError::InternalError(_) => "internal",
        }
    }
}

impl From<std::io::Error> for TileError {
    fn from(err: std::io::Error) -> Self {
        TileError::InternalError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(TileError::MissingParameter("width".into()).http_status_code(), 400);
        assert_eq!(TileError::invalid("x", "not a number").http_status_code(), 400);
        assert_eq!(TileError::RenderCancelled.http_status_code(), 500);
        assert_eq!(TileError::EncodeError("boom".into()).http_status_code(), 500);
        assert_eq!(TileError::ServiceUnavailable("closed".into()).http_status_code(), 503);
    }

    #[test]
    fn test_messages_name_the_parameter() {
        let err = TileError::invalid("a12", "expected a number, got 'abc'");
        assert_eq!(
            err.to_string(),
            "Invalid parameter value for 'a12': expected a number, got 'abc'"
        );
    }
}
