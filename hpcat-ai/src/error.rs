//! Error types for hpcat-ai
//!
//! Propagation policy:
//! - validation and generation errors abort a session before any mutation
//! - keyword parse failures never surface here (they degrade in
//!   `KeywordOutcome`)
//! - persistence errors are reported, but the record stays in memory

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::LogRecord;
use crate::services::generation_client::GenerationError;

/// Cataloging pipeline error
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Metadata file, log schema or credentials could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Blank title, or image reference unreachable or not an image
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Generation service call failed; no record was written
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// Log rewrite failed; `record` was appended in memory and is not rolled back
    #[error("Failed to persist description log: {source}")]
    Persistence {
        record: Box<LogRecord>,
        #[source]
        source: hpcat_common::Error,
    },
}

impl CatalogError {
    /// Wrap a common error raised while loading startup data
    pub fn config(err: hpcat_common::Error) -> Self {
        CatalogError::Config(err.to_string())
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Cataloging pipeline error
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Catalog(ref err) => match err {
                CatalogError::Validation(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string())
                }
                CatalogError::Generation(_) => {
                    (StatusCode::BAD_GATEWAY, "GENERATION_ERROR", err.to_string())
                }
                CatalogError::Persistence { .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_ERROR",
                    err.to_string(),
                ),
                CatalogError::Config(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIG_ERROR",
                    err.to_string(),
                ),
            },
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_400() {
        let response =
            ApiError::from(CatalogError::Validation("not an image".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_generation_maps_to_502() {
        let err = CatalogError::Generation(GenerationError::RequestFailed("timeout".into()));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_config_wraps_common_error() {
        let err = CatalogError::config(hpcat_common::Error::Config("no files key".into()));
        assert!(err.to_string().contains("no files key"));
    }
}
