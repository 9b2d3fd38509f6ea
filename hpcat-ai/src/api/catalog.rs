//! Cataloging API handlers
//!
//! POST /catalog (remote image by URL), POST /catalog/upload (multipart)
//!
//! The image reference is validated before the description log is locked;
//! the lock is then held until the session has persisted or failed.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    services::{normalize_title, CatalogOutcome},
    AppState,
};

/// Largest accepted upload
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// POST /catalog request
#[derive(Debug, Deserialize)]
pub struct CatalogUrlRequest {
    pub image_url: String,
    pub title: String,
}

/// POST /catalog
pub async fn catalog_url(
    State(state): State<AppState>,
    Json(request): Json<CatalogUrlRequest>,
) -> ApiResult<Json<CatalogOutcome>> {
    let title = normalize_title(&request.title).map_err(ApiError::from)?;
    let image_ref = state
        .images
        .validate_url(&request.image_url)
        .await
        .map_err(ApiError::from)?;

    run_session(&state, &image_ref, title).await
}

/// POST /catalog/upload
///
/// Multipart fields: `file` (JPEG or PNG) and `title`.
pub async fn catalog_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<CatalogOutcome>> {
    let mut title: Option<String> = None;
    let mut upload: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid title field: {}", e)))?;
                title = Some(text);
            }
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid file field: {}", e)))?;
                upload = Some((file_name, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let title = title.ok_or_else(|| ApiError::BadRequest("Missing 'title' field".to_string()))?;
    let title = normalize_title(&title).map_err(ApiError::from)?;
    let (file_name, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".to_string()))?;

    let image_ref = state
        .images
        .persist_upload(file_name.as_deref(), &bytes)
        .map_err(ApiError::from)?;

    run_session(&state, &image_ref, title).await
}

async fn run_session(
    state: &AppState,
    image_ref: &str,
    title: &str,
) -> ApiResult<Json<CatalogOutcome>> {
    let result = {
        let mut log = state.log.lock().await;
        state.cataloger.session(&mut log).run(image_ref, title).await
    };

    match result {
        Ok(outcome) => {
            info!(image = image_ref, title, "Catalog request completed");
            Ok(Json(outcome))
        }
        Err(e) => {
            state.record_error(e.to_string()).await;
            Err(e.into())
        }
    }
}

/// Build cataloging routes
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/catalog", post(catalog_url))
        .route("/catalog/upload", post(catalog_upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
