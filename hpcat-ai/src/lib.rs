//! hpcat-ai library interface
//!
//! Archival descriptions and index keywords for historical photographs.
//! Exposes the cataloging pipeline and the HTTP router for the binary and
//! for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult, CatalogError};

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tower_http::trace::TraceLayer;

use crate::services::{Cataloger, DescriptionLog, ImageSource};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Metadata, prompts and generation client
    pub cataloger: Arc<Cataloger>,
    /// Description log; the lock is held for a whole cataloging session
    pub log: Arc<Mutex<DescriptionLog>>,
    /// URL validation and upload storage
    pub images: ImageSource,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(cataloger: Cataloger, log: DescriptionLog, images: ImageSource) -> Self {
        Self {
            cataloger: Arc::new(cataloger),
            log: Arc::new(Mutex::new(log)),
            images,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember `message` for `/health`
    pub async fn record_error(&self, message: String) {
        *self.last_error.write().await = Some(message);
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::catalog_routes())
        .merge(api::records_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
