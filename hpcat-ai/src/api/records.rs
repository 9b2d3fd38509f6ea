//! Description log listing
//!
//! GET /records

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::{models::LogRecord, AppState};

/// GET /records response
#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    pub count: usize,
    pub records: Vec<LogRecord>,
}

/// GET /records
///
/// Returns the in-memory log, including records whose persist failed.
pub async fn list_records(State(state): State<AppState>) -> Json<RecordsResponse> {
    let log = state.log.lock().await;
    Json(RecordsResponse {
        count: log.len(),
        records: log.records().to_vec(),
    })
}

/// Build records routes
pub fn records_routes() -> Router<AppState> {
    Router::new().route("/records", get(list_records))
}
