//! Coding batch trigger endpoint

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

use crate::error::ApiResult;
use crate::services::coding_pipeline;
use crate::AppState;

/// Summary of one coding run
#[derive(Debug, Serialize)]
pub struct CodingRunResponse {
    pub batch_id: i64,
    /// Records selected for this batch (those lacking a coding)
    pub records: usize,
    pub causes: usize,
    pub issues: usize,
}

/// POST /coding/run
///
/// Runs one coding batch over every record lacking a cause. Batches are
/// serialized behind the app-state mutex so two runs can never select
/// overlapping record sets. Hop failures surface as 502 with the batch
/// left in the failed state and no rows written.
pub async fn run_coding(State(state): State<AppState>) -> ApiResult<Json<CodingRunResponse>> {
    let _guard = state.coding_lock.lock().await;

    let outcome = coding_pipeline::run_coding_algorithms(&state.db, &state.config).await?;

    Ok(Json(CodingRunResponse {
        batch_id: outcome.batch_id,
        records: outcome.verbal_autopsies.len(),
        causes: outcome.causes.len(),
        issues: outcome.issues.len(),
    }))
}

/// Build coding routes
pub fn coding_routes() -> Router<AppState> {
    Router::new().route("/coding/run", post(run_coding))
}
