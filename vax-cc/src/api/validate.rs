//! Dashboard validation endpoint

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

use crate::db;
use crate::error::ApiResult;
use crate::validators::dashboard::validate_vas_for_dashboard;
use crate::AppState;

/// Summary of one validation run
#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub records: usize,
    pub issues: usize,
}

/// POST /validate
///
/// Re-runs the dashboard checks over every record. Idempotent: each
/// record's previous dashboard issues are replaced by the new set.
pub async fn run_validation(State(state): State<AppState>) -> ApiResult<Json<ValidateResponse>> {
    let mut verbal_autopsies = db::verbal_autopsies::load_all(&state.db).await?;
    let issues = validate_vas_for_dashboard(&state.db, &mut verbal_autopsies).await?;

    Ok(Json(ValidateResponse {
        records: verbal_autopsies.len(),
        issues: issues.len(),
    }))
}

/// Build validation routes
pub fn validate_routes() -> Router<AppState> {
    Router::new().route("/validate", post(run_validation))
}
