//! vax-cc library interface
//!
//! Cause-of-death coding and dashboard validation for verbal autopsy
//! records. Exposes the pipeline, validators and API for integration
//! testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod validators;

pub use crate::error::{ApiError, ApiResult, CodingError};

use axum::Router;
use chrono::{DateTime, Utc};
use config::CodingConfig;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Endpoint hosts and validated algorithm settings
    pub config: CodingConfig,
    /// Serializes coding batches: the "records lacking a coding"
    /// selection must see a consistent snapshot, so only one batch runs
    /// at a time
    pub coding_lock: Arc<Mutex<()>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: CodingConfig) -> Self {
        Self {
            db,
            config,
            coding_lock: Arc::new(Mutex::new(())),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::coding_routes())
        .merge(api::validate_routes())
        .with_state(state)
}
