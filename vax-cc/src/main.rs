//! vax-cc - Cause Coding Service
//!
//! Codes verbal autopsy records against the InterVA5 algorithm (via the
//! pyCrossVA transform service) and validates records for dashboard
//! readiness.

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use vax_cc::config::CodingConfig;
use vax_cc::AppState;

const BIND_ADDR: &str = "127.0.0.1:5003";

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting vax-cc (Cause Coding) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Settings are validated once here; the pipeline never runs with a
    // value outside the algorithm's documented sets.
    let config = CodingConfig::from_env();
    config
        .settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid algorithm settings: {}", e))?;
    info!("Transform service: {}", config.pycross_host);
    info!("Algorithm service: {}", config.interva_host);
    info!("Algorithm settings: {}", config.settings.snapshot());

    let db_path = vax_common::config::resolve_database_path(None);
    info!("Database: {}", db_path.display());

    let db_pool = vax_cc::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    let state = AppState::new(db_pool, config);
    let app = vax_cc::build_router(state);

    let listener = tokio::net::TcpListener::bind(BIND_ADDR).await?;
    info!("Listening on http://{}", BIND_ADDR);
    info!("Health check: http://{}/health", BIND_ADDR);

    axum::serve(listener, app).await?;

    Ok(())
}
