//! Coding batch coordination
//!
//! One batch: select every record lacking a cause coding (primary-key
//! order, the fixed ordering the response parser resolves identifiers
//! against), run the two-hop coding client, parse causes and issues fully
//! in memory, then persist everything and mark the batch finished in a
//! single transaction. Any failure after batch creation marks the batch
//! failed and leaves zero Cause/Issue rows from the run visible.

use crate::config::CodingConfig;
use crate::db;
use crate::error::CodingError;
use crate::models::{CauseCodingIssue, CauseOfDeath, VerbalAutopsy, INTERVA_ALGORITHM};
use crate::services::coding_client::CodingClient;
use crate::services::response_parser;
use sqlx::SqlitePool;

/// Everything one batch produced, for caller inspection
#[derive(Debug)]
pub struct CodingOutcome {
    pub batch_id: i64,
    /// The records selected for coding, in the order they were sent
    pub verbal_autopsies: Vec<VerbalAutopsy>,
    pub causes: Vec<CauseOfDeath>,
    pub issues: Vec<CauseCodingIssue>,
}

/// Run one coding batch end to end.
///
/// Callers serialize invocations (the HTTP layer holds an async mutex):
/// the "records lacking a coding" selection must not race a concurrent
/// batch's writes.
pub async fn run_coding_algorithms(
    pool: &SqlitePool,
    config: &CodingConfig,
) -> Result<CodingOutcome, CodingError> {
    let batch = db::batches::create(pool).await?;

    let verbal_autopsies = db::verbal_autopsies::load_uncoded(pool).await?;

    tracing::info!(
        batch_id = batch.id,
        records = verbal_autopsies.len(),
        settings = %config.settings.snapshot(),
        "Starting coding batch"
    );

    match code_and_persist(pool, config, batch.id, &verbal_autopsies).await {
        Ok((causes, issues)) => {
            tracing::info!(
                batch_id = batch.id,
                causes = causes.len(),
                issues = issues.len(),
                "Coding batch finished"
            );
            Ok(CodingOutcome {
                batch_id: batch.id,
                verbal_autopsies,
                causes,
                issues,
            })
        }
        Err(err) => {
            tracing::error!(batch_id = batch.id, error = %err, "Coding batch failed");
            if let Err(mark_err) = db::batches::mark_failed(pool, batch.id).await {
                tracing::error!(batch_id = batch.id, error = %mark_err, "Failed to mark batch failed");
            }
            Err(err)
        }
    }
}

async fn code_and_persist(
    pool: &SqlitePool,
    config: &CodingConfig,
    batch_id: i64,
    verbal_autopsies: &[VerbalAutopsy],
) -> Result<(Vec<CauseOfDeath>, Vec<CauseCodingIssue>), CodingError> {
    if verbal_autopsies.is_empty() {
        let mut tx = pool.begin().await?;
        db::batches::mark_finished(&mut tx, batch_id).await?;
        tx.commit().await?;
        return Ok((Vec::new(), Vec::new()));
    }

    let client = CodingClient::new(config.clone())?;
    let response = client.run(verbal_autopsies).await?;

    // Parse everything before touching the database: a parse failure must
    // not leave a partial write.
    let snapshot = config.settings.snapshot();
    let causes =
        response_parser::parse_causes(&response, verbal_autopsies, INTERVA_ALGORITHM, &snapshot)?;
    let issues =
        response_parser::parse_issues(&response, verbal_autopsies, INTERVA_ALGORITHM, &snapshot)?;

    let mut tx = pool.begin().await?;
    db::causes::bulk_create(&mut tx, &causes, batch_id).await?;
    db::issues::bulk_create(&mut tx, &issues, Some(batch_id)).await?;
    db::batches::mark_finished(&mut tx, batch_id).await?;
    tx.commit().await?;

    Ok((causes, issues))
}
