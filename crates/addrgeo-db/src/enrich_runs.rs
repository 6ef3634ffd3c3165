//! Database operations for the `enrich_runs` ledger.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `enrich_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EnrichRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub trigger_source: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub records_read: i64,
    pub records_inserted: i64,
    pub records_skipped: i64,
    pub api_failures: i64,
    pub storage_failures: i64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Final counters recorded against a succeeded run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichRunCounts {
    pub read: i64,
    pub inserted: i64,
    pub skipped: i64,
    pub api_failures: i64,
    pub storage_failures: i64,
}

/// Creates a new run directly in `running` status with `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn start_enrich_run(
    pool: &PgPool,
    trigger_source: &str,
) -> Result<EnrichRunRow, DbError> {
    let row = sqlx::query_as::<_, EnrichRunRow>(
        "INSERT INTO enrich_runs (public_id, trigger_source, status) \
         VALUES ($1, $2, 'running') \
         RETURNING id, public_id, trigger_source, status, started_at, completed_at, \
                   records_read, records_inserted, records_skipped, \
                   api_failures, storage_failures, error_message, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `succeeded` and stores its counters.
///
/// # Errors
///
/// Returns [`DbError::InvalidEnrichRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_enrich_run(
    pool: &PgPool,
    id: i64,
    counts: EnrichRunCounts,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE enrich_runs \
         SET status = 'succeeded', completed_at = NOW(), \
             records_read = $1, records_inserted = $2, records_skipped = $3, \
             api_failures = $4, storage_failures = $5 \
         WHERE id = $6 AND status = 'running'",
    )
    .bind(counts.read)
    .bind(counts.inserted)
    .bind(counts.skipped)
    .bind(counts.api_failures)
    .bind(counts.storage_failures)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidEnrichRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a run as `failed` with an error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidEnrichRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_enrich_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE enrich_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidEnrichRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}
