//! Write operations for the `rependparc` table.

use addrgeo_core::EnrichedRecord;
use sqlx::{PgConnection, Postgres, Transaction};

pub const INSERT_ENRICHED_SQL: &str = "INSERT INTO rependparc \
         (codparc, nomeparc, endereco, latitude, longitude) \
     VALUES ($1, $2, $3, $4, $5)";

/// Insert one enriched record. Plain insert, no conflict handling.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the statement fails.
pub async fn insert_enriched(
    conn: &mut PgConnection,
    record: &EnrichedRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(INSERT_ENRICHED_SQL)
        .bind(record.id)
        .bind(record.name.as_deref())
        .bind(&record.address)
        .bind(record.latitude)
        .bind(record.longitude)
        .execute(conn)
        .await?;
    Ok(())
}

/// Insert one enriched record inside a savepoint of `tx`.
///
/// Postgres aborts the whole transaction on any failed statement. Wrapping
/// the insert in a savepoint confines a failure to this one row, so earlier
/// uncommitted inserts in `tx` survive and later ones can proceed.
///
/// # Errors
///
/// Returns the insert's [`sqlx::Error`] after rolling back to the savepoint,
/// or the savepoint error itself if one could not be created.
pub async fn insert_enriched_isolated(
    tx: &mut Transaction<'static, Postgres>,
    record: &EnrichedRecord,
) -> Result<(), sqlx::Error> {
    let mut savepoint = sqlx::Acquire::begin(&mut *tx).await?;

    match insert_enriched(&mut savepoint, record).await {
        Ok(()) => savepoint.commit().await,
        Err(err) => {
            if let Err(rollback_err) = savepoint.rollback().await {
                tracing::warn!(
                    codparc = record.id,
                    error = %rollback_err,
                    "failed to roll back insert savepoint"
                );
            }
            Err(err)
        }
    }
}
