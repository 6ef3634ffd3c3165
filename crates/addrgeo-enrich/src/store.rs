//! Postgres-backed write handle and the pool-level entry point.

use addrgeo_core::EnrichedRecord;
use futures::TryStreamExt;
use sqlx::{PgPool, Postgres, Transaction};

use crate::error::{PipelineError, StoreError};
use crate::observer::PipelineObserver;
use crate::pipeline::EnrichmentPipeline;
use crate::ports::{Geocoder, RecordSink};
use crate::summary::RunSummary;

/// Writes enriched records into `rependparc` through one open transaction.
///
/// Each checkpoint commits the current transaction; the next insert opens a
/// fresh one. Dropping the sink rolls back anything not yet checkpointed.
pub struct PgRecordSink {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgRecordSink {
    /// Opens the first write transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sqlx`] if no connection or transaction can be
    /// acquired.
    pub async fn begin(pool: &PgPool) -> Result<Self, StoreError> {
        let tx = pool.begin().await?;
        Ok(Self {
            pool: pool.clone(),
            tx: Some(tx),
        })
    }
}

impl RecordSink for PgRecordSink {
    async fn insert(&mut self, record: &EnrichedRecord) -> Result<(), StoreError> {
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => self.pool.begin().await?,
        };
        let tx = self.tx.insert(tx);
        addrgeo_db::insert_enriched_isolated(tx, record).await?;
        Ok(())
    }

    async fn checkpoint(&mut self) -> Result<(), StoreError> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await?;
        }
        Ok(())
    }
}

/// Accepts and drops every record. Backs `--dry-run`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl RecordSink for DiscardSink {
    async fn insert(&mut self, _record: &EnrichedRecord) -> Result<(), StoreError> {
        Ok(())
    }

    async fn checkpoint(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Runs `pipeline` against the source and destination tables in `pool`.
///
/// Holds one pooled connection for the streaming source query and, unless
/// `dry_run` is set, one write transaction. Both are released when this
/// function returns, on success or failure.
///
/// # Errors
///
/// Returns [`PipelineError::Setup`] if either connection cannot be acquired,
/// otherwise whatever [`EnrichmentPipeline::run`] returns.
pub async fn run_with_pool<G, O>(
    pipeline: &EnrichmentPipeline<G, O>,
    pool: &PgPool,
    dry_run: bool,
) -> Result<RunSummary, PipelineError>
where
    G: Geocoder,
    O: PipelineObserver,
{
    let mut read_conn = pool
        .acquire()
        .await
        .map_err(|e| PipelineError::Setup(e.into()))?;

    if dry_run {
        let source = addrgeo_db::stream_source_records(&mut read_conn).map_err(StoreError::from);
        return pipeline.run(source, &mut DiscardSink).await;
    }

    let mut sink = PgRecordSink::begin(pool)
        .await
        .map_err(PipelineError::Setup)?;
    let source = addrgeo_db::stream_source_records(&mut read_conn).map_err(StoreError::from);
    pipeline.run(source, &mut sink).await
}
