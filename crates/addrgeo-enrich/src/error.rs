use thiserror::Error;

/// A failure in the destination store or the source cursor.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Errors that abort an enrichment pass.
///
/// Per-record geocoding and insert failures never show up here; they are
/// counted in the [`crate::RunSummary`] instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The read cursor, write transaction or connection could not be acquired.
    #[error("enrichment setup failed: {0}")]
    Setup(#[source] StoreError),

    /// The source cursor failed part-way through.
    #[error("failed to read source records: {0}")]
    Source(#[source] StoreError),

    /// A checkpoint commit failed; writes since the previous checkpoint are lost.
    #[error("checkpoint commit failed after {inserted} inserts: {source}")]
    Checkpoint {
        inserted: u64,
        #[source]
        source: StoreError,
    },
}
