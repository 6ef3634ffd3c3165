//! `addrgeo enrich` handler.
//!
//! Records the pass in `enrich_runs`, runs the pipeline against the pool, and
//! prints the summary line. Only setup and checkpoint failures reach the
//! caller; per-record failures are already folded into the summary.

use std::time::Duration;

use addrgeo_enrich::{run_with_pool, EnrichmentPipeline, PipelineConfig, RunSummary};
use addrgeo_geocode::GeocodeClient;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct EnrichArgs {
    pub batch_size: Option<usize>,
    pub delay_ms: Option<u64>,
    pub dry_run: bool,
}

/// Resolve the pipeline settings: CLI flags win over the environment.
pub(crate) fn pipeline_config(
    config: &addrgeo_core::AppConfig,
    args: &EnrichArgs,
) -> PipelineConfig {
    let mut pipeline_config = PipelineConfig::from_app_config(config);
    if let Some(batch_size) = args.batch_size {
        pipeline_config.batch_size = batch_size.max(1);
    }
    if let Some(delay_ms) = args.delay_ms {
        pipeline_config.request_delay = Duration::from_millis(delay_ms);
    }
    pipeline_config
}

/// Run one enrichment pass and print its summary.
///
/// With `dry_run` the source is read and geocoded but nothing is written,
/// including the `enrich_runs` ledger row.
///
/// # Errors
///
/// Returns an error if the API key is missing, the geocoding client cannot be
/// built, the run row
/// cannot be created, or the pipeline aborts on a setup, source or
/// checkpoint failure.
pub(crate) async fn run_enrich(
    pool: &sqlx::PgPool,
    config: &addrgeo_core::AppConfig,
    args: &EnrichArgs,
) -> anyhow::Result<()> {
    let api_key = config.require_geocode_api_key()?;
    let client = GeocodeClient::from_app_config(config, api_key)
        .map_err(|e| anyhow::anyhow!("failed to build geocoding client: {e}"))?;
    let pipeline = EnrichmentPipeline::new(client, pipeline_config(config, args));

    if args.dry_run {
        let summary = run_with_pool(&pipeline, pool, true).await?;
        println!("dry-run {summary}");
        return Ok(());
    }

    let run = addrgeo_db::start_enrich_run(pool, "cli").await?;

    match run_with_pool(&pipeline, pool, false).await {
        Ok(summary) => {
            if let Err(e) = addrgeo_db::complete_enrich_run(pool, run.id, run_counts(&summary)).await
            {
                tracing::warn!(run_id = run.id, error = %e, "failed to record run completion");
            }
            println!("{summary}");
            Ok(())
        }
        Err(err) => {
            fail_run_best_effort(pool, run.id, &err.to_string()).await;
            Err(err.into())
        }
    }
}

pub(crate) fn run_counts(summary: &RunSummary) -> addrgeo_db::EnrichRunCounts {
    let to_i64 = |v: u64| i64::try_from(v).unwrap_or(i64::MAX);
    addrgeo_db::EnrichRunCounts {
        read: to_i64(summary.read()),
        inserted: to_i64(summary.inserted()),
        skipped: to_i64(summary.skipped()),
        api_failures: to_i64(summary.api_failures()),
        storage_failures: to_i64(summary.storage_failures()),
    }
}

/// Mark the run failed, logging rather than propagating any error doing so.
async fn fail_run_best_effort(pool: &sqlx::PgPool, run_id: i64, message: &str) {
    if let Err(e) = addrgeo_db::fail_enrich_run(pool, run_id, message).await {
        tracing::error!(run_id, error = %e, "failed to mark enrich run as failed");
    }
}
