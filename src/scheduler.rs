use crate::terms::TermCache;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info};

/// Start the periodic sweep that evicts expired term indexes.
///
/// Reads already ignore expired indexes; the sweep only frees their memory
/// for scopes that are no longer being queried.
pub async fn start_cache_sweeper(cache: Arc<TermCache>, cron_expr: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new()
        .await
        .context("Failed to create scheduler")?;

    let job = Job::new_async(cron_expr, move |_uuid, _l| {
        let cache = Arc::clone(&cache);
        Box::pin(async move {
            let evicted = cache.purge_expired();
            debug!("Cache sweep finished, {} index(es) evicted", evicted);
        })
    })
    .with_context(|| format!("Invalid cache sweep schedule: {}", cron_expr))?;

    scheduler.add(job).await.context("Failed to add cache sweep job")?;
    scheduler.start().await.context("Failed to start scheduler")?;
    info!("✓ Cache sweeper scheduled ({})", cron_expr);

    Ok(scheduler)
}
