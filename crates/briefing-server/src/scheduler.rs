//! Background refresh trigger.
//!
//! Runs the same refresh pass as `/api/v1/refresh` on a cron schedule so the
//! aggregate stays warm without an external caller.

use std::sync::Arc;

use briefing_aggregator::{Orchestrator, RefreshOutcome};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process; dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    orchestrator: Arc<Orchestrator>,
    cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_refresh_job(&scheduler, orchestrator, cron).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the periodic unforced refresh (`BRIEFING_REFRESH_CRON`, default
/// every 30 minutes). Overlapping ticks queue on the orchestrator's guard.
async fn register_refresh_job(
    scheduler: &JobScheduler,
    orchestrator: Arc<Orchestrator>,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let orchestrator = Arc::clone(&orchestrator);

        Box::pin(async move {
            tracing::info!("scheduler: starting scheduled refresh");
            let report = orchestrator.refresh(false).await;
            if report.outcome == RefreshOutcome::Failed {
                tracing::error!("scheduler: scheduled refresh failed");
            } else {
                tracing::info!(
                    outcome = ?report.outcome,
                    articles = report.articles_processed,
                    sources = report.sources_fetched,
                    "scheduler: scheduled refresh complete"
                );
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: registered refresh job");
    Ok(())
}
