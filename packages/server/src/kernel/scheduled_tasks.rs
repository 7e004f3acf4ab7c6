//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! One periodic task: the supporter reconciliation pass.
//!
//! ```text
//! startup ──► run_pass()            (t = 0)
//! Scheduler (every sync interval)
//!     └─► run_pass()
//!             ├─► Sweep A: strip the role from members no longer entitled
//!             └─► Sweep B: grant the role to entitled members missing it
//! ```
//!
//! The cadence is measured from process start and no last-run marker is
//! persisted, so a restart resets it and missed runs are never caught up.

use anyhow::Result;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::domains::supporters::reconciler::run_pass;
use crate::kernel::ServerDeps;

/// Start all scheduled tasks
pub async fn start_scheduler(deps: ServerDeps, interval: Duration) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    // Initial pass right away; the repeated job takes over afterwards
    let initial_deps = deps.clone();
    tokio::spawn(async move {
        run_supporter_sync(&initial_deps).await;
    });

    let sync_deps = deps.clone();
    let sync_job = Job::new_repeated_async(interval, move |_uuid, _lock| {
        let deps = sync_deps.clone();
        Box::pin(async move {
            run_supporter_sync(&deps).await;
        })
    })?;

    scheduler.add(sync_job).await?;
    scheduler.start().await?;

    tracing::info!(
        "Scheduled tasks started (supporter sync every {} hours)",
        interval.as_secs() / 3600
    );
    Ok(scheduler)
}

/// Run one reconciliation pass and log its summary
async fn run_supporter_sync(deps: &ServerDeps) {
    tracing::info!("Running supporter sync task");

    let report = run_pass(deps).await;

    tracing::info!(
        added = report.added.len(),
        removed = report.removed.len(),
        unchanged = report.unchanged,
        skipped = report.skipped(),
        failed = report.failed,
        "Supporter sync complete"
    );
}
