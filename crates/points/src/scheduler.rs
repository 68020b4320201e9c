use time::OffsetDateTime;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::Command;

/// Registers the periodic expiry sweep. The caller starts the scheduler.
pub async fn scheduler(command: &Command) -> Result<JobScheduler, JobSchedulerError> {
    let sched = JobScheduler::new().await?;
    let command = command.clone();
    let schedule = command.config.sweep_cron.to_owned();

    sched
        .add(Job::new_async(schedule.as_str(), move |uuid, mut l| {
            let command = command.clone();

            Box::pin(async move {
                match command.sweep_expired(OffsetDateTime::now_utc()).await {
                    Ok(report) if !report.failures.is_empty() => {
                        tracing::warn!(
                            failures = report.failures.len(),
                            "expiry sweep finished with failures"
                        );
                    }
                    Ok(_) => {}
                    Err(err) => tracing::error!(err = %err, "failed to run expiry sweep"),
                }

                if let Err(err) = l.next_tick_for_job(uuid).await {
                    tracing::error!(err = %err, "failed to get next tick for expiry sweep");
                }
            })
        })?)
        .await?;

    Ok(sched)
}
