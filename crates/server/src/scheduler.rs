//! Timers driving the engine.
//!
//! Interval jobs may overlap up to a fixed number of instances; a tick that finds
//! every instance busy is skipped rather than queued. Cron jobs run one at a time.

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Run `job` every `period`, with at most `max_instances` runs in flight.
///
/// The first run starts immediately.
pub fn spawn_interval_job<F, Fut>(
    name: &'static str,
    period: Duration,
    max_instances: usize,
    job: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let permits = Arc::new(Semaphore::new(max_instances));
    let job = Arc::new(job);

    tokio::spawn(async move {
        tracing::info!(
            job = name,
            period_ms = period.as_millis() as u64,
            max_instances,
            "interval job started"
        );
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let Ok(permit) = Arc::clone(&permits).try_acquire_owned() else {
                tracing::debug!(job = name, max_instances, "all instances busy, skipping tick");
                continue;
            };
            let job = Arc::clone(&job);
            tokio::spawn(async move {
                // Held until the run finishes, including on panic
                let _permit = permit;
                job().await;
            });
        }
    })
}

/// Run `job` at every fire time of `schedule`, evaluated in UTC.
///
/// Runs are sequential; fire times that pass while a run is in progress are skipped.
pub fn spawn_cron_job<F, Fut>(name: &'static str, schedule: cron::Schedule, job: F) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut after = Utc::now();
        loop {
            let Some(next) = schedule.after(&after).next() else {
                tracing::warn!(job = name, "schedule has no upcoming fire time, stopping");
                break;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            tracing::debug!(job = name, next = %next, wait_secs = wait.as_secs(), "waiting for next run");

            tokio::time::sleep(wait).await;
            job().await;

            after = std::cmp::max(next, Utc::now());
        }
    })
}
