//! Cron-driven run loop
//!
//! Fires [`EltPipeline::run_once`] at every tick of a cron schedule, one run
//! at a time. A failed run is logged and the loop waits for the next tick.
//! Shutdown is only observed between runs; a run in progress completes.

use chrono::{DateTime, Utc};
use cron::Schedule;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::pipeline::EltPipeline;

pub struct Scheduler {
    pipeline: Arc<EltPipeline>,
    schedule: Schedule,
}

impl Scheduler {
    pub fn new(pipeline: Arc<EltPipeline>, schedule: Schedule) -> Self {
        Self { pipeline, schedule }
    }

    /// Next tick strictly after `now`, with the time left until it
    pub fn next_tick(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, Duration)> {
        let at = self.schedule.after(&now).next()?;
        let delay = (at - now).to_std().unwrap_or(Duration::ZERO);
        Some((at, delay))
    }

    /// Execute one run, returning whether it succeeded.
    pub async fn tick(&self) -> bool {
        match self.pipeline.run_once().await {
            Ok(report) => {
                if !report.staging.is_complete() || !report.transform.is_complete() {
                    warn!(run_id = %report.run_id, "Run finished with failed writes");
                }
                true
            },
            Err(e) => {
                error!(error = %e, "Scheduled run failed");
                false
            },
        }
    }

    /// Loop until `shutdown` resolves or the schedule has no further ticks.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let Some((at, delay)) = self.next_tick(Utc::now()) else {
                warn!("Schedule has no upcoming ticks, stopping");
                return;
            };
            info!(next_run = %at, "Waiting for next scheduled run");

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, scheduler stopping");
                    return;
                }
                _ = tokio::time::sleep(delay) => {
                    self.tick().await;
                }
            }
        }
    }
}
