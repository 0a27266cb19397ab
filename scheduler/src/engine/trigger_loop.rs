// File: scheduler/src/engine/trigger_loop.rs
use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::{watch, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::orchestrator::RetryScheduler;
use super::trigger::{TriggerAdapter, TriggerPayload};
use crate::calendar::strategy_time_zone;
use crate::cron_resolver::{effective_cron, scheduler_expression};
use crate::database::{JobDefinition, ScheduleStrategy};
use crate::errors::{EngineError, EngineResult};

/// One trigger event on its way to the dispatcher.
#[derive(Debug, Clone)]
pub struct Firing {
    pub payload: Value,
    pub scheduled_fire_time: DateTime<Utc>,
}

pub struct CronTriggerLoop {
    scheduler: JobScheduler,
    firings_tx: UnboundedSender<Firing>,
    registered: RwLock<HashMap<i64, Uuid>>, // job id -> cron job uuid
}

fn trigger_error(context: &str, e: impl std::fmt::Display) -> EngineError {
    EngineError::Trigger(format!("{}: {}", context, e))
}

/// Cron ticks land on whole seconds; the tick is the scheduled time.
fn current_tick() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_nanosecond(0).unwrap_or(now)
}

impl CronTriggerLoop {
    pub async fn new(firings_tx: UnboundedSender<Firing>) -> EngineResult<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| trigger_error("Failed to create JobScheduler", e))?;

        Ok(Self {
            scheduler,
            firings_tx,
            registered: RwLock::new(HashMap::new()),
        })
    }

    /// Register a job's recurring trigger, replacing any earlier registration.
    #[instrument(skip(self, job, strategy), fields(job = job.id, strategy = strategy.id))]
    pub async fn register(
        &self,
        job: &JobDefinition,
        strategy: &ScheduleStrategy,
    ) -> EngineResult<Uuid> {
        let schedule = effective_cron(strategy)?;
        let native = scheduler_expression(&schedule)?;
        let tz = strategy_time_zone(strategy)?;
        let payload = TriggerPayload::for_job(job.id, strategy.id, job.job_type.as_str()).to_value();
        let tx = self.firings_tx.clone();
        let job_id = job.id;

        let cron_job = Job::new_async_tz(native.as_str(), tz, move |_uuid, _scheduler| {
            let tx = tx.clone();
            let firing = Firing {
                payload: payload.clone(),
                scheduled_fire_time: current_tick(),
            };

            Box::pin(async move {
                if tx.send(firing).is_err() {
                    warn!("Dispatcher stopped, dropping cron firing for job {}", job_id);
                }
            })
        })
        .map_err(|e| trigger_error(&format!("Failed to create cron job for '{}'", schedule), e))?;

        self.unregister(job.id).await?;
        let uuid = self
            .scheduler
            .add(cron_job)
            .await
            .map_err(|e| trigger_error("Failed to add cron job to scheduler", e))?;
        self.registered.write().await.insert(job.id, uuid);

        info!(
            "Registered job {} ({}) on '{}' [{}] in {}",
            job.id, job.name, schedule, strategy.schedule_type, tz
        );
        Ok(uuid)
    }

    /// Remove a job's recurring trigger. Pending one-shot retries are kept.
    pub async fn unregister(&self, job_id: i64) -> EngineResult<bool> {
        let previous = self.registered.write().await.remove(&job_id);
        match previous {
            Some(uuid) => {
                self.scheduler
                    .remove(&uuid)
                    .await
                    .map_err(|e| trigger_error("Failed to remove cron job", e))?;
                debug!("Unregistered cron trigger for job {}", job_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn registered_jobs(&self) -> Vec<i64> {
        let mut jobs: Vec<i64> = self.registered.read().await.keys().copied().collect();
        jobs.sort_unstable();
        jobs
    }

    pub async fn start(&self) -> EngineResult<()> {
        self.scheduler
            .start()
            .await
            .map_err(|e| trigger_error("Failed to start scheduler", e))?;
        info!(
            "Trigger loop started with {} cron jobs (6-field cron: sec min hour day month dow)",
            self.registered.read().await.len()
        );
        Ok(())
    }

    pub async fn shutdown(&self) -> EngineResult<()> {
        let mut scheduler = self.scheduler.clone();
        scheduler
            .shutdown()
            .await
            .map_err(|e| trigger_error("Failed to shut down scheduler", e))?;
        info!("Trigger loop stopped");
        Ok(())
    }
}

#[async_trait]
impl RetryScheduler for CronTriggerLoop {
    async fn schedule_retry(&self, payload: TriggerPayload, delay: Duration) -> EngineResult<()> {
        let tx = self.firings_tx.clone();
        let job_id = payload.job_id;
        let retry_count = payload.retry_count;
        let scheduled_fire_time = Utc::now()
            + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
        let value = payload.to_value();

        let one_shot = Job::new_one_shot_async(delay, move |_uuid, _scheduler| {
            let tx = tx.clone();
            let firing = Firing {
                payload: value.clone(),
                scheduled_fire_time,
            };

            Box::pin(async move {
                if tx.send(firing).is_err() {
                    warn!("Dispatcher stopped, dropping retry for job {}", job_id);
                }
            })
        })
        .map_err(|e| trigger_error("Failed to create retry trigger", e))?;

        self.scheduler
            .add(one_shot)
            .await
            .map_err(|e| trigger_error("Failed to add retry trigger to scheduler", e))?;

        info!(
            "Registered retry {} for job {} at {}",
            retry_count, job_id, scheduled_fire_time
        );
        Ok(())
    }
}

/// Handle to the running dispatcher.
pub struct Dispatcher {
    handle: JoinHandle<()>,
    stop_tx: watch::Sender<bool>,
}

impl Dispatcher {
    /// Stop taking new firings and wait up to `grace` for the ones already
    /// running to write their ledger rows. Returns false if the grace period
    /// ran out and the remaining firings were aborted.
    pub async fn shutdown(self, grace: Duration) -> bool {
        let _ = self.stop_tx.send(true);
        let mut handle = self.handle;

        match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!("Dispatcher task failed: {}", e);
                false
            }
            Err(_) => {
                warn!(
                    "Firings still running after {}s grace period, aborting them",
                    grace.as_secs()
                );
                handle.abort();
                false
            }
        }
    }
}

/// Run every firing on its own task. Per-job ordering is enforced inside the
/// adapter, so different jobs proceed concurrently.
pub fn spawn_dispatcher(
    mut firings_rx: UnboundedReceiver<Firing>,
    adapter: Arc<TriggerAdapter>,
) -> Dispatcher {
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                Ok(()) = stop_rx.changed() => break,
                received = firings_rx.recv() => match received {
                    Some(firing) => {
                        let adapter = adapter.clone();
                        in_flight.spawn(async move {
                            if let Err(e) = adapter
                                .fire(&firing.payload, firing.scheduled_fire_time)
                                .await
                            {
                                debug!("Trigger reported failure: {}", e);
                            }
                        });
                    }
                    None => {
                        info!("Firing channel closed");
                        break;
                    }
                },
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        error!("Firing task failed: {}", e);
                    }
                }
            }
        }

        // Firings queued behind the stop signal never started
        firings_rx.close();
        while let Ok(firing) = firings_rx.try_recv() {
            warn!(
                "Dispatcher stopping, dropping firing scheduled at {}: {}",
                firing.scheduled_fire_time, firing.payload
            );
        }

        if !in_flight.is_empty() {
            info!("Waiting for {} in-flight firings", in_flight.len());
        }
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                error!("Firing task failed: {}", e);
            }
        }
        info!("Dispatcher exiting");
    });

    Dispatcher { handle, stop_tx }
}
