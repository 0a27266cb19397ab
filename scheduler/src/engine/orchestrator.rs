//! Execution orchestrator
//!
//! One call to [`Orchestrator::execute`] handles one firing end to end:
//!
//! ```text
//! RECEIVED ─┬─ disabled / excluded date ──────────────→ SKIPPED
//!           └─ DISPATCHED ─┬─ ok ─────────────────────→ SUCCESS
//!                          ├─ config error ───────────→ FAILED (raised)
//!                          ├─ attempts left ──────────→ RETRIED (+ one-shot trigger)
//!                          └─ attempts exhausted ─────→ FAILED (raised)
//! ```
//!
//! Every path appends exactly one ledger row. The handler's external effect
//! is not undone if that append fails afterwards.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

use super::context::FiringContext;
use super::trigger::TriggerPayload;
use crate::calendar::local_fire_date;
use crate::constants::defaults;
use crate::database::{ExecutionLogEntry, ExecutionStatus, JobDefinition};
use crate::errors::{ConfigError, EngineError, EngineResult};
use crate::handlers::HandlerRegistry;
use crate::store::{DefinitionStore, ExclusionCalendar, ExecutionLedger};

/// Registers delayed one-shot firings with the trigger loop.
#[async_trait]
pub trait RetryScheduler: Send + Sync {
    async fn schedule_retry(&self, payload: TriggerPayload, delay: Duration) -> EngineResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per firing lineage, the first one included.
    pub max_attempts: u32,
    pub retry_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::MAX_ATTEMPTS,
            retry_interval: Duration::from_secs(defaults::RETRY_INTERVAL_SECONDS),
        }
    }
}

impl RetryPolicy {
    pub fn should_retry(&self, retry_count: u32) -> bool {
        retry_count.saturating_add(1) < self.max_attempts
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    JobDisabled,
    ExcludedDate(NaiveDate),
}

impl SkipReason {
    fn describe(&self) -> String {
        match self {
            SkipReason::JobDisabled => "job is disabled".to_string(),
            SkipReason::ExcludedDate(date) => format!("{} is an excluded date", date),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FiringOutcome {
    Skipped(SkipReason),
    Succeeded { duration_ms: i64 },
    RetryScheduled { next_retry_count: u32, delay: Duration },
}

/// Timing of a dispatched attempt, carried into its ledger row.
struct Attempt {
    actual_fire_time: DateTime<Utc>,
    finished_time: DateTime<Utc>,
    duration_ms: i64,
}

pub struct Orchestrator {
    definitions: Arc<dyn DefinitionStore>,
    calendar: Arc<dyn ExclusionCalendar>,
    ledger: Arc<dyn ExecutionLedger>,
    handlers: Arc<HandlerRegistry>,
    retries: Arc<dyn RetryScheduler>,
    policy: RetryPolicy,
}

impl Orchestrator {
    pub fn new(
        definitions: Arc<dyn DefinitionStore>,
        calendar: Arc<dyn ExclusionCalendar>,
        ledger: Arc<dyn ExecutionLedger>,
        handlers: Arc<HandlerRegistry>,
        retries: Arc<dyn RetryScheduler>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            definitions,
            calendar,
            ledger,
            handlers,
            retries,
            policy,
        }
    }

    #[instrument(skip(self, ctx), fields(job = ctx.job_id, retry = ctx.retry_count, firing = %ctx.firing_id))]
    pub async fn execute(&self, ctx: &FiringContext) -> EngineResult<FiringOutcome> {
        let job = match self.definitions.load_job(ctx.job_id).await? {
            Some(job) => job,
            None => {
                let err = ConfigError::JobNotFound(ctx.job_id);
                return self.fail(ctx, ctx.strategy_id, None, err.into()).await;
            }
        };
        let strategy_id = ctx.strategy_id.unwrap_or(job.schedule_strategy_id);

        if !job.enabled {
            return self.skip(ctx, strategy_id, SkipReason::JobDisabled).await;
        }

        let strategy = self.definitions.load_strategy(strategy_id).await?;
        if strategy.is_none() {
            warn!(
                "Strategy {} for job {} not found, checking calendar in UTC",
                strategy_id, job.id
            );
        }
        let fire_date = match local_fire_date(strategy.as_ref(), ctx.scheduled_fire_time) {
            Ok(date) => date,
            Err(e) => return self.fail(ctx, Some(strategy_id), None, e.into()).await,
        };
        if self.calendar.is_excluded(strategy_id, fire_date).await? {
            return self
                .skip(ctx, strategy_id, SkipReason::ExcludedDate(fire_date))
                .await;
        }

        let handler = match self.handlers.resolve(job.job_type) {
            Ok(handler) => handler,
            Err(e) => return self.fail(ctx, Some(strategy_id), None, e.into()).await,
        };

        let actual_fire_time = Utc::now();
        let started = Instant::now();
        let result = handler.handle(&job, ctx).await;
        let attempt = Attempt {
            actual_fire_time,
            finished_time: Utc::now(),
            duration_ms: i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX),
        };

        match result {
            Ok(()) => {
                self.record(ctx, Some(strategy_id), ExecutionStatus::Success, Some(&attempt), None)
                    .await?;
                info!(
                    "Job {} ({}) succeeded in {}ms",
                    job.id, job.name, attempt.duration_ms
                );
                Ok(FiringOutcome::Succeeded {
                    duration_ms: attempt.duration_ms,
                })
            }
            Err(e) if e.is_retryable() && self.policy.should_retry(ctx.retry_count) => {
                self.retry(ctx, &job, strategy_id, &attempt, e).await
            }
            Err(e) => self.fail(ctx, Some(strategy_id), Some(&attempt), e).await,
        }
    }

    async fn retry(
        &self,
        ctx: &FiringContext,
        job: &JobDefinition,
        strategy_id: i64,
        attempt: &Attempt,
        cause: EngineError,
    ) -> EngineResult<FiringOutcome> {
        let next_retry_count = ctx.retry_count + 1;
        let delay = self.policy.retry_interval;
        let payload = TriggerPayload {
            job_id: job.id,
            schedule_strategy_id: Some(strategy_id),
            retry_count: next_retry_count,
            job_type: Some(job.job_type.to_string()),
        };

        if let Err(registration) = self.retries.schedule_retry(payload, delay).await {
            error!(
                "Job {} failed and its retry could not be registered: {}",
                job.id, registration
            );
            let message = format!("{}; retry registration failed: {}", cause, registration);
            self.record(ctx, Some(strategy_id), ExecutionStatus::Failed, Some(attempt), Some(message))
                .await?;
            return Err(registration);
        }

        self.record(
            ctx,
            Some(strategy_id),
            ExecutionStatus::Retried,
            Some(attempt),
            Some(cause.to_string()),
        )
        .await?;
        warn!(
            "Job {} failed (attempt {} of {}), retrying in {}s: {}",
            job.id,
            next_retry_count,
            self.policy.max_attempts,
            delay.as_secs(),
            cause
        );

        Ok(FiringOutcome::RetryScheduled {
            next_retry_count,
            delay,
        })
    }

    async fn skip(
        &self,
        ctx: &FiringContext,
        strategy_id: i64,
        reason: SkipReason,
    ) -> EngineResult<FiringOutcome> {
        let description = reason.describe();
        self.record(
            ctx,
            Some(strategy_id),
            ExecutionStatus::Skipped,
            None,
            Some(description.clone()),
        )
        .await?;
        info!("Skipped firing of job {}: {}", ctx.job_id, description);
        Ok(FiringOutcome::Skipped(reason))
    }

    /// Record a terminal failure and hand the error back to the caller.
    async fn fail(
        &self,
        ctx: &FiringContext,
        strategy_id: Option<i64>,
        attempt: Option<&Attempt>,
        err: EngineError,
    ) -> EngineResult<FiringOutcome> {
        error!(
            "Job {} failed permanently at retry {}: {}",
            ctx.job_id, ctx.retry_count, err
        );
        self.record(ctx, strategy_id, ExecutionStatus::Failed, attempt, Some(err.to_string()))
            .await?;
        Err(err)
    }

    async fn record(
        &self,
        ctx: &FiringContext,
        strategy_id: Option<i64>,
        status: ExecutionStatus,
        attempt: Option<&Attempt>,
        error_message: Option<String>,
    ) -> EngineResult<i64> {
        let entry = ExecutionLogEntry {
            id: None,
            job_id: ctx.job_id,
            strategy_id,
            scheduled_fire_time: ctx.scheduled_fire_time,
            actual_fire_time: attempt.map(|a| a.actual_fire_time),
            finished_time: Some(attempt.map_or_else(Utc::now, |a| a.finished_time)),
            status,
            error_message,
            retry_count: ctx.retry_count,
            duration_ms: attempt.map(|a| a.duration_ms),
        };
        self.ledger.append(&entry).await
    }
}
