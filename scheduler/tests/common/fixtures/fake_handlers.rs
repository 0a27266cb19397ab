//! Stand-ins for handlers, internal tasks and the trigger loop
//!
//! These let orchestrator tests count dispatches and inspect retry
//! registrations without a running scheduler.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scheduler::database::JobDefinition;
use scheduler::engine::{FiringContext, RetryScheduler, TriggerPayload};
use scheduler::errors::{ConfigError, EngineError, EngineResult, ExecutionError};
use scheduler::handlers::{InternalTask, JobHandler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    /// Retryable execution failure
    Fail,
    /// Non-retryable configuration failure
    Misconfigured,
}

/// Handler that records every call and answers with a fixed behavior
pub struct CountingHandler {
    behavior: Behavior,
    calls: AtomicUsize,
    seen_retry_counts: Mutex<Vec<u32>>,
    delay: Option<Duration>,
}

impl CountingHandler {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            seen_retry_counts: Mutex::new(Vec::new()),
            delay: None,
        })
    }

    pub fn slow(behavior: Behavior, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            seen_retry_counts: Mutex::new(Vec::new()),
            delay: Some(delay),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_retry_counts(&self) -> Vec<u32> {
        self.seen_retry_counts.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobHandler for CountingHandler {
    async fn handle(&self, job: &JobDefinition, context: &FiringContext) -> EngineResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_retry_counts
            .lock()
            .unwrap()
            .push(context.retry_count);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.behavior {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(ExecutionError::HttpStatus {
                method: "POST".to_string(),
                url: "http://backend/test".to_string(),
                status: 503,
                body: "unavailable".to_string(),
            }
            .into()),
            Behavior::Misconfigured => Err(ConfigError::MalformedJobConfig {
                job_id: job.id,
                job_type: job.job_type,
                reason: "missing field `url`".to_string(),
            }
            .into()),
        }
    }
}

/// Retry scheduler that records registrations instead of scheduling them
#[derive(Default)]
pub struct RecordingRetryScheduler {
    scheduled: Mutex<Vec<(TriggerPayload, Duration)>>,
    reject: bool,
}

impl RecordingRetryScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A scheduler whose registrations always fail
    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            scheduled: Mutex::new(Vec::new()),
            reject: true,
        })
    }

    pub fn scheduled(&self) -> Vec<(TriggerPayload, Duration)> {
        self.scheduled.lock().unwrap().clone()
    }
}

#[async_trait]
impl RetryScheduler for RecordingRetryScheduler {
    async fn schedule_retry(&self, payload: TriggerPayload, delay: Duration) -> EngineResult<()> {
        if self.reject {
            return Err(EngineError::Trigger("scheduler is shut down".to_string()));
        }
        self.scheduled.lock().unwrap().push((payload, delay));
        Ok(())
    }
}

/// Internal task that records the parameters it was given
#[derive(Default)]
pub struct RecordingTask {
    runs: Mutex<Vec<Map<String, Value>>>,
    fail_with: Option<String>,
}

impl RecordingTask {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            runs: Mutex::new(Vec::new()),
            fail_with: Some(message.to_string()),
        })
    }

    pub fn runs(&self) -> Vec<Map<String, Value>> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl InternalTask for RecordingTask {
    async fn run(
        &self,
        parameters: &Map<String, Value>,
        _context: &FiringContext,
    ) -> anyhow::Result<()> {
        self.runs.lock().unwrap().push(parameters.clone());
        match &self.fail_with {
            Some(message) => Err(anyhow::anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}
