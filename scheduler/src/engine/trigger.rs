//! Boundary between the trigger loop and the orchestrator
//!
//! The adapter turns a raw trigger payload into a [`FiringContext`], holds the
//! firing's scope for exactly as long as the orchestrator runs, and converts
//! orchestrator errors into [`TriggerFailure`] so the loop still observes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument};

use super::context::{ActiveFirings, FiringContext};
use super::orchestrator::{FiringOutcome, Orchestrator};
use crate::errors::EngineError;

/// Data carried by a trigger registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerPayload {
    pub job_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_strategy_id: Option<i64>,
    #[serde(default)]
    pub retry_count: u32,
    /// Informational only; dispatch always uses the stored job type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
}

impl TriggerPayload {
    pub fn for_job(job_id: i64, schedule_strategy_id: i64, job_type: impl Into<String>) -> Self {
        Self {
            job_id,
            schedule_strategy_id: Some(schedule_strategy_id),
            retry_count: 0,
            job_type: Some(job_type.into()),
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, TriggerFailure> {
        Self::deserialize(value).map_err(|e| TriggerFailure::InvalidPayload(e.to_string()))
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Failure signal reported back to the trigger loop.
#[derive(Debug, Error)]
pub enum TriggerFailure {
    #[error("Invalid trigger payload: {0}")]
    InvalidPayload(String),

    #[error("Firing of job {job_id} (retry {retry_count}) failed: {source}")]
    Firing {
        job_id: i64,
        retry_count: u32,
        #[source]
        source: EngineError,
    },
}

pub struct TriggerAdapter {
    orchestrator: Arc<Orchestrator>,
    firings: Arc<ActiveFirings>,
}

impl TriggerAdapter {
    pub fn new(orchestrator: Arc<Orchestrator>, firings: Arc<ActiveFirings>) -> Self {
        Self {
            orchestrator,
            firings,
        }
    }

    pub fn firings(&self) -> &Arc<ActiveFirings> {
        &self.firings
    }

    #[instrument(skip(self, payload))]
    pub async fn fire(
        &self,
        payload: &Value,
        scheduled_fire_time: DateTime<Utc>,
    ) -> Result<FiringOutcome, TriggerFailure> {
        let payload = TriggerPayload::from_value(payload).inspect_err(|e| {
            error!("Rejected trigger: {}", e);
        })?;

        let context = FiringContext::new(
            payload.job_id,
            payload.schedule_strategy_id,
            payload.retry_count,
            scheduled_fire_time,
        );
        info!(
            "Trigger fired for job {} (retry {}, scheduled {})",
            context.job_id, context.retry_count, context.scheduled_fire_time
        );

        let result = {
            let scope = self.firings.acquire(context).await;
            self.orchestrator.execute(scope.context()).await
        };

        result.map_err(|source| {
            error!(
                "Firing of job {} (retry {}) failed: {}",
                payload.job_id, payload.retry_count, source
            );
            TriggerFailure::Firing {
                job_id: payload.job_id,
                retry_count: payload.retry_count,
                source,
            }
        })
    }
}
