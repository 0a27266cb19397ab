// File: scheduler/src/handlers/internal.rs
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::{malformed, parse_job_config, JobHandler};
use crate::database::{JobDefinition, JobType};
use crate::engine::FiringContext;
use crate::errors::{ConfigError, EngineResult, ExecutionError};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalServiceJobConfig {
    pub handler_key: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// An in-process unit of work addressable by key from job definitions.
#[async_trait]
pub trait InternalTask: Send + Sync {
    async fn run(&self, parameters: &Map<String, Value>, context: &FiringContext) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct InternalTaskRegistry {
    tasks: HashMap<String, Arc<dyn InternalTask>>,
}

impl InternalTaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: impl Into<String>, task: Arc<dyn InternalTask>) {
        let key = key.into();
        info!("Registered internal task '{}'", key);
        self.tasks.insert(key, task);
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn InternalTask>> {
        self.tasks.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.tasks.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// `(job name, handler key)` for each enabled INTERNAL_SERVICE job whose
    /// key has no registered task.
    pub fn unknown_keys(&self, jobs: &[JobDefinition]) -> Vec<(String, String)> {
        jobs.iter()
            .filter(|job| job.enabled && job.job_type == JobType::InternalService)
            .filter_map(|job| {
                let config: InternalServiceJobConfig = parse_job_config(job).ok()?;
                (!self.tasks.contains_key(&config.handler_key))
                    .then(|| (job.name.clone(), config.handler_key))
            })
            .collect()
    }
}

pub struct InternalServiceHandler {
    tasks: Arc<InternalTaskRegistry>,
}

impl InternalServiceHandler {
    pub fn new(tasks: Arc<InternalTaskRegistry>) -> Self {
        Self { tasks }
    }
}

#[async_trait]
impl JobHandler for InternalServiceHandler {
    async fn handle(&self, job: &JobDefinition, context: &FiringContext) -> EngineResult<()> {
        let config: InternalServiceJobConfig = parse_job_config(job)?;
        if config.handler_key.trim().is_empty() {
            return Err(malformed(job, "handlerKey must not be empty").into());
        }

        let task = self
            .tasks
            .get(&config.handler_key)
            .ok_or_else(|| ConfigError::UnregisteredHandlerKey(config.handler_key.clone()))?;

        info!(
            "Invoking internal task '{}' for job {} (retry {})",
            config.handler_key, job.id, context.retry_count
        );

        task.run(&config.parameters, context)
            .await
            .map_err(|e| ExecutionError::InternalTask {
                key: config.handler_key,
                reason: format!("{:#}", e),
            })?;

        Ok(())
    }
}
