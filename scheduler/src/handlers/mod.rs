//! Execution backends keyed by job type
//!
//! # Architecture
//!
//! ```text
//! Orchestrator → HandlerRegistry (JobType → handler)
//!                    ├── HttpHandler            one request, non-2xx fails
//!                    ├── CommandHandler         sh -c, timeout kills
//!                    └── InternalServiceHandler in-process task by key
//! ```
//!
//! Handlers are stateless with respect to firings and always run to
//! completion before `handle` returns; nothing is left running in the
//! background. The orchestrator treats every error they return the same way,
//! except configuration errors which are never retried.

pub mod command;
pub mod http;
pub mod internal;

pub use command::{CommandHandler, CommandJobConfig};
pub use http::{HttpHandler, HttpJobConfig};
pub use internal::{InternalServiceHandler, InternalServiceJobConfig, InternalTask, InternalTaskRegistry};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::database::{JobDefinition, JobType};
use crate::engine::FiringContext;
use crate::errors::{ConfigError, EngineResult};

#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Perform the job's external effect and return once it has finished.
    async fn handle(&self, job: &JobDefinition, context: &FiringContext) -> EngineResult<()>;
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<JobType, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the HTTP, command and internal-service handlers.
    pub fn with_builtin_handlers(
        client: reqwest::Client,
        internal_tasks: Arc<InternalTaskRegistry>,
    ) -> Self {
        let mut registry = Self::new();
        registry.register(JobType::Http, Arc::new(HttpHandler::new(client)));
        registry.register(JobType::Command, Arc::new(CommandHandler::new()));
        registry.register(
            JobType::InternalService,
            Arc::new(InternalServiceHandler::new(internal_tasks)),
        );
        registry
    }

    /// Register a handler, returning the one it replaced.
    pub fn register(
        &mut self,
        job_type: JobType,
        handler: Arc<dyn JobHandler>,
    ) -> Option<Arc<dyn JobHandler>> {
        info!("Registered handler for {} jobs", job_type);
        self.handlers.insert(job_type, handler)
    }

    pub fn resolve(&self, job_type: JobType) -> Result<Arc<dyn JobHandler>, ConfigError> {
        self.handlers
            .get(&job_type)
            .cloned()
            .ok_or(ConfigError::UnregisteredJobType(job_type))
    }

    pub fn registered_types(&self) -> Vec<JobType> {
        self.handlers.keys().copied().collect()
    }
}

/// Deserialize a job's config blob into the handler's schema.
pub(crate) fn parse_job_config<T: DeserializeOwned>(job: &JobDefinition) -> Result<T, ConfigError> {
    serde_json::from_value(job.job_config.clone()).map_err(|e| ConfigError::MalformedJobConfig {
        job_id: job.id,
        job_type: job.job_type,
        reason: e.to_string(),
    })
}

pub(crate) fn malformed(job: &JobDefinition, reason: impl Into<String>) -> ConfigError {
    ConfigError::MalformedJobConfig {
        job_id: job.id,
        job_type: job.job_type,
        reason: reason.into(),
    }
}

/// Last `max_chars` characters of captured output, for error messages.
pub(crate) fn tail(output: &str, max_chars: usize) -> String {
    let trimmed = output.trim();
    let count = trimmed.chars().count();
    if count <= max_chars {
        trimmed.to_string()
    } else {
        let skipped: String = trimmed.chars().skip(count - max_chars).collect();
        format!("...{}", skipped)
    }
}
