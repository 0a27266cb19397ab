//! Error types for the scheduling engine
//!
//! Configuration problems are fatal and recorded as FAILED without retry.
//! Everything a handler raises while performing its external effect is
//! transient and goes through the retry policy.

use thiserror::Error;

use crate::database::JobType;

/// Main error type for the engine core
#[derive(Debug, Error)]
pub enum EngineError {
    /// Definitions or job configuration that can never succeed as-is
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A handler failed while performing its external effect
    #[error("Execution failed: {0}")]
    Execution(#[from] ExecutionError),

    /// Persistence failures (definition reads, ledger appends)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Trigger loop registration failures
    #[error("Trigger error: {0}")]
    Trigger(String),
}

/// Configuration error variants
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required field absent for the chosen type
    #[error("Missing required field '{field}' for {context}")]
    MissingRequired { field: String, context: String },

    /// Field present but unusable
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// jobConfig does not match the handler's schema
    #[error("Malformed job config for {job_type} job {job_id}: {reason}")]
    MalformedJobConfig {
        job_id: i64,
        job_type: JobType,
        reason: String,
    },

    /// No handler registered for a job type
    #[error("No handler registered for job type {0}")]
    UnregisteredJobType(JobType),

    /// No in-process task registered under a key
    #[error("No internal task registered under key '{0}'")]
    UnregisteredHandlerKey(String),

    /// Firing references a job that does not exist
    #[error("Job {0} not found")]
    JobNotFound(i64),
}

/// Handler failure variants, all retryable
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Request could not be completed (connect, timeout, body)
    #[error("HTTP request to {url} failed: {reason}")]
    HttpRequest { url: String, reason: String },

    /// Backend answered with a non-2xx status
    #[error("HTTP {method} {url} returned {status}: {body}")]
    HttpStatus {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    /// Subprocess could not be spawned or awaited
    #[error("Failed to run command '{command}': {reason}")]
    CommandSpawn { command: String, reason: String },

    /// Subprocess exited non-zero
    #[error("Command '{command}' exited with code {code}: {stderr}")]
    CommandExit {
        command: String,
        code: i32,
        stderr: String,
    },

    /// Subprocess exceeded its timeout and was killed
    #[error("Command '{command}' timed out after {timeout_seconds}s and was killed")]
    CommandTimeout {
        command: String,
        timeout_seconds: u64,
    },

    /// In-process task returned an error
    #[error("Internal task '{key}' failed: {reason}")]
    InternalTask { key: String, reason: String },
}

impl EngineError {
    /// Whether the retry policy applies to this error.
    ///
    /// Configuration errors are terminal; any other handler failure is
    /// retried purely by attempt count.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, EngineError::Config(_))
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
