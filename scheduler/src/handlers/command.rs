// File: scheduler/src/handlers/command.rs
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, info, warn};

use super::{malformed, parse_job_config, tail, JobHandler};
use crate::constants::{handlers, limits};
use crate::database::JobDefinition;
use crate::engine::FiringContext;
use crate::errors::{EngineResult, ExecutionError};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandJobConfig {
    pub command: String,
    #[serde(default)]
    pub working_directory: Option<String>,
    #[serde(default)]
    pub environment: HashMap<String, String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    handlers::COMMAND_TIMEOUT_SECONDS
}

#[derive(Default)]
pub struct CommandHandler;

impl CommandHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl JobHandler for CommandHandler {
    async fn handle(&self, job: &JobDefinition, context: &FiringContext) -> EngineResult<()> {
        let config: CommandJobConfig = parse_job_config(job)?;
        if config.command.trim().is_empty() {
            return Err(malformed(job, "command must not be empty").into());
        }

        info!(
            "Running command for job {} (timeout {}s, retry {}): {}",
            job.id, config.timeout_seconds, context.retry_count, config.command
        );

        let mut command = AsyncCommand::new("sh");
        command
            .arg("-c")
            .arg(&config.command)
            .envs(&config.environment)
            .env("SCHEDULER_JOB_ID", job.id.to_string())
            .env("SCHEDULER_RETRY_COUNT", context.retry_count.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &config.working_directory {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|e| ExecutionError::CommandSpawn {
            command: config.command.clone(),
            reason: e.to_string(),
        })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(
            Duration::from_secs(config.timeout_seconds),
            child.wait_with_output(),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ExecutionError::CommandSpawn {
                    command: config.command,
                    reason: e.to_string(),
                }
                .into())
            }
            Err(_) => {
                warn!(
                    "Command for job {} exceeded {}s, killed",
                    job.id, config.timeout_seconds
                );
                return Err(ExecutionError::CommandTimeout {
                    command: config.command,
                    timeout_seconds: config.timeout_seconds,
                }
                .into());
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if !stdout.trim().is_empty() {
            debug!("job {} stdout: {}", job.id, stdout.trim());
        }
        if !stderr.trim().is_empty() {
            debug!("job {} stderr: {}", job.id, stderr.trim());
        }

        if output.status.success() {
            return Ok(());
        }

        let code = output.status.code().unwrap_or(-1);
        let diagnostics = if !stderr.trim().is_empty() { stderr } else { stdout };
        warn!("Command for job {} exited with code {}", job.id, code);

        Err(ExecutionError::CommandExit {
            command: config.command,
            code,
            stderr: tail(&diagnostics, limits::ERROR_OUTPUT_CHARS),
        }
        .into())
    }
}
