// File: scheduler/src/handlers/http.rs
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{malformed, parse_job_config, tail, JobHandler};
use crate::constants::{handlers, limits};
use crate::database::JobDefinition;
use crate::engine::FiringContext;
use crate::errors::{EngineResult, ExecutionError};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpJobConfig {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_timeout_seconds() -> u64 {
    handlers::HTTP_TIMEOUT_SECONDS
}

pub struct HttpHandler {
    client: Client,
}

impl HttpHandler {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn build_headers(job: &JobDefinition, config: &HttpJobConfig) -> EngineResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| malformed(job, format!("invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| malformed(job, format!("invalid value for header '{}': {}", name, e)))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

impl Default for HttpHandler {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

#[async_trait]
impl JobHandler for HttpHandler {
    async fn handle(&self, job: &JobDefinition, context: &FiringContext) -> EngineResult<()> {
        let config: HttpJobConfig = parse_job_config(job)?;

        if config.url.trim().is_empty() {
            return Err(malformed(job, "url must not be empty").into());
        }
        let method = Method::from_bytes(config.method.trim().to_uppercase().as_bytes())
            .map_err(|_| malformed(job, format!("invalid HTTP method '{}'", config.method)))?;
        let headers = Self::build_headers(job, &config)?;

        info!(
            "HTTP {} {} for job {} (timeout {}s, retry {})",
            method, config.url, job.id, config.timeout_seconds, context.retry_count
        );

        let mut request = self
            .client
            .request(method.clone(), &config.url)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .headers(headers)
            .header("X-Scheduler-Job-Id", job.id.to_string())
            .header("X-Scheduler-Firing-Id", context.firing_id.to_string())
            .header("X-Scheduler-Retry-Count", context.retry_count.to_string());
        if let Some(body) = &config.body {
            request = request.body(body.clone());
        }

        let started = Instant::now();
        let response = request.send().await.map_err(|e| ExecutionError::HttpRequest {
            url: config.url.clone(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "HTTP {} {} for job {} returned {}",
                method, config.url, job.id, status
            );
            return Err(ExecutionError::HttpStatus {
                method: method.to_string(),
                url: config.url,
                status: status.as_u16(),
                body: tail(&body, limits::ERROR_OUTPUT_CHARS),
            }
            .into());
        }

        debug!(
            "HTTP {} {} for job {} returned {} in {}ms",
            method,
            config.url,
            job.id,
            status,
            started.elapsed().as_millis()
        );
        Ok(())
    }
}
