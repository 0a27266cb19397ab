// File: scheduler/src/config/manager.rs
use super::{Config, DefinitionFile};
use anyhow::{anyhow, Result};
use glob::glob;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

use crate::calendar::{parse_time_zone, strategy_time_zone};
use crate::cron_resolver::{resolve, validate_cron};

pub struct ConfigManager {
    current_config: Arc<Config>,
}

impl ConfigManager {
    pub async fn new(config_dir: String) -> Result<Self> {
        let config = Self::load_configuration(&config_dir).await?;
        Ok(Self {
            current_config: Arc::new(config),
        })
    }

    pub fn get_current_config(&self) -> Arc<Config> {
        self.current_config.clone()
    }

    async fn load_configuration(config_dir: &str) -> Result<Config> {
        let main_config_path = format!("{}/main.toml", config_dir);
        let main_config_content = fs::read_to_string(&main_config_path)
            .await
            .map_err(|e| anyhow!("Failed to read main config {}: {}", main_config_path, e))?;

        let mut config: Config = toml::from_str(&main_config_content)
            .map_err(|e| anyhow!("Failed to parse main config: {}", e))?;

        // Every other *.toml file holds strategy and job definitions
        let pattern = format!("{}/*.toml", config_dir);
        let mut all_strategies = HashMap::new();
        let mut all_jobs = HashMap::new();
        let mut origins: HashMap<String, String> = HashMap::new();

        for entry in glob(&pattern).map_err(|e| anyhow!("Glob pattern error: {}", e))? {
            let path = entry.map_err(|e| anyhow!("Glob entry error: {}", e))?;
            let filename = path
                .file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow!("Invalid filename"))?
                .to_string();

            if filename == "main.toml" {
                continue;
            }

            debug!("Loading definitions: {}", path.display());

            let content = fs::read_to_string(&path)
                .await
                .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;

            let file: DefinitionFile = toml::from_str(&content)
                .map_err(|e| anyhow!("Failed to parse {}: {}", path.display(), e))?;

            for (name, strategy) in file.strategies {
                claim_name(&mut origins, "strategy", &name, &filename)?;
                all_strategies.insert(name, strategy);
            }
            for (name, job) in file.jobs {
                claim_name(&mut origins, "job", &name, &filename)?;
                all_jobs.insert(name, job);
            }
        }

        config.strategies = all_strategies;
        config.jobs = all_jobs;

        validate(&config)?;

        info!(
            "Loaded {} strategies and {} jobs ({} enabled)",
            config.strategies.len(),
            config.jobs.len(),
            config.jobs.values().filter(|job| job.enabled).count()
        );

        Ok(config)
    }
}

fn claim_name(
    origins: &mut HashMap<String, String>,
    kind: &str,
    name: &str,
    filename: &str,
) -> Result<()> {
    let key = format!("{}:{}", kind, name);
    if let Some(previous) = origins.get(&key) {
        return Err(anyhow!(
            "Duplicate {} '{}' in {} (already defined in {})",
            kind,
            name,
            filename,
            previous
        ));
    }
    origins.insert(key, filename.to_string());
    Ok(())
}

/// Reject definitions that could never be registered or fired.
fn validate(config: &Config) -> Result<()> {
    if config.max_attempts == 0 {
        return Err(anyhow!("max_attempts must be at least 1"));
    }
    parse_time_zone(&config.default_time_zone)
        .map_err(|e| anyhow!("Invalid default_time_zone: {}", e))?;

    for (name, strategy) in &config.strategies {
        let record = strategy
            .to_record(name, &config.default_time_zone)
            .map_err(|e| anyhow!("Strategy '{}': {}", name, e))?;
        strategy_time_zone(&record).map_err(|e| anyhow!("Strategy '{}': {}", name, e))?;
        let expression = resolve(&record).map_err(|e| anyhow!("Strategy '{}': {}", name, e))?;
        validate_cron(&expression).map_err(|e| anyhow!("Strategy '{}': {}", name, e))?;
    }

    for (name, job) in &config.jobs {
        if !config.strategies.contains_key(&job.strategy) {
            return Err(anyhow!(
                "Job '{}' references unknown strategy '{}'",
                name,
                job.strategy
            ));
        }
        if !job.job_config.is_object() {
            return Err(anyhow!("Job '{}': job_config must be a table", name));
        }
    }

    Ok(())
}
