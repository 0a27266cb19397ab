// File: scheduler/src/config/mod.rs
pub mod manager;
pub mod sync;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::constants::defaults;
use crate::database::{JobType, ScheduleStrategy, ScheduleType};
use crate::errors::ConfigError;

pub use manager::ConfigManager;
pub use sync::{sync_definitions, SyncSummary};

/// Engine settings from `main.toml`, plus the definitions collected from the
/// other files in the config directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_interval")]
    pub retry_interval_seconds: u64,
    #[serde(default = "default_time_zone")]
    pub default_time_zone: String,
    pub http_user_agent: Option<String>,
    // Populated from definition files
    #[serde(skip)]
    pub strategies: HashMap<String, StrategyConfig>,
    #[serde(skip)]
    pub jobs: HashMap<String, JobConfig>,
}

fn default_database_path() -> String {
    defaults::DATABASE_PATH.to_string()
}

fn default_max_attempts() -> u32 {
    defaults::MAX_ATTEMPTS
}

fn default_retry_interval() -> u64 {
    defaults::RETRY_INTERVAL_SECONDS
}

fn default_time_zone() -> String {
    defaults::TIME_ZONE.to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefinitionFile {
    #[serde(default)]
    pub strategies: HashMap<String, StrategyConfig>,
    #[serde(default)]
    pub jobs: HashMap<String, JobConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub schedule_type: ScheduleType,
    pub cron_expression: Option<String>,
    /// "HH:MM:SS" or "YYYY-MM-DDTHH:MM:SS"
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub time_zone: Option<String>,
    pub interval_seconds: Option<i64>,
    pub days_of_week: Option<String>,
    #[serde(default)]
    pub excluded_dates: Vec<ExcludedDateConfig>,
}

impl StrategyConfig {
    /// Build the stored record, falling back to `default_time_zone` when the
    /// strategy names none. The id is assigned on upsert.
    pub fn to_record(
        &self,
        name: &str,
        default_time_zone: &str,
    ) -> Result<ScheduleStrategy, ConfigError> {
        let parse = |field: &str, raw: &Option<String>| {
            raw.as_deref()
                .map(|value| {
                    parse_start_time(value).map_err(|reason| ConfigError::InvalidValue {
                        field: format!("strategies.{}.{}", name, field),
                        reason,
                    })
                })
                .transpose()
        };

        let time_zone = self
            .time_zone
            .clone()
            .filter(|tz| !tz.trim().is_empty())
            .unwrap_or_else(|| default_time_zone.to_string());

        Ok(ScheduleStrategy {
            id: 0,
            name: name.to_string(),
            schedule_type: self.schedule_type,
            cron_expression: self.cron_expression.clone(),
            start_time: parse("start_time", &self.start_time)?,
            end_time: parse("end_time", &self.end_time)?,
            time_zone: Some(time_zone),
            interval_seconds: self.interval_seconds,
            days_of_week: self.days_of_week.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcludedDateConfig {
    pub date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub job_type: JobType,
    /// Name of the strategy this job runs on
    pub strategy: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "empty_object")]
    pub job_config: Value,
    pub precondition_config: Option<Value>,
}

fn default_enabled() -> bool {
    true
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Parse a strategy time field. A bare time of day is anchored on the Unix
/// epoch date since only the time part drives derivation.
pub fn parse_start_time(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();
    if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(datetime);
    }
    let time = NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|e| format!("'{}' is not HH:MM[:SS] or YYYY-MM-DDTHH:MM:SS: {}", raw, e))?;
    Ok(NaiveDateTime::new(NaiveDate::default(), time))
}
