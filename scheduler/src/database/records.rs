//! Database record types (entities).
//!
//! Definitions (jobs, strategies, excluded dates) are owned by the admin
//! surface; the engine reads them at firing time. Ledger entries are written
//! once per firing attempt and never updated.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Enumerations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    Http,
    Command,
    InternalService,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleType {
    Cron,
    FixedRate,
    Daily,
    Weekly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Success,
    Failed,
    Skipped,
    Retried,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Http => "HTTP",
            JobType::Command => "COMMAND",
            JobType::InternalService => "INTERNAL_SERVICE",
        }
    }
}

impl ScheduleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleType::Cron => "CRON",
            ScheduleType::FixedRate => "FIXED_RATE",
            ScheduleType::Daily => "DAILY",
            ScheduleType::Weekly => "WEEKLY",
        }
    }
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "SUCCESS",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::Skipped => "SKIPPED",
            ExecutionStatus::Retried => "RETRIED",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HTTP" => Ok(JobType::Http),
            "COMMAND" => Ok(JobType::Command),
            "INTERNAL_SERVICE" => Ok(JobType::InternalService),
            other => Err(format!("unknown job type '{}'", other)),
        }
    }
}

impl FromStr for ScheduleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CRON" => Ok(ScheduleType::Cron),
            "FIXED_RATE" => Ok(ScheduleType::FixedRate),
            "DAILY" => Ok(ScheduleType::Daily),
            "WEEKLY" => Ok(ScheduleType::Weekly),
            other => Err(format!("unknown schedule type '{}'", other)),
        }
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(ExecutionStatus::Success),
            "FAILED" => Ok(ExecutionStatus::Failed),
            "SKIPPED" => Ok(ExecutionStatus::Skipped),
            "RETRIED" => Ok(ExecutionStatus::Retried),
            other => Err(format!("unknown execution status '{}'", other)),
        }
    }
}

// ============================================================================
// Definition entities
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefinition {
    pub id: i64,
    pub name: String,
    pub job_type: JobType,
    pub job_config: Value,
    pub schedule_strategy_id: i64,
    pub precondition_config: Option<Value>, // reserved
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleStrategy {
    pub id: i64,
    pub name: String,
    pub schedule_type: ScheduleType,
    pub cron_expression: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub time_zone: Option<String>,
    pub interval_seconds: Option<i64>,
    pub days_of_week: Option<String>, // "2,4"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcludedDate {
    pub strategy_id: i64,
    pub date: NaiveDate,
    pub reason: Option<String>,
}

// ============================================================================
// Ledger entities
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub id: Option<i64>,
    pub job_id: i64,
    pub strategy_id: Option<i64>,
    pub scheduled_fire_time: DateTime<Utc>,
    pub actual_fire_time: Option<DateTime<Utc>>,
    pub finished_time: Option<DateTime<Utc>>,
    pub status: ExecutionStatus,
    pub error_message: Option<String>,
    pub retry_count: u32,
    pub duration_ms: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionCounts {
    pub success: i64,
    pub failed: i64,
    pub skipped: i64,
    pub retried: i64,
}
