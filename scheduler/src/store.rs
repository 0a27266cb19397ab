//! Persistence seams consumed by the orchestrator
//!
//! The engine reads definitions and appends ledger rows through these traits;
//! `Database` is the SQLite implementation used by the daemon.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::database::{ExecutionLogEntry, JobDefinition, ScheduleStrategy};
use crate::errors::EngineResult;

/// Read accessors for job and strategy definitions
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    async fn load_job(&self, job_id: i64) -> EngineResult<Option<JobDefinition>>;

    async fn load_strategy(&self, strategy_id: i64) -> EngineResult<Option<ScheduleStrategy>>;
}

/// Per-strategy set of dates on which firings are suppressed
#[async_trait]
pub trait ExclusionCalendar: Send + Sync {
    async fn is_excluded(&self, strategy_id: i64, date: NaiveDate) -> EngineResult<bool>;
}

/// Append-only execution ledger
#[async_trait]
pub trait ExecutionLedger: Send + Sync {
    /// Appends one row and returns its id. Rows are never updated.
    async fn append(&self, entry: &ExecutionLogEntry) -> EngineResult<i64>;
}
