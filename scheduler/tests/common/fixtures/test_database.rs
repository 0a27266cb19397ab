//! Test database utilities for in-memory SQLite testing

use anyhow::Result;
use sqlx::SqlitePool;
use std::sync::Arc;

use scheduler::database::{
    Database, ExcludedDate, ExecutionLogEntry, ExecutionStatus, JobDefinition, ScheduleStrategy,
};

/// Test database wrapper around an in-memory `Database`
pub struct TestDatabase {
    database: Arc<Database>,
}

impl TestDatabase {
    /// Create a new in-memory test database with the engine schema
    pub async fn new() -> Result<Self> {
        let database = Database::in_memory().await?;
        Ok(Self {
            database: Arc::new(database),
        })
    }

    pub fn database(&self) -> Arc<Database> {
        self.database.clone()
    }

    /// Get the database pool
    pub fn pool(&self) -> &SqlitePool {
        self.database.pool()
    }

    pub async fn add_strategy(&self, strategy: ScheduleStrategy) -> i64 {
        self.database
            .upsert_strategy(&strategy)
            .await
            .expect("Failed to insert strategy")
    }

    pub async fn add_job(&self, job: JobDefinition) -> i64 {
        self.database
            .upsert_job(&job)
            .await
            .expect("Failed to insert job")
    }

    pub async fn exclude(&self, strategy_id: i64, date: chrono::NaiveDate) {
        self.database
            .add_excluded_date(&ExcludedDate {
                strategy_id,
                date,
                reason: Some("holiday".to_string()),
            })
            .await
            .expect("Failed to insert excluded date");
    }

    /// Ledger rows for a job, oldest first
    pub async fn ledger(&self, job_id: i64) -> Vec<ExecutionLogEntry> {
        let mut rows = self
            .database
            .recent_executions(job_id, 1000)
            .await
            .expect("Failed to read ledger");
        rows.reverse();
        rows
    }

    pub async fn statuses(&self, job_id: i64) -> Vec<ExecutionStatus> {
        self.ledger(job_id).await.iter().map(|row| row.status).collect()
    }
}
