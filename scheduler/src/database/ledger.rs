//! Execution ledger: one INSERT per firing attempt, never updated.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, error};

use super::records::{ExecutionCounts, ExecutionLogEntry, ExecutionStatus};
use super::Database;
use crate::errors::EngineResult;
use crate::store::ExecutionLedger;

fn entry_from_row(row: &SqliteRow) -> sqlx::Result<ExecutionLogEntry> {
    let status: String = row.try_get("status")?;
    let retry_count: i64 = row.try_get("retry_count")?;

    Ok(ExecutionLogEntry {
        id: row.try_get("id")?,
        job_id: row.try_get("job_id")?,
        strategy_id: row.try_get("strategy_id")?,
        scheduled_fire_time: row.try_get("scheduled_fire_time")?,
        actual_fire_time: row.try_get("actual_fire_time")?,
        finished_time: row.try_get("finished_time")?,
        status: status
            .parse()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?,
        error_message: row.try_get("error_message")?,
        retry_count: u32::try_from(retry_count)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        duration_ms: row.try_get("duration_ms")?,
    })
}

impl Database {
    pub async fn insert_execution(&self, entry: &ExecutionLogEntry) -> sqlx::Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO execution_log (
                job_id, strategy_id, scheduled_fire_time, actual_fire_time,
                finished_time, status, error_message, retry_count, duration_ms
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.job_id)
        .bind(entry.strategy_id)
        .bind(entry.scheduled_fire_time)
        .bind(entry.actual_fire_time)
        .bind(entry.finished_time)
        .bind(entry.status.as_str())
        .bind(&entry.error_message)
        .bind(i64::from(entry.retry_count))
        .bind(entry.duration_ms)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => {
                let id = done.last_insert_rowid();
                debug!(
                    "Ledger row {} appended: job {} {} (retry {})",
                    id, entry.job_id, entry.status, entry.retry_count
                );
                Ok(id)
            }
            Err(e) => {
                error!(
                    "Failed to append ledger row for job {} ({}): {}",
                    entry.job_id, entry.status, e
                );
                Err(e)
            }
        }
    }

    /// Most recent ledger rows for a job, newest first.
    pub async fn recent_executions(
        &self,
        job_id: i64,
        limit: i64,
    ) -> sqlx::Result<Vec<ExecutionLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, job_id, strategy_id, scheduled_fire_time, actual_fire_time,
                   finished_time, status, error_message, retry_count, duration_ms
            FROM execution_log
            WHERE job_id = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(job_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }

    pub async fn execution_counts(&self, job_id: i64) -> sqlx::Result<ExecutionCounts> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS total FROM execution_log WHERE job_id = ? GROUP BY status",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = ExecutionCounts::default();
        for row in rows {
            let status: String = row.try_get("status")?;
            let total: i64 = row.try_get("total")?;
            match status.parse::<ExecutionStatus>() {
                Ok(ExecutionStatus::Success) => counts.success = total,
                Ok(ExecutionStatus::Failed) => counts.failed = total,
                Ok(ExecutionStatus::Skipped) => counts.skipped = total,
                Ok(ExecutionStatus::Retried) => counts.retried = total,
                Err(e) => return Err(sqlx::Error::Decode(e.into())),
            }
        }

        Ok(counts)
    }
}

#[async_trait]
impl ExecutionLedger for Database {
    async fn append(&self, entry: &ExecutionLogEntry) -> EngineResult<i64> {
        Ok(self.insert_execution(entry).await?)
    }
}
