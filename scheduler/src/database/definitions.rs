//! Job and strategy definition reads, plus the upserts used when syncing
//! definition files into the store.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use super::records::{JobDefinition, ScheduleStrategy};
use super::Database;
use crate::errors::EngineResult;
use crate::store::DefinitionStore;

fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(message.into())
}

fn job_from_row(row: &SqliteRow) -> sqlx::Result<JobDefinition> {
    let job_type: String = row.try_get("job_type")?;
    let job_config: String = row.try_get("job_config")?;
    let precondition_config: Option<String> = row.try_get("precondition_config")?;

    Ok(JobDefinition {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        job_type: job_type.parse().map_err(decode_error)?,
        job_config: serde_json::from_str(&job_config)
            .map_err(|e| decode_error(format!("job_config is not valid JSON: {}", e)))?,
        schedule_strategy_id: row.try_get("schedule_strategy_id")?,
        precondition_config: precondition_config
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(|e| decode_error(format!("precondition_config is not valid JSON: {}", e)))?,
        enabled: row.try_get("enabled")?,
    })
}

fn strategy_from_row(row: &SqliteRow) -> sqlx::Result<ScheduleStrategy> {
    let schedule_type: String = row.try_get("schedule_type")?;

    Ok(ScheduleStrategy {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        schedule_type: schedule_type.parse().map_err(decode_error)?,
        cron_expression: row.try_get("cron_expression")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        time_zone: row.try_get("time_zone")?,
        interval_seconds: row.try_get("interval_seconds")?,
        days_of_week: row.try_get("days_of_week")?,
    })
}

const JOB_COLUMNS: &str =
    "id, name, job_type, job_config, schedule_strategy_id, precondition_config, enabled";
const STRATEGY_COLUMNS: &str = "id, name, schedule_type, cron_expression, start_time, end_time, time_zone, interval_seconds, days_of_week";

impl Database {
    pub async fn get_job(&self, job_id: i64) -> sqlx::Result<Option<JobDefinition>> {
        let sql = format!("SELECT {} FROM job_definitions WHERE id = ?", JOB_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(job_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(job_from_row).transpose()
    }

    pub async fn get_strategy(&self, strategy_id: i64) -> sqlx::Result<Option<ScheduleStrategy>> {
        let sql = format!(
            "SELECT {} FROM schedule_strategies WHERE id = ?",
            STRATEGY_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(strategy_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(strategy_from_row).transpose()
    }

    pub async fn list_jobs(&self) -> sqlx::Result<Vec<JobDefinition>> {
        let sql = format!("SELECT {} FROM job_definitions ORDER BY id", JOB_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(job_from_row).collect()
    }

    pub async fn list_strategies(&self) -> sqlx::Result<Vec<ScheduleStrategy>> {
        let sql = format!(
            "SELECT {} FROM schedule_strategies ORDER BY id",
            STRATEGY_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(strategy_from_row).collect()
    }

    /// Insert or update a strategy by name. The `id` field is ignored; the
    /// stored id is returned.
    pub async fn upsert_strategy(&self, strategy: &ScheduleStrategy) -> sqlx::Result<i64> {
        debug!("Upserting schedule strategy: {}", strategy.name);

        sqlx::query(
            r#"
            INSERT INTO schedule_strategies (
                name, schedule_type, cron_expression, start_time, end_time,
                time_zone, interval_seconds, days_of_week
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                schedule_type = excluded.schedule_type,
                cron_expression = excluded.cron_expression,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                time_zone = excluded.time_zone,
                interval_seconds = excluded.interval_seconds,
                days_of_week = excluded.days_of_week
            "#,
        )
        .bind(&strategy.name)
        .bind(strategy.schedule_type.as_str())
        .bind(&strategy.cron_expression)
        .bind(strategy.start_time)
        .bind(strategy.end_time)
        .bind(&strategy.time_zone)
        .bind(strategy.interval_seconds)
        .bind(&strategy.days_of_week)
        .execute(&self.pool)
        .await?;

        sqlx::query("SELECT id FROM schedule_strategies WHERE name = ?")
            .bind(&strategy.name)
            .fetch_one(&self.pool)
            .await?
            .try_get("id")
    }

    /// Insert or update a job by name. The `id` field is ignored; the stored
    /// id is returned.
    pub async fn upsert_job(&self, job: &JobDefinition) -> sqlx::Result<i64> {
        debug!("Upserting job definition: {}", job.name);

        let precondition = job.precondition_config.as_ref().map(|v| v.to_string());

        sqlx::query(
            r#"
            INSERT INTO job_definitions (
                name, job_type, job_config, schedule_strategy_id,
                precondition_config, enabled
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                job_type = excluded.job_type,
                job_config = excluded.job_config,
                schedule_strategy_id = excluded.schedule_strategy_id,
                precondition_config = excluded.precondition_config,
                enabled = excluded.enabled
            "#,
        )
        .bind(&job.name)
        .bind(job.job_type.as_str())
        .bind(job.job_config.to_string())
        .bind(job.schedule_strategy_id)
        .bind(precondition)
        .bind(job.enabled)
        .execute(&self.pool)
        .await?;

        sqlx::query("SELECT id FROM job_definitions WHERE name = ?")
            .bind(&job.name)
            .fetch_one(&self.pool)
            .await?
            .try_get("id")
    }

    pub async fn set_job_enabled(&self, job_id: i64, enabled: bool) -> sqlx::Result<bool> {
        let result = sqlx::query("UPDATE job_definitions SET enabled = ? WHERE id = ?")
            .bind(enabled)
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl DefinitionStore for Database {
    async fn load_job(&self, job_id: i64) -> EngineResult<Option<JobDefinition>> {
        Ok(self.get_job(job_id).await?)
    }

    async fn load_strategy(&self, strategy_id: i64) -> EngineResult<Option<ScheduleStrategy>> {
        Ok(self.get_strategy(strategy_id).await?)
    }
}
