//! Exclusion calendar storage.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::Row;
use tracing::debug;

use super::records::ExcludedDate;
use super::Database;
use crate::errors::EngineResult;
use crate::store::ExclusionCalendar;

impl Database {
    /// Add a date to a strategy's calendar. Re-adding an existing date
    /// replaces its reason.
    pub async fn add_excluded_date(&self, excluded: &ExcludedDate) -> sqlx::Result<()> {
        debug!(
            "Excluding {} for strategy {}",
            excluded.date, excluded.strategy_id
        );

        sqlx::query(
            r#"
            INSERT INTO excluded_dates (strategy_id, excluded_date, reason)
            VALUES (?, ?, ?)
            ON CONFLICT(strategy_id, excluded_date) DO UPDATE SET reason = excluded.reason
            "#,
        )
        .bind(excluded.strategy_id)
        .bind(excluded.date)
        .bind(&excluded.reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_excluded_dates(&self, strategy_id: i64) -> sqlx::Result<Vec<ExcludedDate>> {
        let rows = sqlx::query(
            r#"
            SELECT strategy_id, excluded_date, reason
            FROM excluded_dates
            WHERE strategy_id = ?
            ORDER BY excluded_date
            "#,
        )
        .bind(strategy_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ExcludedDate {
                    strategy_id: row.try_get("strategy_id")?,
                    date: row.try_get("excluded_date")?,
                    reason: row.try_get("reason")?,
                })
            })
            .collect()
    }

    pub async fn has_excluded_date(&self, strategy_id: i64, date: NaiveDate) -> sqlx::Result<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS hits FROM excluded_dates WHERE strategy_id = ? AND excluded_date = ?",
        )
        .bind(strategy_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        let hits: i64 = row.try_get("hits")?;
        Ok(hits > 0)
    }
}

#[async_trait]
impl ExclusionCalendar for Database {
    async fn is_excluded(&self, strategy_id: i64, date: NaiveDate) -> EngineResult<bool> {
        Ok(self.has_excluded_date(strategy_id, date).await?)
    }
}
