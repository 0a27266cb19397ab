//! Database layer for the scheduling engine.
//!
//! This module provides SQLite persistence for:
//! - Schedule strategies, job definitions and excluded dates (read at firing time)
//! - The execution ledger (append-only)
//!
//! The module is organized into submodules:
//! - `records` - All record types (entities)
//! - `definitions` - Definition reads and the upserts used by config sync
//! - `calendar` - Exclusion calendar lookups
//! - `ledger` - Execution ledger appends and queries

mod calendar;
mod definitions;
mod ledger;
mod records;

pub use records::*;

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;
use tracing::{debug, error, info};

pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Expose pool for integration test queries
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn new(database_path: &str) -> Result<Self> {
        info!("Database path: {}", database_path);

        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    error!("Failed to create parent directory {:?}: {}", parent, e);
                    return Err(e.into());
                }
            }
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path);
        let pool = match SqlitePool::connect(&database_url).await {
            Ok(pool) => pool,
            Err(e) => {
                error!("Failed to connect to database {}: {}", database_url, e);
                return Err(e.into());
            }
        };

        let database = Self { pool };
        database.initialize_tables().await?;

        info!("Database initialized at {}", database_path);
        Ok(database)
    }

    /// Single-connection in-memory database; the connection is never recycled
    /// so the data lives as long as the pool.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let database = Self { pool };
        database.initialize_tables().await?;
        Ok(database)
    }

    async fn initialize_tables(&self) -> Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS schedule_strategies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                schedule_type TEXT NOT NULL,
                cron_expression TEXT,
                start_time DATETIME,
                end_time DATETIME,
                time_zone TEXT,
                interval_seconds INTEGER,
                days_of_week TEXT
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS job_definitions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                job_type TEXT NOT NULL,
                job_config TEXT NOT NULL,
                schedule_strategy_id INTEGER NOT NULL REFERENCES schedule_strategies(id),
                precondition_config TEXT,
                enabled BOOLEAN NOT NULL DEFAULT 1
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS excluded_dates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                strategy_id INTEGER NOT NULL REFERENCES schedule_strategies(id),
                excluded_date DATE NOT NULL,
                reason TEXT,
                UNIQUE (strategy_id, excluded_date)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS execution_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id INTEGER NOT NULL,
                strategy_id INTEGER,
                scheduled_fire_time DATETIME NOT NULL,
                actual_fire_time DATETIME,
                finished_time DATETIME,
                status TEXT NOT NULL,
                error_message TEXT,
                retry_count INTEGER NOT NULL DEFAULT 0,
                duration_ms INTEGER
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_execution_log_job ON execution_log(job_id, scheduled_fire_time DESC)",
            "CREATE INDEX IF NOT EXISTS idx_execution_log_status ON execution_log(status, scheduled_fire_time DESC)",
        ];

        for sql in statements {
            if let Err(e) = sqlx::query(sql).execute(&self.pool).await {
                error!("Failed to initialize schema: {}", e);
                error!("SQL was: {}", sql);
                return Err(e.into());
            }
        }

        debug!("Database tables initialized");
        Ok(())
    }
}
