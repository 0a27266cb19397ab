// File: scheduler/src/config/sync.rs
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use tracing::{debug, info};

use super::Config;
use crate::cron_resolver::resolve;
use crate::database::{Database, ExcludedDate, JobDefinition};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub strategies: usize,
    pub excluded_dates: usize,
    pub jobs: usize,
}

/// Write the file-based definitions into the database.
///
/// Rows are matched by name, so ids stay stable across restarts. Rows that
/// no longer appear in the files are left untouched.
pub async fn sync_definitions(config: &Config, database: &Database) -> Result<SyncSummary> {
    let mut summary = SyncSummary::default();
    let mut strategy_ids: HashMap<&str, i64> = HashMap::new();

    let mut strategy_names: Vec<&String> = config.strategies.keys().collect();
    strategy_names.sort();

    for name in strategy_names {
        let strategy = &config.strategies[name];
        let mut record = strategy.to_record(name, &config.default_time_zone)?;
        // Stored as a cache of the derived form
        record.cron_expression = Some(resolve(&record)?);

        let id = database.upsert_strategy(&record).await?;
        strategy_ids.insert(name.as_str(), id);
        summary.strategies += 1;
        debug!(
            "Synced strategy '{}' (id {}) as '{}'",
            name,
            id,
            record.cron_expression.as_deref().unwrap_or_default()
        );

        for excluded in &strategy.excluded_dates {
            database
                .add_excluded_date(&ExcludedDate {
                    strategy_id: id,
                    date: excluded.date,
                    reason: excluded.reason.clone(),
                })
                .await?;
            summary.excluded_dates += 1;
        }
    }

    let mut job_names: Vec<&String> = config.jobs.keys().collect();
    job_names.sort();

    for name in job_names {
        let job = &config.jobs[name];
        let strategy_id = *strategy_ids
            .get(job.strategy.as_str())
            .ok_or_else(|| anyhow!("Job '{}' references unknown strategy '{}'", name, job.strategy))?;

        let id = database
            .upsert_job(&JobDefinition {
                id: 0,
                name: name.clone(),
                job_type: job.job_type,
                job_config: job.job_config.clone(),
                schedule_strategy_id: strategy_id,
                precondition_config: job.precondition_config.clone(),
                enabled: job.enabled,
            })
            .await?;
        summary.jobs += 1;
        debug!("Synced job '{}' (id {}) on strategy {}", name, id, strategy_id);
    }

    info!(
        "Definitions synced: {} strategies, {} excluded dates, {} jobs",
        summary.strategies, summary.excluded_dates, summary.jobs
    );
    Ok(summary)
}
