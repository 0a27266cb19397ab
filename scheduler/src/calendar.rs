//! Exclusion calendar date resolution
//!
//! Excluded dates are calendar days in the strategy's own time zone, so a
//! firing is matched against the local date of its scheduled fire time.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::database::ScheduleStrategy;
use crate::errors::ConfigError;

pub fn parse_time_zone(name: &str) -> Result<Tz, ConfigError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| ConfigError::InvalidValue {
            field: "time_zone".to_string(),
            reason: format!("'{}': {}", name, e),
        })
}

/// Time zone a strategy fires in; UTC when none is configured.
pub fn strategy_time_zone(strategy: &ScheduleStrategy) -> Result<Tz, ConfigError> {
    match strategy.time_zone.as_deref() {
        Some(name) if !name.trim().is_empty() => parse_time_zone(name),
        _ => Ok(Tz::UTC),
    }
}

/// Calendar date of `scheduled` as seen by the strategy.
pub fn local_fire_date(
    strategy: Option<&ScheduleStrategy>,
    scheduled: DateTime<Utc>,
) -> Result<NaiveDate, ConfigError> {
    let tz = match strategy {
        Some(strategy) => strategy_time_zone(strategy)?,
        None => Tz::UTC,
    };
    Ok(scheduled.with_timezone(&tz).date_naive())
}
