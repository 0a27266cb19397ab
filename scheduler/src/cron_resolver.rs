//! Schedule strategy → 6-field cron expression
//!
//! Only CRON strategies carry literal text; FIXED_RATE, DAILY and WEEKLY are
//! always derived from their own fields, so resolving the same strategy twice
//! yields the same string.
//!
//! Field order is `sec min hour day-of-month month day-of-week`.

use chrono::Timelike;
use tracing::warn;

use crate::database::{ScheduleStrategy, ScheduleType};
use crate::errors::ConfigError;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 3600;

/// Derive the cron expression for a strategy.
pub fn resolve(strategy: &ScheduleStrategy) -> Result<String, ConfigError> {
    match strategy.schedule_type {
        ScheduleType::Cron => {
            let literal = strategy
                .cron_expression
                .as_deref()
                .map(str::trim)
                .filter(|expr| !expr.is_empty())
                .ok_or_else(|| missing("cron_expression", strategy))?;
            Ok(literal.to_string())
        }
        ScheduleType::FixedRate => {
            let interval = strategy
                .interval_seconds
                .ok_or_else(|| missing("interval_seconds", strategy))?;
            fixed_rate_expression(interval)
        }
        ScheduleType::Daily => {
            let (h, m, s) = time_of_day(strategy)?;
            Ok(format!("{} {} {} * * ?", s, m, h))
        }
        ScheduleType::Weekly => {
            let (h, m, s) = time_of_day(strategy)?;
            let days = strategy
                .days_of_week
                .as_deref()
                .map(|d| d.split_whitespace().collect::<String>())
                .filter(|d| !d.is_empty())
                .ok_or_else(|| missing("days_of_week", strategy))?;
            validate_days_of_week(&days)?;
            Ok(format!("{} {} {} ? * {}", s, m, h, days))
        }
    }
}

/// The expression the trigger loop should register.
///
/// CRON strategies use their literal text. For derived types the stored
/// expression is only a cache: it is re-derived, and a stale stored value is
/// reported and ignored.
pub fn effective_cron(strategy: &ScheduleStrategy) -> Result<String, ConfigError> {
    let resolved = resolve(strategy)?;

    if strategy.schedule_type != ScheduleType::Cron {
        if let Some(stored) = strategy.cron_expression.as_deref() {
            if stored.trim() != resolved {
                warn!(
                    "Strategy '{}' stores cron '{}' but its {} fields derive '{}'; using derived",
                    strategy.name, stored, strategy.schedule_type, resolved
                );
            }
        }
    }

    validate_cron(&resolved)?;
    Ok(resolved)
}

/// Seconds-field repeat for short intervals, coarser fields for whole
/// minutes or hours. Intervals that no single cron field can express are
/// rejected.
fn fixed_rate_expression(interval: i64) -> Result<String, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        field: "interval_seconds".to_string(),
        reason: format!("{} (got {})", reason, interval),
    };

    if interval <= 0 {
        return Err(invalid("must be positive"));
    }
    if interval < SECONDS_PER_MINUTE {
        return Ok(format!("0/{} * * * * ?", interval));
    }
    if interval % SECONDS_PER_HOUR == 0 && interval / SECONDS_PER_HOUR < 24 {
        return Ok(format!("0 0 0/{} * * ?", interval / SECONDS_PER_HOUR));
    }
    if interval % SECONDS_PER_MINUTE == 0 && interval / SECONDS_PER_MINUTE < 60 {
        return Ok(format!("0 0/{} * * * ?", interval / SECONDS_PER_MINUTE));
    }

    Err(invalid(
        "intervals of a minute or more must be whole minutes below 60 or whole hours below 24",
    ))
}

fn time_of_day(strategy: &ScheduleStrategy) -> Result<(u32, u32, u32), ConfigError> {
    let start = strategy
        .start_time
        .ok_or_else(|| missing("start_time", strategy))?;
    Ok((start.hour(), start.minute(), start.second()))
}

fn missing(field: &str, strategy: &ScheduleStrategy) -> ConfigError {
    ConfigError::MissingRequired {
        field: field.to_string(),
        context: format!("{} strategy '{}'", strategy.schedule_type, strategy.name),
    }
}

/// Comma-separated day numbers, 1 (Sunday) through 7 (Saturday).
pub fn validate_days_of_week(days: &str) -> Result<(), ConfigError> {
    for part in days.split(',') {
        let day = part.trim().parse::<u32>().map_err(|_| ConfigError::InvalidValue {
            field: "days_of_week".to_string(),
            reason: format!("'{}' is not a day number", part),
        })?;
        if !(1..=7).contains(&day) {
            return Err(ConfigError::InvalidValue {
                field: "days_of_week".to_string(),
                reason: format!("day {} is outside 1-7", day),
            });
        }
    }
    Ok(())
}

const MONTH_NAMES: &[&str] = &[
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];
const DAY_NAMES: &[&str] = &["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

#[derive(Clone, Copy, PartialEq, Eq)]
enum Specials {
    None,
    /// `L`, `LW` and `nW`
    DayOfMonth,
    /// `L`, `nL` and `n#k`
    DayOfWeek,
}

struct CronField {
    name: &'static str,
    min: u32,
    max: u32,
    names: &'static [&'static str],
    specials: Specials,
}

const FIELDS: [CronField; 6] = [
    CronField { name: "second", min: 0, max: 59, names: &[], specials: Specials::None },
    CronField { name: "minute", min: 0, max: 59, names: &[], specials: Specials::None },
    CronField { name: "hour", min: 0, max: 23, names: &[], specials: Specials::None },
    CronField { name: "day", min: 1, max: 31, names: &[], specials: Specials::DayOfMonth },
    CronField { name: "month", min: 1, max: 12, names: MONTH_NAMES, specials: Specials::None },
    CronField { name: "dayofweek", min: 1, max: 7, names: DAY_NAMES, specials: Specials::DayOfWeek },
];

impl CronField {
    fn invalid(&self, reason: String) -> ConfigError {
        ConfigError::InvalidValue {
            field: format!("cron {}", self.name),
            reason,
        }
    }

    /// A single number or name, checked against the field's range.
    fn value(&self, raw: &str) -> Result<u32, ConfigError> {
        let value = match raw.parse::<u32>() {
            Ok(value) => value,
            Err(_) => self
                .names
                .iter()
                .position(|name| name.eq_ignore_ascii_case(raw))
                .map(|index| index as u32 + self.min)
                .ok_or_else(|| self.invalid(format!("'{}' is not a number", raw)))?,
        };
        if value < self.min || value > self.max {
            return Err(self.invalid(format!(
                "{} is outside valid range {}-{}",
                value, self.min, self.max
            )));
        }
        Ok(value)
    }

    /// `None` when the part is not one of the field's special forms.
    fn special(&self, part: &str) -> Option<Result<(), ConfigError>> {
        match self.specials {
            Specials::None => None,
            Specials::DayOfMonth => {
                if part == "L" || part == "LW" {
                    return Some(Ok(()));
                }
                part.strip_suffix('W')
                    .map(|day| self.value(day).map(|_| ()))
            }
            Specials::DayOfWeek => {
                if part == "L" {
                    return Some(Ok(()));
                }
                if let Some((day, nth)) = part.split_once('#') {
                    return Some(self.value(day).and_then(|_| match nth.parse::<u32>() {
                        Ok(1..=5) => Ok(()),
                        _ => Err(self.invalid(format!("'#{}' must be 1-5", nth))),
                    }));
                }
                part.strip_suffix('L')
                    .map(|day| self.value(day).map(|_| ()))
            }
        }
    }

    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        field.split(',').try_for_each(|part| self.validate_part(part))
    }

    fn validate_part(&self, part: &str) -> Result<(), ConfigError> {
        if part == "*" || part == "?" {
            return Ok(());
        }
        if let Some(result) = self.special(part) {
            return result;
        }

        let base = match part.split_once('/') {
            Some((base, step)) => {
                let step = step
                    .parse::<u32>()
                    .map_err(|_| self.invalid(format!("step '{}' is not a number", step)))?;
                if step == 0 {
                    return Err(self.invalid("step value cannot be 0".to_string()));
                }
                if base == "*" {
                    return Ok(());
                }
                base
            }
            None => part,
        };

        if let Some((start, end)) = base.split_once('-') {
            let (start, end) = (self.value(start)?, self.value(end)?);
            if start > end {
                return Err(self.invalid(format!("range {}-{} is reversed", start, end)));
            }
            return Ok(());
        }

        self.value(base).map(|_| ())
    }
}

/// Check the 6-field shape and per-field ranges.
///
/// Accepts Quartz forms: month and weekday names, `L`/`W` in day-of-month,
/// `L`/`#` in day-of-week, and steps over a range.
pub fn validate_cron(schedule: &str) -> Result<(), ConfigError> {
    let parts: Vec<&str> = schedule.split_whitespace().collect();

    if parts.len() != 6 {
        return Err(ConfigError::InvalidValue {
            field: "cron_expression".to_string(),
            reason: format!(
                "expected 6 fields (sec min hour day month dow), got {}: '{}'",
                parts.len(),
                schedule
            ),
        });
    }

    FIELDS
        .iter()
        .zip(parts)
        .try_for_each(|(field, part)| field.validate(part))
}

/// Rewrite a validated expression for the trigger loop's parser, which
/// numbers weekdays 0 (Sunday) through 6 and has no `?` token. Names are
/// left for the parser to map.
pub fn scheduler_expression(schedule: &str) -> Result<String, ConfigError> {
    validate_cron(schedule)?;
    let mut parts: Vec<String> = schedule
        .split_whitespace()
        .map(|part| if part == "?" { "*".to_string() } else { part.to_string() })
        .collect();
    parts[5] = shift_day_of_week(&parts[5]);
    Ok(parts.join(" "))
}

fn shift_day_of_week(field: &str) -> String {
    field
        .split(',')
        .map(|part| match part.split_once('/') {
            Some((base, step)) => format!("{}/{}", shift_day_range(base), step),
            None => shift_day_range(part),
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn shift_day_range(base: &str) -> String {
    match base.split_once('-') {
        Some((start, end)) => format!("{}-{}", shift_day(start), shift_day(end)),
        None => shift_day(base),
    }
}

/// Shift the leading day number, keeping any `L` or `#k` suffix.
fn shift_day(token: &str) -> String {
    // A bare `L` means Saturday
    if token == "L" {
        return "6".to_string();
    }
    let digits = token.len() - token.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    match token[..digits].parse::<u32>() {
        Ok(day) => format!("{}{}", day.saturating_sub(1), &token[digits..]),
        Err(_) => token.to_string(),
    }
}
