//! Common definitions used across tests

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde_json::{json, Value};

use scheduler::database::{JobDefinition, JobType, ScheduleStrategy, ScheduleType};
use scheduler::engine::FiringContext;

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Time of day on the epoch date, as config sync stores bare times
pub fn time_of_day(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDateTime::new(
        NaiveDate::default(),
        NaiveTime::from_hms_opt(h, m, s).unwrap(),
    )
}

fn strategy(name: &str, schedule_type: ScheduleType) -> ScheduleStrategy {
    ScheduleStrategy {
        id: 0,
        name: name.to_string(),
        schedule_type,
        cron_expression: None,
        start_time: None,
        end_time: None,
        time_zone: None,
        interval_seconds: None,
        days_of_week: None,
    }
}

pub fn cron_strategy(name: &str, expression: &str) -> ScheduleStrategy {
    ScheduleStrategy {
        cron_expression: Some(expression.to_string()),
        ..strategy(name, ScheduleType::Cron)
    }
}

pub fn fixed_rate_strategy(name: &str, interval_seconds: i64) -> ScheduleStrategy {
    ScheduleStrategy {
        interval_seconds: Some(interval_seconds),
        ..strategy(name, ScheduleType::FixedRate)
    }
}

pub fn daily_strategy(name: &str, h: u32, m: u32, s: u32) -> ScheduleStrategy {
    ScheduleStrategy {
        start_time: Some(time_of_day(h, m, s)),
        ..strategy(name, ScheduleType::Daily)
    }
}

pub fn weekly_strategy(name: &str, h: u32, m: u32, s: u32, days: &str) -> ScheduleStrategy {
    ScheduleStrategy {
        start_time: Some(time_of_day(h, m, s)),
        days_of_week: Some(days.to_string()),
        ..strategy(name, ScheduleType::Weekly)
    }
}

pub fn job(name: &str, job_type: JobType, strategy_id: i64, job_config: Value) -> JobDefinition {
    JobDefinition {
        id: 0,
        name: name.to_string(),
        job_type,
        job_config,
        schedule_strategy_id: strategy_id,
        precondition_config: None,
        enabled: true,
    }
}

pub fn http_job(name: &str, strategy_id: i64, url: &str) -> JobDefinition {
    job(name, JobType::Http, strategy_id, json!({ "url": url }))
}

pub fn command_job(name: &str, strategy_id: i64, command: &str) -> JobDefinition {
    job(
        name,
        JobType::Command,
        strategy_id,
        json!({ "command": command, "timeoutSeconds": 5 }),
    )
}

pub fn internal_job(name: &str, strategy_id: i64, handler_key: &str) -> JobDefinition {
    job(
        name,
        JobType::InternalService,
        strategy_id,
        json!({ "handlerKey": handler_key, "parameters": { "batch": 10 } }),
    )
}

/// A job as handlers see it, without touching the database
pub fn standalone_job(id: i64, job_type: JobType, job_config: Value) -> JobDefinition {
    JobDefinition {
        id,
        ..job("standalone", job_type, 1, job_config)
    }
}

pub fn firing(job_id: i64, retry_count: u32) -> FiringContext {
    FiringContext::new(job_id, None, retry_count, Utc::now())
}
