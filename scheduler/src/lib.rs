pub mod calendar;
pub mod config;
pub mod constants;
pub mod cron_resolver;
pub mod database;
pub mod engine;
pub mod errors;
pub mod handlers;
pub mod store;

// Re-export commonly used types
pub use config::{Config, ConfigManager};
pub use database::Database;
pub use engine::{
    spawn_dispatcher, ActiveFirings, CronTriggerLoop, Dispatcher, FiringContext, FiringOutcome,
    Orchestrator, RetryPolicy, TriggerAdapter,
};
pub use errors::{ConfigError, EngineError, EngineResult, ExecutionError};
pub use handlers::{HandlerRegistry, InternalTaskRegistry, JobHandler};
