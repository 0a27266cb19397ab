//! Central repository for defaults, timeouts and limits
//!
//! Organized by category so every magic number has one home.

/// Handler defaults applied when a job config omits them
pub mod handlers {
    /// HTTP request timeout when `timeoutSeconds` is absent
    pub const HTTP_TIMEOUT_SECONDS: u64 = 30;

    /// Subprocess timeout when `timeoutSeconds` is absent
    pub const COMMAND_TIMEOUT_SECONDS: u64 = 60;

    /// Connect timeout for the shared HTTP client
    pub const HTTP_CONNECT_TIMEOUT_SECONDS: u64 = 10;
}

/// Engine configuration defaults
pub mod defaults {
    /// Total attempts per firing lineage, the first one included
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Delay before a retry firing
    pub const RETRY_INTERVAL_SECONDS: u64 = 60;

    pub const DATABASE_PATH: &str = "data/scheduler.db";

    pub const TIME_ZONE: &str = "UTC";

    pub const CONFIG_DIR: &str = "config";

    /// How long shutdown waits for running firings to record their outcome
    pub const SHUTDOWN_GRACE_SECONDS: u64 = 30;

    pub const USER_AGENT: &str = concat!("scheduler/", env!("CARGO_PKG_VERSION"));
}

/// Limits and constraints
pub mod limits {
    /// Characters of response body / stderr kept in ledger error messages
    pub const ERROR_OUTPUT_CHARS: usize = 512;

    /// Ledger rows logged per job at startup
    pub const RECENT_EXECUTIONS: i64 = 5;
}
