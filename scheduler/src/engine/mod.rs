//! Trigger-driven execution engine
//!
//! This module turns trigger events into ledger rows:
//! - `trigger_loop` - cron and one-shot triggers (tokio-cron-scheduler) and the dispatcher
//! - `trigger` - payload extraction and the adapter guarding each firing
//! - `context` - the explicit per-firing context and the active-firings tracker
//! - `orchestrator` - skip / dispatch / retry / fail decisions and ledger writes
//!
//! # Flow
//!
//! ```text
//! cron tick / one-shot retry
//!        ↓
//!   Firing channel → dispatcher (task per firing, drained on shutdown)
//!        ↓
//!   TriggerAdapter (scope: per-job serialization)
//!        ↓
//!   Orchestrator → HandlerRegistry → handler
//!        ↓
//!   ExecutionLedger (+ RetryScheduler on retryable failure)
//! ```

pub mod context;
pub mod orchestrator;
pub mod trigger;
pub mod trigger_loop;

pub use context::{ActiveFirings, FiringContext, FiringScope, FiringStatus};
pub use orchestrator::{FiringOutcome, Orchestrator, RetryPolicy, RetryScheduler, SkipReason};
pub use trigger::{TriggerAdapter, TriggerFailure, TriggerPayload};
pub use trigger_loop::{spawn_dispatcher, CronTriggerLoop, Dispatcher, Firing};
