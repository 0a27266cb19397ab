//! Per-firing context and the active-firings tracker
//!
//! The context is an explicit value handed down the call chain. The tracker
//! hands out a scope guard per firing which:
//!
//! - **Serializes firings per job**: a second firing of a running job waits
//!   for the first to finish instead of being dropped
//! - **Tracks running firings**: status snapshots for diagnostics
//! - **Releases on every exit path**: the scope is removed when the guard is
//!   dropped, including on error or panic. A job's lock is dropped with the
//!   last firing that holds or waits on it
//!
//! # Usage
//!
//! ```ignore
//! let scope = firings.acquire(context).await;
//! let outcome = orchestrator.execute(scope.context()).await;
//! drop(scope);
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct FiringContext {
    pub firing_id: Uuid,
    pub job_id: i64,
    pub strategy_id: Option<i64>,
    pub retry_count: u32,
    pub scheduled_fire_time: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
}

impl FiringContext {
    pub fn new(
        job_id: i64,
        strategy_id: Option<i64>,
        retry_count: u32,
        scheduled_fire_time: DateTime<Utc>,
    ) -> Self {
        Self {
            firing_id: Uuid::new_v4(),
            job_id,
            strategy_id,
            retry_count,
            scheduled_fire_time,
            received_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FiringStatus {
    pub active: Vec<FiringContext>,
    pub total_active: usize,
}

type ActiveMap = Arc<Mutex<HashMap<Uuid, FiringContext>>>;
type JobLocks = Arc<Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>>;

#[derive(Default)]
pub struct ActiveFirings {
    job_locks: JobLocks,
    active: ActiveMap,
}

impl ActiveFirings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the scope for a firing, waiting while another firing of the
    /// same job is still running.
    pub async fn acquire(&self, context: FiringContext) -> FiringScope {
        let job_lock = {
            let mut locks = self.job_locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks
                .entry(context.job_id)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        let permit = match job_lock.clone().try_lock_owned() {
            Ok(permit) => permit,
            Err(_) => {
                info!(
                    "Job {} is still running, deferring firing {}",
                    context.job_id, context.firing_id
                );
                job_lock.lock_owned().await
            }
        };

        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(context.firing_id, context.clone());
        debug!("Firing {} entered for job {}", context.firing_id, context.job_id);

        FiringScope {
            context,
            active: self.active.clone(),
            job_locks: self.job_locks.clone(),
            permit: Some(permit),
        }
    }

    pub fn is_running(&self, job_id: i64) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .any(|ctx| ctx.job_id == job_id)
    }

    pub fn status(&self) -> FiringStatus {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        let mut firings: Vec<FiringContext> = active.values().cloned().collect();
        firings.sort_by_key(|ctx| ctx.received_at);
        FiringStatus {
            total_active: firings.len(),
            active: firings,
        }
    }
}

/// Guard for one running firing; see [`ActiveFirings::acquire`].
pub struct FiringScope {
    context: FiringContext,
    active: ActiveMap,
    job_locks: JobLocks,
    permit: Option<OwnedMutexGuard<()>>,
}

impl FiringScope {
    pub fn context(&self) -> &FiringContext {
        &self.context
    }
}

impl Drop for FiringScope {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.context.firing_id);

        // Release first so the map holds the only reference unless a
        // firing of the same job is waiting
        drop(self.permit.take());
        let mut locks = self.job_locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.context.job_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.context.job_id);
        }
        drop(locks);

        let elapsed = Utc::now().signed_duration_since(self.context.received_at);
        debug!(
            "Firing {} released for job {} after {}ms",
            self.context.firing_id,
            self.context.job_id,
            elapsed.num_milliseconds()
        );
    }
}
