// File: scheduler/src/main.rs
use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use scheduler::config::sync_definitions;
use scheduler::constants::{self, defaults, limits};
use scheduler::engine::{
    spawn_dispatcher, ActiveFirings, CronTriggerLoop, Orchestrator, RetryPolicy, TriggerAdapter,
};
use scheduler::handlers::{HandlerRegistry, InternalTaskRegistry};
use scheduler::{ConfigManager, Database};

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("scheduler=info".parse()?)
        .add_directive("tokio_cron_scheduler=warn".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("sqlx=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    info!("Starting job scheduler");

    let config_dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| defaults::CONFIG_DIR.to_string());

    // Load configuration
    let config_manager = ConfigManager::new(config_dir.clone()).await?;
    let config = config_manager.get_current_config();
    info!(
        "Configuration loaded from {}: {} strategies, {} jobs",
        config_dir,
        config.strategies.len(),
        config.jobs.len()
    );

    // Initialize database and write definitions into it
    let database = Arc::new(Database::new(&config.database_path).await?);
    sync_definitions(&config, &database).await?;
    info!("Database initialized");

    // Handlers
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(constants::handlers::HTTP_CONNECT_TIMEOUT_SECONDS))
        .user_agent(
            config
                .http_user_agent
                .clone()
                .unwrap_or_else(|| defaults::USER_AGENT.to_string()),
        )
        .build()
        .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;
    let internal_tasks = Arc::new(InternalTaskRegistry::new());
    let handler_registry = Arc::new(HandlerRegistry::with_builtin_handlers(
        client,
        internal_tasks.clone(),
    ));
    info!("Handler registry initialized");

    // Trigger loop and orchestrator
    let (firings_tx, firings_rx) = mpsc::unbounded_channel();
    let trigger_loop = Arc::new(CronTriggerLoop::new(firings_tx).await?);

    let policy = RetryPolicy {
        max_attempts: config.max_attempts,
        retry_interval: Duration::from_secs(config.retry_interval_seconds),
    };
    info!(
        "Retry policy: {} attempts, {}s apart",
        policy.max_attempts, config.retry_interval_seconds
    );

    let orchestrator = Arc::new(Orchestrator::new(
        database.clone(),
        database.clone(),
        database.clone(),
        handler_registry,
        trigger_loop.clone(),
        policy,
    ));
    let adapter = Arc::new(TriggerAdapter::new(
        orchestrator,
        Arc::new(ActiveFirings::new()),
    ));
    let dispatcher = spawn_dispatcher(firings_rx, adapter);
    info!("Orchestrator initialized");

    let jobs = database.list_jobs().await?;
    for (name, key) in internal_tasks.unknown_keys(&jobs) {
        warn!(
            "Job '{}' uses internal task '{}', which is not registered (known: {:?}); its firings will fail",
            name,
            key,
            internal_tasks.keys()
        );
    }

    // Register every enabled job on its strategy
    let mut registered = 0;
    for job in jobs {
        if !job.enabled {
            info!("Job {} ({}) is disabled, not registering", job.id, job.name);
            continue;
        }

        let strategy = match database.get_strategy(job.schedule_strategy_id).await? {
            Some(strategy) => strategy,
            None => {
                error!(
                    "Job {} ({}) references missing strategy {}",
                    job.id, job.name, job.schedule_strategy_id
                );
                continue;
            }
        };

        match trigger_loop.register(&job, &strategy).await {
            Ok(_) => registered += 1,
            Err(e) => error!("Failed to register job {} ({}): {}", job.id, job.name, e),
        }

        let recent = database
            .recent_executions(job.id, limits::RECENT_EXECUTIONS)
            .await?;
        if let Some(last) = recent.first() {
            info!(
                "Job {} last ran at {} with status {}",
                job.id, last.scheduled_fire_time, last.status
            );
        }
    }

    trigger_loop.start().await?;
    info!("Scheduler started with {} registered jobs", registered);

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }

    info!("Shutting down");
    trigger_loop.shutdown().await?;
    if dispatcher
        .shutdown(Duration::from_secs(defaults::SHUTDOWN_GRACE_SECONDS))
        .await
    {
        info!("All in-flight firings recorded");
    }

    Ok(())
}
