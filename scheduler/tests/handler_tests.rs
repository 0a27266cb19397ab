//! Tests for the built-in HTTP, command and internal-service handlers

mod common;

use common::fixtures::*;
use serde_json::json;
use std::sync::Arc;

use scheduler::database::JobType;
use scheduler::errors::{ConfigError, EngineError, ExecutionError};
use scheduler::handlers::{
    CommandHandler, HandlerRegistry, HttpHandler, InternalServiceHandler, InternalTaskRegistry,
    JobHandler,
};

// ============================================================================
// HTTP
// ============================================================================

#[tokio::test]
async fn test_http_get_success() {
    let backend = MockBackend::start().await;
    backend.respond("GET", "/reports", 200, "ok").await;

    let job = standalone_job(
        7,
        JobType::Http,
        json!({ "url": backend.url("/reports"), "method": "GET" }),
    );
    let context = firing(7, 0);

    HttpHandler::default().handle(&job, &context).await.unwrap();

    let requests = backend.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method.as_str(), "GET");
    assert_eq!(
        requests[0].headers.get("x-scheduler-job-id").unwrap(),
        "7"
    );
    assert_eq!(
        requests[0].headers.get("x-scheduler-firing-id").unwrap(),
        context.firing_id.to_string().as_str()
    );
}

#[tokio::test]
async fn test_http_defaults_to_post_with_body_and_headers() {
    let backend = MockBackend::start().await;
    backend.respond("POST", "/hook", 204, "").await;

    let job = standalone_job(
        3,
        JobType::Http,
        json!({
            "url": backend.url("/hook"),
            "body": "{\"run\":true}",
            "headers": { "Authorization": "Bearer token", "Content-Type": "application/json" }
        }),
    );

    HttpHandler::default().handle(&job, &firing(3, 1)).await.unwrap();

    let requests = backend.requests().await;
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method.as_str(), "POST");
    assert_eq!(request.body, b"{\"run\":true}".to_vec());
    assert_eq!(request.headers.get("authorization").unwrap(), "Bearer token");
    assert_eq!(request.headers.get("x-scheduler-retry-count").unwrap(), "1");
}

#[tokio::test]
async fn test_http_non_2xx_is_execution_error() {
    let backend = MockBackend::start().await;
    backend.respond("POST", "/fail", 500, "database down").await;

    let job = standalone_job(1, JobType::Http, json!({ "url": backend.url("/fail") }));
    let err = HttpHandler::default()
        .handle(&job, &firing(1, 0))
        .await
        .unwrap_err();

    match err {
        EngineError::Execution(ExecutionError::HttpStatus { status, body, .. }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "database down");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_http_timeout_is_retryable() {
    let backend = MockBackend::start().await;
    backend
        .respond_slowly("/slow", std::time::Duration::from_secs(3))
        .await;

    let job = standalone_job(
        1,
        JobType::Http,
        json!({ "url": backend.url("/slow"), "timeoutSeconds": 1 }),
    );
    let err = HttpHandler::default()
        .handle(&job, &firing(1, 0))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Execution(ExecutionError::HttpRequest { .. })
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_http_missing_url_is_config_error() {
    let job = standalone_job(4, JobType::Http, json!({ "method": "GET" }));
    let err = HttpHandler::default()
        .handle(&job, &firing(4, 0))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Config(ConfigError::MalformedJobConfig { job_id: 4, .. })
    ));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_http_invalid_method_is_config_error() {
    let job = standalone_job(
        4,
        JobType::Http,
        json!({ "url": "http://127.0.0.1:1/x", "method": "NOT A METHOD" }),
    );
    let err = HttpHandler::default()
        .handle(&job, &firing(4, 0))
        .await
        .unwrap_err();
    assert!(!err.is_retryable());
}

// ============================================================================
// Command
// ============================================================================

#[tokio::test]
async fn test_command_success() {
    let job = standalone_job(
        10,
        JobType::Command,
        json!({ "command": "test \"$SCHEDULER_JOB_ID\" = 10 && echo done" }),
    );
    CommandHandler::new().handle(&job, &firing(10, 0)).await.unwrap();
}

#[tokio::test]
async fn test_command_non_zero_exit_carries_stderr() {
    let job = standalone_job(
        11,
        JobType::Command,
        json!({ "command": "echo 'disk full' >&2; exit 3" }),
    );
    let err = CommandHandler::new()
        .handle(&job, &firing(11, 0))
        .await
        .unwrap_err();

    match err {
        EngineError::Execution(ExecutionError::CommandExit { code, stderr, .. }) => {
            assert_eq!(code, 3);
            assert!(stderr.contains("disk full"));
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_command_timeout_kills_process() {
    let job = standalone_job(
        12,
        JobType::Command,
        json!({ "command": "sleep 5", "timeoutSeconds": 1 }),
    );
    let started = std::time::Instant::now();
    let err = CommandHandler::new()
        .handle(&job, &firing(12, 0))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Execution(ExecutionError::CommandTimeout {
            timeout_seconds: 1,
            ..
        })
    ));
    assert!(started.elapsed() < std::time::Duration::from_secs(4));
}

#[tokio::test]
async fn test_command_uses_working_directory_and_environment() {
    let dir = tempfile::TempDir::new().unwrap();
    let job = standalone_job(
        13,
        JobType::Command,
        json!({
            "command": "echo \"$GREETING\" > out.txt",
            "workingDirectory": dir.path().display().to_string(),
            "environment": { "GREETING": "hello" }
        }),
    );

    CommandHandler::new().handle(&job, &firing(13, 0)).await.unwrap();

    let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
    assert_eq!(written.trim(), "hello");
}

#[tokio::test]
async fn test_command_missing_command_is_config_error() {
    let job = standalone_job(14, JobType::Command, json!({ "timeoutSeconds": 5 }));
    let err = CommandHandler::new()
        .handle(&job, &firing(14, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
}

// ============================================================================
// Internal service
// ============================================================================

#[tokio::test]
async fn test_internal_task_receives_parameters() {
    let task = RecordingTask::new();
    let mut tasks = InternalTaskRegistry::new();
    tasks.register("reports.rollup", task.clone());
    let handler = InternalServiceHandler::new(Arc::new(tasks));

    let job = standalone_job(
        20,
        JobType::InternalService,
        json!({ "handlerKey": "reports.rollup", "parameters": { "days": 7 } }),
    );
    handler.handle(&job, &firing(20, 0)).await.unwrap();

    let runs = task.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].get("days"), Some(&json!(7)));
}

#[tokio::test]
async fn test_internal_unregistered_key_is_config_error() {
    let handler = InternalServiceHandler::new(Arc::new(InternalTaskRegistry::new()));
    let job = standalone_job(
        21,
        JobType::InternalService,
        json!({ "handlerKey": "missing.task" }),
    );

    let err = handler.handle(&job, &firing(21, 0)).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Config(ConfigError::UnregisteredHandlerKey(ref key)) if key == "missing.task"
    ));
}

#[tokio::test]
async fn test_internal_task_error_is_retryable() {
    let mut tasks = InternalTaskRegistry::new();
    tasks.register("flaky", RecordingTask::failing("upstream refused"));
    let handler = InternalServiceHandler::new(Arc::new(tasks));
    let job = standalone_job(22, JobType::InternalService, json!({ "handlerKey": "flaky" }));

    let err = handler.handle(&job, &firing(22, 0)).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(err.to_string().contains("upstream refused"));
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn test_registry_resolves_builtin_types() {
    let registry = HandlerRegistry::with_builtin_handlers(
        reqwest::Client::new(),
        Arc::new(InternalTaskRegistry::new()),
    );

    for job_type in [JobType::Http, JobType::Command, JobType::InternalService] {
        assert!(registry.resolve(job_type).is_ok(), "{}", job_type);
    }
    assert_eq!(registry.registered_types().len(), 3);
}

#[test]
fn test_empty_registry_reports_unregistered_type() {
    let registry = HandlerRegistry::new();
    assert!(matches!(
        registry.resolve(JobType::Command),
        Err(ConfigError::UnregisteredJobType(JobType::Command))
    ));
}

#[test]
fn test_internal_registry_lists_sorted_keys() {
    let mut tasks = InternalTaskRegistry::new();
    tasks.register("b.task", RecordingTask::new());
    tasks.register("a.task", RecordingTask::new());
    assert_eq!(tasks.keys(), vec!["a.task".to_string(), "b.task".to_string()]);
}

#[test]
fn test_internal_registry_reports_unknown_keys() {
    let mut tasks = InternalTaskRegistry::new();
    tasks.register("reports.rollup", RecordingTask::new());

    let mut disabled = internal_job("disabled", 1, "missing.task");
    disabled.enabled = false;
    let jobs = vec![
        internal_job("known", 1, "reports.rollup"),
        internal_job("unknown", 1, "missing.task"),
        disabled,
        http_job("http", 1, "http://backend/run"),
        standalone_job(9, JobType::InternalService, json!({ "parameters": {} })),
    ];

    assert_eq!(
        tasks.unknown_keys(&jobs),
        vec![("unknown".to_string(), "missing.task".to_string())]
    );
}
