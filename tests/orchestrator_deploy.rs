// tests/orchestrator_deploy.rs
mod common;
use crate::common::{
    FakeBackend, Harness, RegistrationBuilder, ScriptDir, closed_url, http_responder,
    init_tracing, with_timeout,
};

use std::sync::Arc;
use std::time::{Duration, Instant};

use cmdrunner::errors::DispatchError;
use cmdrunner::exec::{BackendRegistry, FailureKind};
use cmdrunner::health::HealthStatus;
use cmdrunner::orchestrator::CallOptions;
use cmdrunner::registry::HistoryDetails;

const DEPLOY_SCRIPT: &str = "echo starting\nsleep 2\necho Deployment completed successfully!\n";

fn deployment(command: &str, url: &str) -> cmdrunner::registry::Registration {
    RegistrationBuilder::deploy("web", command)
        .success("Deployment completed successfully!")
        .failure("Deployment failed!")
        .max_wait_for_startup(10)
        .health_check_url(url)
        .health_check_timeout(2)
        .build()
}

#[tokio::test]
async fn deploy_with_healthy_service_succeeds() {
    init_tracing();

    let (url, server) = http_responder(200).await;
    let dir = ScriptDir::new();
    let command = dir.script("deploy.sh", DEPLOY_SCRIPT);
    let harness = Harness::new(vec![deployment(&command, &url)]);

    let started = Instant::now();
    let result = with_timeout(harness.orchestrator.deploy(&CallOptions::new("web")))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(result.success(), "unexpected failure: {:?}", result.error());
    assert_eq!(result.status, Some(HealthStatus::Healthy));
    assert_eq!(result.status.as_ref().unwrap().to_string(), "HEALTHY");
    assert!(result.health_response_time_ms.is_some());
    assert_eq!(result.deployment_url.as_deref(), Some(url.as_str()));
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_secs(6), "took {elapsed:?}");

    match harness.history.find(result.run_id).unwrap().details {
        HistoryDetails::Deploy { health, .. } => {
            assert_eq!(health.map(|h| h.status), Some(HealthStatus::Healthy));
        }
        other => panic!("unexpected details {other:?}"),
    }
    server.abort();
}

#[tokio::test]
async fn unhealthy_service_fails_the_deployment() {
    init_tracing();

    let (url, server) = http_responder(500).await;
    let dir = ScriptDir::new();
    let command = dir.script("deploy.sh", DEPLOY_SCRIPT);
    let harness = Harness::new(vec![deployment(&command, &url)]);

    let result = with_timeout(harness.orchestrator.deploy(&CallOptions::new("web")))
        .await
        .unwrap();

    assert!(!result.success());
    assert_eq!(result.outcome.failure, Some(FailureKind::HealthCheck));
    assert!(result.error().unwrap_or_default().contains("Health check failed"));
    let status = result.status.as_ref().unwrap().to_string();
    assert!(status.starts_with("UNHEALTHY"), "status {status}");
    assert!(result.health_response_time_ms.is_some());
    server.abort();
}

#[tokio::test]
async fn unreachable_health_url_is_unhealthy() {
    init_tracing();

    let url = closed_url().await;
    let harness = Harness::new(vec![
        RegistrationBuilder::deploy("web", "echo up")
            .health_check_url(&url)
            .health_check_timeout(2)
            .build(),
    ]);

    let result = with_timeout(harness.orchestrator.deploy(&CallOptions::new("web")))
        .await
        .unwrap();

    assert!(!result.success());
    assert!(matches!(result.status, Some(HealthStatus::Unhealthy(_))));
}

#[tokio::test]
async fn deploy_failure_pattern_stops_early_and_skips_health() {
    init_tracing();

    let (url, server) = http_responder(200).await;
    let dir = ScriptDir::new();
    let command = dir.script("deploy.sh", "echo Deployment failed!\nsleep 30\n");
    let harness = Harness::new(vec![deployment(&command, &url)]);

    let started = Instant::now();
    let result = with_timeout(harness.orchestrator.deploy(&CallOptions::new("web")))
        .await
        .unwrap();

    assert!(!result.success());
    assert_eq!(result.error(), Some("Failure pattern found in input"));
    assert!(result.status.is_none());
    assert!(!result.is_running);
    assert!(started.elapsed() < Duration::from_secs(6));
    server.abort();
}

#[tokio::test]
async fn deploy_requests_are_strict_and_stop_early() {
    init_tracing();

    let backend = Arc::new(FakeBackend::succeeding("Deployment completed successfully!"));
    let requests = backend.requests();
    let mut backends = BackendRegistry::new();
    backends.register(backend);

    let harness = Harness::with_backends(
        vec![
            RegistrationBuilder::deploy("web", "bash deploy.sh")
                .timeout(120)
                .max_wait_for_startup(30)
                .build(),
        ],
        backends,
    );

    let result = harness
        .orchestrator
        .deploy(&CallOptions::new("web"))
        .await
        .unwrap();
    assert!(result.success());
    assert!(result.status.is_none());

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].strict_success_patterns);
    assert!(requests[0].stop_early_on_failure);
    assert_eq!(requests[0].max_wait_for_pattern_seconds, Some(30));
    assert_eq!(requests[0].timeout_seconds, Some(120));
}

#[tokio::test]
async fn stop_runs_the_stop_command_even_when_disabled() {
    init_tracing();

    let dir = ScriptDir::new();
    let stop = dir.script("stop.sh", "echo stopped web\n");
    let harness = Harness::new(vec![
        RegistrationBuilder::deploy("web", "echo deploy")
            .success("never printed")
            .stop_command(&stop)
            .disabled()
            .build(),
    ]);

    let result = with_timeout(
        harness
            .orchestrator
            .stop_deployment(&CallOptions::new("web").with_session("s-9")),
    )
    .await
    .unwrap();

    // The stop command runs without the deployment's patterns.
    assert!(result.success(), "unexpected failure: {:?}", result.error());
    assert_eq!(result.status, Some(HealthStatus::Stopped));
    assert_eq!(result.outcome.full_log, "stopped web");
    assert!(!result.is_running);

    let record = harness.history.find(result.run_id).unwrap();
    assert_eq!(record.details, HistoryDetails::Stop);
    assert_eq!(record.session_id.as_deref(), Some("s-9"));
}

#[tokio::test]
async fn stop_without_a_stop_command_fails_without_spawning() {
    init_tracing();

    let backend = Arc::new(FakeBackend::succeeding("unused"));
    let requests = backend.requests();
    let mut backends = BackendRegistry::new();
    backends.register(backend);

    let harness = Harness::with_backends(
        vec![RegistrationBuilder::deploy("web", "echo deploy").build()],
        backends,
    );

    let result = harness
        .orchestrator
        .stop_deployment(&CallOptions::new("web"))
        .await
        .unwrap();

    assert!(!result.success());
    assert_eq!(
        result.error(),
        Some("No stop command configured for deployment: web")
    );
    assert_eq!(result.outcome.failure, Some(FailureKind::Internal));
    assert_eq!(result.status, Some(HealthStatus::Stopped));
    assert!(requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn stop_requires_an_existing_deployment() {
    init_tracing();

    let harness = Harness::new(vec![]);
    let result = harness
        .orchestrator
        .stop_deployment(&CallOptions::new("ghost"))
        .await;

    assert!(matches!(result, Err(DispatchError::NotFound { ref id, .. }) if id == "ghost"));
}
