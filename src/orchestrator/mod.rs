// src/orchestrator/mod.rs

//! Run/build/deploy/stop entry points.
//!
//! Each entry point resolves a registration (rejecting missing, unknown and
//! disabled ids before anything is spawned), turns it plus the call options
//! into an [`ExecutionRequest`], dispatches it to the backend for the
//! registration's execution type, folds in its own post-processing and
//! records history.
//!
//! - [`run`]: test runs with optional report summaries.
//! - [`build`]: builds with artifact collection.
//! - [`deploy`]: deployments with a health probe, and stopping them.

pub mod build;
pub mod deploy;
pub mod options;
pub mod run;

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::artifacts::ArtifactCollector;
use crate::exec::{BackendRegistry, ExecutionOutcome, ExecutionRequest, FailureKind};
use crate::health::HealthChecker;
use crate::registry::{
    HistoryDetails, HistoryRecord, HistoryRecorder, Registration, RegistrationLookup,
    ReportProcessor,
};

pub use options::{BuildResult, CallOptions, DeployResult, RunOptions, RunResult};

#[derive(Clone)]
pub struct Orchestrator {
    registrations: Arc<dyn RegistrationLookup>,
    history: Arc<dyn HistoryRecorder>,
    reports: Option<Arc<dyn ReportProcessor>>,
    backends: BackendRegistry,
    health: HealthChecker,
    artifacts: ArtifactCollector,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("backends", &self.backends)
            .field("reports", &self.reports.is_some())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn new(
        registrations: Arc<dyn RegistrationLookup>,
        history: Arc<dyn HistoryRecorder>,
        backends: BackendRegistry,
    ) -> Self {
        Self {
            registrations,
            history,
            reports: None,
            backends,
            health: HealthChecker::new(),
            artifacts: ArtifactCollector::default(),
        }
    }

    pub fn with_reports(mut self, reports: Arc<dyn ReportProcessor>) -> Self {
        self.reports = Some(reports);
        self
    }

    pub fn with_artifact_collector(mut self, artifacts: ArtifactCollector) -> Self {
        self.artifacts = artifacts;
        self
    }

    /// Hand the request to the backend serving the registration's type.
    async fn dispatch(
        &self,
        registration: &Registration,
        request: &ExecutionRequest,
    ) -> ExecutionOutcome {
        match self.backends.get(registration.execution_type) {
            Some(backend) => backend.execute(request).await,
            None => {
                let message = format!(
                    "No execution backend registered for type: {}",
                    registration.execution_type
                );
                error!(registration = %registration.id, "{message}");
                ExecutionOutcome::rejected(FailureKind::Internal, message, 0)
            }
        }
    }

    fn record_history(&self, record: HistoryRecord) {
        let run_id = record.run_id;
        let registration = record.registration_id.clone();
        if let Err(err) = self.history.record(record) {
            warn!(%registration, %run_id, error = %err, "failed to record execution history");
        }
    }
}

/// Request skeleton shared by every orchestrator: call options override the
/// registration's arguments (unless blank) and timeout.
fn base_request(registration: &Registration, call: &CallOptions) -> ExecutionRequest {
    let arguments = call
        .arguments
        .clone()
        .filter(|a| !a.trim().is_empty())
        .or_else(|| registration.arguments.clone());

    ExecutionRequest {
        arguments,
        working_directory: registration.working_directory.clone(),
        timeout_seconds: call.timeout_seconds.or(registration.timeout_seconds),
        output_regex: registration.output_regex.clone(),
        success_patterns: registration.success_patterns.clone(),
        failure_patterns: registration.failure_patterns.clone(),
        ..ExecutionRequest::new(registration.command.clone())
    }
}

fn history_record(
    run_id: Uuid,
    registration: &Registration,
    call: &CallOptions,
    request: &ExecutionRequest,
    outcome: &ExecutionOutcome,
    output: String,
    details: HistoryDetails,
) -> HistoryRecord {
    HistoryRecord {
        run_id,
        registration_id: registration.id.clone(),
        kind: registration.kind,
        command: request.command.clone(),
        arguments: request.arguments.clone(),
        session_id: call.session_id.clone(),
        success: outcome.success,
        exit_code: outcome.exit_code,
        elapsed_ms: outcome.elapsed_ms,
        error: outcome.error.clone(),
        output,
        full_log: outcome.full_log.clone(),
        recorded_at: Utc::now(),
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RegistrationKind;

    fn registration() -> Registration {
        Registration {
            arguments: Some("--default".to_string()),
            timeout_seconds: Some(30),
            ..Registration::new("unit", RegistrationKind::Test, "cargo test")
        }
    }

    #[test]
    fn call_options_override_registration_defaults() {
        let call = CallOptions::new("unit").with_arguments("--lib").with_timeout(5);
        let request = base_request(&registration(), &call);
        assert_eq!(request.arguments.as_deref(), Some("--lib"));
        assert_eq!(request.timeout_seconds, Some(5));
    }

    #[test]
    fn blank_arguments_fall_back_to_registration() {
        let call = CallOptions::new("unit").with_arguments("  ");
        let request = base_request(&registration(), &call);
        assert_eq!(request.arguments.as_deref(), Some("--default"));
        assert_eq!(request.timeout_seconds, Some(30));
        assert_eq!(request.command, "cargo test");
    }
}
