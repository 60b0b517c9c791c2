// src/orchestrator/deploy.rs

use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::DispatchError;
use crate::exec::{ExecutionOutcome, ExecutionRequest, FailureKind};
use crate::health::HealthStatus;
use crate::registry::HistoryDetails;
use crate::types::RegistrationKind;

use super::options::{CallOptions, DeployResult};
use super::{Orchestrator, base_request, history_record};

impl Orchestrator {
    /// Run a deploy registration, then probe its health URL if it has one.
    ///
    /// The run stops as soon as a failure pattern shows up, and waits for the
    /// success pattern for at most `max_wait_for_startup_seconds`.
    pub async fn deploy(&self, call: &CallOptions) -> Result<DeployResult, DispatchError> {
        let registration = self
            .registrations
            .find_enabled(RegistrationKind::Deploy, &call.registration_id)?;
        let run_id = Uuid::new_v4();

        let mut request = base_request(&registration, call);
        request.strict_success_patterns = true;
        request.stop_early_on_failure = true;
        request.max_wait_for_pattern_seconds = registration.max_wait_for_startup_seconds;

        info!(
            registration = %registration.id,
            %run_id,
            command = %request.command,
            "starting deployment"
        );

        let mut outcome = self.dispatch(&registration, &request).await;
        let deployment_url = registration.health_check_url.clone();

        let mut health = None;
        if outcome.success {
            if let Some(url) = deployment_url.as_deref() {
                let timeout = registration
                    .health_check_timeout_seconds
                    .map(Duration::from_secs);
                let check = self.health.check(url, timeout).await;
                if !check.status.is_healthy() {
                    warn!(registration = %registration.id, %run_id, status = %check.status, "deployment is unhealthy");
                    let message = format!("Health check failed: {}", check.status);
                    outcome = outcome.into_failure(FailureKind::HealthCheck, message);
                }
                health = Some(check);
            }
        }
        let is_running = outcome.is_running();

        self.record_history(history_record(
            run_id,
            &registration,
            call,
            &request,
            &outcome,
            outcome.matched_output.clone(),
            HistoryDetails::Deploy {
                health: health.clone(),
                deployment_url: deployment_url.clone(),
                is_running,
            },
        ));

        info!(
            registration = %registration.id,
            %run_id,
            success = outcome.success,
            "deployment finished"
        );

        Ok(DeployResult {
            run_id,
            registration_id: registration.id.clone(),
            session_id: call.session_id.clone(),
            outcome,
            status: health.as_ref().map(|h| h.status.clone()),
            health_response_time_ms: health.as_ref().map(|h| h.response_time_ms),
            deployment_url,
            is_running,
        })
    }

    /// Run the deployment's stop command.
    ///
    /// Works on disabled registrations too; a registration without a stop
    /// command fails without spawning anything.
    pub async fn stop_deployment(&self, call: &CallOptions) -> Result<DeployResult, DispatchError> {
        let registration = self
            .registrations
            .find_existing(RegistrationKind::Deploy, &call.registration_id)?;
        let run_id = Uuid::new_v4();

        let stop_command = registration
            .stop_command
            .as_deref()
            .filter(|c| !c.trim().is_empty());

        let request = ExecutionRequest {
            working_directory: registration.working_directory.clone(),
            timeout_seconds: call.timeout_seconds.or(registration.timeout_seconds),
            ..ExecutionRequest::new(stop_command.unwrap_or_default())
        };

        let outcome = match stop_command {
            Some(command) => {
                info!(registration = %registration.id, %run_id, command, "stopping deployment");
                self.dispatch(&registration, &request).await
            }
            None => {
                warn!(registration = %registration.id, "no stop command configured");
                ExecutionOutcome::rejected(
                    FailureKind::Internal,
                    format!("No stop command configured for deployment: {}", registration.id),
                    0,
                )
            }
        };

        self.record_history(history_record(
            run_id,
            &registration,
            call,
            &request,
            &outcome,
            outcome.matched_output.clone(),
            HistoryDetails::Stop,
        ));

        Ok(DeployResult {
            run_id,
            registration_id: registration.id.clone(),
            session_id: call.session_id.clone(),
            outcome,
            status: Some(HealthStatus::Stopped),
            health_response_time_ms: None,
            deployment_url: registration.health_check_url.clone(),
            is_running: false,
        })
    }
}
