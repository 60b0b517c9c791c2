// src/orchestrator/build.rs

use tracing::{info, warn};
use uuid::Uuid;

use crate::artifacts::{ArtifactSpec, CollectedArtifacts};
use crate::errors::DispatchError;
use crate::registry::{HistoryDetails, Registration};
use crate::types::RegistrationKind;

use super::options::{BuildResult, CallOptions};
use super::{Orchestrator, base_request, history_record};

impl Orchestrator {
    /// Run a build registration and collect its artifacts on success.
    pub async fn build(&self, call: &CallOptions) -> Result<BuildResult, DispatchError> {
        let registration = self
            .registrations
            .find_enabled(RegistrationKind::Build, &call.registration_id)?;
        let run_id = Uuid::new_v4();

        let mut request = base_request(&registration, call);
        request.strict_success_patterns = true;

        info!(
            registration = %registration.id,
            build_id = %run_id,
            command = %request.command,
            "starting build"
        );

        let outcome = self.dispatch(&registration, &request).await;
        let artifacts = if outcome.success {
            self.collect_artifacts(&registration, run_id).await
        } else {
            CollectedArtifacts::default()
        };

        self.record_history(history_record(
            run_id,
            &registration,
            call,
            &request,
            &outcome,
            outcome.matched_output.clone(),
            HistoryDetails::Build {
                build_directory: artifacts.build_directory.clone(),
                artifacts: artifacts.copied.clone(),
            },
        ));

        info!(
            registration = %registration.id,
            build_id = %run_id,
            success = outcome.success,
            artifacts = artifacts.copied.len(),
            "build finished"
        );

        Ok(BuildResult {
            run_id,
            registration_id: registration.id.clone(),
            session_id: call.session_id.clone(),
            outcome,
            output_directory: registration.artifact_output_directory.clone(),
            artifacts,
        })
    }

    async fn collect_artifacts(&self, registration: &Registration, build_id: Uuid) -> CollectedArtifacts {
        let spec = ArtifactSpec {
            paths: registration.artifact_paths.clone(),
            output_directory: registration.artifact_output_directory.clone(),
            working_directory: registration.working_directory.clone(),
        };
        let collector = self.artifacts.clone();
        let build_id = build_id.to_string();

        match tokio::task::spawn_blocking(move || collector.collect(&spec, &build_id)).await {
            Ok(collected) => collected,
            Err(err) => {
                warn!(registration = %registration.id, error = %err, "artifact collection failed");
                CollectedArtifacts::default()
            }
        }
    }
}
