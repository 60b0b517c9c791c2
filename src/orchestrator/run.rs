// src/orchestrator/run.rs

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::DispatchError;
use crate::registry::{HistoryDetails, Registration, ReportProcessor, ReportRequest};
use crate::types::RegistrationKind;

use super::options::{RunOptions, RunResult};
use super::{Orchestrator, base_request, history_record};

impl Orchestrator {
    /// Run a test registration.
    pub async fn run(&self, options: &RunOptions) -> Result<RunResult, DispatchError> {
        let call = &options.call;
        let registration = self
            .registrations
            .find_enabled(RegistrationKind::Test, &call.registration_id)?;
        let run_id = Uuid::new_v4();

        let output_file = options.write_to_file.then(|| {
            options
                .output_file_path
                .clone()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| PathBuf::from(format!("execution_{run_id}.log")))
        });

        let mut request = base_request(&registration, call);
        request.output_file = output_file.clone();
        request.strict_success_patterns = true;

        info!(
            registration = %registration.id,
            %run_id,
            command = %request.command,
            "starting test execution"
        );
        if let Some(path) = output_file.as_deref() {
            info!(%run_id, path = %path.display(), "writing execution output to file");
        }

        let outcome = self.dispatch(&registration, &request).await;
        let report = self.summarize_reports(&registration, call.session_id.clone()).await;

        let output = report
            .clone()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| outcome.matched_output.clone());
        self.record_history(history_record(
            run_id,
            &registration,
            call,
            &request,
            &outcome,
            output,
            HistoryDetails::Run {
                output_file: output_file.clone(),
            },
        ));

        info!(
            registration = %registration.id,
            %run_id,
            success = outcome.success,
            exit_code = outcome.exit_code,
            "test execution finished"
        );

        Ok(RunResult {
            run_id,
            registration_id: registration.id,
            session_id: call.session_id.clone(),
            outcome,
            report,
            output_file,
        })
    }

    async fn summarize_reports(
        &self,
        registration: &Registration,
        session_id: Option<String>,
    ) -> Option<String> {
        if registration.reporting_paths.is_empty() {
            return None;
        }
        let reports: Arc<dyn ReportProcessor> = self.reports.clone()?;
        let reporting_paths = registration
            .reporting_paths
            .iter()
            .map(|path| match registration.working_directory.as_deref() {
                Some(dir) if path.is_relative() => dir.join(path),
                _ => path.clone(),
            })
            .collect();
        let request = ReportRequest {
            registration_id: registration.id.clone(),
            reporting_paths,
            session_id,
            runner_copy_path: registration.runner_copy_path.clone(),
        };

        match tokio::task::spawn_blocking(move || reports.summarize(&request)).await {
            Ok(summary) => summary,
            Err(err) => {
                warn!(registration = %registration.id, error = %err, "report processing failed");
                None
            }
        }
    }
}
