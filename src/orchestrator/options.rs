// src/orchestrator/options.rs

//! Per-call options and the typed results of each orchestrator.

use std::path::PathBuf;

use uuid::Uuid;

use crate::artifacts::CollectedArtifacts;
use crate::exec::ExecutionOutcome;
use crate::health::HealthStatus;

/// Options shared by every orchestrator call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    pub registration_id: String,
    /// Overrides the registration's arguments unless blank.
    pub arguments: Option<String>,
    /// Overrides the registration's timeout when present.
    pub timeout_seconds: Option<i64>,
    pub session_id: Option<String>,
}

impl CallOptions {
    pub fn new(registration_id: impl Into<String>) -> Self {
        Self {
            registration_id: registration_id.into(),
            ..Self::default()
        }
    }

    pub fn with_arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = Some(arguments.into());
        self
    }

    pub fn with_timeout(mut self, seconds: i64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Options of a test run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub call: CallOptions,
    pub write_to_file: bool,
    /// Used when `write_to_file` is set; defaults to `execution_<run id>.log`.
    pub output_file_path: Option<PathBuf>,
}

impl From<CallOptions> for RunOptions {
    fn from(call: CallOptions) -> Self {
        Self {
            call,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub run_id: Uuid,
    pub registration_id: String,
    pub session_id: Option<String>,
    pub outcome: ExecutionOutcome,
    /// Summary produced from the registration's reporting paths.
    pub report: Option<String>,
    pub output_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    pub run_id: Uuid,
    pub registration_id: String,
    pub session_id: Option<String>,
    pub outcome: ExecutionOutcome,
    pub output_directory: Option<PathBuf>,
    pub artifacts: CollectedArtifacts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployResult {
    pub run_id: Uuid,
    pub registration_id: String,
    pub session_id: Option<String>,
    pub outcome: ExecutionOutcome,
    /// Health probe result, or `Stopped` after a stop request.
    pub status: Option<HealthStatus>,
    pub health_response_time_ms: Option<u64>,
    pub deployment_url: Option<String>,
    pub is_running: bool,
}

macro_rules! outcome_accessors {
    ($($ty:ty),*) => {
        $(
            impl $ty {
                pub fn success(&self) -> bool {
                    self.outcome.success
                }

                pub fn error(&self) -> Option<&str> {
                    self.outcome.error.as_deref()
                }
            }
        )*
    };
}

outcome_accessors!(RunResult, BuildResult, DeployResult);
