#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cmdrunner::exec::{BackendRegistry, ProcessRunner, RunnerSettings};
use cmdrunner::orchestrator::Orchestrator;
use cmdrunner::registry::{
    FileReportProcessor, InMemoryHistory, InMemoryRegistrationStore, Registration,
};
use cmdrunner::types::RegistrationKind;
use tempfile::TempDir;

/// Builder for `Registration` to simplify test setup.
pub struct RegistrationBuilder {
    registration: Registration,
}

impl RegistrationBuilder {
    pub fn new(id: &str, kind: RegistrationKind, command: &str) -> Self {
        Self {
            registration: Registration::new(id, kind, command),
        }
    }

    pub fn test(id: &str, command: &str) -> Self {
        Self::new(id, RegistrationKind::Test, command)
    }

    pub fn build_step(id: &str, command: &str) -> Self {
        Self::new(id, RegistrationKind::Build, command)
    }

    pub fn deploy(id: &str, command: &str) -> Self {
        Self::new(id, RegistrationKind::Deploy, command)
    }

    pub fn arguments(mut self, args: &str) -> Self {
        self.registration.arguments = Some(args.to_string());
        self
    }

    pub fn working_directory(mut self, dir: impl AsRef<Path>) -> Self {
        self.registration.working_directory = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn timeout(mut self, seconds: i64) -> Self {
        self.registration.timeout_seconds = Some(seconds);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.registration.enabled = false;
        self
    }

    pub fn output_regex(mut self, pattern: &str) -> Self {
        self.registration.output_regex.push(pattern.to_string());
        self
    }

    pub fn success(mut self, pattern: &str) -> Self {
        self.registration.success_patterns.push(pattern.to_string());
        self
    }

    pub fn failure(mut self, pattern: &str) -> Self {
        self.registration.failure_patterns.push(pattern.to_string());
        self
    }

    pub fn reporting_path(mut self, path: impl AsRef<Path>) -> Self {
        self.registration
            .reporting_paths
            .push(path.as_ref().to_path_buf());
        self
    }

    pub fn runner_copy_path(mut self, path: impl AsRef<Path>) -> Self {
        self.registration.runner_copy_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn artifact(mut self, path: &str) -> Self {
        self.registration.artifact_paths.push(path.to_string());
        self
    }

    pub fn artifact_output_directory(mut self, dir: impl AsRef<Path>) -> Self {
        self.registration.artifact_output_directory = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn health_check_url(mut self, url: &str) -> Self {
        self.registration.health_check_url = Some(url.to_string());
        self
    }

    pub fn health_check_timeout(mut self, seconds: u64) -> Self {
        self.registration.health_check_timeout_seconds = Some(seconds);
        self
    }

    pub fn max_wait_for_startup(mut self, seconds: i64) -> Self {
        self.registration.max_wait_for_startup_seconds = Some(seconds);
        self
    }

    pub fn stop_command(mut self, command: &str) -> Self {
        self.registration.stop_command = Some(command.to_string());
        self
    }

    pub fn build(self) -> Registration {
        self.registration
    }
}

/// A temp directory holding shell scripts and fixture files.
///
/// Commands are never run through a shell, so anything needing pipes,
/// sleeps or loops goes into a script invoked as `sh <path>`.
pub struct ScriptDir {
    dir: TempDir,
}

impl ScriptDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `body` to `<dir>/<name>` and return the command that runs it.
    pub fn script(&self, name: &str, body: &str) -> String {
        let path = self.file(name, body);
        format!("sh {}", path.display())
    }

    /// Write a fixture file, creating parent directories.
    pub fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture dir");
        }
        fs::write(&path, contents).expect("write fixture");
        path
    }
}

impl Default for ScriptDir {
    fn default() -> Self {
        Self::new()
    }
}

/// Runner settings with a short tick so process tests stay quick.
pub fn fast_runner_settings() -> RunnerSettings {
    RunnerSettings {
        poll_interval: Duration::from_millis(100),
        reader_grace: Duration::from_millis(500),
        termination_grace: Duration::from_secs(1),
        ..RunnerSettings::default()
    }
}

/// An orchestrator over an in-memory store, with handles on the store and
/// history for assertions.
pub struct Harness {
    pub store: Arc<InMemoryRegistrationStore>,
    pub history: Arc<InMemoryHistory>,
    pub orchestrator: Orchestrator,
}

impl Harness {
    /// Real process runner with [`fast_runner_settings`].
    pub fn new(registrations: Vec<Registration>) -> Self {
        let runner = ProcessRunner::new(fast_runner_settings());
        Self::with_backends(registrations, BackendRegistry::with_process_runner(runner))
    }

    pub fn with_backends(registrations: Vec<Registration>, backends: BackendRegistry) -> Self {
        let store = Arc::new(InMemoryRegistrationStore::new());
        for registration in registrations {
            store.insert(registration);
        }
        let history = Arc::new(InMemoryHistory::new());
        let orchestrator = Orchestrator::new(store.clone(), history.clone(), backends)
            .with_reports(Arc::new(FileReportProcessor::default()));

        Self {
            store,
            history,
            orchestrator,
        }
    }
}
