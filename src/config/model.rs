// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::exec::RunnerSettings;
use crate::registry::Registration;
use crate::types::{ExecutionType, RegistrationKind};

/// Configuration as deserialized from TOML, before validation.
///
/// ```toml
/// [runner]
/// queue_capacity = 1024
///
/// [test.unit]
/// command = "cargo test"
///
/// [build.app]
/// command = "cargo build --release"
/// artifact_paths = ["target/release/app"]
/// artifact_output_directory = "dist"
///
/// [deploy.web]
/// command = "bash deploy.sh"
/// health_check_url = "http://localhost:8080/health"
/// ```
///
/// Every section is optional; validation requires at least one registration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub runner: RunnerSection,

    /// Test registrations from `[test.<id>]`.
    #[serde(default)]
    pub test: BTreeMap<String, TestConfig>,

    /// Build registrations from `[build.<id>]`.
    #[serde(default)]
    pub build: BTreeMap<String, BuildConfig>,

    /// Deploy registrations from `[deploy.<id>]`.
    #[serde(default)]
    pub deploy: BTreeMap<String, DeployConfig>,
}

/// Validated configuration. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    runner: RunnerSection,
    test: BTreeMap<String, TestConfig>,
    build: BTreeMap<String, BuildConfig>,
    deploy: BTreeMap<String, DeployConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            runner: raw.runner,
            test: raw.test,
            build: raw.build,
            deploy: raw.deploy,
        }
    }

    pub fn runner(&self) -> &RunnerSection {
        &self.runner
    }

    /// Every registration in the file, tests first, then builds, then deploys.
    pub fn registrations(&self) -> Vec<Registration> {
        let tests = self.test.iter().map(|(id, t)| t.to_registration(id));
        let builds = self.build.iter().map(|(id, b)| b.to_registration(id));
        let deploys = self.deploy.iter().map(|(id, d)| d.to_registration(id));
        tests.chain(builds).chain(deploys).collect()
    }
}

/// `[runner]` section: engine tunables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RunnerSection {
    pub queue_capacity: usize,
    pub poll_interval_ms: u64,
    pub reader_grace_ms: u64,
    pub termination_grace_ms: u64,
    pub default_pattern_wait_seconds: u64,
    /// Retained history records; `0` keeps everything.
    pub history_limit: usize,
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            poll_interval_ms: 500,
            reader_grace_ms: 1000,
            termination_grace_ms: 5000,
            default_pattern_wait_seconds: 300,
            history_limit: 500,
        }
    }
}

impl From<&RunnerSection> for RunnerSettings {
    fn from(section: &RunnerSection) -> Self {
        RunnerSettings {
            queue_capacity: section.queue_capacity,
            poll_interval: Duration::from_millis(section.poll_interval_ms),
            reader_grace: Duration::from_millis(section.reader_grace_ms),
            termination_grace: Duration::from_millis(section.termination_grace_ms),
            default_pattern_wait: Duration::from_secs(section.default_pattern_wait_seconds),
        }
    }
}

/// Fields shared by every registration kind.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandConfig {
    /// Command line; split on whitespace, no shell involved.
    pub command: String,

    #[serde(default)]
    pub arguments: Option<String>,

    #[serde(default)]
    pub working_directory: Option<PathBuf>,

    #[serde(default)]
    pub description: Option<String>,

    /// Non-positive means no timeout.
    #[serde(default)]
    pub timeout_seconds: Option<i64>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub execution_type: ExecutionType,

    /// Whole-line regexes selecting the lines reported as matched output.
    #[serde(default)]
    pub output_regex: Vec<String>,

    #[serde(default)]
    pub success_patterns: Vec<String>,

    #[serde(default)]
    pub failure_patterns: Vec<String>,
}

fn default_enabled() -> bool {
    true
}

impl CommandConfig {
    fn to_registration(&self, id: &str, kind: RegistrationKind) -> Registration {
        Registration {
            arguments: self.arguments.clone(),
            working_directory: self.working_directory.clone(),
            description: self.description.clone(),
            timeout_seconds: self.timeout_seconds,
            enabled: self.enabled,
            execution_type: self.execution_type,
            output_regex: self.output_regex.clone(),
            success_patterns: self.success_patterns.clone(),
            failure_patterns: self.failure_patterns.clone(),
            ..Registration::new(id, kind, self.command.clone())
        }
    }

    /// All regexes configured on this command, for validation.
    pub(crate) fn patterns(&self) -> impl Iterator<Item = &String> {
        self.output_regex
            .iter()
            .chain(&self.success_patterns)
            .chain(&self.failure_patterns)
    }
}

/// `[test.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TestConfig {
    #[serde(flatten)]
    pub common: CommandConfig,

    /// Report files or directories summarized after the run.
    #[serde(default)]
    pub reporting_paths: Vec<PathBuf>,

    /// Report directories are mirrored to `<runner_copy_path>/<session>`.
    #[serde(default)]
    pub runner_copy_path: Option<PathBuf>,
}

impl TestConfig {
    pub fn to_registration(&self, id: &str) -> Registration {
        Registration {
            reporting_paths: self.reporting_paths.clone(),
            runner_copy_path: self.runner_copy_path.clone(),
            ..self.common.to_registration(id, RegistrationKind::Test)
        }
    }
}

/// `[build.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    #[serde(flatten)]
    pub common: CommandConfig,

    /// Files or glob patterns copied after a successful build.
    #[serde(default)]
    pub artifact_paths: Vec<String>,

    #[serde(default)]
    pub artifact_output_directory: Option<PathBuf>,
}

impl BuildConfig {
    pub fn to_registration(&self, id: &str) -> Registration {
        Registration {
            artifact_paths: self.artifact_paths.clone(),
            artifact_output_directory: self.artifact_output_directory.clone(),
            ..self.common.to_registration(id, RegistrationKind::Build)
        }
    }
}

/// `[deploy.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    #[serde(flatten)]
    pub common: CommandConfig,

    #[serde(default)]
    pub health_check_url: Option<String>,

    #[serde(default)]
    pub health_check_timeout_seconds: Option<u64>,

    /// Deadline for the success pattern; falls back to the timeout.
    #[serde(default)]
    pub max_wait_for_startup_seconds: Option<i64>,

    #[serde(default)]
    pub stop_command: Option<String>,
}

impl DeployConfig {
    pub fn to_registration(&self, id: &str) -> Registration {
        Registration {
            health_check_url: self.health_check_url.clone(),
            health_check_timeout_seconds: self.health_check_timeout_seconds,
            max_wait_for_startup_seconds: self.max_wait_for_startup_seconds,
            stop_command: self.stop_command.clone(),
            ..self.common.to_registration(id, RegistrationKind::Deploy)
        }
    }
}
