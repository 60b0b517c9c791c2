// src/registry/model.rs

use std::path::PathBuf;

use crate::types::{ExecutionType, RegistrationKind};

/// A registered command template.
///
/// Orchestrators treat a registration as a snapshot: they read it once per
/// call and never mutate it. Kind-specific fields are empty for the kinds
/// that don't use them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub id: String,
    pub kind: RegistrationKind,
    pub command: String,
    pub arguments: Option<String>,
    pub working_directory: Option<PathBuf>,
    pub description: Option<String>,
    pub timeout_seconds: Option<i64>,
    pub enabled: bool,
    pub execution_type: ExecutionType,
    pub output_regex: Vec<String>,
    pub success_patterns: Vec<String>,
    pub failure_patterns: Vec<String>,

    // test
    pub reporting_paths: Vec<PathBuf>,
    pub runner_copy_path: Option<PathBuf>,

    // build
    pub artifact_paths: Vec<String>,
    pub artifact_output_directory: Option<PathBuf>,

    // deploy
    pub health_check_url: Option<String>,
    pub health_check_timeout_seconds: Option<u64>,
    pub max_wait_for_startup_seconds: Option<i64>,
    pub stop_command: Option<String>,
}

impl Registration {
    pub fn new(id: impl Into<String>, kind: RegistrationKind, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            command: command.into(),
            arguments: None,
            working_directory: None,
            description: None,
            timeout_seconds: None,
            enabled: true,
            execution_type: ExecutionType::default(),
            output_regex: Vec::new(),
            success_patterns: Vec::new(),
            failure_patterns: Vec::new(),
            reporting_paths: Vec::new(),
            runner_copy_path: None,
            artifact_paths: Vec::new(),
            artifact_output_directory: None,
            health_check_url: None,
            health_check_timeout_seconds: None,
            max_wait_for_startup_seconds: None,
            stop_command: None,
        }
    }
}
