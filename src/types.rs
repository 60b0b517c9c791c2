use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Strategy used to execute a registration.
///
/// Only plain OS processes exist today; the variant is still carried by every
/// registration so that an alternative backend can be selected per
/// registration without touching the orchestrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionType {
    Process,
}

impl Default for ExecutionType {
    fn default() -> Self {
        ExecutionType::Process
    }
}

impl fmt::Display for ExecutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionType::Process => write!(f, "process"),
        }
    }
}

impl FromStr for ExecutionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "process" => Ok(ExecutionType::Process),
            other => Err(format!(
                "invalid execution_type: {other} (expected \"process\")"
            )),
        }
    }
}

/// Which orchestrator a registration belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegistrationKind {
    Test,
    Build,
    Deploy,
}

impl fmt::Display for RegistrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RegistrationKind::Test => "test",
            RegistrationKind::Build => "build",
            RegistrationKind::Deploy => "deploy",
        };
        write!(f, "{s}")
    }
}
