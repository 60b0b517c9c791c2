// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::types::RegistrationKind;

#[derive(Error, Debug)]
pub enum CmdrunnerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Rejections raised by the orchestrators before any process is spawned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Registration ID is required")]
    MissingRegistrationId,

    #[error("No {kind} registration found with ID: {id}")]
    NotFound { kind: RegistrationKind, id: String },

    #[error("{kind} registration is disabled: {id}")]
    Disabled { kind: RegistrationKind, id: String },
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CmdrunnerError>;
