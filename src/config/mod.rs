// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - The TOML-backed data model (`model.rs`).
//! - Loading a config file from disk (`loader.rs`).
//! - Validation on conversion from the raw model (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{DEFAULT_CONFIG_FILE, load_and_validate, load_from_path};
pub use model::{
    BuildConfig, CommandConfig, ConfigFile, DeployConfig, RawConfigFile, RunnerSection,
    TestConfig,
};
