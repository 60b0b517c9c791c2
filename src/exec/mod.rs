// src/exec/mod.rs

//! Process execution layer.
//!
//! This module runs one command per [`ExecutionRequest`] with
//! `tokio::process::Command` and turns what happened into an
//! [`ExecutionOutcome`].
//!
//! - [`request`] holds the request/outcome value types.
//! - [`log_consumer`] is the bounded queue between the stream readers and the
//!   poll loop.
//! - [`patterns`] matches output lines against success/failure patterns.
//! - [`decision`] folds match state and exit status into the verdict.
//! - [`runner`] owns the process lifecycle.
//! - [`backend`] provides the `ExecutionBackend` trait and the registry the
//!   orchestrators dispatch through.

pub mod backend;
pub mod decision;
pub mod log_consumer;
pub mod output_file;
pub mod patterns;
pub mod request;
pub mod runner;

pub use backend::{BackendRegistry, ExecutionBackend};
pub use request::{
    DroppedLines, ExecutionOutcome, ExecutionRequest, FailureKind, MAX_PATTERN_WAIT,
    ProcessHandle, TerminationReason,
};
pub use runner::{ProcessRunner, RunnerSettings};
