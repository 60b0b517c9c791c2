// src/lib.rs

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod health;
pub mod logging;
pub mod orchestrator;
pub mod registry;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::cli::{CliArgs, Command};
use crate::config::load_and_validate;
use crate::errors::DispatchError;
use crate::exec::{BackendRegistry, ExecutionOutcome, ProcessRunner};
use crate::orchestrator::{
    BuildResult, CallOptions, DeployResult, Orchestrator, RunResult,
};
use crate::registry::{FileReportProcessor, InMemoryHistory, InMemoryRegistrationStore};

/// High-level entry point used by `main.rs`.
///
/// Loads the config, wires the registration store, history, process runner
/// and report processor into an [`Orchestrator`], then runs the requested
/// subcommand. Returns whether the command succeeded.
pub async fn run(args: CliArgs) -> Result<bool> {
    let cfg = load_and_validate(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;

    let store = Arc::new(InMemoryRegistrationStore::from_config(&cfg));
    info!(
        config = %args.config.display(),
        registrations = store.len(),
        "configuration loaded"
    );

    let runner = ProcessRunner::new(cfg.runner().into());
    let history = Arc::new(InMemoryHistory::with_limit(cfg.runner().history_limit));
    let orchestrator = Orchestrator::new(
        store.clone(),
        history,
        BackendRegistry::with_process_runner(runner),
    )
    .with_reports(Arc::new(FileReportProcessor::default()));

    let outcome = match args.command {
        Command::Run {
            call,
            write_to_file,
            output_file,
        } => {
            let options = call.into_run_options(write_to_file, output_file);
            orchestrator.run(&options).await.map(|r| print_run(&r))
        }
        Command::Build { call } => orchestrator
            .build(&CallOptions::from(call))
            .await
            .map(|r| print_build(&r)),
        Command::Deploy { call } => orchestrator
            .deploy(&CallOptions::from(call))
            .await
            .map(|r| print_deploy(&r)),
        Command::Stop { id, session } => {
            let call = CallOptions {
                session_id: session,
                ..CallOptions::new(id)
            };
            orchestrator
                .stop_deployment(&call)
                .await
                .map(|r| print_deploy(&r))
        }
        Command::List => {
            print_registrations(&store);
            Ok(true)
        }
    };

    match outcome {
        Ok(success) => Ok(success),
        Err(err) => {
            report_dispatch_error(&err);
            Ok(false)
        }
    }
}

fn report_dispatch_error(err: &DispatchError) {
    error!(error = %err, "request rejected");
    println!("cmdrunner: {err}");
}

fn print_outcome(outcome: &ExecutionOutcome) {
    println!(
        "  status: {}",
        if outcome.success { "SUCCESS" } else { "FAILED" }
    );
    if let Some(pid) = outcome.process.and_then(|p| p.pid()) {
        println!("  pid: {pid}");
    }
    println!("  exit_code: {}", outcome.exit_code);
    println!("  elapsed_ms: {}", outcome.elapsed_ms);
    println!("  stopped: {}", outcome.reason);
    if let Some(error) = outcome.error.as_deref() {
        println!("  error: {error}");
    }
    if let Some(kind) = outcome.failure {
        println!("  failure: {kind:?}");
    }
    if let Some(path) = outcome.log_path.as_deref() {
        println!("  log_file: {}", path.display());
    }
    if !outcome.matched_output.is_empty() {
        println!();
        println!("output:");
        for line in outcome.matched_output.lines() {
            println!("  {line}");
        }
    }
}

fn print_run(result: &RunResult) -> bool {
    println!("run {} ({})", result.registration_id, result.run_id);
    print_outcome(&result.outcome);
    if let Some(report) = result.report.as_deref() {
        println!();
        println!("report:");
        for line in report.lines() {
            println!("  {line}");
        }
    }
    result.success()
}

fn print_build(result: &BuildResult) -> bool {
    println!("build {} ({})", result.registration_id, result.run_id);
    print_outcome(&result.outcome);
    if let Some(dir) = result.artifacts.build_directory.as_deref() {
        println!();
        println!("artifacts -> {}", dir.display());
        for artifact in &result.artifacts.copied {
            println!(
                "  - {} ({} bytes{})",
                artifact.target.display(),
                artifact.bytes,
                artifact
                    .digest
                    .as_deref()
                    .map(|d| format!(", blake3 {d}"))
                    .unwrap_or_default()
            );
        }
        for missing in &result.artifacts.missing {
            println!("  ! missing: {missing}");
        }
    }
    result.success()
}

fn print_deploy(result: &DeployResult) -> bool {
    println!("deploy {} ({})", result.registration_id, result.run_id);
    print_outcome(&result.outcome);
    if let Some(status) = result.status.as_ref() {
        println!("  health: {status}");
    }
    if let Some(ms) = result.health_response_time_ms {
        println!("  health_response_ms: {ms}");
    }
    if let Some(url) = result.deployment_url.as_deref() {
        println!("  url: {url}");
    }
    println!("  running: {}", result.is_running);
    result.success()
}

/// Dry-run style listing of every registration.
fn print_registrations(store: &InMemoryRegistrationStore) {
    let registrations = store.list();
    println!("registrations ({}):", registrations.len());
    for reg in registrations {
        let state = if reg.enabled { "" } else { " (disabled)" };
        println!("  - {} {}{state}", reg.kind, reg.id);
        println!("      command: {}", reg.command);
        if let Some(ref args) = reg.arguments {
            println!("      arguments: {args}");
        }
        if let Some(ref dir) = reg.working_directory {
            println!("      working_directory: {}", dir.display());
        }
        if let Some(ref description) = reg.description {
            println!("      description: {description}");
        }
        if let Some(timeout) = reg.timeout_seconds {
            println!("      timeout_seconds: {timeout}");
        }
        if !reg.success_patterns.is_empty() {
            println!("      success_patterns: {:?}", reg.success_patterns);
        }
        if !reg.failure_patterns.is_empty() {
            println!("      failure_patterns: {:?}", reg.failure_patterns);
        }
        if !reg.artifact_paths.is_empty() {
            println!("      artifact_paths: {:?}", reg.artifact_paths);
        }
        if let Some(ref url) = reg.health_check_url {
            println!("      health_check_url: {url}");
        }
        if let Some(ref stop) = reg.stop_command {
            println!("      stop_command: {stop}");
        }
    }

    debug!("listing complete (no execution)");
}
