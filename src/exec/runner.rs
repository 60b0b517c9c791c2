// src/exec/runner.rs

//! The process runner: one command in, one [`ExecutionOutcome`] out.
//!
//! Lifecycle of a run:
//!
//! 1. spawn the command (no shell) with piped stdout/stderr;
//! 2. two reader tasks push lines into a bounded [`LogConsumer`];
//! 3. the calling task polls the queue, feeding the [`PatternEvaluator`],
//!    until the deadline passes, the process exits or a pattern resolves;
//! 4. readers get a short grace period, then a still-running process is
//!    terminated;
//! 5. a final drain, the verdict, and the outcome.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout};
use tracing::{debug, error, info, warn};

use crate::errors::CmdrunnerError;

use super::decision::{DecisionInput, decide};
use super::log_consumer::{LogConsumer, LogLine, StreamOrigin, log_channel};
use super::output_file::OutputFile;
use super::patterns::PatternEvaluator;
use super::request::{
    ExecutionOutcome, ExecutionRequest, FailureKind, ProcessHandle, TerminationReason,
};

/// Tunables of the poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Slots in the log queue shared by both readers.
    pub queue_capacity: usize,
    /// Longest single wait on the log queue.
    pub poll_interval: Duration,
    /// How long readers may keep draining after the poll loop ends.
    pub reader_grace: Duration,
    /// Longest wait between SIGTERM and SIGKILL.
    pub termination_grace: Duration,
    /// Deadline when the request sets neither max-wait nor timeout.
    pub default_pattern_wait: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            poll_interval: Duration::from_millis(500),
            reader_grace: Duration::from_secs(1),
            termination_grace: Duration::from_secs(5),
            default_pattern_wait: Duration::from_secs(300),
        }
    }
}

/// Failures that stop a run before it has an outcome of its own.
#[derive(Debug, Error)]
enum RunError {
    #[error("Command is empty")]
    EmptyCommand,

    #[error("Failed to start process '{command}': {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Pattern(#[from] CmdrunnerError),

    #[error("Error checking process status: {0}")]
    Status(#[source] std::io::Error),

    #[error("Cannot schedule a deadline {0:?} from now")]
    Deadline(Duration),
}

impl RunError {
    fn kind(&self) -> FailureKind {
        match self {
            RunError::EmptyCommand | RunError::Launch { .. } => FailureKind::Launch,
            RunError::Pattern(_) | RunError::Status(_) | RunError::Deadline(_) => {
                FailureKind::Internal
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    settings: RunnerSettings,
}

impl ProcessRunner {
    pub fn new(settings: RunnerSettings) -> Self {
        Self { settings }
    }

    /// Run `request` to completion. Never fails: every problem is reported
    /// through the returned outcome.
    pub async fn execute(&self, request: &ExecutionRequest) -> ExecutionOutcome {
        let started = Instant::now();
        match self.run(request, started).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(command = %request.command, error = %err, "process execution failed");
                ExecutionOutcome::rejected(err.kind(), err.to_string(), elapsed_ms(started))
            }
        }
    }

    async fn run(
        &self,
        request: &ExecutionRequest,
        started: Instant,
    ) -> Result<ExecutionOutcome, RunError> {
        let mut patterns = PatternEvaluator::new(
            &request.output_regex,
            &request.success_patterns,
            &request.failure_patterns,
        )?;

        let wait = request.pattern_wait(self.settings.default_pattern_wait);
        let deadline = started
            .checked_add(wait)
            .ok_or(RunError::Deadline(wait))?;

        let parts = request.command_parts();
        let (program, args) = parts.split_first().ok_or(RunError::EmptyCommand)?;
        let command_line = parts.join(" ");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = request.working_directory.as_deref() {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| RunError::Launch {
            command: command_line.clone(),
            source,
        })?;
        let pid = child.id();
        info!(command = %command_line, pid, "executing command with pattern wait");

        let (consumer, mut drain) = log_channel(self.settings.queue_capacity);
        let dropped = consumer.counter();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, StreamOrigin::Stdout, consumer.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, StreamOrigin::Stderr, consumer.clone()));
        }
        // Readers hold the only senders now, so the queue closes when both end.
        drop(consumer);

        let mut output = match request.output_file.as_deref() {
            Some(path) => Some(OutputFile::open(path).await),
            None => None,
        };
        let mut log: Vec<LogLine> = Vec::new();
        let mut status: Option<ExitStatus> = None;

        let mut reason = loop {
            let now = Instant::now();
            if now >= deadline {
                break TerminationReason::TimedOut;
            }
            if let Some(exit) = child.try_wait().map_err(RunError::Status)? {
                status = Some(exit);
                break TerminationReason::NaturalExit;
            }

            let tick = self.settings.poll_interval.min(deadline - now);
            let batch = drain.poll(tick).await;
            absorb(batch, &mut log, &mut patterns, output.as_mut()).await;

            if request.stop_early_on_failure && patterns.failure_found() {
                debug!(pid, "failure pattern matched, stopping early");
                break TerminationReason::FailureDetected;
            }
            if patterns.is_complete() {
                break if patterns.failure_found() {
                    TerminationReason::FailureDetected
                } else {
                    TerminationReason::PatternComplete
                };
            }
        };

        let mut tail = Vec::new();
        let readers_done = timeout(
            self.settings.reader_grace,
            drain.collect_until_closed(&mut tail),
        )
        .await
        .is_ok();
        absorb(tail, &mut log, &mut patterns, output.as_mut()).await;
        if !readers_done {
            debug!(pid, "output readers still busy after grace period");
        }

        if status.is_none() {
            status = child.try_wait().map_err(RunError::Status)?;
            if status.is_some() && reason == TerminationReason::TimedOut {
                reason = TerminationReason::NaturalExit;
            }
        }
        let exited = status.is_some();

        if !exited {
            let residual = deadline.saturating_duration_since(Instant::now());
            info!(pid, %reason, residual_ms = residual.as_millis() as u64, "terminating process");
            status = self.terminate(&mut child, pid, residual).await;
        }
        for reader in &readers {
            reader.abort();
        }

        absorb(drain.drain(), &mut log, &mut patterns, output.as_mut()).await;

        let exit_code = match (reason, status) {
            (TerminationReason::TimedOut, _) => -1,
            (_, Some(status)) => status.code().unwrap_or(-1),
            (_, None) => 1,
        };

        let decision = decide(
            &patterns,
            DecisionInput {
                exit_code,
                exited,
                strict_success_patterns: request.strict_success_patterns,
                pattern_wait: wait,
            },
        );

        let log_path = match output {
            Some(mut file) => {
                if let Some(err) = decision.error.as_deref() {
                    file.write_line(&format!("ERROR: {err}")).await;
                }
                file.finish().await
            }
            None => None,
        };

        let dropped = dropped.snapshot();
        if dropped.total() > 0 {
            warn!(
                pid,
                stdout = dropped.stdout,
                stderr = dropped.stderr,
                "log queue overflowed, lines were dropped"
            );
        }

        let full_log = log
            .iter()
            .map(LogLine::tagged)
            .collect::<Vec<_>>()
            .join("\n");
        let matched_output = if patterns.has_output_filter() {
            patterns.matched_output().join("\n")
        } else {
            full_log.clone()
        };

        let error = [decision.error, dropped.warning()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        let error = (!error.is_empty()).then(|| error.join("\n"));

        let elapsed_ms = elapsed_ms(started);
        info!(
            pid,
            exit_code,
            success = decision.success,
            %reason,
            elapsed_ms,
            "process finished"
        );

        Ok(ExecutionOutcome {
            success: decision.success,
            matched_output,
            full_log,
            error,
            failure: decision.failure,
            exit_code,
            elapsed_ms,
            reason,
            success_matches: patterns.success_matches().to_vec(),
            failure_matches: patterns.failure_matches().to_vec(),
            dropped,
            log_path,
            process: Some(ProcessHandle::new(pid, status.is_some())),
        })
    }

    /// Stop a running child: SIGTERM and a bounded wait while `residual`
    /// deadline remains, SIGKILL otherwise or afterwards.
    async fn terminate(
        &self,
        child: &mut Child,
        pid: Option<u32>,
        residual: Duration,
    ) -> Option<ExitStatus> {
        if !residual.is_zero() && send_sigterm(pid) {
            let grace = residual.min(self.settings.termination_grace);
            if let Ok(Ok(status)) = timeout(grace, child.wait()).await {
                return Some(status);
            }
        }

        if let Err(err) = child.kill().await {
            warn!(pid, error = %err, "failed to kill process");
        }
        match child.wait().await {
            Ok(status) => Some(status),
            Err(err) => {
                warn!(pid, error = %err, "failed to reap process");
                None
            }
        }
    }
}

async fn absorb(
    batch: Vec<LogLine>,
    log: &mut Vec<LogLine>,
    patterns: &mut PatternEvaluator,
    output: Option<&mut OutputFile>,
) {
    if batch.is_empty() {
        return;
    }
    if let Some(file) = output {
        for line in &batch {
            file.write_line(&line.tagged()).await;
        }
    }
    log.extend(batch);
    patterns.evaluate(log.as_slice());
}

fn spawn_reader<R>(stream: R, origin: StreamOrigin, consumer: LogConsumer) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf);
                    let text = text.trim_end_matches(['\n', '\r']);
                    consumer.offer(LogLine {
                        origin,
                        text: text.to_string(),
                    });
                }
                Err(err) => {
                    warn!(?origin, error = %err, "error reading process output");
                    break;
                }
            }
        }
    })
}

#[cfg(unix)]
fn send_sigterm(pid: Option<u32>) -> bool {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    match pid {
        Some(pid) => kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok(),
        None => false,
    }
}

#[cfg(not(unix))]
fn send_sigterm(_pid: Option<u32>) -> bool {
    false
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_command_is_a_launch_failure() {
        let runner = ProcessRunner::default();
        let outcome = runner.execute(&ExecutionRequest::new("   ")).await;
        assert!(!outcome.success);
        assert_eq!(outcome.failure, Some(FailureKind::Launch));
        assert_eq!(outcome.error.as_deref(), Some("Command is empty"));
        assert_eq!(outcome.exit_code, -1);
    }

    #[tokio::test]
    async fn invalid_pattern_fails_before_spawning() {
        let runner = ProcessRunner::default();
        let request = ExecutionRequest {
            success_patterns: vec!["(".to_string()],
            ..ExecutionRequest::new("echo hi")
        };
        let outcome = runner.execute(&request).await;
        assert!(!outcome.success);
        assert_eq!(outcome.failure, Some(FailureKind::Internal));
        assert_eq!(outcome.reason, TerminationReason::NotStarted);
        assert!(outcome.process.is_none());
    }
}
