// src/exec/request.rs

//! Value types describing one invocation of the engine and its verdict.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound on how long one run may poll for patterns.
pub const MAX_PATTERN_WAIT: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Everything the process runner needs to run one command.
///
/// Plain data: build it with struct-update syntax from `Default`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionRequest {
    /// Command line; split on whitespace, the first token is the program.
    pub command: String,
    /// Extra whitespace-separated arguments appended after `command`.
    pub arguments: Option<String>,
    pub working_directory: Option<PathBuf>,
    /// Non-positive or absent means "no timeout".
    pub timeout_seconds: Option<i64>,
    /// Whitelist for the matched-output text. Empty means every line.
    pub output_regex: Vec<String>,
    pub success_patterns: Vec<String>,
    pub failure_patterns: Vec<String>,
    /// Overrides `timeout_seconds` as the deadline of the poll loop.
    pub max_wait_for_pattern_seconds: Option<i64>,
    pub output_file: Option<PathBuf>,
    /// Configured success patterns must be seen before a clean exit counts.
    pub strict_success_patterns: bool,
    /// Leave the poll loop as soon as a failure pattern matches.
    pub stop_early_on_failure: bool,
}

impl ExecutionRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    /// Seconds the poll loop may run: max-wait-for-pattern, else timeout,
    /// else `default_wait`. Capped at [`MAX_PATTERN_WAIT`].
    pub fn pattern_wait(&self, default_wait: Duration) -> Duration {
        self.max_wait_for_pattern_seconds
            .filter(|s| *s > 0)
            .or(self.timeout_seconds.filter(|s| *s > 0))
            .map(|s| Duration::from_secs(s.unsigned_abs()))
            .unwrap_or(default_wait)
            .min(MAX_PATTERN_WAIT)
    }

    /// Program followed by its arguments, as handed to the OS.
    pub fn command_parts(&self) -> Vec<String> {
        let mut parts: Vec<String> = self
            .command
            .split_whitespace()
            .map(str::to_string)
            .collect();

        if let Some(args) = self.arguments.as_deref() {
            parts.extend(args.split_whitespace().map(str::to_string));
        }

        parts
    }
}

/// Why the poll loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// A success pattern matched while the process was still running.
    PatternComplete,
    /// A failure pattern matched.
    FailureDetected,
    /// The process exited by itself.
    NaturalExit,
    /// The deadline expired with the process still alive.
    TimedOut,
    /// The process never started (or the request was rejected up front).
    NotStarted,
}

/// Machine-readable category of a failed outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Launch,
    Timeout,
    NonZeroExit,
    PatternMismatch,
    FailurePattern,
    HealthCheck,
    Internal,
}

/// Lines lost because the log queue was full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DroppedLines {
    pub stdout: usize,
    pub stderr: usize,
}

impl DroppedLines {
    pub fn total(&self) -> usize {
        self.stdout + self.stderr
    }

    /// Warning text attached to the outcome error, if anything was dropped.
    pub fn warning(&self) -> Option<String> {
        if self.total() == 0 {
            return None;
        }
        Some(format!(
            "Dropped {} output lines and {} error lines while processing.",
            self.stdout, self.stderr
        ))
    }
}

/// Handle on the OS process behind an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessHandle {
    pid: Option<u32>,
    reaped: bool,
}

impl ProcessHandle {
    pub(crate) fn new(pid: Option<u32>, reaped: bool) -> Self {
        Self { pid, reaped }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Whether the process is still running.
    ///
    /// A process the runner waited on is never alive; otherwise the pid is
    /// probed with a null signal.
    pub fn is_alive(&self) -> bool {
        if self.reaped {
            return false;
        }
        match self.pid {
            Some(pid) => probe_pid(pid),
            None => false,
        }
    }
}

#[cfg(unix)]
fn probe_pid(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(not(unix))]
fn probe_pid(_pid: u32) -> bool {
    false
}

/// The engine's final verdict for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub success: bool,
    /// Lines passing the output filter, or the full log without a filter.
    pub matched_output: String,
    /// Interleaved stdout/stderr; stderr lines carry an `ERROR: ` tag.
    pub full_log: String,
    pub error: Option<String>,
    pub failure: Option<FailureKind>,
    /// `-1` when the process was killed or terminated by a signal.
    pub exit_code: i32,
    pub elapsed_ms: u64,
    pub reason: TerminationReason,
    pub success_matches: Vec<String>,
    pub failure_matches: Vec<String>,
    pub dropped: DroppedLines,
    pub log_path: Option<PathBuf>,
    pub process: Option<ProcessHandle>,
}

impl ExecutionOutcome {
    /// Outcome for an invocation that failed before (or while) spawning.
    pub fn rejected(kind: FailureKind, error: impl Into<String>, elapsed_ms: u64) -> Self {
        Self {
            success: false,
            matched_output: String::new(),
            full_log: String::new(),
            error: Some(error.into()),
            failure: Some(kind),
            exit_code: -1,
            elapsed_ms,
            reason: TerminationReason::NotStarted,
            success_matches: Vec::new(),
            failure_matches: Vec::new(),
            dropped: DroppedLines::default(),
            log_path: None,
            process: None,
        }
    }

    /// Turn an otherwise finished outcome into a failure, keeping the logs.
    pub fn into_failure(self, kind: FailureKind, error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            failure: Some(kind),
            ..self
        }
    }

    pub fn is_running(&self) -> bool {
        self.process.is_some_and(|p| p.is_alive())
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminationReason::PatternComplete => "pattern complete",
            TerminationReason::FailureDetected => "failure detected",
            TerminationReason::NaturalExit => "natural exit",
            TerminationReason::TimedOut => "timed out",
            TerminationReason::NotStarted => "not started",
        };
        write!(f, "{s}")
    }
}
