// src/registry/report.rs

//! Test report summaries.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::fs::{FileSystem, RealFileSystem, copy_dir_all};

use super::lock::{KeyedLock, ScopedLock};

/// Summary returned when no report yielded anything.
pub const NO_FAILURES: &str = "No test failures found.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportRequest {
    pub registration_id: String,
    pub reporting_paths: Vec<PathBuf>,
    pub session_id: Option<String>,
    /// Where report directories are mirrored, per session.
    pub runner_copy_path: Option<PathBuf>,
}

/// Turns test report files into a human-readable summary.
pub trait ReportProcessor: Send + Sync {
    /// `None` when the request names no reporting paths.
    fn summarize(&self, request: &ReportRequest) -> Option<String>;
}

/// Reads plain-text reports (`*.log`, `*.txt`) straight from disk.
#[derive(Debug, Clone)]
pub struct FileReportProcessor {
    fs: Arc<dyn FileSystem>,
    lock: Arc<dyn ScopedLock>,
}

impl Default for FileReportProcessor {
    fn default() -> Self {
        Self::new(Arc::new(RealFileSystem), Arc::new(KeyedLock::new()))
    }
}

impl FileReportProcessor {
    pub fn new(fs: Arc<dyn FileSystem>, lock: Arc<dyn ScopedLock>) -> Self {
        Self { fs, lock }
    }

    /// Failure detail for one existing reporting path.
    fn failure_detail(&self, path: &Path) -> String {
        let name = path.to_string_lossy();
        let readable = self.fs.is_file(path) && (name.ends_with("log") || name.ends_with("txt"));
        let loaded = if readable {
            self.fs.read_to_string(path).ok()
        } else {
            None
        };
        loaded.unwrap_or_else(|| format!("Error loading test report from {name}"))
    }

    fn summarize_path(&self, path: &Path) -> String {
        let name = path.to_string_lossy();
        let detail = self.failure_detail(path);
        format!("Test Failure Summary:\n\nClass: {name}\n  - Test: {name}\n    Error: {detail}\n\n")
    }

    /// Persist the summary next to the report and mirror the report directory
    /// into `<runner copy path>/<session>`.
    fn archive(&self, path: &Path, summary: &str, session_id: &str, copy_root: &Path) -> Result<()> {
        let report_dir = if self.fs.is_file(path) {
            path.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| absolute(Path::new(".")))
        } else {
            path.to_path_buf()
        };
        let copy_root = absolute(copy_root);

        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let processed = report_dir
            .join(session_id)
            .join(format!("processed-{stamp}.txt"));
        self.fs.write(&processed, summary.as_bytes())?;

        let target = copy_root.join(session_id);
        let copied = copy_dir_all(self.fs.as_ref(), &report_dir, &target)?;
        info!(
            report = %report_dir.display(),
            target = %target.display(),
            copied,
            "test report copied"
        );
        Ok(())
    }
}

impl ReportProcessor for FileReportProcessor {
    fn summarize(&self, request: &ReportRequest) -> Option<String> {
        if request.reporting_paths.is_empty() {
            return None;
        }
        let mut summaries = Vec::new();

        for path in &request.reporting_paths {
            let path = &absolute(path);
            if !self.fs.exists(path) {
                continue;
            }
            let summary = self.summarize_path(path);

            if let (Some(session), Some(copy_root)) =
                (request.session_id.as_deref(), request.runner_copy_path.as_deref())
            {
                self.lock.with_lock(session, &mut || {
                    if let Err(err) = self.archive(path, &summary, session, copy_root) {
                        warn!(
                            registration = %request.registration_id,
                            path = %path.display(),
                            error = %err,
                            "failed to copy test report"
                        );
                    }
                });
            }
            summaries.push(summary);
        }

        Some(combine_summaries(&summaries))
    }
}

/// `path` made absolute against the process directory, unchanged if that fails.
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn combine_summaries(summaries: &[String]) -> String {
    if summaries.is_empty() {
        NO_FAILURES.to_string()
    } else {
        summaries.join("\n")
    }
}
