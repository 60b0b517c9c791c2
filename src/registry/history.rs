// src/registry/history.rs

//! Execution history.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::artifacts::CopiedArtifact;
use crate::health::HealthCheck;
use crate::types::RegistrationKind;

/// Orchestrator-specific part of a history record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryDetails {
    Run {
        output_file: Option<PathBuf>,
    },
    Build {
        build_directory: Option<PathBuf>,
        artifacts: Vec<CopiedArtifact>,
    },
    Deploy {
        health: Option<HealthCheck>,
        deployment_url: Option<String>,
        is_running: bool,
    },
    Stop,
}

/// One finished invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub run_id: Uuid,
    pub registration_id: String,
    pub kind: RegistrationKind,
    pub command: String,
    pub arguments: Option<String>,
    pub session_id: Option<String>,
    pub success: bool,
    pub exit_code: i32,
    pub elapsed_ms: u64,
    pub error: Option<String>,
    /// Matched output, or the report summary when one was produced.
    pub output: String,
    pub full_log: String,
    pub recorded_at: DateTime<Utc>,
    pub details: HistoryDetails,
}

/// Sink for finished invocations. Orchestrators log a failed `record` and
/// carry on.
pub trait HistoryRecorder: Send + Sync {
    fn record(&self, record: HistoryRecord) -> Result<()>;
}

/// History held in memory, newest last, optionally capped.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistory {
    records: Arc<Mutex<VecDeque<HistoryRecord>>>,
    /// `0` keeps everything.
    limit: usize,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `limit` records, evicting the oldest.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<HistoryRecord> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.iter().cloned().collect()
    }

    pub fn for_registration(&self, registration_id: &str) -> Vec<HistoryRecord> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records
            .iter()
            .filter(|r| r.registration_id == registration_id)
            .cloned()
            .collect()
    }

    pub fn find(&self, run_id: Uuid) -> Option<HistoryRecord> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.iter().find(|r| r.run_id == run_id).cloned()
    }
}

impl HistoryRecorder for InMemoryHistory {
    fn record(&self, record: HistoryRecord) -> Result<()> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.push_back(record);
        if self.limit > 0 {
            while records.len() > self.limit {
                records.pop_front();
            }
        }
        Ok(())
    }
}
