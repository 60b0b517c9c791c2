use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use cmdrunner::exec::{
    ExecutionBackend, ExecutionOutcome, ExecutionRequest, FailureKind, TerminationReason,
};
use cmdrunner::types::ExecutionType;

/// A fake backend that:
/// - records every request it is handed
/// - returns a canned outcome without spawning anything.
pub struct FakeBackend {
    outcome: ExecutionOutcome,
    requests: Arc<Mutex<Vec<ExecutionRequest>>>,
}

impl FakeBackend {
    pub fn new(outcome: ExecutionOutcome) -> Self {
        Self {
            outcome,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Backend whose every run exits 0 with `output` as its only line.
    pub fn succeeding(output: &str) -> Self {
        Self::new(ExecutionOutcome {
            success: true,
            matched_output: output.to_string(),
            full_log: output.to_string(),
            error: None,
            failure: None,
            exit_code: 0,
            reason: TerminationReason::NaturalExit,
            ..ExecutionOutcome::rejected(FailureKind::Internal, "", 0)
        })
    }

    /// Shared handle on the recorded requests.
    pub fn requests(&self) -> Arc<Mutex<Vec<ExecutionRequest>>> {
        Arc::clone(&self.requests)
    }
}

impl ExecutionBackend for FakeBackend {
    fn execution_type(&self) -> ExecutionType {
        ExecutionType::Process
    }

    fn execute<'a>(
        &'a self,
        request: &'a ExecutionRequest,
    ) -> Pin<Box<dyn Future<Output = ExecutionOutcome> + Send + 'a>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request.clone());
            self.outcome.clone()
        })
    }
}
