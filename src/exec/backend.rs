// src/exec/backend.rs

//! Pluggable execution backend abstraction.
//!
//! Orchestrators never talk to the [`ProcessRunner`] directly: they look up an
//! `ExecutionBackend` by the registration's [`ExecutionType`]. Production
//! registers the process runner; tests can register a fake that records
//! requests and returns canned outcomes without spawning anything.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::types::ExecutionType;

use super::request::{ExecutionOutcome, ExecutionRequest};
use super::runner::ProcessRunner;

/// Trait abstracting how an [`ExecutionRequest`] is carried out.
pub trait ExecutionBackend: Send + Sync {
    /// The execution type this backend serves.
    fn execution_type(&self) -> ExecutionType;

    /// Run the request to an outcome. Implementations report every failure
    /// through the outcome rather than an `Err`.
    fn execute<'a>(
        &'a self,
        request: &'a ExecutionRequest,
    ) -> Pin<Box<dyn Future<Output = ExecutionOutcome> + Send + 'a>>;
}

impl ExecutionBackend for ProcessRunner {
    fn execution_type(&self) -> ExecutionType {
        ExecutionType::Process
    }

    fn execute<'a>(
        &'a self,
        request: &'a ExecutionRequest,
    ) -> Pin<Box<dyn Future<Output = ExecutionOutcome> + Send + 'a>> {
        Box::pin(ProcessRunner::execute(self, request))
    }
}

/// Backends keyed by the execution type they serve.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<ExecutionType, Arc<dyn ExecutionBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the process runner as the only backend.
    pub fn with_process_runner(runner: ProcessRunner) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(runner));
        registry
    }

    /// Add a backend, replacing any previous one for the same type.
    pub fn register(&mut self, backend: Arc<dyn ExecutionBackend>) {
        self.backends.insert(backend.execution_type(), backend);
    }

    pub fn get(&self, execution_type: ExecutionType) -> Option<Arc<dyn ExecutionBackend>> {
        self.backends.get(&execution_type).cloned()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.backends.keys().collect();
        types.sort_by_key(|t| t.to_string());
        f.debug_struct("BackendRegistry")
            .field("types", &types)
            .finish()
    }
}
