// src/registry/mod.rs

//! Collaborators around the engine: registration lookup, history, test
//! report processing and the scoped lock used while copying reports.
//!
//! Each collaborator is a trait with a small in-process implementation; the
//! orchestrators only depend on the traits.

pub mod history;
pub mod lock;
pub mod model;
pub mod report;
pub mod store;

pub use history::{HistoryDetails, HistoryRecord, HistoryRecorder, InMemoryHistory};
pub use lock::{KeyedLock, ScopedLock};
pub use model::Registration;
pub use report::{FileReportProcessor, ReportProcessor, ReportRequest};
pub use store::{InMemoryRegistrationStore, RegistrationLookup};
