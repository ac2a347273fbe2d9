//! Case persistence.
//!
//! Cases are owned by a store; everything else works on copies. The [`CaseStore`] trait is the
//! whole contract the core relies on: insert a new case, fetch one, apply a mutation
//! atomically, and list everything. Two implementations are provided:
//!
//! - [`MemoryCaseStore`]: a process-local map, used by tests and short-lived tools.
//! - [`FileCaseStore`]: one YAML file per case in a sharded directory tree.
//!
//! `list` returns whatever a single listing observes. Callers that bucket the result do not
//! need a point-in-time snapshot beyond that.

mod file;
mod memory;

pub use file::FileCaseStore;
pub use memory::MemoryCaseStore;

use crate::case::Case;
use crate::error::TriageResult;
use medflow_uuid::CaseId;

/// Storage backend for cases.
pub trait CaseStore: Send + Sync {
    /// Stores a new case.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TriageError::DuplicateCase`] if a case with the same id exists.
    fn insert(&self, case: Case) -> TriageResult<()>;

    /// Fetches a case by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TriageError::CaseNotFound`] if no such case exists.
    fn get(&self, id: CaseId) -> TriageResult<Case>;

    /// Applies `f` to the stored case and persists the result.
    ///
    /// The mutation runs against a copy; if `f` fails nothing is written. Concurrent updates to
    /// the same store are serialised.
    fn update<F>(&self, id: CaseId, f: F) -> TriageResult<Case>
    where
        F: FnOnce(&mut Case) -> TriageResult<()>;

    /// Lists every stored case, in no particular order.
    fn list(&self) -> TriageResult<Vec<Case>>;
}
