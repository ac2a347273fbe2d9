use super::CaseStore;
use crate::case::Case;
use crate::error::{TriageError, TriageResult};
use medflow_uuid::CaseId;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory case store.
#[derive(Debug, Default)]
pub struct MemoryCaseStore {
    cases: RwLock<HashMap<CaseId, Case>>,
}

impl MemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    // `update` only writes after `f` succeeds, so a poisoned lock still guards consistent data.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<CaseId, Case>> {
        self.cases.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CaseId, Case>> {
        self.cases.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CaseStore for MemoryCaseStore {
    fn insert(&self, case: Case) -> TriageResult<()> {
        let mut cases = self.write();
        if cases.contains_key(&case.id()) {
            return Err(TriageError::DuplicateCase(case.id()));
        }
        cases.insert(case.id(), case);
        Ok(())
    }

    fn get(&self, id: CaseId) -> TriageResult<Case> {
        self.read()
            .get(&id)
            .cloned()
            .ok_or(TriageError::CaseNotFound(id))
    }

    fn update<F>(&self, id: CaseId, f: F) -> TriageResult<Case>
    where
        F: FnOnce(&mut Case) -> TriageResult<()>,
    {
        let mut cases = self.write();
        let stored = cases.get_mut(&id).ok_or(TriageError::CaseNotFound(id))?;
        let mut updated = stored.clone();
        f(&mut updated)?;
        *stored = updated.clone();
        Ok(updated)
    }

    fn list(&self) -> TriageResult<Vec<Case>> {
        Ok(self.read().values().cloned().collect())
    }
}
