//! File-backed case store.
//!
//! ## Storage Layout
//!
//! ```text
//! <case_data_dir>/
//!   cases/
//!     <s1>/
//!       <s2>/
//!         <case_id>/
//!           case.yaml
//! ```
//!
//! where `s1` and `s2` are the first four hex characters of the case id. Writes go to a
//! temporary file that is renamed into place, so readers never see a half-written record.

use super::CaseStore;
use crate::case::Case;
use crate::config::CoreConfig;
use crate::constants::CASE_FILENAME;
use crate::error::{TriageError, TriageResult};
use medflow_uuid::CaseId;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Case store writing one YAML document per case.
#[derive(Debug)]
pub struct FileCaseStore {
    cases_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCaseStore {
    /// Creates a store rooted at `cases_dir`, creating the directory if needed.
    pub fn new(cases_dir: PathBuf) -> TriageResult<Self> {
        fs::create_dir_all(&cases_dir).map_err(TriageError::StorageDirCreation)?;
        Ok(Self {
            cases_dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Creates a store under the configured data directory.
    pub fn from_config(cfg: &CoreConfig) -> TriageResult<Self> {
        Self::new(cfg.cases_dir())
    }

    pub fn cases_dir(&self) -> &Path {
        &self.cases_dir
    }

    fn case_path(&self, id: CaseId) -> PathBuf {
        id.sharded_dir(&self.cases_dir).join(CASE_FILENAME)
    }

    fn read_case(&self, id: CaseId) -> TriageResult<Case> {
        let path = self.case_path(id);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TriageError::CaseNotFound(id))
            }
            Err(e) => return Err(TriageError::FileRead(e)),
        };
        let case = parse_case(&text)?;
        if case.id() != id {
            return Err(TriageError::CorruptRecord {
                id: id.to_string(),
                reason: format!("file contains case {}", case.id()),
            });
        }
        Ok(case)
    }

    fn write_case(&self, case: &Case) -> TriageResult<()> {
        let path = self.case_path(case.id());
        let dir = path
            .parent()
            .ok_or_else(|| TriageError::InvalidInput("case path has no parent".into()))?;
        fs::create_dir_all(dir).map_err(TriageError::StorageDirCreation)?;

        let yaml = serde_yaml::to_string(case).map_err(TriageError::YamlSerialization)?;
        let tmp = path.with_extension("yaml.tmp");
        fs::write(&tmp, yaml).map_err(TriageError::FileWrite)?;
        fs::rename(&tmp, &path).map_err(TriageError::FileWrite)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Parse a stored case, reporting the failing field path on schema errors.
pub(crate) fn parse_case(yaml_text: &str) -> TriageResult<Case> {
    let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
    let case = serde_path_to_error::deserialize::<_, Case>(deserializer).map_err(|err| {
        let path = err.path().to_string();
        let source = err.into_inner();
        TriageError::YamlDeserialization(format!("case schema mismatch at {path}: {source}"))
    })?;
    case.check_invariants()?;
    Ok(case)
}

impl CaseStore for FileCaseStore {
    fn insert(&self, case: Case) -> TriageResult<()> {
        let _guard = self.lock();
        if self.case_path(case.id()).exists() {
            return Err(TriageError::DuplicateCase(case.id()));
        }
        self.write_case(&case)
    }

    fn get(&self, id: CaseId) -> TriageResult<Case> {
        self.read_case(id)
    }

    fn update<F>(&self, id: CaseId, f: F) -> TriageResult<Case>
    where
        F: FnOnce(&mut Case) -> TriageResult<()>,
    {
        let _guard = self.lock();
        let mut case = self.read_case(id)?;
        f(&mut case)?;
        self.write_case(&case)?;
        Ok(case)
    }

    /// Walks the sharded tree. Unreadable or corrupt records are logged and skipped.
    fn list(&self) -> TriageResult<Vec<Case>> {
        let mut cases = Vec::new();

        let s1_iter = match fs::read_dir(&self.cases_dir) {
            Ok(it) => it,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(cases),
            Err(e) => return Err(TriageError::FileRead(e)),
        };

        for s1 in s1_iter.flatten() {
            let s1_path = s1.path();
            if !s1_path.is_dir() {
                continue;
            }
            let Ok(s2_iter) = fs::read_dir(&s1_path) else {
                continue;
            };
            for s2 in s2_iter.flatten() {
                let s2_path = s2.path();
                if !s2_path.is_dir() {
                    continue;
                }
                let Ok(id_iter) = fs::read_dir(&s2_path) else {
                    continue;
                };
                for id_ent in id_iter.flatten() {
                    let case_path = id_ent.path().join(CASE_FILENAME);
                    if !case_path.is_file() {
                        continue;
                    }
                    match fs::read_to_string(&case_path)
                        .map_err(TriageError::FileRead)
                        .and_then(|text| parse_case(&text))
                    {
                        Ok(case) => cases.push(case),
                        Err(e) => {
                            tracing::warn!("skipping case file {}: {}", case_path.display(), e)
                        }
                    }
                }
            }
        }

        Ok(cases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Actor, Role};
    use crate::case::tests::sample_input;
    use crate::triage::TriageEvaluator;
    use chrono::Utc;
    use tempfile::TempDir;

    fn store(temp_dir: &TempDir) -> FileCaseStore {
        FileCaseStore::new(temp_dir.path().join("cases")).expect("store should be created")
    }

    #[test]
    fn insert_writes_sharded_yaml() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = store(&temp_dir);
        let case = Case::new(sample_input(), Utc::now()).unwrap();
        store.insert(case.clone()).unwrap();

        let expected = case
            .id()
            .sharded_dir(&temp_dir.path().join("cases"))
            .join(CASE_FILENAME);
        assert!(expected.is_file(), "case.yaml should exist at {expected:?}");
        assert_eq!(store.get(case.id()).unwrap(), case);
    }

    #[test]
    fn update_persists_transitions() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = store(&temp_dir);
        let case = Case::new(sample_input(), Utc::now()).unwrap();
        let id = case.id();
        store.insert(case).unwrap();

        store
            .update(id, |c| {
                let assessment = TriageEvaluator::default().evaluate(&c.snapshot())?;
                c.apply_triage(assessment, Utc::now())
            })
            .unwrap();
        let nurse = Actor::new("Nurse Demo", Role::Nurse).unwrap();
        store.update(id, |c| c.claim(&nurse)).unwrap();

        let reloaded = store.get(id).unwrap();
        assert_eq!(reloaded.status(), crate::case::CaseStatus::InReview);
        assert_eq!(reloaded.claimed_by(), Some("Nurse Demo"));
    }

    #[test]
    fn failed_update_does_not_write() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = store(&temp_dir);
        let case = Case::new(sample_input(), Utc::now()).unwrap();
        let id = case.id();
        store.insert(case.clone()).unwrap();

        let nurse = Actor::new("Nurse Demo", Role::Nurse).unwrap();
        assert!(store.update(id, |c| c.claim(&nurse)).is_err());
        assert_eq!(store.get(id).unwrap(), case);
    }

    #[test]
    fn list_skips_corrupt_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = store(&temp_dir);
        let good = Case::new(sample_input(), Utc::now()).unwrap();
        store.insert(good.clone()).unwrap();

        let bad_dir = CaseId::new().sharded_dir(store.cases_dir());
        fs::create_dir_all(&bad_dir).unwrap();
        fs::write(bad_dir.join(CASE_FILENAME), "status: [not, a, case]\n").unwrap();

        let cases = store.list().unwrap();
        assert_eq!(cases, vec![good]);
    }

    #[test]
    fn list_on_empty_store_is_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = store(&temp_dir);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn parse_case_reports_field_path() {
        let case = Case::new(sample_input(), Utc::now()).unwrap();
        let yaml = serde_yaml::to_string(&case)
            .unwrap()
            .replace("severity: 8", "severity: loud");
        match parse_case(&yaml) {
            Err(TriageError::YamlDeserialization(msg)) => assert!(msg.contains("severity")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn get_missing_case_is_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = store(&temp_dir);
        assert!(matches!(
            store.get(CaseId::new()),
            Err(TriageError::CaseNotFound(_))
        ));
    }
}
