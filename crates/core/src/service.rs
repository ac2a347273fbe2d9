//! Case workflow orchestration.
//!
//! [`TriageService`] ties the evaluator, the lifecycle rules and a [`CaseStore`] together. Each
//! state change is applied through [`CaseStore::update`], so the closure that validates and
//! mutates a case runs under the store's lock and a failed step leaves the stored case as it was.

use crate::actor::Actor;
use crate::case::{Case, ClinicalUpdate, NewCase};
use crate::config::CoreConfig;
use crate::diagnosis::DifferentialDiagnosis;
use crate::error::TriageResult;
use crate::narrative::{fetch_narrative, NarrativeSource};
use crate::queue::{bucket, QueueSnapshot, QueueStats};
use crate::store::CaseStore;
use crate::triage::TriageEvaluator;
use chrono::{DateTime, Utc};
use medflow_uuid::CaseId;
use std::sync::Arc;

/// Service for submitting, triaging and reviewing cases.
pub struct TriageService<S> {
    cfg: Arc<CoreConfig>,
    store: S,
    evaluator: TriageEvaluator,
}

impl<S: CaseStore> TriageService<S> {
    /// Creates a service over `store` using the scoring and queue settings in `cfg`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TriageError::Config`] if the scoring configuration is invalid.
    pub fn new(cfg: Arc<CoreConfig>, store: S) -> TriageResult<Self> {
        let evaluator = TriageEvaluator::new(cfg.scoring().clone())?;
        Ok(Self {
            cfg,
            store,
            evaluator,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validates and stores a new consultation in `pending` status.
    pub fn submit(&self, input: NewCase) -> TriageResult<Case> {
        let case = Case::new(input, Utc::now())?;
        self.store.insert(case.clone())?;
        tracing::info!(
            "submitted case {} (severity {}, {} symptom(s))",
            case.id(),
            case.severity(),
            case.symptoms().len()
        );
        Ok(case)
    }

    /// Runs the evaluator and moves the case from `pending` to `triaged`.
    pub fn triage(&self, id: CaseId) -> TriageResult<Case> {
        self.triage_inner(id, None)
    }

    /// As [`Self::triage`], attaching a narrative from `source` when one arrives within the
    /// configured timeout.
    pub async fn triage_with_narrative<N: NarrativeSource>(
        &self,
        id: CaseId,
        source: &N,
    ) -> TriageResult<Case> {
        let case = self.store.get(id)?;
        let narrative = fetch_narrative(source, &case, self.cfg.narrative_timeout()).await;
        self.triage_inner(id, narrative)
    }

    fn triage_inner(&self, id: CaseId, narrative: Option<String>) -> TriageResult<Case> {
        let case = self.store.update(id, |case| {
            let mut assessment = self.evaluator.evaluate(&case.snapshot())?;
            assessment.narrative = narrative;
            case.apply_triage(assessment, Utc::now())
        })?;
        if let Some(t) = case.triage() {
            tracing::info!("triaged case {} as {} (score {})", id, t.level, t.score);
        }
        Ok(case)
    }

    /// Applies clinical updates and re-evaluates a case that is still queued.
    ///
    /// Only clinical roles may re-triage. The case keeps its status; the triage record's
    /// revision is incremented.
    pub fn retriage(&self, id: CaseId, actor: &Actor, update: ClinicalUpdate) -> TriageResult<Case> {
        let case = self.store.update(id, |case| {
            actor.require_clinical("re-triage a case")?;
            let narrative = case
                .triage()
                .and_then(|t| t.assessment.narrative.clone());
            case.apply_update(update)?;
            let mut assessment = self.evaluator.evaluate(&case.snapshot())?;
            assessment.narrative = narrative;
            case.apply_retriage(actor, assessment, Utc::now())
        })?;
        if let Some(t) = case.triage() {
            tracing::info!(
                "{} re-triaged case {} as {} (score {}, revision {})",
                actor.name,
                id,
                t.level,
                t.score,
                t.revision
            );
        }
        Ok(case)
    }

    /// A clinician takes a triaged case for review.
    pub fn claim(&self, id: CaseId, actor: &Actor) -> TriageResult<Case> {
        let case = self.store.update(id, |case| case.claim(actor))?;
        tracing::info!("{} ({}) claimed case {}", actor.name, actor.role, id);
        Ok(case)
    }

    /// The reviewing clinician completes a case.
    pub fn complete(&self, id: CaseId, actor: &Actor) -> TriageResult<Case> {
        let case = self
            .store
            .update(id, |case| case.complete(actor, Utc::now()))?;
        tracing::info!("{} ({}) completed case {}", actor.name, actor.role, id);
        Ok(case)
    }

    /// Candidate diagnoses for a stored case's symptoms.
    pub fn differential(&self, id: CaseId) -> TriageResult<DifferentialDiagnosis> {
        let case = self.store.get(id)?;
        let dx = DifferentialDiagnosis::from_symptoms(case.symptoms());
        tracing::debug!(
            "differential for case {}: {} candidate(s)",
            id,
            dx.diagnoses.len()
        );
        Ok(dx)
    }

    pub fn get(&self, id: CaseId) -> TriageResult<Case> {
        self.store.get(id)
    }

    /// All stored cases, oldest first.
    pub fn list(&self) -> TriageResult<Vec<Case>> {
        let mut cases = self.store.list()?;
        cases.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(cases)
    }

    /// Current queue with wait estimates.
    pub fn queue(&self) -> TriageResult<QueueSnapshot> {
        let cases = self.store.list()?;
        Ok(QueueSnapshot::from_buckets(
            &bucket(&cases),
            self.cfg.queue(),
        ))
    }

    pub fn stats(&self, now: DateTime<Utc>) -> TriageResult<QueueStats> {
        let cases = self.store.list()?;
        Ok(QueueStats::compute(&cases, self.cfg.queue(), now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Role;
    use crate::case::tests::sample_input;
    use crate::case::CaseStatus;
    use crate::error::TriageError;
    use crate::narrative::{DemoNarrative, NoNarrative};
    use crate::store::{FileCaseStore, MemoryCaseStore};
    use crate::triage::TriageLevel;
    use crate::vitals::VitalSigns;
    use std::path::Path;
    use tempfile::TempDir;

    fn test_cfg(case_data_dir: &Path) -> Arc<CoreConfig> {
        Arc::new(
            CoreConfig::with_defaults(case_data_dir.to_path_buf())
                .expect("CoreConfig::with_defaults should succeed"),
        )
    }

    fn memory_service() -> TriageService<MemoryCaseStore> {
        TriageService::new(test_cfg(Path::new("unused")), MemoryCaseStore::new())
            .expect("service should build")
    }

    fn nurse() -> Actor {
        Actor::new("Nurse Demo", Role::Nurse).unwrap()
    }

    #[test]
    fn full_lifecycle() {
        let service = memory_service();
        let case = service.submit(sample_input()).unwrap();
        assert_eq!(case.status(), CaseStatus::Pending);

        let case = service.triage(case.id()).unwrap();
        assert_eq!(case.triage_level(), Some(TriageLevel::Critical));
        let assessment = &case.triage().unwrap().assessment;
        assert!(assessment.score >= 9.5);
        assert!(assessment.red_flags.iter().any(|f| f.contains("chest pain")));
        assert!(assessment
            .red_flags
            .iter()
            .any(|f| f.contains("shortness of breath")));

        let queue = service.queue().unwrap();
        let critical = queue.level(TriageLevel::Critical).unwrap();
        assert_eq!(critical.entries.len(), 1);
        assert_eq!(critical.entries[0].case_id, case.id());

        service.claim(case.id(), &nurse()).unwrap();
        let done = service.complete(case.id(), &nurse()).unwrap();
        assert_eq!(done.status(), CaseStatus::Completed);

        let queue = service.queue().unwrap();
        assert!(queue.levels.iter().all(|l| l.entries.is_empty()));
        let stats = service.stats(Utc::now()).unwrap();
        assert_eq!(stats.completed_today, 1);
    }

    #[test]
    fn rejected_transition_leaves_case_unchanged() {
        let service = memory_service();
        let case = service.submit(sample_input()).unwrap();

        let err = service.claim(case.id(), &nurse()).unwrap_err();
        assert!(matches!(err, TriageError::InvalidTransition { .. }));
        assert_eq!(service.get(case.id()).unwrap(), case);

        service.triage(case.id()).unwrap();
        assert!(matches!(
            service.triage(case.id()),
            Err(TriageError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn retriage_with_normal_vitals_lowers_score() {
        let service = memory_service();
        let case = service.submit(sample_input()).unwrap();
        let before = service.triage(case.id()).unwrap().triage_score().unwrap();

        let update = ClinicalUpdate {
            vital_signs: Some(VitalSigns {
                heart_rate: Some(80.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let after = service.retriage(case.id(), &nurse(), update).unwrap();
        assert!(after.triage_score().unwrap() < before);
        assert_eq!(after.status(), CaseStatus::Triaged);
        assert_eq!(after.triage().unwrap().revision, 1);
    }

    #[test]
    fn retriage_by_patient_is_rejected_without_applying_update() {
        let service = memory_service();
        let case = service.submit(sample_input()).unwrap();
        let triaged = service.triage(case.id()).unwrap();

        let patient = Actor::new("Demo Patient", Role::Patient).unwrap();
        let update = ClinicalUpdate {
            additional_symptoms: vec!["seizure".into()],
            ..Default::default()
        };
        let err = service.retriage(case.id(), &patient, update).unwrap_err();
        assert!(matches!(err, TriageError::Unauthorised { .. }));
        assert_eq!(service.get(case.id()).unwrap(), triaged);
    }

    #[test]
    fn differential_uses_case_symptoms() {
        let service = memory_service();
        let case = service.submit(sample_input()).unwrap();
        let dx = service.differential(case.id()).unwrap();
        assert_eq!(dx.matched_keywords, vec!["chest pain".to_string()]);
        assert_eq!(dx.diagnoses[0].diagnosis, "Costochondritis");
        assert_eq!(service.get(case.id()).unwrap(), case);
    }

    #[test]
    fn unknown_case_is_not_found() {
        let service = memory_service();
        assert!(matches!(
            service.triage(CaseId::new()),
            Err(TriageError::CaseNotFound(_))
        ));
    }

    #[test]
    fn submit_rejects_out_of_range_severity() {
        let service = memory_service();
        for severity in [0, 11] {
            let mut input = sample_input();
            input.severity = severity;
            assert!(matches!(
                service.submit(input),
                Err(TriageError::InvalidInput(_))
            ));
        }
        assert!(service.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn narrative_is_attached_without_changing_score() {
        let service = memory_service();
        let plain = service.submit(sample_input()).unwrap();
        let narrated = service.submit(sample_input()).unwrap();

        let plain = service
            .triage_with_narrative(plain.id(), &NoNarrative)
            .await
            .unwrap();
        let narrated = service
            .triage_with_narrative(narrated.id(), &DemoNarrative)
            .await
            .unwrap();

        let plain = &plain.triage().unwrap().assessment;
        let narrated = &narrated.triage().unwrap().assessment;
        assert!(plain.narrative.is_none());
        assert!(narrated.narrative.is_some());
        assert_eq!(plain.score, narrated.score);
        assert_eq!(plain.level, narrated.level);
    }

    #[test]
    fn file_backed_service_survives_restart() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cfg = test_cfg(temp_dir.path());

        let id = {
            let store = FileCaseStore::from_config(&cfg).unwrap();
            let service = TriageService::new(cfg.clone(), store).unwrap();
            let case = service.submit(sample_input()).unwrap();
            service.triage(case.id()).unwrap();
            case.id()
        };

        let store = FileCaseStore::from_config(&cfg).unwrap();
        let service = TriageService::new(cfg, store).unwrap();
        let reloaded = service.get(id).unwrap();
        assert_eq!(reloaded.status(), CaseStatus::Triaged);
        assert_eq!(service.list().unwrap().len(), 1);
    }
}
