//! Consultation cases and their lifecycle.
//!
//! A [`Case`] moves strictly forward through
//! `pending → triaged → in_review → completed`, one step at a time, each step triggered by an
//! explicit action (triage run, clinician claim, clinician completion). A case carries a triage
//! outcome if and only if its status is at least `triaged`; the fields are private so that
//! invariant can only change through the methods below.

use crate::actor::Actor;
use crate::constants::{MAX_SEVERITY, MIN_SEVERITY};
use crate::error::{TriageError, TriageResult};
use crate::triage::{Assessment, CaseSnapshot, TriageLevel};
use crate::vitals::VitalSigns;
use crate::NonEmptyText;
use chrono::{DateTime, Utc};
use medflow_uuid::CaseId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a case. Ordered by progression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Pending,
    Triaged,
    InReview,
    Completed,
}

impl CaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CaseStatus::Pending => "pending",
            CaseStatus::Triaged => "triaged",
            CaseStatus::InReview => "in_review",
            CaseStatus::Completed => "completed",
        }
    }

    /// The only status this one may move to, if any.
    pub fn next(self) -> Option<CaseStatus> {
        match self {
            CaseStatus::Pending => Some(CaseStatus::Triaged),
            CaseStatus::Triaged => Some(CaseStatus::InReview),
            CaseStatus::InReview => Some(CaseStatus::Completed),
            CaseStatus::Completed => None,
        }
    }

    pub fn can_transition_to(self, to: CaseStatus) -> bool {
        self.next() == Some(to)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for a new consultation.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewCase {
    pub chief_complaint: String,
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub medical_history: Vec<String>,
    #[serde(default)]
    pub vital_signs: Option<VitalSigns>,
    #[serde(default)]
    pub ai_findings: Option<String>,
    pub severity: u8,
}

/// Additional information supplied with a re-triage.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClinicalUpdate {
    /// Replaces the recorded vital signs when present.
    #[serde(default)]
    pub vital_signs: Option<VitalSigns>,
    #[serde(default)]
    pub additional_symptoms: Vec<String>,
    #[serde(default)]
    pub additional_history: Vec<String>,
    /// Replaces the recorded AI findings when present.
    #[serde(default)]
    pub ai_findings: Option<String>,
    /// Replaces the self-reported severity when present.
    #[serde(default)]
    pub severity: Option<u8>,
}

impl ClinicalUpdate {
    pub fn is_empty(&self) -> bool {
        self.vital_signs.is_none()
            && self.additional_symptoms.is_empty()
            && self.additional_history.is_empty()
            && self.ai_findings.is_none()
            && self.severity.is_none()
    }
}

/// Triage outcome attached to a case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TriageRecord {
    pub level: TriageLevel,
    pub score: f64,
    pub assessment: Assessment,
    pub assessed_at: DateTime<Utc>,
    /// Number of re-triages applied after the initial triage.
    #[serde(default)]
    pub revision: u32,
}

impl TriageRecord {
    fn new(assessment: Assessment, assessed_at: DateTime<Utc>, revision: u32) -> Self {
        Self {
            level: assessment.level,
            score: assessment.score,
            assessment,
            assessed_at,
            revision,
        }
    }
}

/// One patient consultation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Case {
    id: CaseId,
    chief_complaint: NonEmptyText,
    symptoms: Vec<NonEmptyText>,
    #[serde(default)]
    medical_history: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vital_signs: Option<VitalSigns>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ai_findings: Option<String>,
    severity: u8,
    status: CaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    triage: Option<TriageRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    claimed_by: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
}

fn check_severity(severity: u8) -> TriageResult<()> {
    if (MIN_SEVERITY..=MAX_SEVERITY).contains(&severity) {
        return Ok(());
    }
    Err(TriageError::InvalidInput(format!(
        "severity must be between {MIN_SEVERITY} and {MAX_SEVERITY}, got {severity}"
    )))
}

fn non_empty_entries(entries: Vec<String>, what: &str) -> TriageResult<Vec<NonEmptyText>> {
    entries
        .into_iter()
        .map(|e| {
            NonEmptyText::new(e)
                .map_err(|_| TriageError::InvalidInput(format!("{what} entries cannot be blank")))
        })
        .collect()
}

fn clean_history(history: Vec<String>) -> Vec<String> {
    history
        .into_iter()
        .map(|h| h.trim().to_owned())
        .filter(|h| !h.is_empty())
        .collect()
}

fn clean_findings(findings: Option<String>) -> Option<String> {
    findings
        .map(|f| f.trim().to_owned())
        .filter(|f| !f.is_empty())
}

impl Case {
    /// Validates a submission and creates a `pending` case.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidInput`] if the chief complaint is blank, the symptom list is
    /// empty or has blank entries, severity is outside `[1, 10]`, or a vital reading is unusable.
    pub fn new(input: NewCase, created_at: DateTime<Utc>) -> TriageResult<Self> {
        let chief_complaint = NonEmptyText::new(&input.chief_complaint)
            .map_err(|_| TriageError::InvalidInput("chief_complaint is required".into()))?;
        if input.symptoms.is_empty() {
            return Err(TriageError::InvalidInput(
                "at least one symptom is required".into(),
            ));
        }
        let symptoms = non_empty_entries(input.symptoms, "symptom")?;
        check_severity(input.severity)?;
        if let Some(vitals) = &input.vital_signs {
            vitals.validate()?;
        }

        Ok(Self {
            id: CaseId::new(),
            chief_complaint,
            symptoms,
            medical_history: clean_history(input.medical_history),
            vital_signs: input.vital_signs.filter(|v| !v.is_empty()),
            ai_findings: clean_findings(input.ai_findings),
            severity: input.severity,
            status: CaseStatus::Pending,
            triage: None,
            claimed_by: None,
            created_at,
            completed_at: None,
        })
    }

    pub fn id(&self) -> CaseId {
        self.id
    }

    pub fn chief_complaint(&self) -> &NonEmptyText {
        &self.chief_complaint
    }

    pub fn symptoms(&self) -> &[NonEmptyText] {
        &self.symptoms
    }

    pub fn medical_history(&self) -> &[String] {
        &self.medical_history
    }

    pub fn vital_signs(&self) -> Option<&VitalSigns> {
        self.vital_signs.as_ref()
    }

    pub fn ai_findings(&self) -> Option<&str> {
        self.ai_findings.as_deref()
    }

    pub fn severity(&self) -> u8 {
        self.severity
    }

    pub fn status(&self) -> CaseStatus {
        self.status
    }

    pub fn triage(&self) -> Option<&TriageRecord> {
        self.triage.as_ref()
    }

    pub fn triage_level(&self) -> Option<TriageLevel> {
        self.triage.as_ref().map(|t| t.level)
    }

    pub fn triage_score(&self) -> Option<f64> {
        self.triage.as_ref().map(|t| t.score)
    }

    pub fn claimed_by(&self) -> Option<&str> {
        self.claimed_by.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// True while the case still belongs in a queue bucket.
    pub fn is_active(&self) -> bool {
        self.status != CaseStatus::Completed && self.triage.is_some()
    }

    /// Borrowed view used by the evaluator.
    pub fn snapshot(&self) -> CaseSnapshot<'_> {
        CaseSnapshot {
            severity: self.severity,
            symptoms: &self.symptoms,
            medical_history: &self.medical_history,
            vital_signs: self.vital_signs.as_ref(),
            ai_findings: self.ai_findings.as_deref(),
        }
    }

    /// Checks the invariants that deserialisation alone cannot enforce.
    pub fn check_invariants(&self) -> TriageResult<()> {
        let corrupt = |reason: &str| TriageError::CorruptRecord {
            id: self.id.to_string(),
            reason: reason.to_owned(),
        };

        if self.symptoms.is_empty() {
            return Err(corrupt("symptom list is empty"));
        }
        check_severity(self.severity).map_err(|e| corrupt(&e.to_string()))?;
        if (self.status >= CaseStatus::Triaged) != self.triage.is_some() {
            return Err(corrupt("triage outcome must be present exactly when status >= triaged"));
        }
        if let Some(t) = &self.triage {
            if t.level != t.assessment.level || t.score != t.assessment.score {
                return Err(corrupt("triage record disagrees with its assessment"));
            }
        }
        if (self.status == CaseStatus::Completed) != self.completed_at.is_some() {
            return Err(corrupt("completed_at must be set exactly when status is completed"));
        }
        if self.status >= CaseStatus::InReview && self.claimed_by.is_none() {
            return Err(corrupt("claimed cases must record a clinician"));
        }
        Ok(())
    }

    fn transition(&mut self, to: CaseStatus) -> TriageResult<()> {
        if !self.status.can_transition_to(to) {
            return Err(TriageError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Records the first triage outcome (`pending → triaged`).
    pub fn apply_triage(&mut self, assessment: Assessment, at: DateTime<Utc>) -> TriageResult<()> {
        if self.symptoms.is_empty() {
            return Err(TriageError::InvalidInput(
                "cannot triage a case without symptoms".into(),
            ));
        }
        self.transition(CaseStatus::Triaged)?;
        self.triage = Some(TriageRecord::new(assessment, at, 0));
        Ok(())
    }

    /// Replaces the triage outcome of a case still in the queue. Status is unchanged.
    pub fn apply_retriage(
        &mut self,
        actor: &Actor,
        assessment: Assessment,
        at: DateTime<Utc>,
    ) -> TriageResult<()> {
        actor.require_clinical("re-triage a case")?;
        let revision = match (&self.triage, self.status) {
            (Some(t), CaseStatus::Triaged | CaseStatus::InReview) => t.revision + 1,
            _ => {
                return Err(TriageError::InvalidTransition {
                    from: self.status,
                    to: CaseStatus::Triaged,
                })
            }
        };
        self.triage = Some(TriageRecord::new(assessment, at, revision));
        Ok(())
    }

    /// Applies clinical updates ahead of a re-triage.
    pub fn apply_update(&mut self, update: ClinicalUpdate) -> TriageResult<()> {
        if let Some(severity) = update.severity {
            check_severity(severity)?;
        }
        if let Some(vitals) = &update.vital_signs {
            vitals.validate()?;
        }
        let extra_symptoms = non_empty_entries(update.additional_symptoms, "symptom")?;

        if let Some(severity) = update.severity {
            self.severity = severity;
        }
        if let Some(vitals) = update.vital_signs {
            self.vital_signs = Some(vitals).filter(|v| !v.is_empty());
        }
        if update.ai_findings.is_some() {
            self.ai_findings = clean_findings(update.ai_findings);
        }
        self.symptoms.extend(extra_symptoms);
        self.medical_history
            .extend(clean_history(update.additional_history));
        Ok(())
    }

    /// A clinician takes the case for review (`triaged → in_review`).
    pub fn claim(&mut self, actor: &Actor) -> TriageResult<()> {
        actor.require_clinical("claim a case")?;
        self.transition(CaseStatus::InReview)?;
        self.claimed_by = Some(actor.name.to_string());
        Ok(())
    }

    /// The reviewing clinician closes the case (`in_review → completed`).
    pub fn complete(&mut self, actor: &Actor, at: DateTime<Utc>) -> TriageResult<()> {
        actor.require_clinical("complete a case")?;
        self.transition(CaseStatus::Completed)?;
        self.completed_at = Some(at);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::actor::Role;
    use crate::triage::TriageEvaluator;

    pub(crate) fn sample_input() -> NewCase {
        NewCase {
            chief_complaint: "Chest pain".into(),
            symptoms: vec!["chest pain".into(), "shortness of breath".into()],
            medical_history: vec!["hypertension".into()],
            vital_signs: Some(VitalSigns {
                heart_rate: Some(130.0),
                ..Default::default()
            }),
            ai_findings: None,
            severity: 8,
        }
    }

    fn nurse() -> Actor {
        Actor::new("Nurse Demo", Role::Nurse).unwrap()
    }

    fn triaged_case() -> Case {
        let mut case = Case::new(sample_input(), Utc::now()).unwrap();
        let assessment = TriageEvaluator::default()
            .evaluate(&case.snapshot())
            .unwrap();
        case.apply_triage(assessment, Utc::now()).unwrap();
        case
    }

    #[test]
    fn new_case_is_pending_without_triage() {
        let case = Case::new(sample_input(), Utc::now()).unwrap();
        assert_eq!(case.status(), CaseStatus::Pending);
        assert!(case.triage().is_none());
        assert!(!case.is_active());
        case.check_invariants().unwrap();
    }

    #[test]
    fn new_rejects_invalid_input() {
        let mut input = sample_input();
        input.symptoms.clear();
        assert!(matches!(
            Case::new(input, Utc::now()),
            Err(TriageError::InvalidInput(_))
        ));

        for severity in [0, 11] {
            let mut input = sample_input();
            input.severity = severity;
            assert!(matches!(
                Case::new(input, Utc::now()),
                Err(TriageError::InvalidInput(_))
            ));
        }

        let mut input = sample_input();
        input.chief_complaint = "   ".into();
        assert!(Case::new(input, Utc::now()).is_err());

        let mut input = sample_input();
        input.symptoms.push(" ".into());
        assert!(Case::new(input, Utc::now()).is_err());
    }

    #[test]
    fn lifecycle_moves_forward_one_step_at_a_time() {
        let mut case = triaged_case();
        assert_eq!(case.status(), CaseStatus::Triaged);
        assert!(case.is_active());
        case.check_invariants().unwrap();

        let err = case
            .complete(&nurse(), Utc::now())
            .expect_err("cannot skip in_review");
        assert!(matches!(
            err,
            TriageError::InvalidTransition {
                from: CaseStatus::Triaged,
                to: CaseStatus::Completed
            }
        ));

        case.claim(&nurse()).unwrap();
        assert_eq!(case.claimed_by(), Some("Nurse Demo"));
        case.complete(&nurse(), Utc::now()).unwrap();
        assert_eq!(case.status(), CaseStatus::Completed);
        assert!(!case.is_active());
        case.check_invariants().unwrap();

        assert!(case.claim(&nurse()).is_err());
    }

    #[test]
    fn apply_triage_rejects_empty_symptoms() {
        let case = Case::new(sample_input(), Utc::now()).unwrap();
        let mut value = serde_json::to_value(&case).unwrap();
        value["symptoms"] = serde_json::json!([]);
        let mut empty: Case = serde_json::from_value(value).unwrap();

        let assessment = TriageEvaluator::default()
            .evaluate(&empty.snapshot())
            .expect("evaluation itself tolerates an empty symptom list");
        let err = empty.apply_triage(assessment, Utc::now()).unwrap_err();
        assert!(matches!(err, TriageError::InvalidInput(_)));
        assert_eq!(empty.status(), CaseStatus::Pending);
    }

    #[test]
    fn triage_cannot_be_applied_twice() {
        let mut case = triaged_case();
        let assessment = case.triage().unwrap().assessment.clone();
        let err = case.apply_triage(assessment, Utc::now()).unwrap_err();
        assert!(matches!(err, TriageError::InvalidTransition { .. }));
    }

    #[test]
    fn retriage_requires_clinical_role_and_keeps_status() {
        let mut case = triaged_case();
        let patient = Actor::new("Demo Patient", Role::Patient).unwrap();

        case.apply_update(ClinicalUpdate {
            vital_signs: Some(VitalSigns::default()),
            ..Default::default()
        })
        .unwrap();
        let assessment = TriageEvaluator::default()
            .evaluate(&case.snapshot())
            .unwrap();

        let err = case
            .apply_retriage(&patient, assessment.clone(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, TriageError::Unauthorised { .. }));

        case.apply_retriage(&nurse(), assessment.clone(), Utc::now())
            .unwrap();
        assert_eq!(case.status(), CaseStatus::Triaged);
        assert_eq!(case.triage_score(), Some(assessment.score));
        assert_eq!(case.triage().unwrap().revision, 1);
        assert!(case.vital_signs().is_none());
    }

    #[test]
    fn retriage_rejected_for_pending_and_completed() {
        let mut pending = Case::new(sample_input(), Utc::now()).unwrap();
        let assessment = TriageEvaluator::default()
            .evaluate(&pending.snapshot())
            .unwrap();
        assert!(pending
            .apply_retriage(&nurse(), assessment.clone(), Utc::now())
            .is_err());

        let mut done = triaged_case();
        done.claim(&nurse()).unwrap();
        done.complete(&nurse(), Utc::now()).unwrap();
        assert!(done.apply_retriage(&nurse(), assessment, Utc::now()).is_err());
    }

    #[test]
    fn claim_rejects_non_clinical_roles() {
        let mut case = triaged_case();
        let admin = Actor::new("Admin", Role::Admin).unwrap();
        assert!(matches!(
            case.claim(&admin),
            Err(TriageError::Unauthorised { .. })
        ));
        assert_eq!(case.status(), CaseStatus::Triaged);
    }

    #[test]
    fn check_invariants_detects_inconsistent_records() {
        let case = Case::new(sample_input(), Utc::now()).unwrap();
        let mut value = serde_json::to_value(&case).unwrap();
        value["status"] = serde_json::json!("triaged");
        let tampered: Case = serde_json::from_value(value).unwrap();
        assert!(matches!(
            tampered.check_invariants(),
            Err(TriageError::CorruptRecord { .. })
        ));
    }

    #[test]
    fn status_ordering_matches_progression() {
        assert!(CaseStatus::Pending < CaseStatus::Triaged);
        assert!(CaseStatus::Triaged < CaseStatus::InReview);
        assert!(CaseStatus::InReview < CaseStatus::Completed);
        assert_eq!(CaseStatus::Completed.next(), None);
    }
}
