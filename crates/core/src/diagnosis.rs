//! Rule-based differential diagnosis.
//!
//! A fixed table maps symptom keywords to candidate diagnoses, each with a demo probability and
//! an urgency. Candidates from every matched keyword are pooled, ordered by probability (highest
//! first, match order breaking ties) and cut to the top [`MAX_CANDIDATES`]. When nothing matches,
//! a generic fallback list is returned. Like narratives, the result is advisory and never feeds
//! the triage score.

use crate::triage::TriageLevel;
use serde::Serialize;

/// Number of candidates returned.
pub const MAX_CANDIDATES: usize = 5;

type Rule = (&'static str, &'static [(&'static str, f64, TriageLevel)]);

const DIAGNOSIS_RULES: &[Rule] = &[
    (
        "chest pain",
        &[
            ("Myocardial Infarction", 0.15, TriageLevel::Critical),
            ("Angina Pectoris", 0.25, TriageLevel::Urgent),
            ("Costochondritis", 0.30, TriageLevel::Routine),
            ("GERD", 0.20, TriageLevel::Routine),
            ("Pulmonary Embolism", 0.10, TriageLevel::Critical),
        ],
    ),
    (
        "fever",
        &[
            ("Viral Upper Respiratory Infection", 0.40, TriageLevel::Routine),
            ("Bacterial Pneumonia", 0.20, TriageLevel::Urgent),
            ("Urinary Tract Infection", 0.15, TriageLevel::Urgent),
            ("Influenza", 0.25, TriageLevel::Routine),
        ],
    ),
    (
        "headache",
        &[
            ("Tension Headache", 0.50, TriageLevel::Routine),
            ("Migraine", 0.30, TriageLevel::Routine),
            ("Cluster Headache", 0.10, TriageLevel::Urgent),
            ("Secondary Headache", 0.10, TriageLevel::Urgent),
        ],
    ),
];

const FALLBACK_DIAGNOSES: &[(&str, f64, TriageLevel)] = &[
    ("Viral Syndrome", 0.40, TriageLevel::Routine),
    ("General Medical Consultation", 0.60, TriageLevel::Routine),
];

/// One candidate diagnosis.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DiagnosisCandidate {
    pub diagnosis: String,
    pub probability: f64,
    pub urgency: TriageLevel,
}

/// Ranked candidate diagnoses for a symptom list.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DifferentialDiagnosis {
    pub diagnoses: Vec<DiagnosisCandidate>,
    pub matched_keywords: Vec<String>,
    pub reasoning: String,
}

impl DifferentialDiagnosis {
    /// Builds the differential for `symptoms`.
    ///
    /// Each symptom contributes the candidates of the first keyword it contains
    /// (case-insensitive). A keyword contributes at most once.
    pub fn from_symptoms<I, S>(symptoms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symptoms: Vec<String> = symptoms
            .into_iter()
            .map(|s| s.as_ref().trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();

        let mut matched_keywords: Vec<String> = Vec::new();
        let mut pool: Vec<&(&str, f64, TriageLevel)> = Vec::new();
        for symptom in &symptoms {
            let lowered = symptom.to_lowercase();
            let Some((keyword, candidates)) = DIAGNOSIS_RULES
                .iter()
                .find(|(keyword, _)| lowered.contains(keyword))
            else {
                continue;
            };
            if matched_keywords.iter().any(|k| k.as_str() == *keyword) {
                continue;
            }
            matched_keywords.push((*keyword).to_owned());
            pool.extend(candidates.iter());
        }
        if pool.is_empty() {
            pool.extend(FALLBACK_DIAGNOSES.iter());
        }

        // Stable sort keeps match order among equal probabilities.
        pool.sort_by(|a, b| b.1.total_cmp(&a.1));
        let diagnoses = pool
            .into_iter()
            .take(MAX_CANDIDATES)
            .map(|(diagnosis, probability, urgency)| DiagnosisCandidate {
                diagnosis: (*diagnosis).to_owned(),
                probability: *probability,
                urgency: *urgency,
            })
            .collect();

        let presented = if symptoms.is_empty() {
            "none reported".to_owned()
        } else {
            symptoms.join(", ")
        };
        let reasoning = format!(
            "Based on the presented symptoms: {presented}. Differential prioritised by likelihood \
             and clinical urgency. Further clinical evaluation and targeted diagnostics as indicated."
        );

        Self {
            diagnoses,
            matched_keywords,
            reasoning,
        }
    }

    /// Most urgent level among the candidates.
    pub fn highest_urgency(&self) -> Option<TriageLevel> {
        TriageLevel::ALL
            .into_iter()
            .find(|level| self.diagnoses.iter().any(|d| d.urgency == *level))
    }
}
