//! Triage evaluation.
//!
//! [`TriageEvaluator::evaluate`] turns a case snapshot into an [`Assessment`]: a score in
//! `[0, 10]`, the level that score maps to, and the explanatory fields derived from whichever
//! rules fired. Evaluation is a pure function of the snapshot and the [`ScoringConfig`]: it does
//! not persist, log or call out to anything, so it is safe to run concurrently without locking.
//!
//! Scoring rules, applied additively:
//! 1. Base score from self-reported severity (`severity / 10 * severity_weight`).
//! 2. A fixed bonus per matched red-flag keyword, and a smaller one per concern keyword.
//! 3. Per-vital bonuses for readings outside the normal range, larger beyond the critical range.
//! 4. A single bonus when the medical history mentions a high-risk condition.
//!
//! The total is clamped to `[0, 10]` and compared against the configured thresholds.
//! Free-text AI findings and narratives are carried through for display only and never change
//! the score or level.

use crate::config::ScoringConfig;
use crate::constants::*;
use crate::error::{TriageError, TriageResult};
use crate::vitals::{Vital, VitalRange, VitalSigns, VitalStatus};
use crate::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discrete priority classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriageLevel {
    Critical,
    Urgent,
    Routine,
}

impl TriageLevel {
    /// All levels, most urgent first.
    pub const ALL: [TriageLevel; 3] = [
        TriageLevel::Critical,
        TriageLevel::Urgent,
        TriageLevel::Routine,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TriageLevel::Critical => "critical",
            TriageLevel::Urgent => "urgent",
            TriageLevel::Routine => "routine",
        }
    }

    fn base_recommendations(self) -> [&'static str; 3] {
        match self {
            TriageLevel::Critical => [
                "Immediate medical attention required",
                "Consider emergency department evaluation",
                "Monitor vital signs closely",
            ],
            TriageLevel::Urgent => [
                "Schedule appointment within 24-48 hours",
                "Monitor symptoms for worsening",
                "Return if symptoms deteriorate",
            ],
            TriageLevel::Routine => [
                "Routine follow-up appropriate",
                "Self-care measures may be sufficient",
                "Schedule if symptoms persist",
            ],
        }
    }
}

impl fmt::Display for TriageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriageLevel {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(TriageLevel::Critical),
            "urgent" => Ok(TriageLevel::Urgent),
            "routine" => Ok(TriageLevel::Routine),
            other => Err(TriageError::InvalidInput(format!(
                "unknown triage level: {other}"
            ))),
        }
    }
}

/// Read-only view of the case fields that scoring depends on.
#[derive(Clone, Copy, Debug)]
pub struct CaseSnapshot<'a> {
    pub severity: u8,
    pub symptoms: &'a [NonEmptyText],
    pub medical_history: &'a [String],
    pub vital_signs: Option<&'a VitalSigns>,
    pub ai_findings: Option<&'a str>,
}

/// Result of evaluating a case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub score: f64,
    pub level: TriageLevel,
    pub primary_concern: String,
    pub risk_factors: Vec<String>,
    pub red_flags: Vec<String>,
    pub recommendations: Vec<String>,
    pub confidence: f64,
    pub clinical_reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplementary_findings: Option<String>,
    /// Free text from an external model. Display only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

#[derive(Debug)]
struct VitalFinding {
    vital: Vital,
    reading: String,
    status: VitalStatus,
}

impl VitalFinding {
    fn describe(&self) -> String {
        format!(
            "{} {} {} ({})",
            self.vital,
            self.reading,
            self.vital.unit(),
            self.status.as_str()
        )
    }
}

/// Rules fired while scoring one snapshot.
#[derive(Debug, Default)]
struct ScoreCard {
    score: f64,
    red_flags: Vec<String>,
    concerns: Vec<String>,
    vital_findings: Vec<VitalFinding>,
    risk_history: Vec<String>,
}

/// Stateless triage evaluator.
#[derive(Clone, Debug)]
pub struct TriageEvaluator {
    config: ScoringConfig,
}

impl Default for TriageEvaluator {
    fn default() -> Self {
        Self::from_validated(ScoringConfig::default())
    }
}

impl TriageEvaluator {
    /// Creates an evaluator from a scoring configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Config`] if the configuration fails validation.
    pub fn new(config: ScoringConfig) -> TriageResult<Self> {
        config.validate()?;
        Ok(Self::from_validated(config))
    }

    fn from_validated(mut config: ScoringConfig) -> Self {
        for list in [
            &mut config.red_flag_keywords,
            &mut config.concern_keywords,
            &mut config.risk_conditions,
        ] {
            for word in list.iter_mut() {
                *word = word.trim().to_lowercase();
            }
        }
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Maps a clamped score onto a level using the configured thresholds.
    pub fn level_for(&self, score: f64) -> TriageLevel {
        if score >= self.config.critical_threshold {
            TriageLevel::Critical
        } else if score >= self.config.urgent_threshold {
            TriageLevel::Urgent
        } else {
            TriageLevel::Routine
        }
    }

    /// Evaluates a case snapshot.
    ///
    /// An empty symptom list is accepted here: the score comes from severity alone and the level
    /// is always routine. The non-empty requirement is enforced where a case moves to `triaged`.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidInput`] if severity is outside `[1, 10]`, a numeric vital
    /// is not finite, or the blood pressure string is malformed.
    pub fn evaluate(&self, case: &CaseSnapshot<'_>) -> TriageResult<Assessment> {
        if !(MIN_SEVERITY..=MAX_SEVERITY).contains(&case.severity) {
            return Err(TriageError::InvalidInput(format!(
                "severity must be between {MIN_SEVERITY} and {MAX_SEVERITY}, got {}",
                case.severity
            )));
        }
        if let Some(vitals) = case.vital_signs {
            vitals.validate()?;
        }

        let mut card = ScoreCard {
            score: f64::from(case.severity) / 10.0 * self.config.severity_weight,
            ..Default::default()
        };
        // Without symptoms only severity is scored, and the case stays routine.
        let has_symptoms = !case.symptoms.is_empty();
        if has_symptoms {
            self.score_symptoms(case.symptoms, &mut card);
            if let Some(vitals) = case.vital_signs {
                self.score_vitals(vitals, &mut card)?;
            }
            self.score_history(case.medical_history, &mut card);
        }

        let score = round2(card.score.clamp(MIN_SCORE, MAX_SCORE));
        let level = if has_symptoms {
            self.level_for(score)
        } else {
            TriageLevel::Routine
        };
        let supplementary_findings = case
            .ai_findings
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_owned);

        Ok(Assessment {
            score,
            level,
            primary_concern: self.primary_concern(case.symptoms),
            risk_factors: risk_factors(&card),
            red_flags: card.red_flags.clone(),
            recommendations: recommendations(level, &card, supplementary_findings.is_some()),
            confidence: confidence(case, supplementary_findings.is_some()),
            clinical_reasoning: clinical_reasoning(level, score, &card),
            supplementary_findings,
            narrative: None,
        })
    }

    fn score_symptoms(&self, symptoms: &[NonEmptyText], card: &mut ScoreCard) {
        let lowered: Vec<String> = symptoms
            .iter()
            .map(|s| s.as_str().to_lowercase())
            .collect();
        let mentions = |keyword: &str| lowered.iter().any(|s| s.contains(keyword));

        for keyword in &self.config.red_flag_keywords {
            if mentions(keyword) && !card.red_flags.contains(keyword) {
                card.red_flags.push(keyword.clone());
                card.score += self.config.red_flag_bonus;
            }
        }
        for keyword in &self.config.concern_keywords {
            if mentions(keyword) && !card.concerns.contains(keyword) {
                card.concerns.push(keyword.clone());
                card.score += self.config.concern_bonus;
            }
        }
    }

    fn score_vitals(&self, vitals: &VitalSigns, card: &mut ScoreCard) -> TriageResult<()> {
        let cfg = &self.config;
        for (vital, value, range) in [
            (Vital::Temperature, vitals.temperature, &cfg.temperature),
            (Vital::HeartRate, vitals.heart_rate, &cfg.heart_rate),
            (Vital::RespiratoryRate, vitals.respiratory_rate, &cfg.respiratory_rate),
        ] {
            if let Some(v) = value {
                record_vital(card, vital, v.to_string(), range, v);
            }
        }

        if let Some(bp) = vitals.parsed_blood_pressure()? {
            let systolic = cfg.systolic_pressure.classify(bp.systolic);
            let diastolic = cfg.diastolic_pressure.classify(bp.diastolic);
            let bonus = cfg
                .systolic_pressure
                .bonus(systolic)
                .max(cfg.diastolic_pressure.bonus(diastolic));
            let status = systolic.max(diastolic);
            if status != VitalStatus::Normal {
                card.score += bonus;
                card.vital_findings.push(VitalFinding {
                    vital: Vital::BloodPressure,
                    reading: bp.to_string(),
                    status,
                });
            }
        }
        Ok(())
    }

    fn score_history(&self, history: &[String], card: &mut ScoreCard) {
        for entry in history {
            let lowered = entry.to_lowercase();
            if self
                .config
                .risk_conditions
                .iter()
                .any(|condition| lowered.contains(condition.as_str()))
            {
                card.risk_history.push(entry.trim().to_owned());
            }
        }
        if !card.risk_history.is_empty() {
            card.score += self.config.history_bonus;
        }
    }

    fn primary_concern(&self, symptoms: &[NonEmptyText]) -> String {
        let matching = |keywords: &[String]| {
            symptoms.iter().find(|s| {
                let lowered = s.as_str().to_lowercase();
                keywords.iter().any(|k| lowered.contains(k.as_str()))
            })
        };

        matching(self.config.red_flag_keywords.as_slice())
            .or_else(|| matching(self.config.concern_keywords.as_slice()))
            .or_else(|| symptoms.first())
            .map(|s| s.to_string())
            .unwrap_or_else(|| GENERAL_CONSULTATION.to_owned())
    }
}

fn record_vital(card: &mut ScoreCard, vital: Vital, reading: String, range: &VitalRange, v: f64) {
    let status = range.classify(v);
    if status == VitalStatus::Normal {
        return;
    }
    card.score += range.bonus(status);
    card.vital_findings.push(VitalFinding {
        vital,
        reading,
        status,
    });
}

fn risk_factors(card: &ScoreCard) -> Vec<String> {
    let mut factors: Vec<String> = card.vital_findings.iter().map(VitalFinding::describe).collect();
    factors.extend(card.risk_history.iter().cloned());
    factors.extend(card.concerns.iter().map(|c| format!("reported {c}")));
    factors
}

fn recommendations(level: TriageLevel, card: &ScoreCard, has_findings: bool) -> Vec<String> {
    let mut recs: Vec<String> = level
        .base_recommendations()
        .iter()
        .map(|r| (*r).to_owned())
        .collect();

    if !card.red_flags.is_empty() {
        recs.push(format!(
            "Clinician review of red-flag symptoms: {}",
            card.red_flags.join(", ")
        ));
    }
    for finding in &card.vital_findings {
        recs.push(format!(
            "Recheck {} ({} {}, {})",
            finding.vital,
            finding.reading,
            finding.vital.unit(),
            finding.status.as_str()
        ));
    }
    if !card.risk_history.is_empty() {
        recs.push(format!(
            "Review management of existing conditions: {}",
            card.risk_history.join(", ")
        ));
    }
    if has_findings {
        recs.push("Correlate imaging findings with clinical presentation".to_owned());
    }
    recs
}

fn confidence(case: &CaseSnapshot<'_>, has_findings: bool) -> f64 {
    let mut confidence = BASE_CONFIDENCE;
    if case.vital_signs.is_some_and(|v| !v.is_empty()) {
        confidence += VITALS_CONFIDENCE_BONUS;
    }
    if !case.medical_history.is_empty() {
        confidence += HISTORY_CONFIDENCE_BONUS;
    }
    if has_findings {
        confidence += FINDINGS_CONFIDENCE_BONUS;
    }
    round2(confidence.min(MAX_CONFIDENCE))
}

fn clinical_reasoning(level: TriageLevel, score: f64, card: &ScoreCard) -> String {
    format!(
        "Based on reported symptoms and medical history, patient presents with {level} priority \
         case (score {score:.1}/10; {} red flag(s), {} abnormal vital(s), {} high-risk condition(s)).",
        card.red_flags.len(),
        card.vital_findings.len(),
        card.risk_history.len(),
    )
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
