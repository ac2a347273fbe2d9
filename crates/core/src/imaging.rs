//! Parsing of free-text imaging model output.
//!
//! An external imaging model returns prose. [`ImageReport::from_model_text`] extracts the
//! sentences that read like findings, estimates a confidence from hedging language and assigns
//! a review priority. The resulting findings may be attached to a case as `ai_findings`; they
//! are display-only and never feed the triage score.

use serde::{Deserialize, Serialize};
use std::fmt;

const MEDICAL_INDICATORS: &[&str] = &[
    "normal",
    "abnormal",
    "shows",
    "indicates",
    "suggests",
    "finding",
    "lesion",
    "mass",
    "opacity",
    "infiltrate",
    "heart",
    "lung",
    "bone",
    "tissue",
    "structure",
];

const CONFIDENCE_KEYWORDS: &[(&str, f64)] = &[
    ("normal", 88.0),
    ("clear", 85.0),
    ("obvious", 90.0),
    ("definite", 92.0),
    ("consistent", 85.0),
    ("typical", 80.0),
    ("characteristic", 87.0),
    ("possible", 65.0),
    ("likely", 75.0),
    ("probable", 80.0),
    ("suggests", 78.0),
    ("uncertain", 45.0),
    ("unclear", 40.0),
    ("difficult", 50.0),
];

const URGENT_TERMS: &[&str] = &["emergency", "urgent", "critical", "immediate", "acute"];
const CONCERN_TERMS: &[&str] = &["abnormal", "concern", "follow", "monitor", "lesion"];

const DEFAULT_CONFIDENCE: f64 = 82.5;
const FALLBACK_CONFIDENCE: f64 = 75.0;
const MIN_FINDING_CHARS: usize = 15;
const MIN_FALLBACK_CHARS: usize = 20;
const MAX_ERROR_CHARS: usize = 100;
const NO_FINDINGS: &str = "Image analysis completed without specific findings";

/// Review priority suggested by the report text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagePriority {
    High,
    Moderate,
    Low,
}

impl ImagePriority {
    pub fn as_str(self) -> &'static str {
        match self {
            ImagePriority::High => "high",
            ImagePriority::Moderate => "moderate",
            ImagePriority::Low => "low",
        }
    }
}

impl fmt::Display for ImagePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured view of an imaging model's output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImageReport {
    pub findings: Vec<String>,
    pub priority: ImagePriority,
    /// Percentage in `[0, 100]`.
    pub confidence: f64,
    pub recommendation: String,
    pub requires_review: bool,
}

impl ImageReport {
    /// Builds a report from raw model text.
    pub fn from_model_text(text: &str) -> Self {
        let priority = priority_from_text(text);
        Self {
            findings: extract_findings(text),
            priority,
            confidence: confidence_from_text(text),
            recommendation: recommendation_from_text(text).to_owned(),
            requires_review: priority != ImagePriority::Low,
        }
    }

    /// Report used when the imaging model could not be reached.
    pub fn fallback(image_type: &str, error: &str) -> Self {
        let error: String = error.chars().take(MAX_ERROR_CHARS).collect();
        Self {
            findings: vec![
                format!("{image_type} analysis temporarily unavailable"),
                format!("Error: {error}"),
                "Please try again shortly".to_owned(),
            ],
            priority: ImagePriority::Moderate,
            confidence: FALLBACK_CONFIDENCE,
            recommendation: "Image analysis unavailable; retry before relying on findings"
                .to_owned(),
            requires_review: true,
        }
    }

    /// Findings joined into one line, stored as a case's `ai_findings`.
    pub fn findings_text(&self) -> String {
        self.findings.join(". ")
    }
}

fn sentences(text: &str) -> Vec<&str> {
    text.split(['.', '\n']).map(str::trim).collect()
}

fn extract_findings(text: &str) -> Vec<String> {
    let all = sentences(text);
    let mut findings: Vec<String> = all
        .iter()
        .filter(|s| s.chars().count() > MIN_FINDING_CHARS)
        .filter(|s| {
            let lower = s.to_lowercase();
            MEDICAL_INDICATORS.iter().any(|i| lower.contains(i))
        })
        .map(|s| (*s).to_owned())
        .collect();

    if findings.is_empty() {
        findings = all
            .iter()
            .take(3)
            .filter(|s| s.chars().count() > MIN_FALLBACK_CHARS)
            .map(|s| (*s).to_owned())
            .collect();
    }
    if findings.is_empty() {
        findings.push(NO_FINDINGS.to_owned());
    }
    findings
}

fn confidence_from_text(text: &str) -> f64 {
    let lower = text.to_lowercase();
    let scores: Vec<f64> = CONFIDENCE_KEYWORDS
        .iter()
        .filter(|(word, _)| lower.contains(word))
        .map(|(_, score)| *score)
        .collect();
    if scores.is_empty() {
        return DEFAULT_CONFIDENCE;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    (mean * 10.0).round() / 10.0
}

fn priority_from_text(text: &str) -> ImagePriority {
    let lower = text.to_lowercase();
    if URGENT_TERMS.iter().any(|t| lower.contains(t)) {
        ImagePriority::High
    } else if CONCERN_TERMS.iter().any(|t| lower.contains(t)) {
        ImagePriority::Moderate
    } else {
        ImagePriority::Low
    }
}

fn recommendation_from_text(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if lower.contains("follow") || lower.contains("correlation") {
        "Clinical follow-up and correlation with symptoms recommended"
    } else if lower.contains("normal") && lower.contains("routine") {
        "Routine clinical management suggested"
    } else if lower.contains("specialist") || lower.contains("referral") {
        "Specialist consultation recommended"
    } else {
        "Clinical correlation and appropriate follow-up suggested"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn findings_keep_indicator_sentences() {
        let report = ImageReport::from_model_text(
            "The heart size is within normal limits. Ok. \
             Lung fields are clear bilaterally.\nNo acute distress noted today here",
        );
        assert_eq!(
            report.findings,
            vec![
                "The heart size is within normal limits".to_owned(),
                "Lung fields are clear bilaterally".to_owned(),
            ]
        );
    }

    #[test]
    fn findings_fall_back_to_leading_sentences() {
        let report = ImageReport::from_model_text(
            "Image quality is adequate for review. Patient positioned upright for the study.",
        );
        assert_eq!(report.findings.len(), 2);
        assert_eq!(report.findings[0], "Image quality is adequate for review");

        let report = ImageReport::from_model_text("Short. Text.");
        assert_eq!(report.findings, vec![NO_FINDINGS.to_owned()]);
    }

    #[test]
    fn confidence_is_mean_of_matched_keywords() {
        assert_eq!(confidence_from_text("nothing to see"), DEFAULT_CONFIDENCE);
        assert_eq!(confidence_from_text("Findings are definite"), 92.0);
        // "likely" (75) and "uncertain" (45)
        assert_eq!(confidence_from_text("Likely benign, margins uncertain"), 60.0);
    }

    #[test]
    fn priority_follows_term_lists() {
        assert_eq!(priority_from_text("Acute fracture"), ImagePriority::High);
        assert_eq!(priority_from_text("Small lesion noted"), ImagePriority::Moderate);
        assert_eq!(priority_from_text("Unremarkable study"), ImagePriority::Low);

        let report = ImageReport::from_model_text("Unremarkable study of the wrist");
        assert!(!report.requires_review);
    }

    #[test]
    fn recommendation_rules_apply_in_order() {
        assert!(recommendation_from_text("Suggest follow up").contains("follow-up"));
        assert!(recommendation_from_text("Normal, routine care").starts_with("Routine"));
        assert!(recommendation_from_text("Needs referral").starts_with("Specialist"));
        assert!(recommendation_from_text("Unremarkable").starts_with("Clinical correlation"));
    }

    #[test]
    fn findings_text_joins_findings_for_a_case() {
        let report = ImageReport::from_model_text(
            "The heart size is within normal limits. Lung fields are clear bilaterally.",
        );
        assert_eq!(
            report.findings_text(),
            "The heart size is within normal limits. Lung fields are clear bilaterally"
        );
    }

    #[test]
    fn fallback_truncates_error_and_requires_review() {
        let long_error = "x".repeat(300);
        let report = ImageReport::fallback("X-Ray", &long_error);
        assert_eq!(report.priority, ImagePriority::Moderate);
        assert!(report.requires_review);
        assert_eq!(report.findings[1].len(), "Error: ".len() + MAX_ERROR_CHARS);
        assert!(report.findings[0].starts_with("X-Ray"));
    }
}
