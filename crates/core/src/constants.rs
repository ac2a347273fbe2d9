//! Constants used throughout the MedFlow core crate.
//!
//! Path and filename constants live here alongside the default scoring and queue values, so
//! the demo calibration is visible in one place. None of the numbers are clinically
//! validated; every one of them can be overridden through [`crate::config`].

/// Default directory for case data when no explicit directory is configured.
pub const DEFAULT_CASE_DATA_DIR: &str = "case_data";

/// Directory name for case records under the data directory.
pub const CASES_DIR_NAME: &str = "cases";

/// Filename for a stored case record.
pub const CASE_FILENAME: &str = "case.yaml";

/// Default bound on how long triage waits for an external narrative.
pub const DEFAULT_NARRATIVE_TIMEOUT_MS: u64 = 2_000;

/// Primary concern reported when no symptom is available.
pub const GENERAL_CONSULTATION: &str = "General consultation";

pub const DEFAULT_SEVERITY_WEIGHT: f64 = 4.0;
pub const DEFAULT_RED_FLAG_BONUS: f64 = 2.5;
pub const DEFAULT_CONCERN_BONUS: f64 = 0.5;
pub const DEFAULT_HISTORY_BONUS: f64 = 1.0;
pub const DEFAULT_CRITICAL_THRESHOLD: f64 = 7.0;
pub const DEFAULT_URGENT_THRESHOLD: f64 = 4.5;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;
pub const MIN_SEVERITY: u8 = 1;
pub const MAX_SEVERITY: u8 = 10;

pub const BASE_CONFIDENCE: f64 = 0.70;
pub const VITALS_CONFIDENCE_BONUS: f64 = 0.10;
pub const HISTORY_CONFIDENCE_BONUS: f64 = 0.05;
pub const FINDINGS_CONFIDENCE_BONUS: f64 = 0.05;
pub const MAX_CONFIDENCE: f64 = 0.95;

pub const DEFAULT_RED_FLAG_KEYWORDS: &[&str] = &[
    "chest pain",
    "difficulty breathing",
    "shortness of breath",
    "severe bleeding",
    "loss of consciousness",
    "seizure",
];

pub const DEFAULT_CONCERN_KEYWORDS: &[&str] = &[
    "severe headache",
    "fever",
    "dizziness",
    "abdominal pain",
    "vomiting",
];

pub const DEFAULT_RISK_CONDITIONS: &[&str] = &[
    "diabetes",
    "heart",
    "hypertension",
    "copd",
    "cancer",
    "kidney",
    "immunocompromised",
];

/// Average minutes a clinician spends per case, by level.
pub const DEFAULT_CRITICAL_SERVICE_MINUTES: u32 = 5;
pub const DEFAULT_URGENT_SERVICE_MINUTES: u32 = 15;
pub const DEFAULT_ROUTINE_SERVICE_MINUTES: u32 = 30;
