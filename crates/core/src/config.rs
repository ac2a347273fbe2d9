//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services as an
//! `Arc<CoreConfig>`. Nothing in the core reads environment variables during request handling;
//! binaries read them up front and hand the values to the helpers in this module.
//!
//! Scoring and queue constants are demo calibration values. They can be replaced wholesale or
//! in part by a YAML file:
//!
//! ```yaml
//! scoring:
//!   critical_threshold: 7.5
//!   heart_rate:
//!     normal_low: 55
//!     normal_high: 100
//!     critical_low: 40
//!     critical_high: 130
//!     mild_bonus: 0.75
//!     severe_bonus: 1.5
//! queue:
//!   routine_service_minutes: 20
//! ```

use crate::constants::*;
use crate::error::{TriageError, TriageResult};
use crate::triage::TriageLevel;
use crate::vitals::VitalRange;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Constants that drive the triage evaluator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    /// Score contributed by a self-reported severity of 10.
    pub severity_weight: f64,
    pub red_flag_bonus: f64,
    pub concern_bonus: f64,
    pub history_bonus: f64,
    pub critical_threshold: f64,
    pub urgent_threshold: f64,
    pub red_flag_keywords: Vec<String>,
    pub concern_keywords: Vec<String>,
    pub risk_conditions: Vec<String>,
    pub temperature: VitalRange,
    pub heart_rate: VitalRange,
    pub respiratory_rate: VitalRange,
    pub systolic_pressure: VitalRange,
    pub diastolic_pressure: VitalRange,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        fn owned(words: &[&str]) -> Vec<String> {
            words.iter().map(|w| (*w).to_owned()).collect()
        }

        Self {
            severity_weight: DEFAULT_SEVERITY_WEIGHT,
            red_flag_bonus: DEFAULT_RED_FLAG_BONUS,
            concern_bonus: DEFAULT_CONCERN_BONUS,
            history_bonus: DEFAULT_HISTORY_BONUS,
            critical_threshold: DEFAULT_CRITICAL_THRESHOLD,
            urgent_threshold: DEFAULT_URGENT_THRESHOLD,
            red_flag_keywords: owned(DEFAULT_RED_FLAG_KEYWORDS),
            concern_keywords: owned(DEFAULT_CONCERN_KEYWORDS),
            risk_conditions: owned(DEFAULT_RISK_CONDITIONS),
            temperature: VitalRange::new((36.1, 37.8), (35.0, 39.5), 0.5, 1.0),
            heart_rate: VitalRange::new((60.0, 100.0), (40.0, 120.0), 0.75, 1.5),
            respiratory_rate: VitalRange::new((12.0, 20.0), (8.0, 28.0), 0.75, 1.5),
            systolic_pressure: VitalRange::new((90.0, 140.0), (80.0, 180.0), 0.75, 1.5),
            diastolic_pressure: VitalRange::new((60.0, 90.0), (50.0, 120.0), 0.75, 1.5),
        }
    }
}

impl ScoringConfig {
    /// Rejects configurations the evaluator cannot apply consistently.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::Config`] if:
    /// - a weight or bonus is negative or non-finite, or the severity weight is zero,
    /// - thresholds do not satisfy `0 < urgent_threshold < critical_threshold <= 10`,
    /// - the red-flag list is empty or any keyword is blank,
    /// - any vital range is inverted.
    pub fn validate(&self) -> TriageResult<()> {
        for (name, value) in [
            ("severity_weight", self.severity_weight),
            ("red_flag_bonus", self.red_flag_bonus),
            ("concern_bonus", self.concern_bonus),
            ("history_bonus", self.history_bonus),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(TriageError::Config(format!(
                    "{name} must be a finite, non-negative number"
                )));
            }
        }
        if self.severity_weight == 0.0 {
            return Err(TriageError::Config("severity_weight must be positive".into()));
        }

        if !(MIN_SCORE < self.urgent_threshold
            && self.urgent_threshold < self.critical_threshold
            && self.critical_threshold <= MAX_SCORE)
        {
            return Err(TriageError::Config(format!(
                "thresholds must satisfy 0 < urgent ({}) < critical ({}) <= 10",
                self.urgent_threshold, self.critical_threshold
            )));
        }

        if self.red_flag_keywords.is_empty() {
            return Err(TriageError::Config(
                "red_flag_keywords must not be empty".into(),
            ));
        }
        for (list, words) in [
            ("red_flag_keywords", &self.red_flag_keywords),
            ("concern_keywords", &self.concern_keywords),
            ("risk_conditions", &self.risk_conditions),
        ] {
            if words.iter().any(|w| w.trim().is_empty()) {
                return Err(TriageError::Config(format!(
                    "{list} must not contain blank entries"
                )));
            }
        }

        self.temperature.validate("temperature")?;
        self.heart_rate.validate("heart_rate")?;
        self.respiratory_rate.validate("respiratory_rate")?;
        self.systolic_pressure.validate("systolic_pressure")?;
        self.diastolic_pressure.validate("diastolic_pressure")?;
        Ok(())
    }
}

/// Average service time per level, used for display-only wait estimates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    pub critical_service_minutes: u32,
    pub urgent_service_minutes: u32,
    pub routine_service_minutes: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            critical_service_minutes: DEFAULT_CRITICAL_SERVICE_MINUTES,
            urgent_service_minutes: DEFAULT_URGENT_SERVICE_MINUTES,
            routine_service_minutes: DEFAULT_ROUTINE_SERVICE_MINUTES,
        }
    }
}

impl QueueConfig {
    pub fn service_minutes(&self, level: TriageLevel) -> u32 {
        match level {
            TriageLevel::Critical => self.critical_service_minutes,
            TriageLevel::Urgent => self.urgent_service_minutes,
            TriageLevel::Routine => self.routine_service_minutes,
        }
    }

    pub fn validate(&self) -> TriageResult<()> {
        if self.critical_service_minutes == 0
            || self.urgent_service_minutes == 0
            || self.routine_service_minutes == 0
        {
            return Err(TriageError::Config(
                "service minutes must be positive for every level".into(),
            ));
        }
        Ok(())
    }
}

/// Shape of the optional YAML configuration file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub scoring: ScoringConfig,
    pub queue: QueueConfig,
}

impl ConfigFile {
    /// Parse configuration from YAML text.
    ///
    /// Missing fields fall back to their defaults. Schema errors name the failing field, for
    /// example `scoring.heart_rate.normal_low`.
    pub fn parse(yaml_text: &str) -> TriageResult<Self> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml_text);
        match serde_path_to_error::deserialize::<_, ConfigFile>(deserializer) {
            Ok(parsed) => Ok(parsed),
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                Err(TriageError::Config(format!(
                    "configuration schema mismatch at {path}: {source}"
                )))
            }
        }
    }

    /// Read and parse a configuration file from disk.
    pub fn load(path: &Path) -> TriageResult<Self> {
        let text = std::fs::read_to_string(path).map_err(TriageError::FileRead)?;
        Self::parse(&text)
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    case_data_dir: PathBuf,
    scoring: ScoringConfig,
    queue: QueueConfig,
    narrative_timeout: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig`, validating scoring and queue settings.
    pub fn new(
        case_data_dir: PathBuf,
        scoring: ScoringConfig,
        queue: QueueConfig,
        narrative_timeout: Duration,
    ) -> TriageResult<Self> {
        scoring.validate()?;
        queue.validate()?;
        if narrative_timeout.is_zero() {
            return Err(TriageError::Config(
                "narrative timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            case_data_dir,
            scoring,
            queue,
            narrative_timeout,
        })
    }

    /// Configuration with default constants rooted at `case_data_dir`.
    pub fn with_defaults(case_data_dir: PathBuf) -> TriageResult<Self> {
        Self::new(
            case_data_dir,
            ScoringConfig::default(),
            QueueConfig::default(),
            Duration::from_millis(DEFAULT_NARRATIVE_TIMEOUT_MS),
        )
    }

    pub fn case_data_dir(&self) -> &Path {
        &self.case_data_dir
    }

    pub fn cases_dir(&self) -> PathBuf {
        self.case_data_dir.join(CASES_DIR_NAME)
    }

    pub fn scoring(&self) -> &ScoringConfig {
        &self.scoring
    }

    pub fn queue(&self) -> &QueueConfig {
        &self.queue
    }

    pub fn narrative_timeout(&self) -> Duration {
        self.narrative_timeout
    }
}

/// Parse the narrative timeout from an optional millisecond string.
///
/// If `value` is `None` or blank, returns the default timeout.
pub fn narrative_timeout_from_env_value(value: Option<String>) -> TriageResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(Duration::from_millis(DEFAULT_NARRATIVE_TIMEOUT_MS)),
        Some(v) => v.parse::<u64>().map(Duration::from_millis).map_err(|_| {
            TriageError::Config(format!(
                "narrative timeout must be a whole number of milliseconds, got '{v}'"
            ))
        }),
    }
}

/// Load the optional configuration file named by `value` (typically `MEDFLOW_CONFIG`).
pub fn config_file_from_env_value(value: Option<String>) -> TriageResult<ConfigFile> {
    match value.map(PathBuf::from) {
        Some(path) if !path.as_os_str().is_empty() => ConfigFile::load(&path),
        _ => Ok(ConfigFile::default()),
    }
}
