//! Vital signs and range classification.
//!
//! Each vital is checked against two nested ranges: a normal range and a wider critical range.
//! A reading inside the normal range contributes nothing to the triage score, a reading between
//! the two ranges contributes the vital's mild increment, and a reading beyond the critical
//! range contributes its severe (maximum) increment.

use crate::error::{TriageError, TriageResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Vital signs recorded with a consultation. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VitalSigns {
    /// Body temperature in degrees Celsius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Heart rate in beats per minute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,

    /// Respiratory rate in breaths per minute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<f64>,

    /// Blood pressure as `"<systolic>/<diastolic>"`, e.g. `"120/80"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<String>,
}

impl VitalSigns {
    /// True when no vital has been recorded.
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.heart_rate.is_none()
            && self.respiratory_rate.is_none()
            && self.blood_pressure.is_none()
    }

    /// Checks every present reading is usable for scoring.
    ///
    /// # Errors
    ///
    /// Returns [`TriageError::InvalidInput`] for non-finite or negative numeric readings and for
    /// a blood pressure string that does not parse.
    pub fn validate(&self) -> TriageResult<()> {
        for (vital, value) in [
            (Vital::Temperature, self.temperature),
            (Vital::HeartRate, self.heart_rate),
            (Vital::RespiratoryRate, self.respiratory_rate),
        ] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(TriageError::InvalidInput(format!(
                        "{vital} must be a finite, non-negative number, got {v}"
                    )));
                }
            }
        }
        self.parsed_blood_pressure()?;
        Ok(())
    }

    /// Parses the blood pressure string, if present.
    pub fn parsed_blood_pressure(&self) -> TriageResult<Option<BloodPressure>> {
        self.blood_pressure
            .as_deref()
            .map(str::parse::<BloodPressure>)
            .transpose()
    }
}

/// A parsed blood pressure reading in mmHg.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BloodPressure {
    pub systolic: f64,
    pub diastolic: f64,
}

impl FromStr for BloodPressure {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            TriageError::InvalidInput(format!(
                "blood pressure must look like '120/80', got '{s}'"
            ))
        };

        let trimmed = s.trim();
        let trimmed = trimmed
            .strip_suffix("mmHg")
            .or_else(|| trimmed.strip_suffix("mmhg"))
            .unwrap_or(trimmed)
            .trim();
        let (sys, dia) = trimmed.split_once('/').ok_or_else(invalid)?;
        let systolic: f64 = sys.trim().parse().map_err(|_| invalid())?;
        let diastolic: f64 = dia.trim().parse().map_err(|_| invalid())?;

        if !systolic.is_finite() || !diastolic.is_finite() || systolic <= 0.0 || diastolic <= 0.0
        {
            return Err(invalid());
        }

        Ok(Self {
            systolic,
            diastolic,
        })
    }
}

impl fmt::Display for BloodPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.systolic, self.diastolic)
    }
}

/// The vitals the evaluator knows how to score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Vital {
    Temperature,
    HeartRate,
    RespiratoryRate,
    BloodPressure,
}

impl Vital {
    pub fn label(self) -> &'static str {
        match self {
            Vital::Temperature => "temperature",
            Vital::HeartRate => "heart rate",
            Vital::RespiratoryRate => "respiratory rate",
            Vital::BloodPressure => "blood pressure",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Vital::Temperature => "°C",
            Vital::HeartRate => "bpm",
            Vital::RespiratoryRate => "breaths/min",
            Vital::BloodPressure => "mmHg",
        }
    }
}

impl fmt::Display for Vital {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How far a reading sits from its normal range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum VitalStatus {
    Normal,
    Abnormal,
    Critical,
}

impl VitalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VitalStatus::Normal => "normal",
            VitalStatus::Abnormal => "abnormal",
            VitalStatus::Critical => "critical",
        }
    }
}

/// Normal and critical bounds for one vital, with the score increments they carry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VitalRange {
    pub normal_low: f64,
    pub normal_high: f64,
    pub critical_low: f64,
    pub critical_high: f64,
    pub mild_bonus: f64,
    pub severe_bonus: f64,
}

impl VitalRange {
    pub const fn new(
        normal: (f64, f64),
        critical: (f64, f64),
        mild_bonus: f64,
        severe_bonus: f64,
    ) -> Self {
        Self {
            normal_low: normal.0,
            normal_high: normal.1,
            critical_low: critical.0,
            critical_high: critical.1,
            mild_bonus,
            severe_bonus,
        }
    }

    /// Classifies a reading. Bounds are inclusive.
    pub fn classify(&self, value: f64) -> VitalStatus {
        if (self.normal_low..=self.normal_high).contains(&value) {
            VitalStatus::Normal
        } else if (self.critical_low..=self.critical_high).contains(&value) {
            VitalStatus::Abnormal
        } else {
            VitalStatus::Critical
        }
    }

    /// Score increment for a classified reading.
    pub fn bonus(&self, status: VitalStatus) -> f64 {
        match status {
            VitalStatus::Normal => 0.0,
            VitalStatus::Abnormal => self.mild_bonus,
            VitalStatus::Critical => self.severe_bonus,
        }
    }

    /// Ranges must nest (`critical_low <= normal_low <= normal_high <= critical_high`) and
    /// increments must satisfy `0 <= mild_bonus <= severe_bonus`.
    pub fn validate(&self, name: &str) -> TriageResult<()> {
        let values = [
            self.normal_low,
            self.normal_high,
            self.critical_low,
            self.critical_high,
            self.mild_bonus,
            self.severe_bonus,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(TriageError::Config(format!(
                "{name}: range values must be finite"
            )));
        }
        if !(self.critical_low <= self.normal_low
            && self.normal_low <= self.normal_high
            && self.normal_high <= self.critical_high)
        {
            return Err(TriageError::Config(format!(
                "{name}: normal range must sit inside the critical range"
            )));
        }
        if !(0.0 <= self.mild_bonus && self.mild_bonus <= self.severe_bonus) {
            return Err(TriageError::Config(format!(
                "{name}: bonuses must satisfy 0 <= mild_bonus <= severe_bonus"
            )));
        }
        Ok(())
    }
}
