//! # MedFlow Core
//!
//! Triage logic for consultation cases:
//! - Case model and its lifecycle (`pending → triaged → in_review → completed`)
//! - Deterministic triage scoring from severity, symptoms, vital signs and history
//! - Queue bucketing by triage level with wait-time estimates and statistics
//! - Case stores (in-memory and sharded YAML files under `MEDFLOW_DATA_DIR`)
//! - Optional narrative text, imaging-report parsing and a rule-based differential diagnosis,
//!   all display-only
//!
//! **No transport concerns**: authentication, HTTP routing and UI belong to whichever front end
//! drives [`TriageService`]. Callers pass the acting [`Actor`] explicitly.

pub mod actor;
pub mod case;
pub mod config;
pub mod constants;
pub mod diagnosis;
pub mod error;
pub mod imaging;
pub mod narrative;
pub mod queue;
pub mod service;
pub mod store;
pub mod triage;
pub mod vitals;

pub use medflow_types::{NonEmptyText, TextError};
pub use medflow_uuid::CaseId;

pub use actor::{Actor, Role};
pub use case::{Case, CaseStatus, ClinicalUpdate, NewCase, TriageRecord};
pub use config::{ConfigFile, CoreConfig, QueueConfig, ScoringConfig};
pub use diagnosis::{DiagnosisCandidate, DifferentialDiagnosis};
pub use error::{TriageError, TriageResult};
pub use imaging::{ImagePriority, ImageReport};
pub use narrative::{fetch_narrative, DemoNarrative, NarrativeSource, NoNarrative};
pub use queue::{bucket, QueueBuckets, QueueSnapshot, QueueStats};
pub use service::TriageService;
pub use store::{CaseStore, FileCaseStore, MemoryCaseStore};
pub use triage::{Assessment, CaseSnapshot, TriageEvaluator, TriageLevel};
pub use vitals::{BloodPressure, VitalSigns};
