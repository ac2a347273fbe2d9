//! Case identifiers and sharded-path utilities.
//!
//! MedFlow stores each consultation case under a sharded directory derived from its UUID.
//!
//! Identifiers use a *canonical* representation: **32 lowercase hexadecimal characters** (no
//! hyphens), the same value produced by `Uuid::new_v4().simple().to_string()`. Externally
//! supplied identifiers (CLI arguments, stored records) must already be canonical; use
//! [`CaseId::parse`] to validate them.
//!
//! ## Sharded directory layout
//! For a canonical UUID `u`, a case lives under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `case_data/cases/55/0e/550e8400e29b41d4a716446655440000/`
//!
//! This keeps directory fan-out bounded as the number of cases grows.

mod case_id;

pub use case_id::{CaseId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
