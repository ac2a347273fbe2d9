//! Request actors.
//!
//! Every state-changing operation on a case receives the acting person explicitly. There is no
//! process-wide "current user": the caller (CLI, or whichever request handler fronts the core)
//! builds an [`Actor`] per request from its own session context.

use crate::error::{TriageError, TriageResult};
use crate::NonEmptyText;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of the person performing an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Nurse,
    Physician,
    Specialist,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Nurse => "nurse",
            Role::Physician => "physician",
            Role::Specialist => "specialist",
            Role::Admin => "admin",
        }
    }

    /// Roles that may re-triage, claim and complete cases.
    pub fn is_clinical(self) -> bool {
        matches!(self, Role::Nurse | Role::Physician | Role::Specialist)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" => Ok(Role::Patient),
            "nurse" => Ok(Role::Nurse),
            "physician" | "doctor" => Ok(Role::Physician),
            "specialist" => Ok(Role::Specialist),
            "admin" => Ok(Role::Admin),
            other => Err(TriageError::InvalidInput(format!("unknown role: {other}"))),
        }
    }
}

/// The person performing a case operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    /// Display name, recorded on claimed cases.
    pub name: NonEmptyText,

    /// Role used for authorisation checks.
    pub role: Role,
}

impl Actor {
    pub fn new(name: impl AsRef<str>, role: Role) -> TriageResult<Self> {
        let name = NonEmptyText::new(name)
            .map_err(|_| TriageError::InvalidInput("actor name cannot be empty".into()))?;
        Ok(Self { name, role })
    }

    /// Fails with [`TriageError::Unauthorised`] unless the actor holds a clinical role.
    pub fn require_clinical(&self, action: &'static str) -> TriageResult<()> {
        if self.role.is_clinical() {
            return Ok(());
        }
        Err(TriageError::Unauthorised {
            actor: self.name.to_string(),
            role: self.role,
            action,
        })
    }
}
