use crate::case::CaseStatus;
use medflow_uuid::CaseId;

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("case not found: {0}")]
    CaseNotFound(CaseId),
    #[error("case already exists: {0}")]
    DuplicateCase(CaseId),
    #[error("cannot move case from {from} to {to}")]
    InvalidTransition { from: CaseStatus, to: CaseStatus },
    #[error("{actor} ({role}) is not permitted to {action}")]
    Unauthorised {
        actor: String,
        role: crate::actor::Role,
        action: &'static str,
    },
    #[error("stored case {id} is inconsistent: {reason}")]
    CorruptRecord { id: String, reason: String },

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write case file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read case file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(String),
}

pub type TriageResult<T> = std::result::Result<T, TriageError>;
