use thiserror::Error;

use crate::trigger::{TriggerKind, TsBit};

/// Fatal errors. Per-event data anomalies are never reported through this
/// type; they surface as skipped events instead.
#[derive(Error, Debug)]
pub enum DiagError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown trigger type: {0}")]
    UnknownTriggerType(String),

    #[error("Verification for trigger type \"{0}\" is not supported")]
    UnsupportedTriggerType(TsBit),

    #[error("Trigger kind mismatch: expected {expected}, found {found}")]
    MismatchedTriggerKind {
        expected: TriggerKind,
        found: TriggerKind,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, DiagError>;
