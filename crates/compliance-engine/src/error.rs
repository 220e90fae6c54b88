//! Error types for compliance analysis

use corpus_core::CorpusError;
use thiserror::Error;

/// Result type alias for analysis operations
pub type Result<T> = std::result::Result<T, ComplianceError>;

#[derive(Error, Debug)]
pub enum ComplianceError {
    /// An uploaded document could not be read; fatal for that document only
    #[error("failed to parse {file}: {reason}")]
    Parse { file: String, reason: String },

    /// The document set cannot be classified (empty input)
    #[error("classification error: {0}")]
    Classification(String),

    /// No checklist is configured for the detected pair
    #[error("process not supported: no checklist for '{process}' / '{entity_type}'")]
    UnknownChecklist { process: String, entity_type: String },

    /// Invalid rules, checklists, taxonomy or scoring policy
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Corpus(#[from] CorpusError),
}

impl ComplianceError {
    pub fn config(message: impl Into<String>) -> Self {
        ComplianceError::Config(message.into())
    }

    pub fn parse(file: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ComplianceError::Parse {
            file: file.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the caller should present this as "process not supported"
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ComplianceError::UnknownChecklist { .. })
    }
}
