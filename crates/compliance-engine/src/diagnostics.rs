use serde::{Deserialize, Serialize};

/// Non-fatal problem encountered during an analysis run.
///
/// Returned beside the report so nothing that was skipped or degraded goes
/// unreported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// An uploaded file could not be parsed and was left out
    ParseFailed { file: String, reason: String },
    /// A retriever call failed or timed out; the dependent result has no citation
    RetrievalDegraded { context: String, reason: String },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::ParseFailed { file, reason } => write!(f, "parse failed for {}: {}", file, reason),
            Diagnostic::RetrievalDegraded { context, reason } => {
                write!(f, "retrieval degraded for {}: {}", context, reason)
            }
        }
    }
}
