use serde::{Deserialize, Serialize};

/// Severity of a red-flag issue. Intrinsic to the rule that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Regulatory passage attached to an issue as supporting evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub record_id: String,
    pub source_url: String,
    pub excerpt: String,
    pub offset: usize, // Character offset of the chunk in its normalized source
    pub rerank_score: f32,
}

/// A clause-level compliance issue.
///
/// Serialized field names follow the report contract consumed downstream
/// (`document`, `section`, `issue`, `severity`, `suggestion`, `citation`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub document: String,
    pub section: Option<String>,
    #[serde(skip_serializing, default)]
    pub rule_id: String,
    pub severity: Severity,
    #[serde(rename = "issue")]
    pub message: String,
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub citation: Option<Citation>,
}

/// Overall status derived from the compliance score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplianceStatus {
    #[serde(rename = "Compliant")]
    Compliant,
    #[serde(rename = "Mostly Compliant")]
    MostlyCompliant,
    #[serde(rename = "Partially Compliant")]
    PartiallyCompliant,
    #[serde(rename = "Non-Compliant")]
    NonCompliant,
}

impl ComplianceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "Compliant",
            ComplianceStatus::MostlyCompliant => "Mostly Compliant",
            ComplianceStatus::PartiallyCompliant => "Partially Compliant",
            ComplianceStatus::NonCompliant => "Non-Compliant",
        }
    }
}

/// Final analysis report. Built once per analysis run and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub process: String,
    pub entity_type: String,
    pub documents_uploaded: usize,
    pub required_documents: usize,
    pub missing_document: Option<String>, // First missing label in checklist order
    pub missing_documents: Vec<String>,
    pub issues_found: Vec<Issue>,
    pub compliance_score: f64,
    pub compliance_status: ComplianceStatus,
}

/// Condensed view of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub process: String,
    pub entity_type: String,
    pub compliance_status: ComplianceStatus,
    pub total_issues: usize,
    pub high_issues: usize,
    pub medium_issues: usize,
    pub low_issues: usize,
    pub missing_requirements: usize,
    pub key_missing_document: Option<String>,
}

impl Report {
    /// Number of issues with the given severity
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.issues_found
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            process: self.process.clone(),
            entity_type: self.entity_type.clone(),
            compliance_status: self.compliance_status,
            total_issues: self.issues_found.len(),
            high_issues: self.count_severity(Severity::High),
            medium_issues: self.count_severity(Severity::Medium),
            low_issues: self.count_severity(Severity::Low),
            missing_requirements: self.missing_documents.len(),
            key_missing_document: self.missing_document.clone(),
        }
    }
}
