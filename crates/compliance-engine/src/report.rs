use shared_types::{Issue, Report};

use crate::checklist::ChecklistResult;
use crate::scoring::ScoringPolicy;

/// Reduces checklist gaps and issues into the final report
#[derive(Debug, Clone, Default)]
pub struct ReportAssembler {
    policy: ScoringPolicy,
}

impl ReportAssembler {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Pure: same inputs, same report
    pub fn assemble(&self, documents_uploaded: usize, checklist: &ChecklistResult, issues: Vec<Issue>) -> Report {
        let score = self
            .policy
            .score(checklist.missing.len(), checklist.required_count, &issues);

        Report {
            process: checklist.process.clone(),
            entity_type: checklist.entity_type.clone(),
            documents_uploaded,
            required_documents: checklist.required_count,
            missing_document: checklist.first_missing().map(str::to_string),
            missing_documents: checklist.missing_in_order.clone(),
            issues_found: issues,
            compliance_score: score,
            compliance_status: self.policy.status(score),
        }
    }
}
