//! Remediation suggestions for issues that carry none of their own

use shared_types::Issue;

/// Produces a suggestion string from an issue. Must be a pure function.
pub trait IssueSummarizer: Send + Sync {
    fn suggest(&self, issue: &Issue) -> String;
}

const GUIDANCE: &[(&str, &str)] = &[
    ("jurisdiction", "Update the jurisdiction clause to reference ADGM laws and ADGM Courts."),
    ("signat", "Ensure all required signatures are present with signatory names, capacity and dates."),
    ("register", "Prepare and maintain the required register as set out in the ADGM Companies Regulations."),
    ("template", "Complete all template fields and remove placeholder text."),
    ("placeholder", "Complete all template fields and remove placeholder text."),
    ("share capital", "Remove references to share capital for companies limited by guarantee."),
];

const GENERIC: &str = "Review and address the identified issue according to the ADGM Registration Authority guidance.";

/// Keyword-to-guidance table over the issue message and its citation
#[derive(Debug, Clone, Default)]
pub struct GuidanceSummarizer;

impl GuidanceSummarizer {
    pub fn new() -> Self {
        Self
    }
}

impl IssueSummarizer for GuidanceSummarizer {
    fn suggest(&self, issue: &Issue) -> String {
        let message = issue.message.to_lowercase();
        let topic = GUIDANCE
            .iter()
            .find(|(keyword, _)| message.contains(keyword))
            .map(|(_, guidance)| *guidance)
            .unwrap_or(GENERIC);

        match &issue.citation {
            Some(citation) => format!("{} See {}.", topic, citation.source_url),
            None => topic.to_string(),
        }
    }
}
