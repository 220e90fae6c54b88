//! Parsed uploaded documents, owned read-only by the engine

use serde::{Deserialize, Serialize};

/// One section or clause of a parsed document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clause_id: Option<String>,
}

impl Section {
    pub fn new(heading: &str, text: &str) -> Self {
        Self {
            heading: heading.to_string(),
            text: text.to_string(),
            clause_id: None,
        }
    }

    pub fn with_clause(mut self, clause_id: &str) -> Self {
        self.clause_id = Some(clause_id.to_string());
        self
    }

    /// Label used in issues: clause id when present, otherwise the heading
    pub fn label(&self) -> Option<String> {
        match &self.clause_id {
            Some(id) if self.heading.is_empty() => Some(id.clone()),
            Some(id) => Some(format!("{} {}", id, self.heading)),
            None if self.heading.is_empty() => None,
            None => Some(self.heading.clone()),
        }
    }

    /// Heading and body as one searchable string
    pub fn content(&self) -> String {
        if self.heading.is_empty() {
            self.text.clone()
        } else if self.text.is_empty() {
            self.heading.clone()
        } else {
            format!("{}\n{}", self.heading, self.text)
        }
    }
}

/// Output of the parser collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// File name the document was uploaded as
    #[serde(default)]
    pub name: String,
    pub sections: Vec<Section>,
    /// Document kind label, e.g. "Articles of Association"
    #[serde(default)]
    pub detected_kind: Option<String>,
}

impl ParsedDocument {
    pub fn new(name: &str, detected_kind: Option<&str>, sections: Vec<Section>) -> Self {
        Self {
            name: name.to_string(),
            sections,
            detected_kind: detected_kind.map(str::to_string),
        }
    }

    /// Non-empty headings in document order
    pub fn headings(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .map(|s| s.heading.as_str())
            .filter(|h| !h.is_empty())
    }

    pub fn full_text(&self) -> String {
        self.sections
            .iter()
            .map(Section::content)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Short signature used for taxonomy queries: kind plus leading headings
    pub fn signature(&self, max_headings: usize) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(kind) = &self.detected_kind {
            parts.push(kind);
        }
        let mut seen = 0;
        for heading in self.headings() {
            if seen == max_headings {
                break;
            }
            if !parts.contains(&heading) {
                parts.push(heading);
                seen += 1;
            }
        }
        parts.join("; ")
    }
}
