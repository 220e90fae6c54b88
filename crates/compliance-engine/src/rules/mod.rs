//! Red-flag rules
//!
//! A rule is a pure predicate over a [`ParsedDocument`]. Lexical kinds run per
//! section and may fire once per matching section; structural kinds look at the
//! whole document and fire at most once. Rules never see each other's results,
//! so evaluation order only decides output order.

pub mod engine;

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use shared_types::Severity;

use crate::document::ParsedDocument;
use crate::error::{ComplianceError, Result};

pub use engine::{RuleEngine, RuleEvaluation};

lazy_static! {
    static ref TEMPLATE_BLANK: Regex = Regex::new(r"\[\[.*?\]\]|_{3,}").unwrap();
    static ref LOREM_IPSUM: Regex = Regex::new(r"(?i)lorem ipsum").unwrap();
    static ref SIGNATORY_NAME: Regex =
        Regex::new(r"(?i:signed|signature|executed by)[^\n]*\b[A-Z][a-z]+ [A-Z][a-z]+\b").unwrap();
    static ref CAPACITY: Regex = Regex::new(r"(?i)\b(director|officer|authori[sz]ed|capacity)\b").unwrap();
    static ref SIGNATURE: Regex = Regex::new(r"(?i)\b(signature|signed|e-sign)").unwrap();
    static ref DATE: Regex = Regex::new(
        r"(?i)\b\d{1,2}[/-]\d{1,2}[/-]\d{4}\b|\b\d{4}[/-]\d{1,2}[/-]\d{1,2}\b|\b\d{1,2}(st|nd|rd|th)? (january|february|march|april|may|june|july|august|september|october|november|december),? \d{4}\b"
    )
    .unwrap();
}

/// Structural element a signed document must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralElement {
    #[serde(alias = "has_signatory_name")]
    SignatoryName,
    #[serde(alias = "has_capacity")]
    Capacity,
    #[serde(alias = "has_signature_or_e-sign")]
    Signature,
    #[serde(alias = "has_date")]
    Date,
}

impl StructuralElement {
    pub fn label(&self) -> &'static str {
        match self {
            StructuralElement::SignatoryName => "signatory name",
            StructuralElement::Capacity => "capacity",
            StructuralElement::Signature => "signature",
            StructuralElement::Date => "date",
        }
    }

    fn present_in(&self, text: &str) -> bool {
        match self {
            StructuralElement::SignatoryName => SIGNATORY_NAME.is_match(text),
            StructuralElement::Capacity => CAPACITY.is_match(text),
            StructuralElement::Signature => SIGNATURE.is_match(text),
            StructuralElement::Date => DATE.is_match(text),
        }
    }
}

/// Predicate part of a rule as written in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternDefinition {
    /// Any of the patterns present in a section
    ForbiddenPhrase { patterns: Vec<String> },
    /// A trigger pattern present in a section that lacks the required phrase
    PatternWithoutPhrase {
        patterns: Vec<String>,
        required_phrase: String,
    },
    /// Template blanks or filler text left in a section
    Placeholder,
    /// Document lacks some of the listed elements
    MissingElements { elements: Vec<StructuralElement> },
    /// Document has none of the listed headings
    RequiredHeading { headings: Vec<String> },
}

impl PatternDefinition {
    fn default_severity(&self) -> Severity {
        match self {
            PatternDefinition::ForbiddenPhrase { .. } => Severity::High,
            PatternDefinition::PatternWithoutPhrase { .. } => Severity::Medium,
            PatternDefinition::Placeholder => Severity::Low,
            PatternDefinition::MissingElements { .. } => Severity::Medium,
            PatternDefinition::RequiredHeading { .. } => Severity::Medium,
        }
    }

    fn default_message(&self) -> &'static str {
        match self {
            PatternDefinition::ForbiddenPhrase { .. } => "Forbidden phrase found: {matched}",
            PatternDefinition::PatternWithoutPhrase { .. } => "Pattern presence issue detected in {section}",
            PatternDefinition::Placeholder => "Template placeholders found",
            PatternDefinition::MissingElements { .. } => "Missing structural elements: {missing}",
            PatternDefinition::RequiredHeading { .. } => "Missing required section: {missing}",
        }
    }
}

/// A rule as declared in the `[[rules]]` tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub id: String,
    #[serde(flatten)]
    pub pattern: PatternDefinition,
    #[serde(default)]
    pub severity: Option<Severity>,
    /// Supports `{document}`, `{section}`, `{matched}` and `{missing}`
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub citation_query: Option<String>,
    #[serde(default)]
    pub suggestion: Option<String>,
    /// Restrict to these processes; empty means all
    #[serde(default)]
    pub processes: Vec<String>,
    /// Restrict to these entity types; empty means all
    #[serde(default)]
    pub entity_types: Vec<String>,
    /// Restrict to these detected document kinds; empty means all
    #[serde(default)]
    pub document_kinds: Vec<String>,
    /// Tag filter for the citation query
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
enum Predicate {
    AnyPattern(Vec<Regex>),
    PatternWithout { triggers: Vec<Regex>, required: Regex },
    Placeholder,
    Elements(Vec<StructuralElement>),
    Headings(Vec<String>),
}

/// Where a rule fired
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    /// Section label; None for document-scope matches
    pub section: Option<String>,
    /// Text the citation query is conjoined with
    pub context: String,
    pub matched: Option<String>,
    pub missing: Vec<String>,
}

/// Compiled, immutable red-flag rule
#[derive(Debug, Clone)]
pub struct RedFlagRule {
    pub id: String,
    pub severity: Severity,
    pub message_template: String,
    pub citation_query: Option<String>,
    pub suggestion: Option<String>,
    pub processes: Vec<String>,
    pub entity_types: Vec<String>,
    pub document_kinds: Vec<String>,
    pub tags: Vec<String>,
    predicate: Predicate,
}

fn compile_pattern(rule_id: &str, pattern: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ComplianceError::config(format!("rule {}: invalid pattern '{}': {}", rule_id, pattern, e)))
}

fn compile_all(rule_id: &str, patterns: &[String]) -> Result<Vec<Regex>> {
    if patterns.is_empty() {
        return Err(ComplianceError::config(format!("rule {}: no patterns", rule_id)));
    }
    patterns.iter().map(|p| compile_pattern(rule_id, p)).collect()
}

impl RedFlagRule {
    pub fn compile(definition: &RuleDefinition) -> Result<Self> {
        let id = definition.id.trim();
        if id.is_empty() {
            return Err(ComplianceError::config("rule id must not be empty"));
        }

        let predicate = match &definition.pattern {
            PatternDefinition::ForbiddenPhrase { patterns } => Predicate::AnyPattern(compile_all(id, patterns)?),
            PatternDefinition::PatternWithoutPhrase {
                patterns,
                required_phrase,
            } => Predicate::PatternWithout {
                triggers: compile_all(id, patterns)?,
                required: compile_pattern(id, required_phrase)?,
            },
            PatternDefinition::Placeholder => Predicate::Placeholder,
            PatternDefinition::MissingElements { elements } => {
                if elements.is_empty() {
                    return Err(ComplianceError::config(format!("rule {}: no elements", id)));
                }
                let mut elements = elements.clone();
                elements.sort();
                elements.dedup();
                Predicate::Elements(elements)
            }
            PatternDefinition::RequiredHeading { headings } => {
                if headings.is_empty() {
                    return Err(ComplianceError::config(format!("rule {}: no headings", id)));
                }
                Predicate::Headings(headings.iter().map(|h| h.to_lowercase()).collect())
            }
        };

        Ok(Self {
            id: id.to_string(),
            severity: definition
                .severity
                .unwrap_or_else(|| definition.pattern.default_severity()),
            message_template: definition
                .message
                .clone()
                .unwrap_or_else(|| definition.pattern.default_message().to_string()),
            citation_query: definition
                .citation_query
                .clone()
                .filter(|q| !q.trim().is_empty()),
            suggestion: definition.suggestion.clone(),
            processes: definition.processes.clone(),
            entity_types: definition.entity_types.clone(),
            document_kinds: definition.document_kinds.clone(),
            tags: definition.tags.clone(),
            predicate,
        })
    }

    /// Compile a declared rule set, keeping declared order
    pub fn compile_all(definitions: &[RuleDefinition]) -> Result<Vec<Self>> {
        let mut seen = std::collections::BTreeSet::new();
        let mut rules = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let rule = Self::compile(definition)?;
            if !seen.insert(rule.id.clone()) {
                return Err(ComplianceError::config(format!("duplicate rule id {}", rule.id)));
            }
            rules.push(rule);
        }
        Ok(rules)
    }

    pub fn applies_to(&self, document: &ParsedDocument, process: &str, entity_type: &str) -> bool {
        let process_ok = self.processes.is_empty() || self.processes.iter().any(|p| p == process);
        let entity_ok = self.entity_types.is_empty() || self.entity_types.iter().any(|e| e == entity_type);
        let kind_ok = self.document_kinds.is_empty()
            || document
                .detected_kind
                .as_ref()
                .is_some_and(|kind| self.document_kinds.contains(kind));
        process_ok && entity_ok && kind_ok
    }

    /// Every place the rule fires in `document`, in section order
    pub fn matches(&self, document: &ParsedDocument) -> Vec<RuleMatch> {
        match &self.predicate {
            Predicate::AnyPattern(patterns) => self.section_matches(document, |text| {
                patterns.iter().find_map(|p| p.find(text)).map(|m| m.as_str().to_string())
            }),
            Predicate::PatternWithout { triggers, required } => self.section_matches(document, |text| {
                if required.is_match(text) {
                    return None;
                }
                triggers.iter().find_map(|p| p.find(text)).map(|m| m.as_str().to_string())
            }),
            Predicate::Placeholder => self.section_matches(document, |text| {
                TEMPLATE_BLANK
                    .find(text)
                    .or_else(|| LOREM_IPSUM.find(text))
                    .map(|m| m.as_str().to_string())
            }),
            Predicate::Elements(elements) => {
                let text = document.full_text();
                let missing: Vec<String> = elements
                    .iter()
                    .filter(|e| !e.present_in(&text))
                    .map(|e| e.label().to_string())
                    .collect();
                self.document_match(document, missing)
            }
            Predicate::Headings(headings) => {
                let present = document
                    .headings()
                    .map(str::to_lowercase)
                    .any(|h| headings.iter().any(|wanted| h.contains(wanted.as_str())));
                let missing = if present { Vec::new() } else { headings.clone() };
                self.document_match(document, missing)
            }
        }
    }

    fn section_matches<F>(&self, document: &ParsedDocument, find: F) -> Vec<RuleMatch>
    where
        F: Fn(&str) -> Option<String>,
    {
        document
            .sections
            .iter()
            .filter_map(|section| {
                let content = section.content();
                find(&content).map(|matched| RuleMatch {
                    section: section.label(),
                    context: content,
                    matched: Some(matched),
                    missing: Vec::new(),
                })
            })
            .collect()
    }

    fn document_match(&self, document: &ParsedDocument, missing: Vec<String>) -> Vec<RuleMatch> {
        if missing.is_empty() {
            return Vec::new();
        }
        vec![RuleMatch {
            section: None,
            context: document.detected_kind.clone().unwrap_or_default(),
            matched: None,
            missing,
        }]
    }

    /// Issue message for one match
    pub fn render_message(&self, document: &ParsedDocument, found: &RuleMatch) -> String {
        self.message_template
            .replace("{document}", &document.name)
            .replace("{section}", found.section.as_deref().unwrap_or("document"))
            .replace("{matched}", found.matched.as_deref().unwrap_or(""))
            .replace("{missing}", &found.missing.join(", "))
    }
}
