//! Compliance Engine - document set analysis against the regulatory corpus
//!
//! This crate provides:
//! - Parsed document model and the parser collaborator
//! - Process/entity classification over the indexed taxonomy
//! - Required-document checklist verification
//! - Red-flag rules backed by regulatory citations
//! - Compliance scoring and report assembly
//! - Engine configuration

pub mod analyzer;
pub mod checklist;
pub mod classifier;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod parser;
pub mod report;
pub mod rules;
pub mod scoring;
pub mod summarize;
pub mod taxonomy;

pub use analyzer::{AnalysisOutcome, ComplianceAnalyzer};
pub use checklist::{ChecklistRegistry, ChecklistResult, ChecklistSpec};
pub use classifier::{Classification, ClassifierConfig, ProcessClassifier};
pub use config::EngineConfig;
pub use diagnostics::Diagnostic;
pub use document::{ParsedDocument, Section};
pub use error::{ComplianceError, Result};
pub use parser::{DocumentParser, TextDocumentParser};
pub use report::ReportAssembler;
pub use rules::{
    PatternDefinition, RedFlagRule, RuleDefinition, RuleEngine, RuleEvaluation, RuleMatch, StructuralElement,
};
pub use scoring::ScoringPolicy;
pub use summarize::{GuidanceSummarizer, IssueSummarizer};
pub use taxonomy::{inline_documents, TaxonomyEntry, TAXONOMY_TAG};
