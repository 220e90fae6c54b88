//! Analysis orchestration: parse → classify → verify checklist → evaluate rules → report

use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use corpus_core::Retriever;
use shared_types::Report;

use crate::checklist::{ChecklistRegistry, ChecklistResult};
use crate::classifier::{Classification, ProcessClassifier};
use crate::config::EngineConfig;
use crate::diagnostics::Diagnostic;
use crate::document::ParsedDocument;
use crate::error::{ComplianceError, Result};
use crate::parser::{DocumentParser, TextDocumentParser};
use crate::report::ReportAssembler;
use crate::rules::{RedFlagRule, RuleEngine};
use crate::summarize::{GuidanceSummarizer, IssueSummarizer};

/// Report plus everything that explains it
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub report: Report,
    pub classification: Classification,
    pub checklist: ChecklistResult,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ComplianceAnalyzer {
    retriever: Arc<Retriever>,
    classifier: ProcessClassifier,
    checklists: Arc<ChecklistRegistry>,
    rules: Vec<RedFlagRule>,
    engine: RuleEngine,
    assembler: ReportAssembler,
    parser: Arc<dyn DocumentParser>,
}

impl ComplianceAnalyzer {
    /// Validates `config` and wires the default parser and summarizer
    pub fn new(config: &EngineConfig, retriever: Arc<Retriever>) -> Result<Self> {
        config.validate()?;
        let checklists = Arc::new(config.checklist_registry()?);
        let classifier = ProcessClassifier::new(retriever.clone(), checklists.clone(), config.classifier.clone())?;

        Ok(Self {
            engine: RuleEngine::new(retriever.clone(), Arc::new(GuidanceSummarizer::new())),
            retriever,
            classifier,
            checklists,
            rules: config.compile_rules()?,
            assembler: ReportAssembler::new(config.scoring.clone()),
            parser: Arc::new(TextDocumentParser::new()),
        })
    }

    pub fn with_parser(mut self, parser: Arc<dyn DocumentParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn IssueSummarizer>) -> Self {
        self.engine = RuleEngine::new(self.retriever.clone(), summarizer);
        self
    }

    pub fn rules(&self) -> &[RedFlagRule] {
        &self.rules
    }

    /// Parse and analyze uploaded files.
    ///
    /// Unparseable files are reported as diagnostics and left out; the run
    /// fails only when none of them parse.
    pub async fn analyze_files(&self, paths: &[PathBuf]) -> Result<AnalysisOutcome> {
        let mut documents = Vec::with_capacity(paths.len());
        let mut diagnostics = Vec::new();

        for path in paths {
            match self.parser.parse(path) {
                Ok(document) => documents.push(document),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                    diagnostics.push(Diagnostic::ParseFailed {
                        file: path.display().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if documents.is_empty() {
            return Err(ComplianceError::Classification(format!(
                "none of the {} uploaded files could be parsed",
                paths.len()
            )));
        }

        let mut outcome = self.analyze(documents).await?;
        diagnostics.append(&mut outcome.diagnostics);
        outcome.diagnostics = diagnostics;
        Ok(outcome)
    }

    /// Analyze already parsed documents
    pub async fn analyze(&self, documents: Vec<ParsedDocument>) -> Result<AnalysisOutcome> {
        tracing::info!("Analyzing {} documents", documents.len());

        let classification = self.classifier.classify(&documents).await?;
        let mut diagnostics = classification.diagnostics.clone();

        let uploaded_kinds: BTreeSet<String> = documents
            .iter()
            .filter_map(|d| d.detected_kind.clone())
            .collect();
        let checklist = self
            .checklists
            .verify(&classification.process, &classification.entity_type, &uploaded_kinds)?;

        let evaluations = join_all(documents.iter().map(|document| {
            let applicable: Vec<&RedFlagRule> = self
                .rules
                .iter()
                .filter(|rule| rule.applies_to(document, &classification.process, &classification.entity_type))
                .collect();
            async move { self.engine.evaluate(document, &applicable).await }
        }))
        .await;

        let mut issues = Vec::new();
        for evaluation in evaluations {
            issues.extend(evaluation.issues);
            diagnostics.extend(evaluation.diagnostics);
        }

        let report = self.assembler.assemble(documents.len(), &checklist, issues);
        tracing::info!(
            "Report: {} issues, {} missing documents, score {:.2} ({})",
            report.issues_found.len(),
            report.missing_documents.len(),
            report.compliance_score,
            report.compliance_status.label()
        );

        Ok(AnalysisOutcome {
            report,
            classification,
            checklist,
            diagnostics,
        })
    }
}
