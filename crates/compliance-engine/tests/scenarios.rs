//! End-to-end analysis runs over a small in-memory corpus with the
//! deterministic hashing embedder and lexical reranker.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use compliance_engine::{
    inline_documents, ComplianceAnalyzer, ComplianceError, Diagnostic, EngineConfig, ParsedDocument, Section,
};
use corpus_core::{
    Embedder, Embedding, Fetcher, HashingEmbedder, IngestionPipeline, InlineDocument, LexicalReranker, MemoryIndex,
    Retriever,
};
use pretty_assertions::assert_eq;
use shared_types::Severity;

const SHARES: &str = "Private Company Limited by Shares (Non-Financial)";
const COURTS_PASSAGE: &str = "ADGM Courts have exclusive jurisdiction over disputes";
const EMPLOYMENT_PASSAGE: &str = "Employment contracts: notice period, courts.";

const ENGINE: &str = r#"
[corpus.index]
dimension = 256

[[taxonomy]]
process = "Company Incorporation"
entity_type = "Private Company Limited by Shares (Non-Financial)"
description = "Articles of Association, Memorandum of Association, share capital, Register of Members and Directors, UBO Declaration Form"

[[taxonomy]]
process = "Company Incorporation"
entity_type = "Private Company Limited by Guarantee (Non-Financial)"
description = "guarantors undertake to contribute on winding up"

[[taxonomy]]
process = "Employment"
entity_type = "Private Company Limited by Shares (Non-Financial)"
description = "Employment Contract, employee handbook, terms of employment, salary, probation"

[[checklists]]
process = "Company Incorporation"
entity_type = "Private Company Limited by Shares (Non-Financial)"
required_documents = [
    "Articles of Association",
    "Memorandum of Association",
    "Incorporation Application Form",
    "UBO Declaration Form",
    "Register of Members and Directors",
]

[[rules]]
id = "jurisdiction_mismatch"
kind = "pattern_without_phrase"
patterns = ["\\bjurisdiction\\b"]
required_phrase = "\\bADGM\\b|Abu Dhabi Global Market"
severity = "High"
message = "Jurisdiction clause in {section} does not reference ADGM Courts"
citation_query = "jurisdiction clause ADGM"
tags = ["incorporation"]

[[rules]]
id = "template_blanks"
kind = "placeholder"

[[rules]]
id = "execution_block"
kind = "missing_elements"
elements = ["signatory_name", "capacity", "signature", "date"]
document_kinds = ["Articles of Association"]
"#;

struct OfflineFetcher;

#[async_trait]
impl Fetcher for OfflineFetcher {
    async fn fetch(&self, url: &str) -> corpus_core::Result<Vec<u8>> {
        Err(corpus_core::CorpusError::fetch(url, "offline"))
    }
}

/// Query embeddings never arrive within the retrieval budget
struct StalledEmbedder;

#[async_trait]
impl Embedder for StalledEmbedder {
    async fn embed_documents(&self, texts: &[&str]) -> corpus_core::Result<Vec<Embedding>> {
        Ok(texts.iter().map(|_| vec![0.0; 256]).collect())
    }

    async fn embed_query(&self, _text: &str) -> corpus_core::Result<Embedding> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(vec![0.0; 256])
    }

    fn dimension(&self) -> usize {
        256
    }

    fn model_name(&self) -> &str {
        "stalled"
    }
}

fn passage(source_ref: &str, text: &str, tag: &str) -> InlineDocument {
    InlineDocument {
        source_ref: source_ref.to_string(),
        text: text.to_string(),
        tags: BTreeSet::from([tag.to_string()]),
    }
}

async fn analyzer_with(config: &EngineConfig, extra: Vec<InlineDocument>) -> ComplianceAnalyzer {
    let dimension = config.corpus.index.dimension;
    let embedder = Arc::new(HashingEmbedder::new(dimension).unwrap());
    let index = Arc::new(MemoryIndex::new(dimension));
    let pipeline =
        IngestionPipeline::new(&config.corpus, Arc::new(OfflineFetcher), embedder.clone(), index.clone()).unwrap();

    let mut documents = inline_documents(&config.taxonomy);
    documents.push(passage("https://example.test/courts", COURTS_PASSAGE, "incorporation"));
    documents.extend(extra);
    let summary = pipeline.ingest_inline(&documents).await;
    assert!(summary.errors.is_empty());

    let retriever = Retriever::new(&config.corpus.rag, embedder, Arc::new(LexicalReranker::new()), index).unwrap();
    ComplianceAnalyzer::new(config, Arc::new(retriever)).unwrap()
}

async fn analyzer() -> ComplianceAnalyzer {
    analyzer_with(&EngineConfig::from_toml(ENGINE).unwrap(), Vec::new()).await
}

fn articles() -> ParsedDocument {
    ParsedDocument::new(
        "articles.txt",
        Some("Articles of Association"),
        vec![
            Section::new("Governing Law", "The courts of England shall have exclusive jurisdiction.").with_clause("12"),
            Section::new("Execution", "Signed by John Smith, Director, on 12/03/2024."),
        ],
    )
}

fn simple(name: &str, kind: &str) -> ParsedDocument {
    ParsedDocument::new(name, Some(kind), vec![Section::new("Details", "Completed and filed.")])
}

#[tokio::test]
async fn jurisdiction_clause_raises_one_cited_high_issue() {
    let outcome = analyzer().await.analyze(vec![articles()]).await.unwrap();
    let report = &outcome.report;

    assert_eq!(report.process, "Company Incorporation");
    assert_eq!(report.entity_type, SHARES);
    assert_eq!(report.issues_found.len(), 1);

    let issue = &report.issues_found[0];
    assert_eq!(issue.severity, Severity::High);
    assert_eq!(issue.section.as_deref(), Some("12 Governing Law"));
    let citation = issue.citation.as_ref().expect("citation attached");
    assert_eq!(citation.excerpt, COURTS_PASSAGE);
    assert_eq!(citation.source_url, "https://example.test/courts");
    assert!(citation.rerank_score >= 0.35);
    assert!(outcome.diagnostics.is_empty());
}

#[tokio::test]
async fn four_of_five_required_documents() {
    let documents = vec![
        articles(),
        simple("memorandum.txt", "Memorandum of Association"),
        simple("application.txt", "Incorporation Application Form"),
        simple("ubo.txt", "UBO Declaration Form"),
    ];
    let report = analyzer().await.analyze(documents).await.unwrap().report;

    assert_eq!(report.documents_uploaded, 4);
    assert_eq!(report.required_documents, 5);
    assert_eq!(report.missing_document.as_deref(), Some("Register of Members and Directors"));
    assert_eq!(report.missing_documents, vec!["Register of Members and Directors".to_string()]);
}

#[tokio::test]
async fn gated_citation_leaves_issue_without_citation() {
    // Only an employment passage carries the rule's tag; its best rerank score
    // is 0.2, below the 0.35 gate.
    let toml = ENGINE.replace(r#"tags = ["incorporation"]"#, r#"tags = ["employment"]"#);
    let config = EngineConfig::from_toml(&toml).unwrap();
    let analyzer = analyzer_with(
        &config,
        vec![passage("https://example.test/employment", EMPLOYMENT_PASSAGE, "employment")],
    )
    .await;

    let query = "jurisdiction clause ADGM Governing Law\nThe courts of England shall have exclusive jurisdiction.";
    assert!((LexicalReranker::new().score(query, EMPLOYMENT_PASSAGE) - 0.2).abs() < 1e-6);

    let report = analyzer.analyze(vec![articles()]).await.unwrap().report;
    assert_eq!(report.issues_found.len(), 1);
    assert_eq!(report.issues_found[0].citation, None);

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["issues_found"][0].get("citation").is_none());
}

#[tokio::test]
async fn identical_runs_produce_identical_reports() {
    let documents = vec![
        articles(),
        simple("memorandum.txt", "Memorandum of Association"),
        ParsedDocument::new(
            "ubo.txt",
            Some("UBO Declaration Form"),
            vec![Section::new("Beneficial Owner", "Name: ________")],
        ),
    ];

    let first = analyzer().await.analyze(documents.clone()).await.unwrap().report;
    let second = analyzer().await.analyze(documents).await.unwrap().report;

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    assert_eq!(first.count_severity(Severity::Low), 1);
}

#[tokio::test]
async fn stalled_retrieval_still_produces_a_report() {
    let toml = format!("[corpus.rag]\ntimeout_ms = 20\n{}", ENGINE);
    let config = EngineConfig::from_toml(&toml).unwrap();
    let retriever = Retriever::new(
        &config.corpus.rag,
        Arc::new(StalledEmbedder),
        Arc::new(LexicalReranker::new()),
        Arc::new(MemoryIndex::new(256)),
    )
    .unwrap();
    let analyzer = ComplianceAnalyzer::new(&config, Arc::new(retriever)).unwrap();

    let outcome = analyzer.analyze(vec![articles()]).await.unwrap();

    // the checklist alone still identifies the pair
    assert_eq!(outcome.report.process, "Company Incorporation");
    assert_eq!(outcome.report.entity_type, SHARES);
    assert_eq!(outcome.report.issues_found.len(), 1);
    assert_eq!(outcome.report.issues_found[0].severity, Severity::High);
    assert_eq!(outcome.report.issues_found[0].citation, None);

    assert_eq!(outcome.diagnostics.len(), 2);
    assert!(outcome
        .diagnostics
        .iter()
        .all(|d| matches!(d, Diagnostic::RetrievalDegraded { .. })));
}

#[tokio::test]
async fn process_without_checklist_is_unsupported() {
    let contract = ParsedDocument::new(
        "contract.txt",
        Some("Employment Contract"),
        vec![
            Section::new("Terms of Employment", "Salary is paid monthly."),
            Section::new("Probation", "Six months."),
        ],
    );

    let err = analyzer().await.analyze(vec![contract]).await.unwrap_err();
    assert!(err.is_unsupported());
    assert!(err.to_string().starts_with("process not supported"));
}

#[tokio::test]
async fn empty_document_set_is_a_classification_error() {
    let err = analyzer().await.analyze(Vec::new()).await.unwrap_err();
    assert!(matches!(err, ComplianceError::Classification(_)));
}

#[tokio::test]
async fn unparseable_files_become_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("articles_of_association.txt");
    let bad = dir.path().join("scan.docx");
    std::fs::write(
        &good,
        "Articles of Association\n\nGoverning Law\nADGM Courts have exclusive jurisdiction.\n\nSigned by John Smith, Director, on 12/03/2024.\n",
    )
    .unwrap();
    std::fs::write(&bad, "binary").unwrap();

    let analyzer = analyzer().await;
    let outcome = analyzer.analyze_files(&[good, bad.clone()]).await.unwrap();

    assert_eq!(outcome.report.documents_uploaded, 1);
    assert!(outcome.report.issues_found.is_empty());
    assert_eq!(outcome.diagnostics.len(), 1);
    assert!(matches!(
        &outcome.diagnostics[0],
        Diagnostic::ParseFailed { file, .. } if file.ends_with("scan.docx")
    ));

    let err = analyzer.analyze_files(&[bad]).await.unwrap_err();
    assert!(matches!(err, ComplianceError::Classification(_)));
}
