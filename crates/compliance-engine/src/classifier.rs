//! Process/entity classification of an uploaded document set
//!
//! Every document contributes a signature query (detected kind plus leading
//! headings) against the taxonomy tag space. A candidate pair's vote weight is
//! the sum of rerank scores of the taxonomy passages supporting it, plus a
//! structural weight when the document's kind is a required document of that
//! pair's checklist. The heaviest process wins, then the heaviest entity type
//! within it. Near-equal weights resolve to the lexicographically first label
//! and are reported as a tie with halved confidence.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use corpus_core::Retriever;

use crate::checklist::ChecklistRegistry;
use crate::diagnostics::Diagnostic;
use crate::document::ParsedDocument;
use crate::error::{ComplianceError, Result};
use crate::taxonomy::{pair_from_tags, TAXONOMY_TAG};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Confidence below which the guess counts as unrecognized
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f64,
    /// Weights closer than this are a tie
    #[serde(default = "default_tie_epsilon")]
    pub tie_epsilon: f64,
    /// Vote added when a document's kind is required by a pair's checklist
    #[serde(default = "default_structural_weight")]
    pub structural_weight: f64,
    /// Headings included in a document signature
    #[serde(default = "default_signature_headings")]
    pub signature_headings: usize,
    /// Reported when nothing votes at all
    #[serde(default = "default_fallback_process")]
    pub fallback_process: String,
    #[serde(default = "default_fallback_entity_type")]
    pub fallback_entity_type: String,
}

fn default_threshold() -> f64 {
    0.5
}

fn default_tie_epsilon() -> f64 {
    1e-6
}

fn default_structural_weight() -> f64 {
    1.0
}

fn default_signature_headings() -> usize {
    5
}

fn default_fallback_process() -> String {
    "General Review".to_string()
}

fn default_fallback_entity_type() -> String {
    "Private Company Limited by Shares (Non-Financial)".to_string()
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_threshold(),
            tie_epsilon: default_tie_epsilon(),
            structural_weight: default_structural_weight(),
            signature_headings: default_signature_headings(),
            fallback_process: default_fallback_process(),
            fallback_entity_type: default_fallback_entity_type(),
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ComplianceError::config("classifier.confidence_threshold must be within [0, 1]"));
        }
        if !(self.tie_epsilon >= 0.0) || !(self.structural_weight >= 0.0) {
            return Err(ComplianceError::config(
                "classifier.tie_epsilon and structural_weight must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Best-effort process/entity guess
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub process: String,
    pub entity_type: String,
    /// Share of the winning process in the total vote, halved on ties
    pub confidence: f64,
    /// Winner was picked from near-equal candidates
    pub tied: bool,
    /// Confidence reached the configured threshold
    pub recognized: bool,
    pub process_votes: BTreeMap<String, f64>,
    #[serde(skip)]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Default)]
struct Votes {
    process: BTreeMap<String, f64>,
    pair: BTreeMap<(String, String), f64>,
}

impl Votes {
    fn add(&mut self, process: &str, entity: Option<&str>, weight: f64) {
        *self.process.entry(process.to_string()).or_insert(0.0) += weight;
        if let Some(entity) = entity {
            *self
                .pair
                .entry((process.to_string(), entity.to_string()))
                .or_insert(0.0) += weight;
        }
    }
}

pub struct ProcessClassifier {
    retriever: Arc<Retriever>,
    checklists: Arc<ChecklistRegistry>,
    config: ClassifierConfig,
}

impl ProcessClassifier {
    pub fn new(
        retriever: Arc<Retriever>,
        checklists: Arc<ChecklistRegistry>,
        config: ClassifierConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            retriever,
            checklists,
            config,
        })
    }

    /// Fails only on an empty document set
    pub async fn classify(&self, documents: &[ParsedDocument]) -> Result<Classification> {
        if documents.is_empty() {
            return Err(ComplianceError::Classification(
                "no documents to classify".to_string(),
            ));
        }

        let mut votes = Votes::default();
        let mut diagnostics = Vec::new();

        let signatures: Vec<String> = documents
            .iter()
            .map(|d| d.signature(self.config.signature_headings))
            .collect();
        let retrievals = join_all(signatures.iter().map(|signature| {
            let query = self.retriever.query(signature.as_str()).with_tags([TAXONOMY_TAG]);
            async move { self.retriever.retrieve(&query).await }
        }))
        .await;

        for ((doc, signature), retrieval) in documents.iter().zip(&signatures).zip(retrievals) {
            match retrieval {
                Ok(result) => {
                    for passage in &result.passages {
                        if let Some((process, entity)) = pair_from_tags(&passage.record.metadata.tags) {
                            votes.add(&process, entity.as_deref(), f64::from(passage.rerank_score));
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Taxonomy query for {} degraded: {}", doc.name, e);
                    diagnostics.push(Diagnostic::RetrievalDegraded {
                        context: format!("classification of {} ('{}')", doc.name, signature),
                        reason: e.to_string(),
                    });
                }
            }
            self.add_structural_votes(doc, &mut votes);
        }

        Ok(self.decide(votes, diagnostics))
    }

    fn add_structural_votes(&self, doc: &ParsedDocument, votes: &mut Votes) {
        let Some(kind) = &doc.detected_kind else {
            return;
        };
        if self.config.structural_weight == 0.0 {
            return;
        }

        let mut processes = BTreeSet::new();
        for spec in self.checklists.specs() {
            if spec.required_documents.iter().any(|d| d == kind) {
                processes.insert(spec.process.as_str());
                *votes
                    .pair
                    .entry((spec.process.clone(), spec.entity_type.clone()))
                    .or_insert(0.0) += self.config.structural_weight;
            }
        }
        for process in processes {
            *votes.process.entry(process.to_string()).or_insert(0.0) += self.config.structural_weight;
        }
    }

    fn decide(&self, votes: Votes, diagnostics: Vec<Diagnostic>) -> Classification {
        let total: f64 = votes.process.values().sum();

        let Some((process, best, process_tied)) = pick(&votes.process, self.config.tie_epsilon) else {
            tracing::info!("No taxonomy votes, falling back to {}", self.config.fallback_process);
            return Classification {
                process: self.config.fallback_process.clone(),
                entity_type: self.config.fallback_entity_type.clone(),
                confidence: 0.0,
                tied: false,
                recognized: false,
                process_votes: votes.process,
                diagnostics,
            };
        };

        let entity_votes: BTreeMap<String, f64> = votes
            .pair
            .iter()
            .filter(|((p, _), _)| *p == process)
            .map(|((_, e), w)| (e.clone(), *w))
            .collect();
        let (entity_type, entity_tied) = match pick(&entity_votes, self.config.tie_epsilon) {
            Some((entity, _, tied)) => (entity, tied),
            None => (self.config.fallback_entity_type.clone(), false),
        };

        let tied = process_tied || entity_tied;
        let mut confidence = if total > 0.0 { best / total } else { 0.0 };
        if tied {
            confidence /= 2.0;
        }
        let recognized = confidence >= self.config.confidence_threshold;

        tracing::info!(
            "Classified as {} / {} (confidence {:.2}{})",
            process,
            entity_type,
            confidence,
            if tied { ", tied" } else { "" }
        );

        Classification {
            process,
            entity_type,
            confidence,
            tied,
            recognized,
            process_votes: votes.process,
            diagnostics,
        }
    }
}

/// Heaviest label; near-equal weights go to the lexicographically first label.
/// Returns None when nothing has positive weight.
fn pick(weights: &BTreeMap<String, f64>, epsilon: f64) -> Option<(String, f64, bool)> {
    let best = weights.values().cloned().fold(0.0f64, f64::max);
    if best <= 0.0 {
        return None;
    }
    // BTreeMap iterates in label order
    let contenders: Vec<&String> = weights
        .iter()
        .filter(|(_, w)| best - **w <= epsilon)
        .map(|(label, _)| label)
        .collect();
    let label = contenders.first()?;
    Some(((*label).clone(), best, contenders.len() > 1))
}
