use futures::future::join_all;
use std::sync::Arc;

use corpus_core::{RetrievedPassage, Retriever};
use shared_types::{Citation, Issue};

use super::{RedFlagRule, RuleMatch};
use crate::diagnostics::Diagnostic;
use crate::document::ParsedDocument;
use crate::summarize::IssueSummarizer;
use crate::taxonomy::TAXONOMY_TAG;

const EXCERPT_CHARS: usize = 240;
const CONTEXT_CHARS: usize = 600;

/// Issues raised for one document plus whatever degraded on the way
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleEvaluation {
    pub issues: Vec<Issue>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs red-flag rules and backs each hit with a regulatory citation
pub struct RuleEngine {
    retriever: Arc<Retriever>,
    summarizer: Arc<dyn IssueSummarizer>,
}

impl RuleEngine {
    pub fn new(retriever: Arc<Retriever>, summarizer: Arc<dyn IssueSummarizer>) -> Self {
        Self {
            retriever,
            summarizer,
        }
    }

    /// Evaluate `rules` against `document`.
    ///
    /// All rules fire independently. Citation lookups run concurrently; issues
    /// come back in rule order, then section order. A failed or timed out
    /// lookup leaves the issue without a citation. Taxonomy descriptors share
    /// the index but are never cited.
    pub async fn evaluate(&self, document: &ParsedDocument, rules: &[&RedFlagRule]) -> RuleEvaluation {
        let hits: Vec<(&RedFlagRule, RuleMatch)> = rules
            .iter()
            .flat_map(|rule| rule.matches(document).into_iter().map(move |m| (*rule, m)))
            .collect();

        tracing::debug!("{}: {} rule hits", document.name, hits.len());

        let resolved = join_all(
            hits.iter()
                .map(|(rule, found)| self.build_issue(document, rule, found)),
        )
        .await;

        let mut evaluation = RuleEvaluation::default();
        for (issue, diagnostic) in resolved {
            evaluation.issues.push(issue);
            evaluation.diagnostics.extend(diagnostic);
        }
        evaluation
    }

    async fn build_issue(
        &self,
        document: &ParsedDocument,
        rule: &RedFlagRule,
        found: &RuleMatch,
    ) -> (Issue, Option<Diagnostic>) {
        let (citation, diagnostic) = match &rule.citation_query {
            Some(citation_query) => self.cite(document, rule, citation_query, found).await,
            None => (None, None),
        };

        let mut issue = Issue {
            document: document.name.clone(),
            section: found.section.clone(),
            rule_id: rule.id.clone(),
            severity: rule.severity,
            message: rule.render_message(document, found),
            suggestion: None,
            citation,
        };
        issue.suggestion = Some(match &rule.suggestion {
            Some(suggestion) => suggestion.clone(),
            None => self.summarizer.suggest(&issue),
        });

        (issue, diagnostic)
    }

    async fn cite(
        &self,
        document: &ParsedDocument,
        rule: &RedFlagRule,
        citation_query: &str,
        found: &RuleMatch,
    ) -> (Option<Citation>, Option<Diagnostic>) {
        let context: String = found.context.chars().take(CONTEXT_CHARS).collect();
        let text = format!("{} {}", citation_query, context);
        let query = self
            .retriever
            .query(text.trim_end())
            .with_tags(rule.tags.iter().cloned())
            .without_tags([TAXONOMY_TAG]);

        match self.retriever.retrieve(&query).await {
            Ok(result) => (result.top().map(to_citation), None),
            Err(e) => {
                tracing::warn!("Citation lookup for rule {} on {} degraded: {}", rule.id, document.name, e);
                let location = found.section.as_deref().unwrap_or("document");
                (
                    None,
                    Some(Diagnostic::RetrievalDegraded {
                        context: format!("rule {} on {} ({})", rule.id, document.name, location),
                        reason: e.to_string(),
                    }),
                )
            }
        }
    }
}

fn to_citation(passage: &RetrievedPassage) -> Citation {
    let text = &passage.record.text;
    let excerpt = if text.chars().count() > EXCERPT_CHARS {
        let cut: String = text.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", cut.trim_end())
    } else {
        text.clone()
    };

    Citation {
        record_id: passage.record.id.clone(),
        source_url: passage.record.metadata.source_url.clone(),
        excerpt,
        offset: passage.record.metadata.offset,
        rerank_score: passage.rerank_score,
    }
}
