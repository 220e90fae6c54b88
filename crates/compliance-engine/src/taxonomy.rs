//! Closed process/entity taxonomy indexed into the corpus
//!
//! Each entry becomes an inline corpus document tagged `taxonomy`,
//! `process:<name>` and `entity:<name>`, so the classifier can vote for a
//! pair from the tags of retrieved passages.

use corpus_core::InlineDocument;
use serde::{Deserialize, Serialize};

pub const TAXONOMY_TAG: &str = "taxonomy";
const PROCESS_PREFIX: &str = "process:";
const ENTITY_PREFIX: &str = "entity:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    pub process: String,
    pub entity_type: String,
    /// Typical document kinds, headings and phrases of this pair
    pub description: String,
}

impl TaxonomyEntry {
    pub fn source_ref(&self) -> String {
        format!("taxonomy://{}/{}", self.process, self.entity_type)
    }

    pub fn to_inline(&self) -> InlineDocument {
        InlineDocument {
            source_ref: self.source_ref(),
            text: format!("{} {}. {}", self.process, self.entity_type, self.description),
            tags: [
                TAXONOMY_TAG.to_string(),
                format!("{}{}", PROCESS_PREFIX, self.process),
                format!("{}{}", ENTITY_PREFIX, self.entity_type),
            ]
            .into_iter()
            .collect(),
        }
    }
}

/// Inline corpus documents for every entry
pub fn inline_documents(entries: &[TaxonomyEntry]) -> Vec<InlineDocument> {
    entries.iter().map(TaxonomyEntry::to_inline).collect()
}

/// The (process, entity type) pair a set of record tags points at
pub fn pair_from_tags<'a, I>(tags: I) -> Option<(String, Option<String>)>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut process = None;
    let mut entity = None;
    for tag in tags {
        if let Some(p) = tag.strip_prefix(PROCESS_PREFIX) {
            process = Some(p.to_string());
        } else if let Some(e) = tag.strip_prefix(ENTITY_PREFIX) {
            entity = Some(e.to_string());
        }
    }
    process.map(|p| (p, entity))
}
