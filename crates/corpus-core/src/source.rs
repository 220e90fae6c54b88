//! Regulatory source declarations

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How the raw bytes of a source are turned into text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Html,
    Pdf,
    Text,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Html => "html",
            ContentType::Pdf => "pdf",
            ContentType::Text => "text",
        }
    }
}

/// A regulatory source declared in configuration.
///
/// Consumed once per ingestion run; the url doubles as the chunk source reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    #[serde(default, alias = "type")]
    pub content_type: ContentType,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Source {
    pub fn new(url: &str, content_type: ContentType) -> Self {
        Self {
            url: url.to_string(),
            content_type,
            tags: BTreeSet::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}
