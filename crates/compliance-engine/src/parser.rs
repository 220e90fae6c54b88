//! Parser collaborator: uploaded file → [`ParsedDocument`]
//!
//! The engine only depends on the [`DocumentParser`] trait. The bundled
//! [`TextDocumentParser`] reads serialized documents (`.json`) and plain
//! text or markdown (`.txt`, `.md`), deriving sections from heading lines.

use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

use crate::document::{ParsedDocument, Section};
use crate::error::{ComplianceError, Result};

/// Turns an uploaded file into sections
pub trait DocumentParser: Send + Sync {
    fn parse(&self, path: &Path) -> Result<ParsedDocument>;
}

lazy_static! {
    static ref MARKDOWN_HEADING: Regex = Regex::new(r"^#{1,6}\s+(.+)$").unwrap();
    static ref NUMBERED: Regex = Regex::new(r"^(?:(?:Article|Section|Clause)\s+)?(\d+(?:\.\d+)*)[.)]?\s+(.+)$").unwrap();
}

const MAX_HEADING_CHARS: usize = 80;
const MINOR_WORDS: &[&str] = &["of", "and", "the", "by", "for", "in", "to", "a", "an", "on", "or"];

#[derive(Debug, Clone, Default)]
pub struct TextDocumentParser;

impl TextDocumentParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse plain text; the first title line names the document kind
    pub fn parse_text(&self, name: &str, fallback_kind: &str, text: &str) -> ParsedDocument {
        let mut detected_kind: Option<String> = None;
        let mut sections: Vec<Section> = Vec::new();
        let mut current: Option<Section> = None;
        let mut context_heading = String::new();

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let line_kind = classify_line(line);

            if detected_kind.is_none() && sections.is_empty() && current.is_none() {
                if let Line::Heading(title) = &line_kind {
                    detected_kind = Some(title.clone());
                    continue;
                }
            }

            match line_kind {
                Line::Heading(heading) => {
                    sections.extend(current.take());
                    context_heading = heading.clone();
                    current = Some(Section::new(&heading, ""));
                }
                Line::NumberedHeading(number, heading) => {
                    sections.extend(current.take());
                    context_heading = heading.clone();
                    current = Some(Section::new(&heading, "").with_clause(&number));
                }
                Line::Clause(number, body) => {
                    // a heading with no body of its own is replaced by its first clause
                    if let Some(open) = current.take().filter(|s| !s.text.is_empty()) {
                        sections.push(open);
                    }
                    current = Some(Section::new(&context_heading, &body).with_clause(&number));
                }
                Line::Body(body) => {
                    let section = current.get_or_insert_with(|| Section::new("", ""));
                    if !section.text.is_empty() {
                        section.text.push(' ');
                    }
                    section.text.push_str(&body);
                }
            }
        }
        sections.extend(current.take());

        ParsedDocument {
            name: name.to_string(),
            sections,
            detected_kind: detected_kind.or_else(|| Some(kind_from_stem(fallback_kind))),
        }
    }
}

enum Line {
    Heading(String),
    NumberedHeading(String, String),
    Clause(String, String),
    Body(String),
}

fn classify_line(line: &str) -> Line {
    if let Some(caps) = MARKDOWN_HEADING.captures(line) {
        let heading = caps[1].trim().to_string();
        return match NUMBERED.captures(&heading) {
            Some(num) => Line::NumberedHeading(num[1].to_string(), num[2].trim().to_string()),
            None => Line::Heading(heading),
        };
    }
    if let Some(caps) = NUMBERED.captures(line) {
        let rest = caps[2].trim();
        return if is_title_like(rest) {
            Line::NumberedHeading(caps[1].to_string(), rest.to_string())
        } else {
            Line::Clause(caps[1].to_string(), rest.to_string())
        };
    }
    if is_title_like(line) {
        return Line::Heading(line.trim_end_matches(':').to_string());
    }
    Line::Body(line.to_string())
}

/// Short line without sentence punctuation whose words are capitalised
fn is_title_like(line: &str) -> bool {
    let trimmed = line.trim_end_matches(':');
    if trimmed.is_empty() || trimmed.chars().count() > MAX_HEADING_CHARS {
        return false;
    }
    if trimmed.ends_with(['.', ';', ',']) {
        return false;
    }
    trimmed.split_whitespace().all(|word| {
        MINOR_WORDS.contains(&word.to_lowercase().as_str())
            || word
                .chars()
                .next()
                .map_or(false, |c| c.is_uppercase() || c.is_numeric() || c == '(')
    })
}

/// "articles_of_association" → "Articles of Association"
fn kind_from_stem(stem: &str) -> String {
    stem.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .enumerate()
        .map(|(i, w)| {
            let lower = w.to_lowercase();
            if i > 0 && MINOR_WORDS.contains(&lower.as_str()) {
                return lower;
            }
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl DocumentParser for TextDocumentParser {
    fn parse(&self, path: &Path) -> Result<ParsedDocument> {
        let file = path.display().to_string();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.clone());
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let content =
            std::fs::read_to_string(path).map_err(|e| ComplianceError::parse(&file, e))?;

        match extension.as_str() {
            "json" => {
                let mut doc: ParsedDocument = serde_json::from_str(&content)
                    .map_err(|e| ComplianceError::parse(&file, e))?;
                if doc.name.is_empty() {
                    doc.name = name;
                }
                Ok(doc)
            }
            "txt" | "md" => {
                let doc = self.parse_text(&name, &stem, &content);
                if doc.sections.is_empty() {
                    return Err(ComplianceError::parse(&file, "document has no text content"));
                }
                Ok(doc)
            }
            other => Err(ComplianceError::parse(
                &file,
                format!("unsupported file type '.{}'", other),
            )),
        }
    }
}
