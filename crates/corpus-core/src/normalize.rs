//! Text normalization for fetched sources
//!
//! HTML is reduced to visible text (script and style blocks dropped), then every
//! content type goes through the same whitespace and control-character cleanup.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{CorpusError, Result};
use crate::source::ContentType;

lazy_static! {
    static ref SCRIPT_STYLE: Regex = Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").unwrap();
    static ref COMMENT: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref TAG: Regex = Regex::new(r"(?s)<[^>]*>").unwrap();
    static ref NUMERIC_ENTITY: Regex = Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Reduce an HTML page to its visible text
pub fn strip_html(html: &str) -> String {
    let text = SCRIPT_STYLE.replace_all(html, " ");
    let text = COMMENT.replace_all(&text, " ");
    let text = TAG.replace_all(&text, " ");
    decode_entities(&text)
}

fn decode_entities(text: &str) -> String {
    let decoded = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures| {
        let raw = &caps[1];
        let code = match raw.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => raw.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_default()
    });

    decoded
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Collapse whitespace runs to a single space and drop NUL characters
pub fn clean_text(text: &str) -> String {
    let without_nul: String = text.chars().filter(|c| *c != '\0').collect();
    WHITESPACE.replace_all(&without_nul, " ").trim().to_string()
}

/// Full normalization for a source body of the given type
pub fn normalize(raw: &str, content_type: ContentType) -> String {
    match content_type {
        ContentType::Html => clean_text(&strip_html(raw)),
        ContentType::Pdf | ContentType::Text => clean_text(raw),
    }
}

/// Decode a fetched body and normalize it to plain text
pub fn extract_text(url: &str, bytes: &[u8], content_type: ContentType) -> Result<String> {
    let raw = match content_type {
        ContentType::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| CorpusError::fetch(url, format!("pdf extraction failed: {}", e)))?,
        ContentType::Html | ContentType::Text => String::from_utf8_lossy(bytes).into_owned(),
    };
    Ok(normalize(&raw, content_type))
}

/// Lowercased alphanumeric tokens in reading order
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}
