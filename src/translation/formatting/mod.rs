/*!
 * Document formats and structure preservation.
 *
 * Non-translatable spans (code, link targets, script bodies) are swapped
 * for `__NAME_n__` placeholders before chunking and put back afterwards.
 * Restoration is tolerant of the spacing, casing and underscore damage
 * models tend to do to placeholders.
 */

pub mod html;
pub mod markdown;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::errors::TranslationError;

pub use html::{extract_html_blocks, restore_html};
pub use markdown::{extract_markdown_text, restore_markdown};

static MARKDOWN_LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.+\]\(.+\)").expect("markdown link regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Markdown,
    Html,
    Text,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Markdown => "markdown",
            DocumentFormat::Html => "html",
            DocumentFormat::Text => "text",
        }
    }

    /// Format implied by a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "md" | "markdown" => Some(DocumentFormat::Markdown),
            "html" | "htm" => Some(DocumentFormat::Html),
            "txt" => Some(DocumentFormat::Text),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentFormat {
    type Err = TranslationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "md" | "markdown" => Ok(DocumentFormat::Markdown),
            "html" | "htm" => Ok(DocumentFormat::Html),
            "txt" | "text" => Ok(DocumentFormat::Text),
            other => Err(TranslationError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Sniff the format from content: markdown markers win over HTML tags
pub fn detect_format(content: &str) -> DocumentFormat {
    let markdown = ["# ", "## ", "```", "- "].iter().any(|m| content.contains(m))
        || MARKDOWN_LINK_RE.is_match(content);
    if markdown {
        return DocumentFormat::Markdown;
    }

    if ["<html", "<body", "<div", "<p>"].iter().any(|m| content.contains(m)) {
        return DocumentFormat::Html;
    }

    DocumentFormat::Text
}

/// Placeholder → original text, in extraction order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreservedSections {
    entries: Vec<(String, String)>,
    next_index: usize,
}

impl PreservedSections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `original` and return its placeholder, e.g. `__CODE_BLOCK_0__`
    pub fn insert(&mut self, kind: &str, original: &str) -> String {
        let placeholder = format!("__{}_{}__", kind, self.next_index);
        self.next_index += 1;
        self.entries.push((placeholder.clone(), original.to_string()));
        placeholder
    }

    pub fn get(&self, placeholder: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(p, _)| p == placeholder)
            .map(|(_, original)| original.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, o)| (p.as_str(), o.as_str()))
    }

    /// Split by placeholder: (matching, rest)
    pub fn partition<F>(&self, predicate: F) -> (Self, Self)
    where
        F: Fn(&str) -> bool,
    {
        let (matching, rest): (Vec<_>, Vec<_>) = self.entries.iter().cloned().partition(|(p, _)| predicate(p));
        (
            Self { entries: matching, next_index: self.next_index },
            Self { entries: rest, next_index: self.next_index },
        )
    }
}

/// Put preserved sections back, matching placeholders loosely.
///
/// Spaces between the underscores and the name, extra or missing
/// underscores and case changes are tolerated. Whitespace outside the
/// placeholder is left alone. `CODE_BLOCK_1` never matches inside
/// `CODE_BLOCK_12`.
pub fn restore_preserved_sections(text: &str, sections: &PreservedSections) -> String {
    let mut entries: Vec<(&str, &str)> = sections.iter().collect();
    entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut result = text.to_string();
    for (placeholder, original) in entries {
        let identifier = placeholder.trim_start_matches('_').trim_end_matches('_');
        let pattern = format!(r"(?i)(?:_+[ \t]*)?{}(\d*)(?:[ \t]*_+)?", regex::escape(identifier));

        match Regex::new(&pattern) {
            Ok(re) => {
                result = re
                    .replace_all(&result, |caps: &Captures| {
                        // A longer index such as CODE_BLOCK_12 when restoring CODE_BLOCK_1
                        if caps[1].is_empty() {
                            original.to_string()
                        } else {
                            caps[0].to_string()
                        }
                    })
                    .into_owned();
            }
            Err(_) => result = result.replace(placeholder, original),
        }
    }

    result
}
