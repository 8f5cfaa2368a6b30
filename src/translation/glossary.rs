/*!
 * Glossary loading, resolution and lookup.
 *
 * A glossary file holds terms with per-language targets. Before use it is
 * resolved against one target language, which yields exactly one target
 * string per term (the source itself for do-not-translate terms) and drops
 * terms that have nothing for that language.
 */

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use crate::errors::{Result, TranslationError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlossaryMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub source_lang: String,
    #[serde(default)]
    pub target_langs: Vec<String>,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// One entry of a glossary file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlossaryTerm {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub targets: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_not_translate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_not_translate_for: Option<Vec<String>>,
}

impl GlossaryTerm {
    fn keeps_source_for(&self, target_lang: &str) -> bool {
        self.do_not_translate == Some(true)
            || self
                .do_not_translate_for
                .as_ref()
                .is_some_and(|langs| langs.iter().any(|l| l == target_lang))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Glossary {
    pub metadata: GlossaryMetadata,
    #[serde(default)]
    pub terms: Vec<GlossaryTerm>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedGlossaryTerm {
    pub source: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub case_sensitive: bool,
    pub do_not_translate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedGlossaryMetadata {
    pub name: String,
    pub source_lang: String,
    pub target_lang: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

/// Glossary narrowed to one target language
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedGlossary {
    pub metadata: ResolvedGlossaryMetadata,
    pub terms: Vec<ResolvedGlossaryTerm>,
}

impl ResolvedGlossary {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Read and parse a glossary file
pub fn load_glossary(path: &Path) -> Result<Glossary> {
    let content = std::fs::read_to_string(path).map_err(|e| TranslationError::GlossaryNotFound {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    serde_json::from_str(&content).map_err(|e| TranslationError::GlossaryInvalid {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Write a glossary back as pretty-printed JSON
pub fn save_glossary(glossary: &Glossary, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(glossary).map_err(|e| TranslationError::GlossaryInvalid {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    std::fs::write(path, json).map_err(|e| TranslationError::FileWrite {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Resolve every term for `target_lang`, dropping unresolvable ones
pub fn resolve_glossary(glossary: &Glossary, target_lang: &str) -> ResolvedGlossary {
    let terms = glossary
        .terms
        .iter()
        .filter_map(|term| {
            let keep_source = term.keeps_source_for(target_lang);
            let target = if keep_source {
                term.source.clone()
            } else {
                term.targets.get(target_lang).filter(|t| !t.is_empty())?.clone()
            };

            Some(ResolvedGlossaryTerm {
                source: term.source.clone(),
                target,
                context: term.context.clone(),
                case_sensitive: term.case_sensitive.unwrap_or(false),
                do_not_translate: keep_source,
            })
        })
        .collect();

    ResolvedGlossary {
        metadata: ResolvedGlossaryMetadata {
            name: glossary.metadata.name.clone(),
            source_lang: glossary.metadata.source_lang.clone(),
            target_lang: target_lang.to_string(),
            version: glossary.metadata.version.clone(),
            domain: glossary.metadata.domain.clone(),
        },
        terms,
    }
}

/// Structural problems with a glossary, one message each
pub fn validate_glossary(glossary: &Glossary) -> Vec<String> {
    let mut errors = Vec::new();

    if glossary.metadata.name.is_empty() {
        errors.push("Missing metadata.name".to_string());
    }
    if glossary.metadata.source_lang.is_empty() {
        errors.push("Missing metadata.sourceLang".to_string());
    }
    if glossary.metadata.target_langs.is_empty() {
        errors.push("Missing or empty metadata.targetLangs".to_string());
    }

    let mut seen = HashSet::new();
    for (i, term) in glossary.terms.iter().enumerate() {
        if term.source.is_empty() {
            errors.push(format!("Term at index {}: missing source", i));
            continue;
        }
        if !seen.insert(term.source.to_lowercase()) {
            errors.push(format!("Duplicate term: \"{}\"", term.source));
        }
        let has_exceptions = term.do_not_translate_for.as_ref().is_some_and(|l| !l.is_empty());
        if term.do_not_translate != Some(true) && term.targets.is_empty() && !has_exceptions {
            errors.push(format!(
                "Term \"{}\": no translations and not marked as do-not-translate",
                term.source
            ));
        }
    }

    errors
}

impl Glossary {
    /// Append a term; a source already present (ignoring case) is rejected
    pub fn add_term(&mut self, term: GlossaryTerm) -> Result<()> {
        let exists = self
            .terms
            .iter()
            .any(|t| t.source.to_lowercase() == term.source.to_lowercase());
        if exists {
            return Err(TranslationError::GlossaryInvalid {
                path: self.metadata.name.clone(),
                message: format!("Term \"{}\" already exists in glossary", term.source),
            });
        }
        self.terms.push(term);
        Ok(())
    }

    /// Remove a term by source (ignoring case); returns whether one was removed
    pub fn remove_term(&mut self, source: &str) -> bool {
        let needle = source.to_lowercase();
        match self.terms.iter().position(|t| t.source.to_lowercase() == needle) {
            Some(index) => {
                self.terms.remove(index);
                true
            }
            None => false,
        }
    }
}

/// Term matching over a resolved glossary
#[derive(Debug, Clone)]
pub struct GlossaryLookup<'a> {
    glossary: &'a ResolvedGlossary,
    by_key: HashMap<String, &'a ResolvedGlossaryTerm>,
    case_sensitive: Vec<&'a ResolvedGlossaryTerm>,
    case_insensitive: Vec<&'a ResolvedGlossaryTerm>,
}

impl<'a> GlossaryLookup<'a> {
    pub fn new(glossary: &'a ResolvedGlossary) -> Self {
        let mut by_key = HashMap::new();
        let mut case_sensitive = Vec::new();
        let mut case_insensitive = Vec::new();

        for term in &glossary.terms {
            if term.case_sensitive {
                by_key.insert(term.source.clone(), term);
                case_sensitive.push(term);
            } else {
                by_key.insert(term.source.to_lowercase(), term);
                case_insensitive.push(term);
            }
        }

        Self { glossary, by_key, case_sensitive, case_insensitive }
    }

    /// Term whose source is exactly `text`, falling back to a lowercase match
    pub fn find(&self, text: &str) -> Option<&'a ResolvedGlossaryTerm> {
        self.by_key
            .get(text)
            .or_else(|| self.by_key.get(&text.to_lowercase()))
            .copied()
    }

    /// Every term whose source occurs in `text`; case-sensitive terms first
    pub fn find_all(&self, text: &str) -> Vec<&'a ResolvedGlossaryTerm> {
        let mut matches: Vec<&'a ResolvedGlossaryTerm> = self
            .case_sensitive
            .iter()
            .filter(|t| text.contains(t.source.as_str()))
            .copied()
            .collect();

        let lower = text.to_lowercase();
        matches.extend(
            self.case_insensitive
                .iter()
                .filter(|t| lower.contains(&t.source.to_lowercase()))
                .copied(),
        );

        matches
    }

    pub fn terms(&self) -> &'a [ResolvedGlossaryTerm] {
        &self.glossary.terms
    }

    /// One line per term for the translation prompt
    pub fn format_for_prompt(&self) -> String {
        self.glossary
            .terms
            .iter()
            .map(|term| {
                let mut flags = vec![if term.case_sensitive {
                    "case-sensitive".to_string()
                } else {
                    "case-insensitive".to_string()
                }];
                if let Some(context) = &term.context {
                    flags.push(format!("context: {}", context));
                }
                let flags = flags.join(", ");

                if term.do_not_translate {
                    format!("- \"{}\" → [DO NOT TRANSLATE, keep as-is] ({})", term.source, flags)
                } else {
                    format!("- \"{}\" → \"{}\" ({})", term.source, term.target, flags)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Which glossary terms made it into a translation
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ComplianceResult {
    pub applied: Vec<String>,
    pub missed: Vec<String>,
    pub score: f64,
}

impl ComplianceResult {
    pub fn is_compliant(&self) -> bool {
        self.missed.is_empty()
    }
}

fn contains_target(translated: &str, term: &ResolvedGlossaryTerm) -> bool {
    if term.case_sensitive {
        translated.contains(term.target.as_str())
    } else {
        translated.to_lowercase().contains(&term.target.to_lowercase())
    }
}

/// Check that every term found in `source` has its target in `translated`
pub fn check_compliance(source: &str, translated: &str, glossary: &ResolvedGlossary) -> ComplianceResult {
    let lookup = GlossaryLookup::new(glossary);
    let found = lookup.find_all(source);

    let total = found.len();
    let (applied, missed): (Vec<&ResolvedGlossaryTerm>, Vec<&ResolvedGlossaryTerm>) = found
        .into_iter()
        .partition(|term| contains_target(translated, term));

    let score = if total > 0 {
        applied.len() as f64 / total as f64 * 100.0
    } else {
        100.0
    };

    ComplianceResult {
        applied: applied.into_iter().map(|t| t.source.clone()).collect(),
        missed: missed.into_iter().map(|t| t.source.clone()).collect(),
        score,
    }
}

/// Document-level check: every term whose source occurs in `source`,
/// honouring case sensitivity on both sides
pub fn check_document_compliance(source: &str, translated: &str, glossary: &ResolvedGlossary) -> ComplianceResult {
    let source_lower = source.to_lowercase();
    let mut result = ComplianceResult::default();

    for term in &glossary.terms {
        let in_source = if term.case_sensitive {
            source.contains(term.source.as_str())
        } else {
            source_lower.contains(&term.source.to_lowercase())
        };
        if !in_source {
            continue;
        }
        if contains_target(translated, term) {
            result.applied.push(term.source.clone());
        } else {
            result.missed.push(term.source.clone());
        }
    }

    let total = result.applied.len() + result.missed.len();
    result.score = if total > 0 {
        result.applied.len() as f64 / total as f64 * 100.0
    } else {
        100.0
    };
    result
}
