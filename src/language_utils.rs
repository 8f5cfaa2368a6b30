/*!
 * Language utilities for ISO language code handling.
 *
 * Prompts name languages in English ("Korean") rather than by code, and
 * codes may carry a region subtag ("pt-BR", "zh_TW").
 */

use isolang::Language;

/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

/// ISO 639-2/B codes that differ from their 639-2/T form
const PART2B_TO_PART2T: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Split "pt-BR" into ("pt", Some("BR"))
fn split_region(code: &str) -> (String, Option<&str>) {
    let code = code.trim();
    match code.split_once(['-', '_']) {
        Some((base, region)) if !region.is_empty() => (base.to_lowercase(), Some(region)),
        _ => (code.to_lowercase(), None),
    }
}

fn lookup(base: &str) -> Option<(Language, LanguageCodeType)> {
    match base.len() {
        2 => Language::from_639_1(base).map(|l| (l, LanguageCodeType::Part1)),
        3 => Language::from_639_3(base)
            .map(|l| (l, LanguageCodeType::Part2T))
            .or_else(|| {
                PART2B_TO_PART2T
                    .iter()
                    .find(|(b, _)| *b == base)
                    .and_then(|(_, t)| Language::from_639_3(t))
                    .map(|l| (l, LanguageCodeType::Part2B))
            }),
        _ => None,
    }
}

/// Validate a language code, ignoring any region subtag
pub fn validate_language_code(code: &str) -> Option<LanguageCodeType> {
    let (base, _) = split_region(code);
    lookup(&base).map(|(_, kind)| kind)
}

pub fn is_valid_language_code(code: &str) -> bool {
    validate_language_code(code).is_some()
}

/// Normalize to ISO 639-1 when one exists, else ISO 639-2/T
pub fn normalize_language_code(code: &str) -> Option<String> {
    let (base, _) = split_region(code);
    let (language, _) = lookup(&base)?;
    Some(
        language
            .to_639_1()
            .map(str::to_string)
            .unwrap_or_else(|| language.to_639_3().to_string()),
    )
}

/// Check if two language codes represent the same base language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_language_code(code1), normalize_language_code(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// English name for prompts; unknown codes are returned unchanged
pub fn language_display_name(code: &str) -> String {
    let (base, region) = split_region(code);
    match (lookup(&base), region) {
        (Some((language, _)), Some(region)) => format!("{} ({})", language.to_name(), region.to_uppercase()),
        (Some((language, _)), None) => language.to_name().to_string(),
        (None, _) => code.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validateLanguageCode_shouldClassifyForms() {
        assert_eq!(validate_language_code("ko"), Some(LanguageCodeType::Part1));
        assert_eq!(validate_language_code("kor"), Some(LanguageCodeType::Part2T));
        assert_eq!(validate_language_code("ger"), Some(LanguageCodeType::Part2B));
        assert_eq!(validate_language_code("pt-BR"), Some(LanguageCodeType::Part1));
        assert_eq!(validate_language_code("xx"), None);
    }

    #[test]
    fn test_languageCodesMatch_shouldNormalizeAcrossForms() {
        assert!(language_codes_match("de", "ger"));
        assert!(language_codes_match("ja", "jpn"));
        assert!(language_codes_match("zh-TW", "zh"));
        assert!(!language_codes_match("en", "fr"));
        assert!(!language_codes_match("en", "bogus"));
    }

    #[test]
    fn test_languageDisplayName_shouldIncludeRegion() {
        assert_eq!(language_display_name("ko"), "Korean");
        assert_eq!(language_display_name("pt_br"), "Portuguese (BR)");
        assert_eq!(language_display_name("klingon"), "klingon");
    }
}
