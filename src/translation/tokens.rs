/*!
 * Token estimation.
 *
 * A character-class heuristic: Latin letters and digits average four
 * characters per token, CJK scripts 1.5, everything else three. The
 * estimate is pure and deterministic so chunk boundaries are reproducible.
 */

const LATIN_CHARS_PER_TOKEN: f64 = 4.0;
const CJK_CHARS_PER_TOKEN: f64 = 1.5;
const OTHER_CHARS_PER_TOKEN: f64 = 3.0;

fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x4E00..=0x9FFF   // CJK Unified Ideographs
        | 0x3400..=0x4DBF // CJK Extension A
        | 0xAC00..=0xD7AF // Hangul Syllables
        | 0x3040..=0x309F // Hiragana
        | 0x30A0..=0x30FF // Katakana
    )
}

/// Estimate the number of tokens in `text`
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }

    let (mut latin, mut cjk, mut other) = (0usize, 0usize, 0usize);
    for c in text.chars() {
        if is_cjk(c) {
            cjk += 1;
        } else if c.is_ascii_alphanumeric() {
            latin += 1;
        } else {
            other += 1;
        }
    }

    let tokens = latin as f64 / LATIN_CHARS_PER_TOKEN
        + cjk as f64 / CJK_CHARS_PER_TOKEN
        + other as f64 / OTHER_CHARS_PER_TOKEN;

    tokens.ceil() as usize
}

pub fn exceeds_token_limit(text: &str, limit: usize) -> bool {
    estimate_tokens(text) > limit
}

/// Cut `text` to roughly fit `limit` tokens, keeping a 5% margin and
/// appending an ellipsis when anything was removed
pub fn truncate_to_token_limit(text: &str, limit: usize) -> String {
    let estimated = estimate_tokens(text);
    if estimated <= limit {
        return text.to_string();
    }

    let char_count = text.chars().count();
    let chars_per_token = char_count as f64 / estimated as f64;
    let target_chars = (limit as f64 * chars_per_token * 0.95).floor() as usize;

    let mut truncated: String = text.chars().take(target_chars).collect();
    truncated.push_str("...");
    truncated
}

/// Split of a model's context window between prompt scaffolding and content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    pub total: usize,
    pub system: usize,
    pub glossary: usize,
    pub context: usize,
    pub content: usize,
    pub reserved: usize,
}

const RESERVED_TOKENS: usize = 500;
const SYSTEM_PROMPT_TOKENS: usize = 300;
const MIN_CONTENT_TOKENS: usize = 100;

/// Budget the remaining content tokens once the fixed parts are accounted for
pub fn calculate_token_budget(max_tokens: usize, glossary_size: usize, context_size: usize) -> TokenBudget {
    let fixed = RESERVED_TOKENS + SYSTEM_PROMPT_TOKENS + glossary_size + context_size;
    let content = max_tokens.saturating_sub(fixed).max(MIN_CONTENT_TOKENS);

    TokenBudget {
        total: max_tokens,
        system: SYSTEM_PROMPT_TOKENS,
        glossary: glossary_size,
        context: context_size,
        content,
        reserved: RESERVED_TOKENS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimateTokens_empty_shouldBeZero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn test_estimateTokens_latin_shouldUseFourCharsPerToken() {
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens("12345678"), 2);
    }

    #[test]
    fn test_estimateTokens_cjk_shouldUseOnePointFiveCharsPerToken() {
        // 3 Hangul syllables -> 2 tokens
        assert_eq!(estimate_tokens("안녕하"), 2);
        // Hiragana + Kanji
        assert_eq!(estimate_tokens("こんにちは世界"), 5);
    }

    #[test]
    fn test_estimateTokens_mixed_shouldSumClassesBeforeRounding() {
        // "Hi " -> 2 latin (0.5) + 1 other (0.333) + 2 hangul (1.333) = 2.17 -> 3
        assert_eq!(estimate_tokens("Hi 안녕"), 3);
        // punctuation and spaces count as "other"
        assert_eq!(estimate_tokens("   "), 1);
        assert_eq!(estimate_tokens("......"), 2);
    }

    #[test]
    fn test_exceedsTokenLimit_shouldCompareStrictly() {
        assert!(!exceeds_token_limit("abcdefgh", 2));
        assert!(exceeds_token_limit("abcdefghi", 2));
    }

    #[test]
    fn test_truncateToTokenLimit_longText_shouldAppendEllipsis() {
        let text = "word ".repeat(100);
        let truncated = truncate_to_token_limit(&text, 10);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() < text.len());
        assert_eq!(truncate_to_token_limit("short", 10), "short");
    }

    #[test]
    fn test_calculateTokenBudget_shouldEnforceMinimumContent() {
        let budget = calculate_token_budget(4096, 200, 100);
        assert_eq!(budget.content, 4096 - 500 - 300 - 200 - 100);

        let tight = calculate_token_budget(600, 200, 100);
        assert_eq!(tight.content, 100);
    }
}
