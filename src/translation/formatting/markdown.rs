/*!
 * Markdown structure preservation.
 *
 * Extraction runs in a fixed order so that each pattern sees only what
 * the previous ones left behind: fenced code blocks, multi-backtick
 * inline code, single-backtick inline code, then link targets.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{restore_preserved_sections, PreservedSections};

pub const CODE_BLOCK: &str = "CODE_BLOCK";
pub const INLINE_CODE: &str = "INLINE_CODE";
pub const LINK_URL: &str = "LINK_URL";

static FENCED_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*```[^\n]*\n[\s\S]*?^[ \t]*```[ \t]*$").expect("fenced code regex")
});
static INLINE_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`\n]+`").expect("inline code regex"));
static LINK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("link regex"));

// Word characters plus the CJK and Hangul blocks
static SPACE_BEFORE_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-z0-9_\x{3000}-\x{9fff}\x{ac00}-\x{d7af}])(`+[^`\n]+`+)").expect("space before regex")
});
static LIST_NUMBER_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.)(`+[^`\n]+`+)").expect("list number regex"));
static SPACE_AFTER_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(`+[^`\n]+`+)([A-Za-z0-9_\x{3000}-\x{9fff}\x{ac00}-\x{d7af}])").expect("space after regex")
});

/// Replace spans of two or more backticks closed by the same run on one line
fn replace_multi_backtick_code(text: &str, sections: &mut PreservedSections) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }

        let run = bytes[i..].iter().take_while(|&&b| b == b'`').count();
        if run < 2 {
            i += 1;
            continue;
        }

        let line_end = bytes[i..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(bytes.len(), |p| i + p);

        // Longest opening run that finds a closing run on the same line
        let closing = (2..=run).rev().find_map(|n| {
            (i + n..=line_end.saturating_sub(n))
                .find(|&j| bytes[j..j + n].iter().all(|&b| b == b'`'))
                .map(|j| j + n)
        });

        match closing {
            Some(end) => {
                out.push_str(&text[last..i]);
                out.push_str(&sections.insert(INLINE_CODE, &text[i..end]));
                last = end;
                i = end;
            }
            None => i += run,
        }
    }

    out.push_str(&text[last..]);
    out
}

/// Swap code and link targets for placeholders
pub fn extract_markdown_text(content: &str) -> (String, PreservedSections) {
    let mut sections = PreservedSections::new();

    let text = FENCED_CODE_RE
        .replace_all(content, |caps: &Captures| sections.insert(CODE_BLOCK, &caps[0]))
        .into_owned();

    let text = replace_multi_backtick_code(&text, &mut sections);

    let text = INLINE_CODE_RE
        .replace_all(&text, |caps: &Captures| sections.insert(INLINE_CODE, &caps[0]))
        .into_owned();

    let text = LINK_RE
        .replace_all(&text, |caps: &Captures| {
            let placeholder = sections.insert(LINK_URL, &caps[2]);
            format!("[{}]({})", &caps[1], placeholder)
        })
        .into_owned();

    (text, sections)
}

/// Models often drop the spaces around inline code placeholders
pub fn ensure_inline_code_spacing(text: &str) -> String {
    let result = SPACE_BEFORE_CODE_RE.replace_all(text, "$1 $2");
    let result = LIST_NUMBER_CODE_RE.replace_all(&result, "$1 $2");
    SPACE_AFTER_CODE_RE.replace_all(&result, "$1 $2").into_owned()
}

/// Restore placeholders; spacing is fixed before code blocks return so
/// their bytes stay untouched
pub fn restore_markdown(text: &str, sections: &PreservedSections) -> String {
    let (blocks, inline) = sections.partition(|placeholder| placeholder.starts_with("__CODE_BLOCK_"));

    let restored = restore_preserved_sections(text, &inline);
    let restored = ensure_inline_code_spacing(&restored);
    restore_preserved_sections(&restored, &blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_fencedCode_shouldBecomePlaceholder() {
        let doc = "Intro\n\n```rust\nfn main() {}\n```\n\nOutro";
        let (text, sections) = extract_markdown_text(doc);

        assert_eq!(text, "Intro\n\n__CODE_BLOCK_0__\n\nOutro");
        assert_eq!(sections.get("__CODE_BLOCK_0__"), Some("```rust\nfn main() {}\n```"));
    }

    #[test]
    fn test_extract_multiBacktick_shouldWinOverSingle() {
        let (text, sections) = extract_markdown_text("Use `` `tick` `` and `plain`.");

        assert_eq!(text, "Use __INLINE_CODE_0__ and __INLINE_CODE_1__.");
        assert_eq!(sections.get("__INLINE_CODE_0__"), Some("`` `tick` ``"));
        assert_eq!(sections.get("__INLINE_CODE_1__"), Some("`plain`"));
    }

    #[test]
    fn test_extract_linkUrl_shouldKeepLinkText() {
        let (text, sections) = extract_markdown_text("Read [the guide](https://example.com/guide).");

        assert_eq!(text, "Read [the guide](__LINK_URL_0__).");
        assert_eq!(sections.get("__LINK_URL_0__"), Some("https://example.com/guide"));
    }

    #[test]
    fn test_roundTrip_untranslated_shouldReproduceDocument() {
        let doc = "# Title\n\nRun `cargo build` then see [docs](https://x.dev).\n\n```sh\necho `date`\n```\n";
        let (text, sections) = extract_markdown_text(doc);
        assert_eq!(restore_markdown(&text, &sections), doc);
    }

    #[test]
    fn test_restore_missingSpaces_shouldReinsertAroundInlineCode() {
        let mut sections = PreservedSections::new();
        sections.insert(INLINE_CODE, "`npm install`");

        let restored = restore_markdown("실행__INLINE_CODE_0__하세요", &sections);
        assert_eq!(restored, "실행 `npm install` 하세요");
    }

    #[test]
    fn test_restore_codeBlock_shouldNotRespaceCode() {
        let mut sections = PreservedSections::new();
        sections.insert(CODE_BLOCK, "```\na`b`c\n```");

        assert_eq!(restore_markdown("__CODE_BLOCK_0__", &sections), "```\na`b`c\n```");
    }
}
