/*!
 * HTML structure preservation.
 *
 * Elements whose content must never be translated are replaced whole,
 * outermost kinds first so nested ones travel with their parent. Text and
 * attribute values stay in place for the model to translate around the
 * tags.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{restore_preserved_sections, PreservedSections};

pub const HTML_BLOCK: &str = "HTML_BLOCK";

/// Element names kept verbatim, outermost first
pub const SKIP_ELEMENTS: [&str; 11] = [
    "script", "style", "template", "noscript", "svg", "math", "pre", "code", "kbd", "samp", "var",
];

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("html comment regex"));

static SKIP_ELEMENT_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    SKIP_ELEMENTS
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).expect("skip element regex"))
        .collect()
});

/// Swap comments and skip elements for `__HTML_BLOCK_n__` placeholders
pub fn extract_html_blocks(content: &str) -> (String, PreservedSections) {
    let mut sections = PreservedSections::new();

    let mut text = COMMENT_RE
        .replace_all(content, |caps: &Captures| sections.insert(HTML_BLOCK, &caps[0]))
        .into_owned();

    for re in SKIP_ELEMENT_RES.iter() {
        text = re
            .replace_all(&text, |caps: &Captures| sections.insert(HTML_BLOCK, &caps[0]))
            .into_owned();
    }

    (text, sections)
}

pub fn restore_html(text: &str, sections: &PreservedSections) -> String {
    restore_preserved_sections(text, sections)
}
