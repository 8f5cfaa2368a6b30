/*!
 * Extraction of JSON objects embedded in free-form LLM output.
 *
 * Models wrap JSON in prose or code fences. The first balanced `{...}`
 * region is located (string literals and escapes are respected) and parsed
 * strictly; callers substitute a neutral value when this yields `None`.
 */

use serde::de::DeserializeOwned;

/// Byte range of the first balanced `{...}` region in `text`
pub fn find_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + c.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parse the first JSON object in `text` as `T`
pub fn parse_embedded_json<T: DeserializeOwned>(text: &str) -> Option<T> {
    let candidate = find_json_object(text)?;
    match serde_json::from_str(candidate) {
        Ok(value) => Some(value),
        Err(e) => {
            log::debug!("Embedded JSON did not parse: {}", e);
            None
        }
    }
}
