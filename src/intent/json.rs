//! Recover a JSON object from free-form model output.
//!
//! Models wrap JSON in code fences, prefix it with prose, or trail it with
//! commentary. Three strategies are tried in order; the first one that
//! yields a JSON object wins.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use super::literal_regex;

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| literal_regex(r"```(?:json|JSON)?\s*([\s\S]*?)```"));

/// Extract the first JSON object from `text`.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<Value> {
    from_fenced_block(text)
        .or_else(|| from_balanced_braces(text))
        .or_else(|| parse_object(text))
}

fn parse_object(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(candidate.trim())
        .ok()
        .filter(Value::is_object)
}

fn from_fenced_block(text: &str) -> Option<Value> {
    FENCED_BLOCK
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| parse_object(m.as_str()).or_else(|| from_balanced_braces(m.as_str())))
}

/// Try each `{` as a start and cut at its matching `}`, skipping braces
/// inside string literals.
fn from_balanced_braces(text: &str) -> Option<Value> {
    text.char_indices()
        .filter(|(_, c)| *c == '{')
        .find_map(|(start, _)| {
            let end = matching_brace(&text[start..])?;
            parse_object(&text[start..start + end])
        })
}

/// Byte length of the balanced `{…}` prefix of `s`, if it closes.
fn matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
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
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fenced_json() {
        let text = "Sure, here it is:\n```json\n{\"intent\": \"list_projects\"}\n```\nAnything else?";
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["intent"], "list_projects");
    }

    #[test]
    fn test_fenced_without_language() {
        let text = "```\n{\"intent\": \"budget_info\", \"filters\": {}}\n```";
        assert_eq!(extract_json_object(text).unwrap()["intent"], "budget_info");
    }

    #[test]
    fn test_prose_around_object() {
        let text = r#"I think the answer is {"intent": "project_status", "filters": {"project_id": "JAIN-1B"}} based on the text."#;
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["filters"]["project_id"], "JAIN-1B");
    }

    #[test]
    fn test_braces_inside_strings() {
        let text = r#"note {"explanation": "uses } and { chars", "intent": "general_search"} end"#;
        let value = extract_json_object(text).unwrap();
        assert_eq!(value["intent"], "general_search");
        assert_eq!(value["explanation"], "uses } and { chars");
    }

    #[test]
    fn test_skips_unparsable_leading_brace() {
        let text = r#"{not json} then {"intent": "list_projects"}"#;
        assert_eq!(extract_json_object(text).unwrap()["intent"], "list_projects");
    }

    #[test]
    fn test_rejects_non_objects() {
        assert!(extract_json_object("[1, 2, 3]").is_none());
        assert!(extract_json_object("\"list_projects\"").is_none());
        assert!(extract_json_object("I could not work that out.").is_none());
        assert!(extract_json_object("{\"unterminated\": ").is_none());
    }
}
