//! Pulling a JSON object out of free-form model output.

use serde_json::Value;

/// Find and parse the JSON object in a model response.
///
/// Tries a ```json fence, then a bare fence, then the first balanced
/// `{...}` span. Returns `None` if nothing parses to an object.
pub fn extract_json(response: &str) -> Option<Value> {
    let candidates = [
        fenced(response, "```json"),
        fenced(response, "```"),
        first_object(response),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(|candidate| serde_json::from_str::<Value>(candidate.trim()).ok())
        .filter(Value::is_object)
}

fn fenced<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let start = text.find(opener)? + opener.len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(&rest[..end])
}

fn first_object(text: &str) -> Option<&str> {
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
                    return Some(&text[start..start + offset + 1]);
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
    fn test_json_fence() {
        let text = "Here you go:\n```json\n{\"category\": \"sales\"}\n```\nDone.";
        assert_eq!(extract_json(text).unwrap()["category"], "sales");
    }

    #[test]
    fn test_bare_fence() {
        let text = "```\n{\"confidence\": 0.8}\n```";
        assert_eq!(extract_json(text).unwrap()["confidence"], 0.8);
    }

    #[test]
    fn test_balanced_object_with_braces_in_strings() {
        let text = "Result: {\"title\": \"Use {braces}\", \"nested\": {\"a\": 1}} trailing }";
        let value = extract_json(text).unwrap();
        assert_eq!(value["title"], "Use {braces}");
        assert_eq!(value["nested"]["a"], 1);
    }

    #[test]
    fn test_no_object() {
        assert!(extract_json("no json here").is_none());
        assert!(extract_json("[1, 2, 3]").is_none());
        assert!(extract_json("{\"unterminated\": ").is_none());
    }
}
