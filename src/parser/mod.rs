use crate::error::ExtractError;
use serde_json::Value;

/// Best-effort parse of a model response into JSON.
///
/// Tries the whole string first, then the greedy span from the first `{` to
/// the last `}`, then the first balanced-brace span. Model output routinely
/// wraps the object in prose or code fences; both fallbacks cut through that.
pub fn extract_json(text: &str) -> Result<Value, ExtractError> {
    let trimmed = text.trim();

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => {
            if !trimmed.contains('{') {
                return Err(ExtractError::Json(e));
            }
        }
    }

    // Greedy: first '{' to last '}'
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                return Ok(value);
            }
        }
    }

    // Balanced scan: handles trailing junk containing stray braces
    if let Some(span) = first_balanced_object(text) {
        if let Ok(value) = serde_json::from_str::<Value>(span) {
            return Ok(value);
        }
    }

    Err(ExtractError::NoJsonObject)
}

fn first_balanced_object(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + i + c.len_utf8()]);
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
    use serde_json::json;

    #[test]
    fn test_direct_parse() {
        let value = extract_json(r#"{"score": 8, "summary": "fine"}"#).unwrap();
        assert_eq!(value["score"], json!(8));
    }

    #[test]
    fn test_embedded_object() {
        let value = extract_json(r#"prefix {"a": 1} suffix"#).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_markdown_fenced() {
        let text = "Here you go:\n```json\n{\"score\": 7}\n```\n";
        let value = extract_json(text).unwrap();
        assert_eq!(value["score"], json!(7));
    }

    #[test]
    fn test_nested_object_with_trailing_brace() {
        let text = r#"note {"outer": {"inner": 2}} and a stray }"#;
        let value = extract_json(text).unwrap();
        assert_eq!(value["outer"]["inner"], json!(2));
    }

    #[test]
    fn test_brace_in_string_value() {
        let text = r#"x {"msg": "a } inside"} y"#;
        let value = extract_json(text).unwrap();
        assert_eq!(value["msg"], json!("a } inside"));
    }

    #[test]
    fn test_no_braces_fails() {
        assert!(extract_json("no json here").is_err());
    }

    #[test]
    fn test_unbalanced_fails() {
        assert!(extract_json(r#"{"a": 1"#).is_err());
    }
}
