use serde_json::{Map, Value};

/// Result of recovering structured data from model text.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Structured(Map<String, Value>),
    Raw(String),
}

impl Extracted {
    pub fn is_structured(&self) -> bool {
        matches!(self, Extracted::Structured(_))
    }
}

/// Parses the widest `{ ... }` span of `raw` as a JSON object, falling back to
/// the raw text.
///
/// The span runs from the first `{` to the last `}`, so a response holding
/// several separate objects is spliced into one span and usually falls back
/// to `Raw`. Callers rely on that fallback shape, so it is kept as is.
pub fn extract(raw: &str) -> Extracted {
    match json_span(raw) {
        Some(span) => match serde_json::from_str::<Map<String, Value>>(span) {
            Ok(map) => Extracted::Structured(map),
            Err(e) => {
                tracing::debug!("Model output is not a JSON object: {}", e);
                Extracted::Raw(raw.to_string())
            }
        },
        None => Extracted::Raw(raw.to_string()),
    }
}

fn json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    // Both braces are single-byte, so the slice is on char boundaries
    (start < end).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_extract_json_from_markdown() {
        let input = r#"Here's the analysis:
```json
{"parties": ["Acme", "Globex"]}
```
"#;
        assert_eq!(
            extract(input),
            Extracted::Structured(as_map(json!({"parties": ["Acme", "Globex"]})))
        );
    }

    #[test]
    fn test_extract_raw_json() {
        let input = r#"{"parties": ["Party A","Party B"], "value": 50000}"#;
        let expected = as_map(json!({"parties": ["Party A", "Party B"], "value": 50000}));
        assert_eq!(extract(input), Extracted::Structured(expected));
    }

    #[test]
    fn test_extract_with_surrounding_prose() {
        let object = json!({
            "risk_score": 7,
            "areas": {"financial": {"level": "High"}},
            "notes": "braces in strings } are fine {"
        });
        let input = format!("prefix text {} suffix text", object);
        assert_eq!(extract(&input), Extracted::Structured(as_map(object)));
    }

    #[test]
    fn test_fallback_is_total() {
        for input in [
            "",
            "no json here",
            "{",
            "}",
            "} backwards {",
            "{ not: valid json }",
            "{\"unterminated\": \"str}",
            "[1, 2, 3]",
            "Haftung für Schäden {ungültig}",
        ] {
            assert_eq!(extract(input), Extracted::Raw(input.to_string()), "input {:?}", input);
        }
    }

    #[test]
    fn test_multiple_objects_splice_into_fallback() {
        let input = r#"First: {"a": 1} and then {"b": 2}"#;
        // Widest span is `{"a": 1} and then {"b": 2}`, which is not JSON
        assert_eq!(extract(input), Extracted::Raw(input.to_string()));
    }

    #[test]
    fn test_nested_object_uses_outer_braces() {
        let input = r#"Result {"outer": {"inner": true}} done"#;
        assert!(extract(input).is_structured());
    }
}
