//! Response parser: locate the JSON object inside a free-form model reply.
//!
//! Vision models are told to answer with bare JSON, yet regularly wrap it in
//! prose ("Here is the extracted information: …") or a ```json fence. The
//! extraction rule is deliberately simple: take everything from the first `{`
//! to the last `}` and decode it strictly.
//!
//! ## Known limitation
//!
//! Braces inside surrounding prose widen the slice (e.g. a trailing
//! "note: {see above}" after the payload), which then fails to decode as
//! [`ParseError::MalformedJson`]. Callers treat that as "no usable answer".

use crate::error::ParseError;
use crate::verify::model::ParsedAnalysis;
use serde_json::Value;

/// Extract and decode the JSON object embedded in `text`.
///
/// No schema validation happens here; shape checks belong to the matcher.
pub fn extract_json(text: &str) -> Result<ParsedAnalysis, ParseError> {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(ParseError::NoJsonFound);
    };
    if start > end {
        return Err(ParseError::NoJsonFound);
    }

    let fragment = &text[start..=end];
    match serde_json::from_str::<Value>(fragment) {
        Ok(Value::Object(object)) => Ok(ParsedAnalysis::new(object)),
        // A slice that starts with '{' can only decode to an object.
        Ok(other) => Err(ParseError::MalformedJson {
            fragment: fragment.to_string(),
            reason: format!("expected an object, got {other}"),
        }),
        Err(e) => Err(ParseError::MalformedJson {
            fragment: fragment.to_string(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_object_surrounded_by_prose() {
        let parsed = extract_json("blah {\"a\":1} blah").unwrap();
        assert_eq!(Value::Object(parsed.into_object()), json!({"a": 1}));
    }

    #[test]
    fn extracts_from_markdown_fence() {
        let text = "```json\n{\"Publicity\": \"False\", \"destinataires\": []}\n```";
        let parsed = extract_json(text).unwrap();
        assert_eq!(parsed.publicity(), Some(&json!("False")));
    }

    #[test]
    fn nested_objects_are_kept_whole() {
        let text = r#"Result: {"destinataires": [{"organisme_destinataire": "ACME"}]} done"#;
        let parsed = extract_json(text).unwrap();
        assert!(parsed.as_object().contains_key("destinataires"));
    }

    #[test]
    fn no_braces_is_no_json() {
        assert_eq!(
            extract_json("I cannot read this document."),
            Err(ParseError::NoJsonFound)
        );
        assert_eq!(extract_json(""), Err(ParseError::NoJsonFound));
    }

    #[test]
    fn closing_before_opening_is_no_json() {
        assert_eq!(extract_json("} nothing {"), Err(ParseError::NoJsonFound));
        assert_eq!(extract_json("only { open"), Err(ParseError::NoJsonFound));
    }

    #[test]
    fn invalid_body_is_malformed() {
        match extract_json("{not json}") {
            Err(ParseError::MalformedJson { fragment, .. }) => assert_eq!(fragment, "{not json}"),
            other => panic!("expected MalformedJson, got {other:?}"),
        }
    }

    #[test]
    fn truncated_reply_is_malformed() {
        let text = r#"{"Publicity": "False", "destinataires": [{"organisme_destinataire": "ACME"}"#;
        assert!(matches!(
            extract_json(text),
            Err(ParseError::MalformedJson { .. })
        ));
    }

    #[test]
    fn stray_brace_in_trailing_prose_widens_slice() {
        let text = r#"{"Publicity": "True"} note: {see above}"#;
        assert!(matches!(
            extract_json(text),
            Err(ParseError::MalformedJson { .. })
        ));
    }

    #[test]
    fn non_ascii_prefix_is_sliced_on_char_boundaries() {
        let parsed = extract_json("Réponse : {\"Publicity\": true} ✓").unwrap();
        assert_eq!(parsed.coerce_publicity(), Ok(true));
    }
}
