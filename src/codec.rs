//! Body codec for records embedded in issue bodies.
//!
//! A record body is free-form markdown with one JSON data segment fenced
//! between two literal guard lines:
//!
//! ~~~text
//! optional prose
//! <!--- issue-db-start -->
//! ```json
//! { "key": "value" }
//! ```
//! <!--- issue-db-end -->
//! optional prose
//! ~~~

use serde_json::Value;

use crate::error::{IssueDbError, Result};

pub const DEFAULT_GUARD_START: &str = "<!--- issue-db-start -->";
pub const DEFAULT_GUARD_END: &str = "<!--- issue-db-end -->";

const FENCE: &str = "```";

/// The pair of sentinel lines delimiting the data segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guards {
    pub start: String,
    pub end: String,
}

impl Guards {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

impl Default for Guards {
    fn default() -> Self {
        Self::new(DEFAULT_GUARD_START, DEFAULT_GUARD_END)
    }
}

/// The three parts of a decoded body.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBody {
    pub text_before: String,
    pub data: Value,
    pub text_after: String,
}

/// Serialize `data` into a body, surrounded by optional prose.
///
/// Empty prose is treated the same as absent prose.
pub fn encode(
    data: &Value,
    text_before: Option<&str>,
    text_after: Option<&str>,
    guards: &Guards,
) -> Result<String> {
    let json = serde_json::to_string_pretty(data)?;

    let mut body = String::new();
    if let Some(before) = text_before.filter(|t| !t.is_empty()) {
        body.push_str(before);
        body.push('\n');
    }
    body.push_str(&guards.start);
    body.push('\n');
    body.push_str(FENCE);
    body.push_str("json\n");
    body.push_str(&json);
    body.push('\n');
    body.push_str(FENCE);
    body.push('\n');
    body.push_str(&guards.end);
    body.push('\n');
    if let Some(after) = text_after.filter(|t| !t.is_empty()) {
        body.push_str(after);
        body.push('\n');
    }

    Ok(body)
}

/// Split a body into prose and data.
///
/// Guards must match whole lines exactly. The end guard is searched for only
/// after the start guard.
pub fn decode(text: &str, guards: &Guards) -> Result<DecodedBody> {
    let lines: Vec<&str> = text.lines().collect();

    let start = lines
        .iter()
        .position(|line| *line == guards.start)
        .ok_or_else(|| {
            IssueDbError::MalformedBody(format!("start guard '{}' not found", guards.start))
        })?;

    let end = lines[start + 1..]
        .iter()
        .position(|line| *line == guards.end)
        .map(|offset| start + 1 + offset)
        .ok_or_else(|| {
            IssueDbError::MalformedBody(format!("end guard '{}' not found", guards.end))
        })?;

    let mut segment = &lines[start + 1..end];
    if segment.first().is_some_and(|line| line.contains(FENCE)) {
        segment = &segment[1..];
    }
    if segment.last().is_some_and(|line| line.contains(FENCE)) {
        segment = &segment[..segment.len() - 1];
    }

    let data = serde_json::from_str(&segment.join("\n"))
        .map_err(|source| IssueDbError::DataParse { source })?;

    Ok(DecodedBody {
        text_before: lines[..start].join("\n"),
        data,
        text_after: lines[end + 1..].join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_wire_format() {
        let body = encode(
            &json!({"zebra": 1, "apple": [true, null]}),
            Some("Some notes"),
            Some("Footer"),
            &Guards::default(),
        )
        .unwrap();

        let expected = "Some notes\n\
<!--- issue-db-start -->\n\
```json\n\
{\n  \"zebra\": 1,\n  \"apple\": [\n    true,\n    null\n  ]\n}\n\
```\n\
<!--- issue-db-end -->\n\
Footer\n";
        assert_eq!(body, expected);
    }

    #[test]
    fn test_encode_without_prose_starts_with_guard() {
        let body = encode(&json!("x"), None, Some(""), &Guards::default()).unwrap();
        assert_eq!(
            body,
            "<!--- issue-db-start -->\n```json\n\"x\"\n```\n<!--- issue-db-end -->\n"
        );
    }

    #[test]
    fn test_roundtrip_preserves_prose() {
        let guards = Guards::default();
        let cases = [
            ("", ""),
            ("intro", ""),
            ("", "outro"),
            ("multi\nline\n\nprose", "trailing newline\n"),
            ("\n", "# Heading\n\n- item"),
        ];
        let data = json!({"nested": {"list": [1, 2.5, "three"]}, "flag": false});

        for (before, after) in cases {
            let body = encode(&data, Some(before), Some(after), &guards).unwrap();
            let decoded = decode(&body, &guards).unwrap();
            assert_eq!(decoded.text_before, before, "before for {body:?}");
            assert_eq!(decoded.text_after, after, "after for {body:?}");
            assert_eq!(decoded.data, data);
        }
    }

    #[test]
    fn test_roundtrip_scalar_values() {
        let guards = Guards::default();
        for data in [json!(null), json!(42), json!("```"), json!(true), json!([])] {
            let body = encode(&data, None, None, &guards).unwrap();
            assert_eq!(decode(&body, &guards).unwrap().data, data);
        }
    }

    #[test]
    fn test_decode_without_fences() {
        let text = "<!--- issue-db-start -->\n{\"a\": 1}\n<!--- issue-db-end -->";
        let decoded = decode(text, &Guards::default()).unwrap();
        assert_eq!(decoded.data, json!({"a": 1}));
        assert_eq!(decoded.text_before, "");
        assert_eq!(decoded.text_after, "");
    }

    #[test]
    fn test_decode_missing_start_guard() {
        let err = decode("```json\n{}\n```\n<!--- issue-db-end -->", &Guards::default())
            .unwrap_err();
        assert!(matches!(err, IssueDbError::MalformedBody(_)));
    }

    #[test]
    fn test_decode_missing_end_guard() {
        let err = decode("<!--- issue-db-start -->\n{}\n", &Guards::default()).unwrap_err();
        assert!(matches!(err, IssueDbError::MalformedBody(_)));
    }

    #[test]
    fn test_decode_end_guard_before_start_is_ignored() {
        let text = "<!--- issue-db-end -->\n<!--- issue-db-start -->\n{}\n";
        let err = decode(text, &Guards::default()).unwrap_err();
        assert!(matches!(err, IssueDbError::MalformedBody(_)));
    }

    #[test]
    fn test_decode_guard_must_match_whole_line() {
        let text = "  <!--- issue-db-start -->\n{}\n<!--- issue-db-end -->";
        let err = decode(text, &Guards::default()).unwrap_err();
        assert!(matches!(err, IssueDbError::MalformedBody(_)));
    }

    #[test]
    fn test_decode_invalid_json() {
        let text = "<!--- issue-db-start -->\n```json\n{not json}\n```\n<!--- issue-db-end -->";
        let err = decode(text, &Guards::default()).unwrap_err();
        assert!(matches!(err, IssueDbError::DataParse { .. }));
    }

    #[test]
    fn test_custom_guards() {
        let guards = Guards::new("<!-- begin -->", "<!-- end -->");
        let body = encode(&json!({"k": "v"}), Some("top"), None, &guards).unwrap();
        assert!(decode(&body, &Guards::default()).is_err());
        assert_eq!(decode(&body, &guards).unwrap().data, json!({"k": "v"}));
    }
}
