use serde_json::Value;

/// Payload value that ends the stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// JSON pointer to the content fragment of a chat-completion chunk.
const CONTENT_POINTER: &str = "/choices/0/delta/content";

/// Interpretation of one `data: ` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// The `[DONE]` sentinel.
    Terminal,
    /// Non-empty `choices[0].delta.content`.
    Delta(String),
    /// Valid JSON carrying no content (role announcement, finish chunk, ...).
    Empty,
    /// Not parseable as JSON; possibly the first half of a split object.
    Malformed,
}

/// Classify a trimmed payload string.
///
/// Wire: `{"choices":[{"delta":{"content":"It "}}]}` → `Delta("It ")`
pub fn parse_payload(payload: &str) -> Payload {
    if payload == DONE_SENTINEL {
        return Payload::Terminal;
    }

    let value: Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(_) => return Payload::Malformed,
    };

    match value.pointer(CONTENT_POINTER).and_then(Value::as_str) {
        Some(content) if !content.is_empty() => Payload::Delta(content.to_string()),
        _ => Payload::Empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_terminal() {
        assert_eq!(parse_payload("[DONE]"), Payload::Terminal);
    }

    #[test]
    fn sentinel_match_is_exact() {
        assert_eq!(parse_payload("[done]"), Payload::Malformed);
        assert_eq!(parse_payload("\"[DONE]\""), Payload::Empty);
    }

    #[test]
    fn content_delta_is_extracted() {
        let p = r#"{"id":"c1","choices":[{"index":0,"delta":{"content":"It "}}]}"#;
        assert_eq!(parse_payload(p), Payload::Delta("It ".to_string()));
    }

    #[test]
    fn role_announcement_is_empty() {
        let p = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_payload(p), Payload::Empty);
    }

    #[test]
    fn empty_or_non_string_content_is_empty() {
        assert_eq!(
            parse_payload(r#"{"choices":[{"delta":{"content":""}}]}"#),
            Payload::Empty
        );
        assert_eq!(
            parse_payload(r#"{"choices":[{"delta":{"content":42}}]}"#),
            Payload::Empty
        );
        assert_eq!(
            parse_payload(r#"{"choices":[{"delta":{"content":null}}]}"#),
            Payload::Empty
        );
    }

    #[test]
    fn only_first_choice_is_read() {
        let p = r#"{"choices":[{"delta":{}},{"delta":{"content":"second"}}]}"#;
        assert_eq!(parse_payload(p), Payload::Empty);
    }

    #[test]
    fn unexpected_shapes_are_empty() {
        assert_eq!(parse_payload(r#"{"choices":[]}"#), Payload::Empty);
        assert_eq!(parse_payload(r#"{"usage":{"total_tokens":9}}"#), Payload::Empty);
        assert_eq!(parse_payload("17"), Payload::Empty);
    }

    #[test]
    fn truncated_json_is_malformed() {
        assert_eq!(
            parse_payload(r#"{"choices":[{"delta":{"con"#),
            Payload::Malformed
        );
        assert_eq!(parse_payload(""), Payload::Malformed);
    }
}
