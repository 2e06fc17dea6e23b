use crate::error::{Error, Result};
use regex_lite::Regex;
use serde_json::Value;
use std::sync::LazyLock;

static TRAILING_COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*([\]}])").unwrap());

/// Drop commas that sit directly (modulo whitespace) before `]` or `}`.
///
/// This is the only repair applied to agent output; the result may still be
/// invalid JSON.
pub fn fix_trailing_commas(raw: &str) -> String {
    TRAILING_COMMA.replace_all(raw, "$1").into_owned()
}

/// Repair then parse one raw agent answer.
pub fn parse_agent_output(raw: &str) -> Result<Value> {
    let fixed = fix_trailing_commas(raw);
    serde_json::from_str(&fixed).map_err(|e| Error::MalformedOutput(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn removes_trailing_commas_in_arrays_and_objects() {
        assert_eq!(fix_trailing_commas(r#"{"a": [1,2,],}"#), r#"{"a": [1,2]}"#);
    }

    #[test]
    fn removes_commas_across_whitespace() {
        let raw = "{\n  \"Praise\": [\n    {\"comment\": \"c\", \"insight\": \"i\"},\n  ],\n}";
        let fixed = fix_trailing_commas(raw);
        assert_eq!(fixed, "{\n  \"Praise\": [\n    {\"comment\": \"c\", \"insight\": \"i\"}]}");
        assert!(serde_json::from_str::<Value>(&fixed).is_ok());
    }

    #[test]
    fn leaves_clean_input_unchanged() {
        let raw = r#"{"Requests": [{"comment": "a, b", "insight": "x"}], "Other": []}"#;
        assert_eq!(fix_trailing_commas(raw), raw);
    }

    #[test]
    fn parses_repaired_output() {
        let parsed = parse_agent_output(r#"{"Praise": [{"comment": "c1", "insight": "i1"},],}"#)
            .expect("repairable");
        assert_eq!(parsed, json!({"Praise": [{"comment": "c1", "insight": "i1"}]}));
    }

    #[test]
    fn reports_malformed_output() {
        let err = parse_agent_output("Here is the final answer: {\"Praise\": [").unwrap_err();
        assert!(matches!(err, Error::MalformedOutput(_)));
    }
}
