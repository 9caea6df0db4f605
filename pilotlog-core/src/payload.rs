//! Tagged payloads for the append and finalize operations.
//!
//! Pilots send log content either as a JSON array of lines or as a bare
//! string, and frequently as JSON-encoded text wrapped inside another JSON
//! document. Everything is parsed into [`LogMessage`] / [`FinalizePayload`]
//! once, at the boundary, so storage code never re-inspects raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// Content of a single append call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogMessage {
    /// Each element becomes one newline-terminated line.
    Lines(Vec<String>),
    /// Appended verbatim, no terminator added.
    Text(String),
}

impl LogMessage {
    /// Interpret raw text. Text that decodes to a non-empty JSON array of
    /// strings is the array form; text that decodes to a JSON string is that
    /// string; anything else is kept verbatim.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Array(items)) if !items.is_empty() && items.iter().all(Value::is_string) => {
                Self::lines_from(items)
            }
            Ok(Value::String(text)) => Ok(LogMessage::Text(text)),
            _ => Ok(LogMessage::Text(raw.to_string())),
        }
    }

    /// Interpret an already-decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Array(items) => Self::lines_from(items),
            Value::String(text) => Self::parse(&text),
            other => Err(ValidationError::InvalidPayload {
                reason: format!("message must be a string or an array of strings, got {}", json_kind(&other)),
            }),
        }
    }

    fn lines_from(items: Vec<Value>) -> Result<Self, ValidationError> {
        items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| match item {
                Value::String(line) => Ok(line),
                other => Err(ValidationError::InvalidPayload {
                    reason: format!("message line {idx} is {}, expected a string", json_kind(&other)),
                }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(LogMessage::Lines)
    }

    /// Bytes that one append call adds to a record.
    pub fn render(&self) -> String {
        match self {
            LogMessage::Lines(lines) => {
                let capacity = lines.iter().map(|l| l.len() + 1).sum();
                let mut out = String::with_capacity(capacity);
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
                out
            }
            LogMessage::Text(text) => text.clone(),
        }
    }

    /// Logical lines carried by this message.
    pub fn lines(&self) -> Vec<&str> {
        match self {
            LogMessage::Lines(lines) => lines.iter().map(String::as_str).collect(),
            LogMessage::Text(text) => text.lines().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            LogMessage::Lines(lines) => lines.is_empty(),
            LogMessage::Text(text) => text.is_empty(),
        }
    }
}

/// Informational data attached to a finalize call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct FinalizePayload {
    /// Exit status of the pilot script. Opaque to storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ret_code: Option<i64>,
}

impl FinalizePayload {
    /// Interpret a decoded JSON value: an object, a JSON-encoded string of an
    /// object, or null for an empty payload.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::String(text) => {
                let inner: Value = serde_json::from_str(&text).map_err(|e| {
                    ValidationError::InvalidPayload {
                        reason: format!("finalize payload is not JSON: {e}"),
                    }
                })?;
                match inner {
                    Value::String(_) => Err(ValidationError::InvalidPayload {
                        reason: "finalize payload must be an object".to_string(),
                    }),
                    other => Self::from_value(other),
                }
            }
            Value::Object(_) => {
                serde_json::from_value(value).map_err(|e| ValidationError::InvalidPayload {
                    reason: format!("invalid finalize payload: {e}"),
                })
            }
            other => Err(ValidationError::InvalidPayload {
                reason: format!("finalize payload must be an object, got {}", json_kind(&other)),
            }),
        }
    }

    /// Return code reported in logs. Missing means 0.
    pub fn ret_code_or_default(&self) -> i64 {
        self.ret_code.unwrap_or(0)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_value_becomes_lines() {
        let msg = LogMessage::from_value(json!(["line1", "line2"])).unwrap();
        assert_eq!(
            msg,
            LogMessage::Lines(vec!["line1".to_string(), "line2".to_string()])
        );
        assert_eq!(msg.render(), "line1\nline2\n");
    }

    #[test]
    fn test_encoded_array_string_becomes_lines() {
        let msg = LogMessage::from_value(json!("[\"a\", \"b\"]")).unwrap();
        assert_eq!(msg.render(), "a\nb\n");
    }

    #[test]
    fn test_encoded_non_string_array_is_verbatim() {
        let msg = LogMessage::from_value(json!("[1, 2]")).unwrap();
        assert_eq!(msg, LogMessage::Text("[1, 2]".to_string()));

        let msg = LogMessage::from_value(json!("[\"ok\", 3]")).unwrap();
        assert_eq!(msg.render(), "[\"ok\", 3]");
    }

    #[test]
    fn test_encoded_empty_array_is_verbatim() {
        let msg = LogMessage::from_value(json!("[]")).unwrap();
        assert!(!msg.is_empty());
        assert_eq!(msg.render(), "[]");
    }

    #[test]
    fn test_bare_string_is_verbatim() {
        let msg = LogMessage::from_value(json!("partial line without newline")).unwrap();
        assert_eq!(msg.render(), "partial line without newline");
    }

    #[test]
    fn test_encoded_string_is_unwrapped() {
        let msg = LogMessage::parse("\"hello\\n\"").unwrap();
        assert_eq!(msg, LogMessage::Text("hello\n".to_string()));
    }

    #[test]
    fn test_non_string_element_rejected() {
        let err = LogMessage::from_value(json!(["ok", 3])).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPayload { .. }));
    }

    #[test]
    fn test_object_message_rejected() {
        assert!(LogMessage::from_value(json!({"line": "x"})).is_err());
    }

    #[test]
    fn test_empty_array_renders_nothing() {
        let msg = LogMessage::from_value(json!([])).unwrap();
        assert!(msg.is_empty());
        assert_eq!(msg.render(), "");
    }

    #[test]
    fn test_finalize_object_and_encoded_object() {
        let p = FinalizePayload::from_value(json!({"retCode": 0})).unwrap();
        assert_eq!(p.ret_code, Some(0));

        let p = FinalizePayload::from_value(json!("{\"retCode\": 2}")).unwrap();
        assert_eq!(p.ret_code, Some(2));
    }

    #[test]
    fn test_finalize_missing_ret_code_defaults() {
        let p = FinalizePayload::from_value(json!({})).unwrap();
        assert_eq!(p.ret_code, None);
        assert_eq!(p.ret_code_or_default(), 0);

        let p = FinalizePayload::from_value(Value::Null).unwrap();
        assert_eq!(p, FinalizePayload::default());
    }

    #[test]
    fn test_finalize_rejects_non_object() {
        assert!(FinalizePayload::from_value(json!([1])).is_err());
        assert!(FinalizePayload::from_value(json!("not json")).is_err());
        assert!(FinalizePayload::from_value(json!({"retCode": "zero"})).is_err());
    }
}
