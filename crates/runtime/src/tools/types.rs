//! Tool argument and result shaping.

use super::ToolError;
use serde_json::{Map, Value};

/// Arguments for an MCP `tools/call` request.
///
/// MCP only accepts a JSON object (or nothing) as arguments, so anything
/// else the model produced is rejected before it reaches the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolArguments(pub Option<Map<String, Value>>);

impl TryFrom<Value> for ToolArguments {
    type Error = ToolError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(Self(None)),
            Value::Object(map) => Ok(Self(Some(map))),
            other => Err(ToolError::InvalidInput(format!(
                "expected a JSON object, got {other}"
            ))),
        }
    }
}

/// Render a tool result into the text of a tool message.
///
/// Content made only of text blocks is joined line by line; anything else
/// (images, resources, bare values) is passed through as compact JSON.
pub fn render_output(output: &Value) -> String {
    match output {
        Value::String(text) => text.clone(),
        Value::Array(blocks) => {
            let texts: Option<Vec<&str>> = blocks
                .iter()
                .map(|block| match block.get("type").and_then(Value::as_str) {
                    Some("text") => block.get("text").and_then(Value::as_str),
                    _ => None,
                })
                .collect();
            match texts {
                Some(texts) => texts.join("\n"),
                None => output.to_string(),
            }
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn arguments_accept_objects_and_null() {
        let args = ToolArguments::try_from(json!({"city": "Tokyo"})).unwrap();
        assert_eq!(args.0.unwrap()["city"], "Tokyo");
        assert_eq!(ToolArguments::try_from(Value::Null).unwrap(), ToolArguments(None));
    }

    #[test]
    fn arguments_reject_scalars() {
        let err = ToolArguments::try_from(json!("Tokyo")).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[test]
    fn render_joins_text_blocks() {
        let content = json!([
            {"type": "text", "text": "line one"},
            {"type": "text", "text": "line two"}
        ]);
        assert_eq!(render_output(&content), "line one\nline two");
    }

    #[test]
    fn render_keeps_non_text_as_json() {
        let content = json!([{"type": "image", "data": "AAAA", "mimeType": "image/png"}]);
        assert_eq!(render_output(&content), content.to_string());
        assert_eq!(render_output(&json!({"temp": 21})), r#"{"temp":21}"#);
    }
}
