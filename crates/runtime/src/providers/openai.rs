//! OpenAI-compatible Chat Completions backend.

use crate::model::{
    Backend, Message, ModelError, ModelRequest, ModelResponse, Role, ToolCall, ToolSpec, Usage,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ApiToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: ApiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunctionCall {
    name: String,
    /// Arguments as a JSON-encoded string.
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: ApiFunction,
}

#[derive(Debug, Serialize)]
struct ApiFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

fn function_type() -> String {
    "function".to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an OpenAI backend.
#[derive(Debug, Clone)]
pub struct OpenAiBackendBuilder {
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: Option<u32>,
}

impl OpenAiBackendBuilder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: None,
        }
    }

    /// Point the backend at any OpenAI-compatible endpoint.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn build(self) -> OpenAiBackend {
        OpenAiBackend {
            client: reqwest::Client::new(),
            api_key: self.api_key,
            model: self.model,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            max_tokens: self.max_tokens,
        }
    }
}

/// OpenAI Chat Completions backend.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: Option<u32>,
}

impl OpenAiBackend {
    pub fn builder(api_key: impl Into<String>, model: impl Into<String>) -> OpenAiBackendBuilder {
        OpenAiBackendBuilder::new(api_key, model)
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn role_to_api(role: Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }

    fn message_to_api(msg: &Message) -> ApiMessage {
        let tool_calls: Vec<ApiToolCall> = msg
            .tool_calls
            .iter()
            .map(|call| ApiToolCall {
                id: call.id.clone(),
                call_type: function_type(),
                function: ApiFunctionCall {
                    name: call.name.clone(),
                    arguments: call.input.to_string(),
                },
            })
            .collect();

        // Assistant turns that only request tools carry no text.
        let content = if msg.content.is_empty() && !tool_calls.is_empty() {
            None
        } else {
            Some(msg.content.clone())
        };

        ApiMessage {
            role: Self::role_to_api(msg.role),
            content,
            tool_calls,
            tool_call_id: msg.tool_call_id.clone(),
            name: msg.name.clone(),
        }
    }

    fn tool_to_api(spec: &ToolSpec) -> ApiTool {
        ApiTool {
            tool_type: "function",
            function: ApiFunction {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.schema.clone(),
            },
        }
    }

    fn parse_arguments(raw: &str) -> Result<Value, ModelError> {
        if raw.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_str(raw)
            .map_err(|e| ModelError::InvalidResponse(format!("tool arguments: {e}")))
    }

    fn response_to_message(msg: ApiResponseMessage) -> Result<Message, ModelError> {
        let mut message = Message::assistant(msg.content.unwrap_or_default());
        for call in msg.tool_calls.unwrap_or_default() {
            message = message.with_tool_call(ToolCall {
                id: call.id,
                input: Self::parse_arguments(&call.function.arguments)?,
                name: call.function.name,
            });
        }
        Ok(message)
    }
}

impl std::fmt::Display for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "openai({}, {})", self.model, self.base_url)
    }
}

impl Backend for OpenAiBackend {
    async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        let messages: Vec<ApiMessage> = request.messages.iter().map(Self::message_to_api).collect();
        let tools: Vec<ApiTool> = request.tools.iter().map(Self::tool_to_api).collect();
        let tool_choice = (!tools.is_empty()).then_some("auto");

        let api_request = ApiRequest {
            model: self.model.clone(),
            messages,
            tools,
            tool_choice,
            max_tokens: self.max_tokens,
        };

        debug!(
            model = %self.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse("no choices in response".into()))?;

        let message = Self::response_to_message(choice.message)?;
        let usage = api_response
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(ModelResponse { message, usage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backend_display() {
        let backend = OpenAiBackend::builder("sk-test", "gpt-4o")
            .base_url("http://localhost:8080/v1/")
            .build();
        assert_eq!(backend.to_string(), "openai(gpt-4o, http://localhost:8080/v1)");
        assert_eq!(backend.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn tool_result_message_wire_shape() {
        let msg = Message::tool_result("call_1", "get_weather", "Sunny, 24C");
        let value = serde_json::to_value(OpenAiBackend::message_to_api(&msg)).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "tool",
                "content": "Sunny, 24C",
                "tool_call_id": "call_1",
                "name": "get_weather"
            })
        );
    }

    #[test]
    fn assistant_tool_call_wire_shape() {
        let msg = Message::assistant("").with_tool_call(ToolCall {
            id: "call_1".into(),
            name: "get_weather".into(),
            input: json!({"city": "Tokyo"}),
        });
        let value = serde_json::to_value(OpenAiBackend::message_to_api(&msg)).unwrap();
        assert_eq!(value["role"], "assistant");
        assert!(value.get("content").is_none());
        assert_eq!(value["tool_calls"][0]["type"], "function");
        assert_eq!(value["tool_calls"][0]["function"]["name"], "get_weather");
        assert_eq!(
            value["tool_calls"][0]["function"]["arguments"],
            r#"{"city":"Tokyo"}"#
        );
    }

    #[test]
    fn tool_spec_wire_shape() {
        let spec = ToolSpec {
            name: "get_weather".into(),
            description: "Weather lookup".into(),
            schema: json!({"type": "object"}),
        };
        let value = serde_json::to_value(OpenAiBackend::tool_to_api(&spec)).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "function",
                "function": {
                    "name": "get_weather",
                    "description": "Weather lookup",
                    "parameters": {"type": "object"}
                }
            })
        );
    }

    #[test]
    fn response_with_tool_call() {
        let raw = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "get_weather", "arguments": "{\"city\":\"Tokyo\"}"}
                    }]
                }
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        });
        let response: ApiResponse = serde_json::from_value(raw).unwrap();
        let choice = response.choices.into_iter().next().unwrap();
        let message = OpenAiBackend::response_to_message(choice.message).unwrap();

        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, "");
        let call = message.requested_tool().unwrap();
        assert_eq!(call.id, "call_9");
        assert_eq!(call.input, json!({"city": "Tokyo"}));
    }

    #[test]
    fn empty_arguments_parse_as_object() {
        assert_eq!(OpenAiBackend::parse_arguments("").unwrap(), json!({}));
        assert!(matches!(
            OpenAiBackend::parse_arguments("{not json"),
            Err(ModelError::InvalidResponse(_))
        ));
    }
}
