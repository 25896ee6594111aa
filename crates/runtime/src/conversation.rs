//! A single conversation turn.
//!
//! The step never mutates the caller's history. It works on a copy and
//! hands the extended history back in the [`Turn`], so the caller decides
//! whether to commit it.

use crate::model::{Backend, Message, ModelRequest, ToolCall};
use crate::tools::{ToolHost, render_output};
use crate::Result;
use tracing::debug;

/// Outcome of one user turn.
#[derive(Debug, Clone)]
pub struct Turn {
    /// Text of the final assistant reply.
    pub reply: String,
    /// History including everything this turn appended.
    pub history: Vec<Message>,
    /// The tool call made during this turn, if any.
    pub tool_call: Option<ToolCall>,
    /// Number of model invocations (1 or 2).
    pub model_calls: usize,
}

/// Run one turn: prompt the model, run at most one requested tool, and
/// re-prompt with the tool result when a tool was used.
///
/// Any collaborator failure aborts the turn; nothing is retried.
pub async fn step<B, T>(backend: &B, tools: &T, history: &[Message], input: &str) -> Result<Turn>
where
    B: Backend,
    T: ToolHost,
{
    let mut messages = history.to_vec();
    messages.push(Message::user(input));

    let specs = tools.list_tools().await?;
    debug!(tools = specs.len(), "prompting model");

    let first = backend
        .call(ModelRequest {
            messages: &messages,
            tools: &specs,
        })
        .await?;
    debug!(
        input_tokens = first.usage.input_tokens,
        output_tokens = first.usage.output_tokens,
        "model replied"
    );

    let mut reply = first.message;
    let Some(call) = reply.requested_tool().cloned() else {
        let text = reply.content.clone();
        messages.push(reply);
        return Ok(Turn {
            reply: text,
            history: messages,
            tool_call: None,
            model_calls: 1,
        });
    };

    if reply.tool_calls.len() > 1 {
        debug!(
            requested = reply.tool_calls.len(),
            "model requested several tools; only the first is run"
        );
    }
    // Only the honoured call stays on the stored message so every call in
    // history has exactly one matching tool result.
    reply.tool_calls.truncate(1);
    messages.push(reply);

    let output = tools.execute(&call).await?;
    messages.push(Message::tool_result(
        call.id.clone(),
        call.name.clone(),
        render_output(&output),
    ));

    // No tools on the follow-up, so the model must answer in text.
    let second = backend
        .call(ModelRequest {
            messages: &messages,
            tools: &[],
        })
        .await?;

    // A tool-less request can still come back with calls from some
    // compatible servers; they would never be answered, so drop them.
    let mut last = second.message;
    if !last.tool_calls.is_empty() {
        debug!(
            ignored = last.tool_calls.len(),
            "follow-up reply requested tools; ignoring"
        );
        last.tool_calls.clear();
    }
    let text = last.content.clone();
    messages.push(last);

    Ok(Turn {
        reply: text,
        history: messages,
        tool_call: Some(call),
        model_calls: 2,
    })
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted collaborators shared by the runtime tests.

    use crate::model::{
        Backend, Message, ModelError, ModelRequest, ModelResponse, ToolCall, ToolSpec, Usage,
    };
    use crate::tools::{ToolError, ToolHost};
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Backend that replays canned replies and records each request.
    #[derive(Default)]
    pub struct ScriptedBackend {
        replies: Mutex<VecDeque<Message>>,
        pub requests: Mutex<Vec<(Vec<Message>, Vec<ToolSpec>)>>,
    }

    impl ScriptedBackend {
        pub fn new(replies: impl IntoIterator<Item = Message>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                requests: Mutex::default(),
            }
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl Backend for ScriptedBackend {
        async fn call(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
            self.requests
                .lock()
                .unwrap()
                .push((request.messages.to_vec(), request.tools.to_vec()));
            let message = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ModelError::Api("script exhausted".into()))?;
            Ok(ModelResponse {
                message,
                usage: Usage::default(),
            })
        }
    }

    /// Tool host offering a single weather tool.
    #[derive(Default)]
    pub struct WeatherHost {
        pub fail_listing: bool,
        pub executed: Mutex<Vec<ToolCall>>,
    }

    impl WeatherHost {
        pub fn failing() -> Self {
            Self {
                fail_listing: true,
                ..Self::default()
            }
        }
    }

    impl ToolHost for WeatherHost {
        async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError> {
            if self.fail_listing {
                return Err(ToolError::Execution("list tools: connection closed".into()));
            }
            Ok(vec![ToolSpec {
                name: "get_weather".into(),
                description: "Current weather for a city".into(),
                schema: json!({
                    "type": "object",
                    "properties": {"city": {"type": "string"}}
                }),
            }])
        }

        async fn execute(&self, call: &ToolCall) -> Result<Value, ToolError> {
            self.executed.lock().unwrap().push(call.clone());
            if call.name != "get_weather" {
                return Err(ToolError::NotFound(call.name.clone()));
            }
            Ok(json!([{"type": "text", "text": "Sunny, 24C"}]))
        }
    }

    pub fn weather_call(id: &str) -> ToolCall {
        ToolCall {
            id: id.into(),
            name: "get_weather".into(),
            input: json!({"city": "Tokyo"}),
        }
    }
}
