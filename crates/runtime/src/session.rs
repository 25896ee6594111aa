//! Session management.

use crate::conversation::{self, Turn};
use crate::model::{Backend, Message, Role};
use crate::tools::ToolHost;
use crate::{Error, Result};
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

/// Unique identifier for a chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A conversation session.
///
/// Owns the model backend, the tool host connection, and the committed
/// message history. History only grows, and only when a turn succeeds.
pub struct Session<B, T> {
    pub id: SessionId,
    backend: B,
    tools: T,
    messages: Vec<Message>,
}

impl<B: Backend, T: ToolHost> Session<B, T> {
    /// Create a new session seeded with the system instruction.
    pub fn new(backend: B, tools: T, system: impl Into<String>) -> Self {
        let id = SessionId::new();
        info!(session = %id, "session started");
        Self {
            id,
            backend,
            tools,
            messages: vec![Message::system(system)],
        }
    }

    /// Committed history, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Send a user message and get the assistant's reply.
    ///
    /// On failure the history is left exactly as it was before the call.
    pub async fn chat(&mut self, user_input: &str) -> Result<Turn> {
        debug!(session = %self.id, turn = self.user_turns() + 1, "starting turn");
        let turn = conversation::step(&self.backend, &self.tools, &self.messages, user_input).await?;

        check_tool_links(&turn.history)?;
        if !turn.history.starts_with(&self.messages) {
            return Err(Error::InvalidState(
                "turn rewrote committed history".into(),
            ));
        }

        self.messages.clone_from(&turn.history);
        debug!(
            session = %self.id,
            messages = self.messages.len(),
            model_calls = turn.model_calls,
            "turn committed"
        );
        Ok(turn)
    }

    fn user_turns(&self) -> usize {
        self.messages.iter().filter(|m| m.role == Role::User).count()
    }
}

/// Tool calls and tool results must pair up: every tool message answers a
/// call made by the assistant message that precedes its run of results,
/// and every call on an assistant message is answered within that run.
fn check_tool_links(messages: &[Message]) -> Result<()> {
    for (i, msg) in messages.iter().enumerate() {
        match msg.role {
            Role::Tool => {
                let id = msg.tool_call_id.as_deref().ok_or_else(|| {
                    Error::InvalidState(format!("tool message {i} has no call id"))
                })?;

                let requester = messages[..i].iter().rev().find(|m| m.role != Role::Tool);
                let linked = requester.is_some_and(|m| {
                    m.role == Role::Assistant && m.tool_calls.iter().any(|call| call.id == id)
                });
                if !linked {
                    return Err(Error::InvalidState(format!(
                        "tool result {id} does not follow a matching tool call"
                    )));
                }
            }
            Role::Assistant => {
                let results: Vec<&str> = messages[i + 1..]
                    .iter()
                    .take_while(|m| m.role == Role::Tool)
                    .filter_map(|m| m.tool_call_id.as_deref())
                    .collect();
                if let Some(call) = msg
                    .tool_calls
                    .iter()
                    .find(|call| !results.contains(&call.id.as_str()))
                {
                    return Err(Error::InvalidState(format!(
                        "tool call {} has no result",
                        call.id
                    )));
                }
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::testing::{ScriptedBackend, WeatherHost, weather_call};

    const SYSTEM: &str = "You are an assistant.";

    #[tokio::test]
    async fn history_grows_only_on_success() {
        let backend = ScriptedBackend::new([
            Message::assistant("Hello!"),
            Message::assistant("").with_tool_call(weather_call("call_1")),
            Message::assistant("Sunny."),
        ]);
        let mut session = Session::new(backend, WeatherHost::default(), SYSTEM);
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::System);

        let turn = session.chat("Hello").await.unwrap();
        assert_eq!(turn.reply, "Hello!");
        assert_eq!(session.messages().len(), 3);

        let turn = session.chat("Weather in Tokyo?").await.unwrap();
        assert_eq!(turn.reply, "Sunny.");
        assert_eq!(session.messages().len(), 7);

        // Script is exhausted, so the model call fails and nothing commits.
        assert!(session.chat("Again?").await.is_err());
        assert_eq!(session.messages().len(), 7);
    }

    #[tokio::test]
    async fn later_turns_see_earlier_history() {
        let backend = ScriptedBackend::new([
            Message::assistant("first"),
            Message::assistant("second"),
        ]);
        let mut session = Session::new(backend, WeatherHost::default(), SYSTEM);

        session.chat("one").await.unwrap();
        session.chat("two").await.unwrap();

        let requests = session.backend.requests.lock().unwrap();
        let contents: Vec<&str> = requests[1].0.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, [SYSTEM, "one", "first", "two"]);
    }

    #[test]
    fn orphan_tool_result_is_rejected() {
        let messages = vec![
            Message::system(SYSTEM),
            Message::user("hi"),
            Message::tool_result("call_1", "get_weather", "Sunny"),
        ];
        assert!(matches!(
            check_tool_links(&messages),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn linked_tool_result_is_accepted() {
        let messages = vec![
            Message::user("hi"),
            Message::assistant("").with_tool_call(weather_call("call_1")),
            Message::tool_result("call_1", "get_weather", "Sunny"),
            Message::assistant("Sunny."),
        ];
        assert!(check_tool_links(&messages).is_ok());
    }

    #[test]
    fn unanswered_tool_call_is_rejected() {
        let messages = vec![
            Message::user("hi"),
            Message::assistant("").with_tool_call(weather_call("call_1")),
            Message::tool_result("call_1", "get_weather", "Sunny"),
            Message::assistant("").with_tool_call(weather_call("call_2")),
        ];
        assert!(matches!(
            check_tool_links(&messages),
            Err(Error::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn follow_up_tool_call_does_not_poison_history() {
        let backend = ScriptedBackend::new([
            Message::assistant("").with_tool_call(weather_call("call_1")),
            Message::assistant("").with_tool_call(weather_call("call_2")),
            Message::assistant("Still here."),
        ]);
        let mut session = Session::new(backend, WeatherHost::default(), SYSTEM);

        session.chat("weather?").await.unwrap();
        assert!(check_tool_links(session.messages()).is_ok());
        assert!(session.messages().last().unwrap().tool_calls.is_empty());

        let turn = session.chat("hello").await.unwrap();
        assert_eq!(turn.reply, "Still here.");
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }
}
