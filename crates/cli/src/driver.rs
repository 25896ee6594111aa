//! Interactive line-by-line chat loop.

use crate::error::Result;
use runtime::{Backend, Session, ToolHost};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Input that ends the session. Matched exactly after trimming.
pub const SENTINEL: &str = "bye";

const BANNER: &str = "please input or say bye";

/// Driver loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    AwaitingInput,
    Terminated,
}

/// Format a reply as the single output line for a turn.
pub fn format_reply(text: &str) -> String {
    format!("\x1b[32mAgent\x1b[0m: {text}")
}

/// Reads user lines, runs one session turn per line, and prints replies.
pub struct Driver<B, T> {
    session: Session<B, T>,
    state: State,
    prime: Option<String>,
}

impl<B: Backend, T: ToolHost> Driver<B, T> {
    pub fn new(session: Session<B, T>) -> Self {
        Self {
            session,
            state: State::AwaitingInput,
            prime: None,
        }
    }

    /// Run one turn with this prompt before reading any input.
    pub fn with_prime(mut self, prompt: Option<String>) -> Self {
        self.prime = prompt;
        self
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn session(&self) -> &Session<B, T> {
        &self.session
    }

    /// Drive the session until `bye`, end of input, or a failed turn.
    ///
    /// A failed turn is returned as-is; the loop does not continue past it.
    pub async fn run<R, W>(&mut self, mut input: R, output: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        if let Some(prompt) = self.prime.take() {
            debug!(prompt = %prompt, "priming session");
            self.turn(&prompt, output).await?;
        }

        output.write_all(format!("{BANNER}\n").as_bytes()).await?;
        output.flush().await?;

        // Bytes rather than lines so a stray non-UTF-8 byte does not end the session.
        let mut buf = Vec::new();
        while self.state == State::AwaitingInput {
            buf.clear();
            if input.read_until(b'\n', &mut buf).await? == 0 {
                debug!("input closed");
                self.state = State::Terminated;
                break;
            }

            let line = String::from_utf8_lossy(&buf);
            let line = line.trim();
            if line == SENTINEL {
                self.state = State::Terminated;
                break;
            }

            self.turn(line, output).await?;
        }

        Ok(())
    }

    async fn turn<W>(&mut self, input: &str, output: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let turn = self.session.chat(input).await?;
        let line = format_reply(&turn.reply);
        output.write_all(format!("{line}\n").as_bytes()).await?;
        output.flush().await?;
        Ok(())
    }
}
