//! A deterministic conversation partner that replays a recorded
//! conversation, for testing purpose.

#[macro_use]
extern crate tracing;

mod provider;
mod script;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sitebot_model::{ConversationPartner, Exchange, PartnerError, Prompt, Response};

pub use provider::*;
pub use script::*;

/// How the replay partner reacts to a prompt that differs from the
/// recorded one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ValidationMode {
    /// Log a warning and return the recorded response anyway.
    #[default]
    Warn,
    /// Fail with [`PartnerError::PromptMismatch`].
    Strict,
}

/// A partner that answers with the responses of a recorded conversation.
///
/// The partner trusts the position, not the content: the `n`-th call
/// returns the `n`-th recorded response. Incoming prompts are compared
/// against the recorded ones only loosely (kind, text, result ids), see
/// [`ValidationMode`]. Calling it more times than there are recorded
/// exchanges fails with [`PartnerError::EndOfConversation`].
///
/// # Note
///
/// The recorded responses are cloned on every call. You should only use
/// it for testing.
pub struct ReplayPartner {
    exchanges: Arc<[Exchange]>,
    cursor: usize,
    mode: ValidationMode,
    metadata: Map<String, Value>,
}

impl ReplayPartner {
    /// Creates a partner over the given exchanges, warning on mismatched
    /// prompts.
    #[inline]
    pub fn new(exchanges: impl Into<Arc<[Exchange]>>) -> Self {
        Self::with_mode(exchanges, ValidationMode::Warn)
    }

    /// Creates a partner over the given exchanges.
    #[inline]
    pub fn with_mode(
        exchanges: impl Into<Arc<[Exchange]>>,
        mode: ValidationMode,
    ) -> Self {
        Self {
            exchanges: exchanges.into(),
            cursor: 0,
            mode,
            metadata: Map::new(),
        }
    }

    /// Returns the number of responses already given.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Returns the number of recorded exchanges not replayed yet.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.exchanges.len() - self.cursor
    }
}

#[async_trait]
impl ConversationPartner for ReplayPartner {
    async fn get_response_for_prompt(
        &mut self,
        prompt: &Prompt,
    ) -> Result<Response, PartnerError> {
        let Some(expected) = self.exchanges.get(self.cursor) else {
            return Err(PartnerError::EndOfConversation {
                exchanges: self.exchanges.len(),
            });
        };
        debug!(index = self.cursor, exchange = %expected.id, "replaying exchange");

        if !prompts_match(&expected.prompt, prompt) {
            let expected = summarize(&expected.prompt);
            let received = summarize(prompt);
            match self.mode {
                ValidationMode::Warn => {
                    warn!(
                        index = self.cursor,
                        %expected,
                        %received,
                        "prompt does not match the recorded conversation"
                    );
                }
                ValidationMode::Strict => {
                    return Err(PartnerError::PromptMismatch {
                        index: self.cursor,
                        expected,
                        received,
                    });
                }
            }
        }

        let response = expected.response.clone();
        self.cursor += 1;
        Ok(response)
    }

    fn name(&self) -> String {
        "Replay".to_owned()
    }

    fn record_metadata(&mut self, key: &str, value: Value) {
        self.metadata.insert(key.to_owned(), value);
    }

    async fn finish_conversation(&mut self) -> Map<String, Value> {
        let remaining = self.remaining();
        if remaining > 0 {
            warn!(remaining, "conversation ended before all recorded exchanges were used");
        }
        self.metadata.clone()
    }
}

fn prompts_match(expected: &Prompt, received: &Prompt) -> bool {
    match (expected, received) {
        (Prompt::Text(expected), Prompt::Text(received)) => {
            expected.text == received.text
        }
        (Prompt::ToolResults(expected), Prompt::ToolResults(received)) => expected
            .results
            .iter()
            .map(|r| &r.id)
            .eq(received.results.iter().map(|r| &r.id)),
        _ => false,
    }
}

fn summarize(prompt: &Prompt) -> String {
    match prompt {
        Prompt::Text(prompt) => format!("text {:?}", prompt.text),
        Prompt::ToolResults(results) => {
            let ids: Vec<_> = results.results.iter().map(|r| r.id.as_str()).collect();
            format!("tool_results {ids:?}")
        }
    }
}
