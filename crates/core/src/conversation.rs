//! Conversation loggers.
//!
//! A logger owns the [`Conversation`] being built while an agent talks to
//! its partner, and is its only writer.

mod file;

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Map, Value};
use sitebot_model::{Conversation, ConversationContext, Exchange, Prompt, Response};

pub use file::FileLogger;

/// Records the exchanges of a conversation.
pub trait ConversationLogger: Send {
    /// Appends an exchange with the next sequential id.
    fn log_exchange(&mut self, prompt: &Prompt, response: &Response);

    /// Merges the given entries into the conversation metadata.
    ///
    /// Existing keys are overwritten.
    fn add_metadata(&mut self, metadata: Map<String, Value>);

    /// Returns a copy of the conversation logged so far.
    fn snapshot(&self) -> Conversation;

    /// Persists the conversation, if the logger persists anything.
    fn flush(&mut self) {}
}

/// Creates a logger when a conversation starts.
pub type LoggerFactory =
    Box<dyn Fn(&ConversationContext) -> Box<dyn ConversationLogger> + Send + Sync>;

/// A logger that keeps the conversation in memory only.
///
/// Clones share the same conversation, so a test can keep one handle and
/// give the other to an agent.
#[derive(Clone, Debug)]
pub struct InMemoryLogger {
    conversation: Arc<Mutex<Conversation>>,
}

impl InMemoryLogger {
    /// Creates a logger for a new conversation.
    pub fn new(context: &ConversationContext) -> Self {
        Self {
            conversation: Arc::new(Mutex::new(Conversation::with_context(context))),
        }
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, Conversation> {
        // A panic while holding the lock can't leave a half-appended
        // exchange behind, so a poisoned lock is still usable.
        self.conversation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ConversationLogger for InMemoryLogger {
    fn log_exchange(&mut self, prompt: &Prompt, response: &Response) {
        append_exchange(&mut self.lock(), prompt, response);
    }

    fn add_metadata(&mut self, metadata: Map<String, Value>) {
        merge_metadata(&mut self.lock().metadata, metadata);
    }

    fn snapshot(&self) -> Conversation {
        self.lock().clone()
    }
}

pub(crate) fn append_exchange(
    conversation: &mut Conversation,
    prompt: &Prompt,
    response: &Response,
) {
    let id = conversation.next_exchange_id();
    trace!(%id, prompt = prompt.kind(), response = response.kind(), "logging exchange");
    conversation.exchanges.push(Exchange {
        id,
        prompt: prompt.clone(),
        response: response.clone(),
    });
}

pub(crate) fn merge_metadata(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        target.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sitebot_model::{FinalResponse, TextPrompt};

    use super::*;

    #[test]
    fn test_shared_handle() {
        let context = ConversationContext {
            system_prompt: "system".to_owned(),
            tool_list: vec![],
        };
        let logger = InMemoryLogger::new(&context);
        let mut writer = logger.clone();

        writer.log_exchange(&TextPrompt::new("a").into(), &FinalResponse::new("b").into());
        writer.log_exchange(&TextPrompt::new("c").into(), &FinalResponse::new("d").into());

        let conversation = logger.snapshot();
        assert_eq!(conversation.system_prompt, "system");
        let ids: Vec<_> = conversation.exchanges.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["exchange-1", "exchange-2"]);
        assert_eq!(conversation.exchanges[1].response.text(), Some("d"));
    }

    #[test]
    fn test_metadata_last_write_wins() {
        let mut logger = InMemoryLogger::new(&ConversationContext::default());
        let mut first = Map::new();
        first.insert("a".to_owned(), json!(1));
        first.insert("b".to_owned(), json!(1));
        logger.add_metadata(first);
        let mut second = Map::new();
        second.insert("b".to_owned(), json!(2));
        logger.add_metadata(second);

        let metadata = logger.snapshot().metadata;
        assert_eq!(metadata["a"], 1);
        assert_eq!(metadata["b"], 2);
    }
}
