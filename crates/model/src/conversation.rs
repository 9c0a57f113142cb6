use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::request::Prompt;
use crate::response::Response;

/// A tool as advertised to the partner, independent of the callable
/// behind it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
}

/// One prompt and the response that followed it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    /// `exchange-<n>`, 1-indexed in creation order.
    pub id: String,
    /// The prompt sent to the partner.
    pub prompt: Prompt,
    /// The response received from the partner.
    pub response: Response,
}

impl Exchange {
    /// Returns the identifier for the exchange at the 0-based `index`.
    #[inline]
    pub fn id_for_index(index: usize) -> String {
        format!("exchange-{}", index + 1)
    }
}

/// What a conversation is started with.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversationContext {
    /// The system instructions.
    pub system_prompt: String,
    /// Tools advertised to the partner.
    pub tool_list: Vec<ToolDescriptor>,
}

/// A complete conversation.
///
/// Exchanges are append-only. A conversation has exactly one writer for
/// its lifetime; sharing one between several agent loops is not
/// supported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conversation {
    /// Unique identifier of the conversation.
    pub conversation_id: String,
    /// When the conversation was started.
    pub timestamp: DateTime<Utc>,
    /// The system instructions.
    pub system_prompt: String,
    /// Tools advertised to the partner.
    pub tool_list: Vec<ToolDescriptor>,
    /// Exchanges in creation order.
    pub exchanges: Vec<Exchange>,
    /// Free-form metadata, such as a trace URL.
    pub metadata: Map<String, Value>,
}

impl Conversation {
    /// Creates an empty conversation with a fresh id and the current time.
    pub fn new<S: Into<String>>(
        system_prompt: S,
        tool_list: Vec<ToolDescriptor>,
    ) -> Self {
        Self {
            conversation_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            system_prompt: system_prompt.into(),
            tool_list,
            exchanges: vec![],
            metadata: Map::new(),
        }
    }

    /// Creates an empty conversation for the given context.
    #[inline]
    pub fn with_context(context: &ConversationContext) -> Self {
        Self::new(context.system_prompt.clone(), context.tool_list.clone())
    }

    /// Returns the identifier the next appended exchange will get.
    #[inline]
    pub fn next_exchange_id(&self) -> String {
        Exchange::id_for_index(self.exchanges.len())
    }

    /// Returns the conversation context this conversation was started
    /// with.
    #[inline]
    pub fn context(&self) -> ConversationContext {
        ConversationContext {
            system_prompt: self.system_prompt.clone(),
            tool_list: self.tool_list.clone(),
        }
    }
}
