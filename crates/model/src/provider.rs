use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::conversation::ConversationContext;
use crate::error::PartnerError;
use crate::request::Prompt;
use crate::response::Response;

/// The party an agent talks to in order to get the next response.
///
/// Implementations may be a live model, a replay of a recorded
/// conversation, or a decorator wrapping another partner. A partner lives
/// for exactly one conversation, and `finish_conversation` is called once
/// when that conversation ends.
#[async_trait]
pub trait ConversationPartner: Send {
    /// Returns the response for the given prompt.
    async fn get_response_for_prompt(
        &mut self,
        prompt: &Prompt,
    ) -> Result<Response, PartnerError>;

    /// Returns a human readable name, including wrapped partners.
    fn name(&self) -> String;

    /// Records a metadata entry for this conversation.
    ///
    /// The default implementation discards it.
    fn record_metadata(&mut self, key: &str, value: Value) {
        let _ = (key, value);
    }

    /// Finishes the conversation and returns the metadata accumulated
    /// during it.
    ///
    /// Decorators merge the map returned by the partner they wrap before
    /// adding their own keys, so outer keys win on collision.
    async fn finish_conversation(&mut self) -> Map<String, Value> {
        Map::new()
    }
}

#[async_trait]
impl<P: ConversationPartner + ?Sized> ConversationPartner for Box<P> {
    #[inline]
    async fn get_response_for_prompt(
        &mut self,
        prompt: &Prompt,
    ) -> Result<Response, PartnerError> {
        (**self).get_response_for_prompt(prompt).await
    }

    #[inline]
    fn name(&self) -> String {
        (**self).name()
    }

    #[inline]
    fn record_metadata(&mut self, key: &str, value: Value) {
        (**self).record_metadata(key, value)
    }

    #[inline]
    async fn finish_conversation(&mut self) -> Map<String, Value> {
        (**self).finish_conversation().await
    }
}

/// A type that hands out a fresh [`ConversationPartner`] for every
/// conversation.
///
/// Once the provider is created, it should behave like a stateless object.
pub trait PartnerProvider: Send + Sync {
    /// Starts a new conversation.
    fn start_conversation(
        &self,
        context: &ConversationContext,
    ) -> Result<Box<dyn ConversationPartner>, PartnerError>;
}
