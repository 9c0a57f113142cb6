use sitebot_model::{Conversation, Exchange, Prompt, Response, ToolDescriptor};

/// A builder for recorded conversations.
///
/// Before replaying, you need to set up the conversation script, which is
/// how the partner should respond to each prompt in turn.
#[derive(Clone, Debug, Default)]
pub struct ConversationScript {
    system_prompt: String,
    tool_list: Vec<ToolDescriptor>,
    exchanges: Vec<Exchange>,
}

impl ConversationScript {
    /// Sets the system prompt of the recorded conversation.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the tools advertised in the recorded conversation.
    #[inline]
    pub fn with_tool_list(mut self, tool_list: Vec<ToolDescriptor>) -> Self {
        self.tool_list = tool_list;
        self
    }

    /// Appends an exchange.
    #[inline]
    pub fn add_exchange(
        &mut self,
        prompt: impl Into<Prompt>,
        response: impl Into<Response>,
    ) {
        self.exchanges.push(Exchange {
            id: Exchange::id_for_index(self.exchanges.len()),
            prompt: prompt.into(),
            response: response.into(),
        });
    }

    /// Appends an exchange, builder style.
    #[inline]
    pub fn exchange(
        mut self,
        prompt: impl Into<Prompt>,
        response: impl Into<Response>,
    ) -> Self {
        self.add_exchange(prompt, response);
        self
    }

    /// Builds the recorded conversation.
    pub fn build(self) -> Conversation {
        let mut conversation = Conversation::new(self.system_prompt, self.tool_list);
        conversation.exchanges = self.exchanges;
        conversation
    }
}
