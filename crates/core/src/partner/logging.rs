use std::mem;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sitebot_model::{ConversationPartner, PartnerError, Prompt, Response};

use crate::conversation::ConversationLogger;

/// A partner that records every exchange of the partner it wraps.
///
/// Failed calls are not logged. Metadata recorded on this partner is passed
/// inward and also kept here, so it reaches the log even when the inner
/// partner discards it.
pub struct LoggingPartner<P> {
    inner: P,
    logger: Box<dyn ConversationLogger>,
    metadata: Map<String, Value>,
}

impl<P: ConversationPartner> LoggingPartner<P> {
    /// Wraps `inner`, logging into `logger`.
    #[inline]
    pub fn new(inner: P, logger: Box<dyn ConversationLogger>) -> Self {
        Self {
            inner,
            logger,
            metadata: Map::new(),
        }
    }

    /// Returns the logger.
    #[inline]
    pub fn logger(&self) -> &dyn ConversationLogger {
        self.logger.as_ref()
    }
}

#[async_trait]
impl<P: ConversationPartner> ConversationPartner for LoggingPartner<P> {
    async fn get_response_for_prompt(
        &mut self,
        prompt: &Prompt,
    ) -> Result<Response, PartnerError> {
        let response = self.inner.get_response_for_prompt(prompt).await?;
        self.logger.log_exchange(prompt, &response);
        Ok(response)
    }

    fn name(&self) -> String {
        format!("Logging({})", self.inner.name())
    }

    fn record_metadata(&mut self, key: &str, value: Value) {
        self.inner.record_metadata(key, value.clone());
        self.metadata.insert(key.to_owned(), value);
    }

    async fn finish_conversation(&mut self) -> Map<String, Value> {
        let metadata = self.inner.finish_conversation().await;
        self.logger.add_metadata(metadata);
        self.logger.add_metadata(mem::take(&mut self.metadata));
        self.logger.flush();
        self.logger.snapshot().metadata
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sitebot_model::{ConversationContext, Exchange, FinalResponse, TextPrompt};
    use sitebot_replay::{ConversationScript, ReplayPartner};

    use super::*;
    use crate::conversation::InMemoryLogger;

    #[tokio::test]
    async fn test_logs_successful_exchanges() {
        let recorded = ConversationScript::default()
            .exchange(TextPrompt::new("Hi"), FinalResponse::new("Hello"))
            .build();
        let logger = InMemoryLogger::new(&ConversationContext::default());
        let mut partner = LoggingPartner::new(
            ReplayPartner::new(recorded.exchanges.clone()),
            Box::new(logger.clone()),
        );
        assert_eq!(partner.name(), "Logging(Replay)");

        let prompt = Prompt::from(TextPrompt::new("Hi"));
        partner.get_response_for_prompt(&prompt).await.unwrap();
        partner.get_response_for_prompt(&prompt).await.unwrap_err();

        let logged = logger.snapshot();
        assert_eq!(logged.exchanges, recorded.exchanges);
        assert_eq!(partner.logger().snapshot(), logged);
    }

    /// Answers everything with "ok" and keeps the default metadata hooks.
    struct Forgetful;

    #[async_trait]
    impl ConversationPartner for Forgetful {
        async fn get_response_for_prompt(
            &mut self,
            _prompt: &Prompt,
        ) -> Result<Response, PartnerError> {
            Ok(FinalResponse::new("ok").into())
        }

        fn name(&self) -> String {
            "Forgetful".to_owned()
        }
    }

    #[tokio::test]
    async fn test_keeps_metadata_the_inner_partner_drops() {
        let logger = InMemoryLogger::new(&ConversationContext::default());
        let mut partner = LoggingPartner::new(Forgetful, Box::new(logger.clone()));
        partner.record_metadata("stop_reason", json!("final"));

        let metadata = partner.finish_conversation().await;
        assert_eq!(metadata["stop_reason"], "final");
        assert_eq!(logger.snapshot().metadata, metadata);
    }

    #[tokio::test]
    async fn test_finish_merges_inner_metadata() {
        let logger = InMemoryLogger::new(&ConversationContext::default());
        let mut partner = LoggingPartner::new(
            ReplayPartner::new(Vec::<Exchange>::new()),
            Box::new(logger.clone()),
        );
        partner.record_metadata("instruction", json!("rename hero tagline"));

        let metadata = partner.finish_conversation().await;
        assert_eq!(metadata["instruction"], "rename hero tagline");
        assert_eq!(logger.snapshot().metadata, metadata);
    }
}
