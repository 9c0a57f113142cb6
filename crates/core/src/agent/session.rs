use serde_json::{Map, Value};
use sitebot_model::{ConversationPartner, PartnerError, Prompt, Response};
use tokio::runtime::Handle;

/// Owns the partner of one conversation and makes sure it is finished.
///
/// [`finish`](Self::finish) consumes the session, so the partner is
/// finished at most once. A session dropped before it was finished, e.g.
/// because the run was cancelled, finishes its partner on the current
/// runtime in the background.
pub(crate) struct ConversationSession {
    partner: Option<Box<dyn ConversationPartner>>,
}

impl ConversationSession {
    #[inline]
    pub fn new(partner: Box<dyn ConversationPartner>) -> Self {
        Self {
            partner: Some(partner),
        }
    }

    pub fn partner_name(&self) -> String {
        self.partner
            .as_ref()
            .map(|partner| partner.name())
            .unwrap_or_default()
    }

    pub async fn ask(
        &mut self,
        prompt: &Prompt,
    ) -> Result<Response, PartnerError> {
        let Some(partner) = self.partner.as_mut() else {
            return Err(PartnerError::Unavailable(
                "conversation already finished".to_owned(),
            ));
        };
        partner.get_response_for_prompt(prompt).await
    }

    pub fn record_metadata(&mut self, key: &str, value: Value) {
        if let Some(partner) = self.partner.as_mut() {
            partner.record_metadata(key, value);
        }
    }

    pub async fn finish(mut self) -> Map<String, Value> {
        match self.partner.take() {
            Some(mut partner) => partner.finish_conversation().await,
            None => Map::new(),
        }
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        let Some(mut partner) = self.partner.take() else {
            return;
        };
        let name = partner.name();
        match Handle::try_current() {
            Ok(handle) => {
                warn!(
                    partner = %name,
                    "conversation dropped before it finished, finishing it now"
                );
                handle.spawn(async move {
                    partner.finish_conversation().await;
                });
            }
            Err(_) => {
                warn!(
                    partner = %name,
                    "conversation dropped outside a runtime, it was never finished"
                );
            }
        }
    }
}
