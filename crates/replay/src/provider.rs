use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sitebot_model::{
    Conversation, ConversationContext, ConversationPartner, Exchange, PartnerError,
    PartnerProvider, RecordError,
};
use thiserror::Error;

use crate::{ReplayPartner, ValidationMode};

/// An error that occurred while loading a recorded conversation.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read conversation file {}: {source}", path.display())]
    Io {
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
    /// The file is not a valid conversation document.
    #[error("invalid conversation file {}: {source}", path.display())]
    Record {
        /// Path of the file.
        path: PathBuf,
        /// The underlying error.
        source: RecordError,
    },
}

/// Hands out a [`ReplayPartner`] over the same recorded conversation for
/// every conversation started.
#[derive(Clone, Debug)]
pub struct ReplayProvider {
    conversation: Arc<Conversation>,
    exchanges: Arc<[Exchange]>,
    mode: ValidationMode,
}

impl ReplayProvider {
    /// Creates a provider replaying the given conversation.
    pub fn new(conversation: Conversation) -> Self {
        let exchanges = Arc::from(conversation.exchanges.as_slice());
        Self {
            conversation: Arc::new(conversation),
            exchanges,
            mode: ValidationMode::default(),
        }
    }

    /// Loads the recorded conversation from a JSON document on disk.
    ///
    /// Both the current and the legacy document versions are accepted.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_owned(),
            source,
        })?;
        let conversation =
            Conversation::from_json(&text).map_err(|source| LoadError::Record {
                path: path.to_owned(),
                source,
            })?;
        info!(
            path = %path.display(),
            conversation_id = %conversation.conversation_id,
            exchanges = conversation.exchanges.len(),
            "loaded recorded conversation"
        );
        Ok(Self::new(conversation))
    }

    /// Sets how mismatched prompts are handled.
    #[inline]
    pub fn with_validation_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Returns the recorded conversation.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }
}

impl PartnerProvider for ReplayProvider {
    fn start_conversation(
        &self,
        context: &ConversationContext,
    ) -> Result<Box<dyn ConversationPartner>, PartnerError> {
        if context.system_prompt != self.conversation.system_prompt {
            debug!("system prompt differs from the recorded conversation");
        }
        Ok(Box::new(ReplayPartner::with_mode(
            Arc::clone(&self.exchanges),
            self.mode,
        )))
    }
}

#[cfg(test)]
mod tests {
    use sitebot_model::{FinalResponse, Prompt, TextPrompt};

    use super::*;
    use crate::ConversationScript;

    #[tokio::test]
    async fn test_fresh_partner_per_conversation() {
        let conversation = ConversationScript::default()
            .exchange(TextPrompt::new("Hi"), FinalResponse::new("Hello"))
            .build();
        let provider = ReplayProvider::new(conversation);
        let prompt = Prompt::Text(TextPrompt::new("Hi"));

        for _ in 0..3 {
            let mut partner = provider
                .start_conversation(&ConversationContext::default())
                .unwrap();
            let response = partner.get_response_for_prompt(&prompt).await.unwrap();
            assert_eq!(response.text(), Some("Hello"));
        }
    }

    #[test]
    fn test_from_file() {
        let conversation = ConversationScript::default()
            .with_system_prompt("system")
            .exchange(TextPrompt::new("Hi"), FinalResponse::new("Hello"))
            .build();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recorded.json");
        fs::write(&path, conversation.to_json().unwrap()).unwrap();

        let provider = ReplayProvider::from_file(&path).unwrap();
        assert_eq!(provider.conversation(), &conversation);

        let err = ReplayProvider::from_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));

        fs::write(&path, "{\"exchanges\": []}").unwrap();
        let err = ReplayProvider::from_file(&path).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Record { source: RecordError::MissingVersion, .. }
        ));
    }
}
