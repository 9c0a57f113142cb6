use thiserror::Error;

/// An error returned by a [`ConversationPartner`](crate::ConversationPartner).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum PartnerError {
    /// The partner has no more responses to give.
    #[error("end of conversation reached after {exchanges} exchanges")]
    EndOfConversation {
        /// Number of exchanges the partner had.
        exchanges: usize,
    },
    /// The prompt does not match what the partner expected.
    #[error(
        "prompt mismatch at exchange {index}: expected {expected}, received {received}"
    )]
    PromptMismatch {
        /// 0-based position of the expected exchange.
        index: usize,
        /// Summary of the expected prompt.
        expected: String,
        /// Summary of the received prompt.
        received: String,
    },
    /// The partner could not produce a response.
    #[error("partner unavailable: {0}")]
    Unavailable(String),
}

/// An error that occurred while reading or writing a conversation
/// document.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The document is not valid JSON, or does not have the expected
    /// shape.
    #[error("malformed conversation document: {0}")]
    Json(#[from] serde_json::Error),
    /// The document has no `version` field.
    #[error("conversation document has no version")]
    MissingVersion,
    /// The document version is not supported.
    #[error("unsupported conversation document version: {0}")]
    UnsupportedVersion(String),
    /// A timestamp could not be parsed.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
