//! Decorators around a [`ConversationPartner`].
//!
//! The agent composes them when a conversation starts, always in the same
//! order: `Logging(Observability(partner))`, each layer optional.
//!
//! [`ConversationPartner`]: sitebot_model::ConversationPartner

mod logging;
mod observability;

pub use logging::LoggingPartner;
pub use observability::{
    ObservabilityPartner, TRACE_URL_KEY, TraceLinker, TraceSummary, UrlTemplateLinker,
};
