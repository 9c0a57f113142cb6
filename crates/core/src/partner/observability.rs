use std::mem;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sitebot_model::{ConversationPartner, PartnerError, Prompt, Response};
use tracing::{Instrument, Span, field};
use uuid::Uuid;

const MAX_TEXT_CHARS: usize = 10_000;

/// The metadata key the trace link is stored under.
pub const TRACE_URL_KEY: &str = "trace_url";

/// What a [`TraceLinker`] knows about a finished conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceSummary {
    /// Identifier of the conversation trace.
    pub trace_id: String,
    /// When the partner was created.
    pub started_at: DateTime<Utc>,
    /// When the conversation was finished.
    pub finished_at: DateTime<Utc>,
    /// Number of partner calls made.
    pub exchanges: usize,
}

/// Turns a finished trace into a link someone can open.
pub trait TraceLinker: Send + Sync {
    /// Returns a shareable link for the trace, if there is one.
    fn link(&self, summary: &TraceSummary) -> Option<String>;
}

/// A [`TraceLinker`] filling in a URL template.
///
/// `{trace_id}` is replaced with the trace id, `{start_ts}` and `{end_ts}`
/// with unix timestamps in seconds.
#[derive(Clone, Debug)]
pub struct UrlTemplateLinker {
    template: String,
}

impl UrlTemplateLinker {
    /// Creates a linker for the given template.
    #[inline]
    pub fn new<S: Into<String>>(template: S) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl TraceLinker for UrlTemplateLinker {
    fn link(&self, summary: &TraceSummary) -> Option<String> {
        Some(
            self.template
                .replace("{trace_id}", &summary.trace_id)
                .replace("{start_ts}", &summary.started_at.timestamp().to_string())
                .replace("{end_ts}", &summary.finished_at.timestamp().to_string()),
        )
    }
}

/// A partner that traces every call of the partner it wraps.
///
/// The whole conversation lives in one root span carrying a generated trace
/// id, and each call gets a child span with the prompt and the response.
pub struct ObservabilityPartner<P> {
    inner: P,
    trace_id: String,
    root: Span,
    started_at: DateTime<Utc>,
    exchanges: usize,
    linker: Option<Arc<dyn TraceLinker>>,
    metadata: Map<String, Value>,
}

impl<P: ConversationPartner> ObservabilityPartner<P> {
    /// Wraps `inner`.
    pub fn new(inner: P) -> Self {
        let trace_id = Uuid::new_v4().simple().to_string();
        let root = info_span!("conversation", %trace_id, partner = %inner.name());
        Self {
            inner,
            trace_id,
            root,
            started_at: Utc::now(),
            exchanges: 0,
            linker: None,
            metadata: Map::new(),
        }
    }

    /// Sets the linker asked for a trace link when the conversation ends.
    #[inline]
    pub fn with_trace_linker(mut self, linker: Arc<dyn TraceLinker>) -> Self {
        self.linker = Some(linker);
        self
    }

    /// Returns the trace id of the conversation.
    #[inline]
    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }
}

#[async_trait]
impl<P: ConversationPartner> ConversationPartner for ObservabilityPartner<P> {
    async fn get_response_for_prompt(
        &mut self,
        prompt: &Prompt,
    ) -> Result<Response, PartnerError> {
        self.exchanges += 1;
        let span = info_span!(
            parent: &self.root,
            "exchange",
            index = self.exchanges,
            prompt_kind = prompt.kind(),
            prompt_text = field::Empty,
            response_kind = field::Empty,
            response_text = field::Empty,
            tool_calls = field::Empty,
            error = field::Empty,
        );
        if let Some(text) = prompt.text() {
            span.record("prompt_text", truncate(text));
        }

        let result = self
            .inner
            .get_response_for_prompt(prompt)
            .instrument(span.clone())
            .await;

        match &result {
            Ok(response) => {
                span.record("response_kind", response.kind());
                if let Some(text) = response.text() {
                    span.record("response_text", truncate(text));
                }
                if let Response::ToolRequests(requests) = response {
                    span.record("tool_calls", requests.requests.len());
                }
            }
            Err(err) => {
                span.record("error", field::display(err));
            }
        }
        result
    }

    fn name(&self) -> String {
        format!("Observability({})", self.inner.name())
    }

    fn record_metadata(&mut self, key: &str, value: Value) {
        self.inner.record_metadata(key, value.clone());
        self.metadata.insert(key.to_owned(), value);
    }

    async fn finish_conversation(&mut self) -> Map<String, Value> {
        let span = info_span!(parent: &self.root, "finish_conversation");
        let mut metadata = self.inner.finish_conversation().instrument(span).await;
        metadata.extend(mem::take(&mut self.metadata));

        let summary = TraceSummary {
            trace_id: self.trace_id.clone(),
            started_at: self.started_at,
            finished_at: Utc::now(),
            exchanges: self.exchanges,
        };
        if let Some(url) = self.linker.as_ref().and_then(|linker| linker.link(&summary)) {
            self.root.in_scope(|| info!(%url, "conversation trace"));
            metadata.insert(TRACE_URL_KEY.to_owned(), Value::String(url));
        }
        metadata
    }
}

fn truncate(text: &str) -> &str {
    match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
