mod builder;
mod session;

use std::fmt::{self, Display};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::{Map, Value, json};
use sitebot_model::{
    ConversationContext, ConversationPartner, PartnerError, PartnerProvider, Prompt, Response,
    TextPrompt, ToolUse, ToolUseResult, ToolUseResults,
};
use tracing::Instrument;

use crate::conversation::LoggerFactory;
use crate::partner::{LoggingPartner, ObservabilityPartner, TraceLinker};
use crate::tool::{Registry, panic_message};
pub use builder::{AgentBuilder, DEFAULT_MAX_ITERATIONS};
use session::ConversationSession;

/// Why an agent stopped working on an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The partner gave a final response.
    Final,
    /// The partner was still requesting tools when the iteration cap was
    /// reached.
    IterationLimit,
    /// The partner answered with something the loop can't act on.
    UnexpectedResponse,
    /// The partner failed, e.g. a replay ran out of recorded exchanges.
    ProtocolError,
}

impl StopReason {
    /// Returns the snake case name of the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Final => "final",
            StopReason::IterationLimit => "iteration_limit",
            StopReason::UnexpectedResponse => "unexpected_response",
            StopReason::ProtocolError => "protocol_error",
        }
    }
}

impl Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of one instruction.
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    /// The final text, or a description of why there is none.
    pub text: String,
    /// Why the loop stopped.
    pub stop_reason: StopReason,
    /// Number of partner calls made.
    pub iterations: usize,
    /// Metadata returned by the partner stack when the conversation ended.
    pub metadata: Map<String, Value>,
}

/// An agent that works on instructions by talking to a conversation
/// partner and executing the tools it requests.
///
/// Every instruction gets its own conversation, and thus its own partner
/// from the provider. Tool requests are executed one at a time, in the
/// order they were requested.
pub struct Agent {
    provider: Box<dyn PartnerProvider>,
    system_prompt: String,
    registry: Registry,
    max_iterations: usize,
    logger_factory: Option<LoggerFactory>,
    observability: bool,
    trace_linker: Option<Arc<dyn TraceLinker>>,
}

impl Agent {
    fn from_builder(builder: AgentBuilder) -> Self {
        let AgentBuilder {
            provider,
            system_prompt,
            base_dir,
            tools,
            max_iterations,
            logger_factory,
            observability,
            trace_linker,
        } = builder;

        Self {
            provider,
            system_prompt,
            registry: Registry::with_tools(base_dir, tools),
            max_iterations,
            logger_factory,
            observability,
            trace_linker,
        }
    }

    /// Returns the tool registry.
    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Works on an instruction and returns the final text.
    ///
    /// See [`run_instruction`](Self::run_instruction) for the details of
    /// why the loop stopped.
    pub async fn execute_instruction(&self, instruction: &str) -> String {
        self.run_instruction(instruction).await.text
    }

    /// Works on an instruction until the partner gives a final response,
    /// the iteration cap is reached, or the conversation breaks.
    ///
    /// Failures are reported through [`RunReport::stop_reason`], never
    /// returned as errors.
    pub async fn run_instruction(&self, instruction: &str) -> RunReport {
        let span = info_span!("run_instruction", max_iterations = self.max_iterations);
        self.run(instruction).instrument(span).await
    }

    async fn run(&self, instruction: &str) -> RunReport {
        let context = ConversationContext {
            system_prompt: self.system_prompt.clone(),
            tool_list: self.registry.descriptors(),
        };
        let partner = match self.start_partner(&context) {
            Ok(partner) => partner,
            Err(err) => {
                error!("failed to start a conversation: {err}");
                return RunReport {
                    text: protocol_error_text(&err),
                    stop_reason: StopReason::ProtocolError,
                    iterations: 0,
                    metadata: Map::new(),
                };
            }
        };
        let mut session = ConversationSession::new(partner);
        info!(partner = %session.partner_name(), "conversation started");

        let mut iterations = 0;
        let converse = self.converse(&mut session, instruction, &mut iterations);
        let outcome = AssertUnwindSafe(converse).catch_unwind().await;
        let (text, stop_reason) = match outcome {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload);
                error!(iteration = iterations, "conversation panicked: {message}");
                (
                    format!("conversation ended unexpectedly: panicked: {message}"),
                    StopReason::ProtocolError,
                )
            }
        };

        session.record_metadata("stop_reason", json!(stop_reason.as_str()));
        session.record_metadata("iterations", json!(iterations));
        let metadata = session.finish().await;
        info!(%stop_reason, iterations, "conversation finished");

        RunReport {
            text,
            stop_reason,
            iterations,
            metadata,
        }
    }

    async fn converse(
        &self,
        session: &mut ConversationSession,
        instruction: &str,
        iterations: &mut usize,
    ) -> (String, StopReason) {
        let mut prompt = Prompt::from(TextPrompt::new(instruction));
        let mut last_text: Option<String> = None;

        loop {
            if *iterations >= self.max_iterations {
                warn!(iterations = *iterations, "maximum iterations reached");
                let text = last_text
                    .unwrap_or_else(|| "maximum iterations reached".to_owned());
                return (text, StopReason::IterationLimit);
            }
            *iterations += 1;
            debug!(iteration = *iterations, prompt = prompt.kind(), "asking partner");

            let response = match session.ask(&prompt).await {
                Ok(response) => response,
                Err(err) => {
                    error!(
                        iteration = *iterations,
                        "conversation ended unexpectedly: {err}"
                    );
                    return (protocol_error_text(&err), StopReason::ProtocolError);
                }
            };

            match response {
                Response::Final(response) => {
                    return (response.text, StopReason::Final);
                }
                Response::ToolRequests(requests) if !requests.requests.is_empty() => {
                    if requests.text.is_some() {
                        last_text = requests.text;
                    }
                    prompt = self.dispatch(requests.requests).await.into();
                }
                other => {
                    warn!(kind = other.kind(), "unexpected response");
                    let text =
                        format!("unexpected response type: {}", other.kind());
                    return (text, StopReason::UnexpectedResponse);
                }
            }
        }
    }

    fn start_partner(
        &self,
        context: &ConversationContext,
    ) -> Result<Box<dyn ConversationPartner>, PartnerError> {
        let mut partner = self.provider.start_conversation(context)?;
        if self.observability {
            let mut observed = ObservabilityPartner::new(partner);
            if let Some(linker) = &self.trace_linker {
                observed = observed.with_trace_linker(Arc::clone(linker));
            }
            partner = Box::new(observed);
        }
        if let Some(factory) = &self.logger_factory {
            partner = Box::new(LoggingPartner::new(partner, factory(context)));
        }
        Ok(partner)
    }

    async fn dispatch(&self, requests: Vec<ToolUse>) -> ToolUseResults {
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            debug!(tool = %request.tool_name, id = %request.id, "executing tool");
            let result = self
                .registry
                .execute(&request.tool_name, Value::Object(request.parameters))
                .await;
            results.push(ToolUseResult {
                id: request.id,
                result,
            });
        }
        ToolUseResults { results }
    }
}

fn protocol_error_text(err: &PartnerError) -> String {
    format!("conversation ended unexpectedly: {err}")
}
