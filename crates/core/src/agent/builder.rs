use std::path::PathBuf;
use std::sync::Arc;

use sitebot_model::{ConversationContext, PartnerProvider};

use super::Agent;
use crate::conversation::{ConversationLogger, LoggerFactory};
use crate::partner::TraceLinker;
use crate::tool::Tool;
use crate::tool::object::{ToolObject, ToolObjectImpl};

/// The default cap on partner calls per instruction.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// [`Agent`] builder.
pub struct AgentBuilder {
    pub(crate) provider: Box<dyn PartnerProvider>,
    pub(crate) system_prompt: String,
    pub(crate) base_dir: PathBuf,
    pub(crate) tools: Vec<Arc<dyn ToolObject>>,
    pub(crate) max_iterations: usize,
    pub(crate) logger_factory: Option<LoggerFactory>,
    pub(crate) observability: bool,
    pub(crate) trace_linker: Option<Arc<dyn TraceLinker>>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified partner provider.
    #[inline]
    pub fn with_partner_provider<P: PartnerProvider + 'static>(provider: P) -> Self {
        Self {
            provider: Box::new(provider),
            system_prompt: String::new(),
            base_dir: PathBuf::from("."),
            tools: vec![],
            max_iterations: DEFAULT_MAX_ITERATIONS,
            logger_factory: None,
            observability: true,
            trace_linker: None,
        }
    }

    /// Sets the system prompt every conversation starts with.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, system_prompt: S) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Sets the directory tools are confined to.
    #[inline]
    pub fn with_base_dir<P: Into<PathBuf>>(mut self, base_dir: P) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    /// Registers a tool.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(ToolObjectImpl(tool)));
        self
    }

    /// Sets the maximum number of partner calls per instruction.
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Logs every conversation into a logger created by `factory`.
    #[inline]
    pub fn with_conversation_logger<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ConversationContext) -> Box<dyn ConversationLogger> + Send + Sync + 'static,
    {
        self.logger_factory = Some(Box::new(factory));
        self
    }

    /// Enables or disables tracing of partner calls. Enabled by default.
    #[inline]
    pub fn with_observability(mut self, enabled: bool) -> Self {
        self.observability = enabled;
        self
    }

    /// Sets the linker that turns a conversation trace into a link.
    #[inline]
    pub fn with_trace_linker<L: TraceLinker + 'static>(mut self, linker: L) -> Self {
        self.trace_linker = Some(Arc::new(linker));
        self
    }

    /// Builds the agent.
    #[inline]
    pub fn build(self) -> Agent {
        Agent::from_builder(self)
    }
}
