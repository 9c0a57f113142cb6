use std::path::Path;

use sitebot_core::conversation::{ConversationLogger, FileLogger, InMemoryLogger};
use sitebot_core::partner::UrlTemplateLinker;
use sitebot_core::{Agent, AgentBuilder, RunReport};
use sitebot_model::{ConversationContext, PartnerProvider};
use sitebot_replay::{LoadError, ReplayProvider};

use crate::config::Config;
use crate::tools::*;

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    agent_builder: AgentBuilder,
    config: Config,
}

impl SessionBuilder {
    /// Creates a session builder with a specified partner provider.
    pub fn with_partner_provider<P: PartnerProvider + 'static>(provider: P) -> Self {
        let agent_builder = AgentBuilder::with_partner_provider(provider);
        Self {
            agent_builder,
            config: Config::default(),
        }
    }

    /// Creates a session builder replaying the conversation recorded in
    /// `conversation_file`, validated the way `config` says.
    pub fn with_recorded_conversation<P: AsRef<Path>>(
        conversation_file: P,
        config: Config,
    ) -> Result<Self, LoadError> {
        let provider = ReplayProvider::from_file(conversation_file)?
            .with_validation_mode(config.validation_mode());
        Ok(Self::with_partner_provider(provider).with_config(config))
    }

    /// Sets the configuration.
    #[inline]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        let Self {
            agent_builder,
            config,
        } = self;
        let website_dir = config.website_dir().to_owned();

        let mut agent_builder = agent_builder
            .with_system_prompt(config.system_prompt())
            .with_base_dir(&website_dir)
            .with_max_iterations(config.max_iterations())
            .with_tool(ListFilesTool::new(&website_dir))
            .with_tool(ReadFileTool::new(&website_dir))
            .with_tool(WriteFileTool::new(&website_dir))
            .with_tool(GitAddTool::new(&website_dir))
            .with_tool(GitCommitTool::new(&website_dir))
            .with_tool(GitPushTool::new(&website_dir));

        if let Some(log_dir) = config.log_dir() {
            let log_dir = log_dir.to_owned();
            agent_builder = agent_builder
                .with_conversation_logger(move |context| create_logger(&log_dir, context));
        }
        if let Some(template) = config.trace_url_template() {
            agent_builder = agent_builder.with_trace_linker(UrlTemplateLinker::new(template));
        }

        Session {
            agent: agent_builder.build(),
            config,
        }
    }
}

fn create_logger(log_dir: &Path, context: &ConversationContext) -> Box<dyn ConversationLogger> {
    match FileLogger::create(log_dir, context) {
        Ok(logger) => Box::new(logger),
        Err(err) => {
            warn!(
                log_dir = %log_dir.display(),
                "failed to create conversation log, keeping it in memory: {err}"
            );
            Box::new(InMemoryLogger::new(context))
        }
    }
}

/// A website agent session.
///
/// The session holds a fully configured agent with the file and git tools
/// bound to the website checkout, and is basically a wrapper around
/// [`Agent`].
pub struct Session {
    agent: Agent,
    config: Config,
}

impl Session {
    /// Returns the configuration the session was built with.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Works on an instruction, see [`Agent::run_instruction`].
    #[inline]
    pub async fn run_instruction(&self, instruction: &str) -> RunReport {
        self.agent.run_instruction(instruction).await
    }

    /// Works on an instruction and returns the final text.
    #[inline]
    pub async fn execute_instruction(&self, instruction: &str) -> String {
        self.agent.execute_instruction(instruction).await
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::config::ConfigBuilder;

    #[test]
    fn test_registers_all_tools() {
        let provider = ReplayProvider::new(sitebot_replay::ConversationScript::default().build());
        let session = SessionBuilder::with_partner_provider(provider)
            .with_config(ConfigBuilder::new().without_log().build())
            .build();
        let names: Vec<_> = session
            .agent
            .registry()
            .descriptors()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            ["git_add", "git_commit", "git_push", "list_files", "read_file", "write_file"]
        );
    }

    #[test]
    fn test_unwritable_log_dir_falls_back_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        let logger = create_logger(&blocker.join("logs"), &ConversationContext::default());
        assert!(logger.snapshot().exchanges.is_empty());
    }
}
