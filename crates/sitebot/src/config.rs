use std::path::{Path, PathBuf};

use sitebot_core::DEFAULT_MAX_ITERATIONS;
use sitebot_replay::ValidationMode;

/// The log directory used unless configured otherwise.
pub const DEFAULT_LOG_DIR: &str = "conversation_history";

/// The system prompt used unless configured otherwise.
pub const DEFAULT_SYSTEM_PROMPT: &str = include_str!("./system_prompt.md");

/// Builder for [`Config`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigBuilder {
    website_dir: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    no_log: bool,
    max_iterations: Option<usize>,
    strict_replay: bool,
    trace_url_template: Option<String>,
    system_prompt: Option<String>,
}

impl ConfigBuilder {
    /// Creates a builder with every setting at its default.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the website checkout the tools work in.
    #[inline]
    pub fn with_website_dir<P: Into<PathBuf>>(mut self, website_dir: P) -> Self {
        self.website_dir = Some(website_dir.into());
        self
    }

    /// Sets the directory conversations are logged into.
    #[inline]
    pub fn with_log_dir<P: Into<PathBuf>>(mut self, log_dir: P) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }

    /// Disables conversation logging to disk.
    #[inline]
    pub fn without_log(mut self) -> Self {
        self.no_log = true;
        self
    }

    /// Sets the maximum number of partner calls per instruction.
    #[inline]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Makes a replayed conversation fail on the first prompt that differs
    /// from the recording, instead of warning about it.
    #[inline]
    pub fn with_strict_replay(mut self, strict: bool) -> Self {
        self.strict_replay = strict;
        self
    }

    /// Sets the template of trace links, see
    /// [`UrlTemplateLinker`](sitebot_core::partner::UrlTemplateLinker).
    #[inline]
    pub fn with_trace_url_template<S: Into<String>>(mut self, template: S) -> Self {
        self.trace_url_template = Some(template.into());
        self
    }

    /// Sets the system prompt.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, system_prompt: S) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Config {
        let log_dir = if self.no_log {
            None
        } else {
            Some(self.log_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)))
        };
        Config {
            website_dir: self.website_dir.unwrap_or_else(|| PathBuf::from(".")),
            log_dir,
            max_iterations: self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            validation_mode: if self.strict_replay {
                ValidationMode::Strict
            } else {
                ValidationMode::Warn
            },
            trace_url_template: self.trace_url_template,
            system_prompt: self
                .system_prompt
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_owned()),
        }
    }
}

/// Settings of a website agent session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub(crate) website_dir: PathBuf,
    pub(crate) log_dir: Option<PathBuf>,
    pub(crate) max_iterations: usize,
    pub(crate) validation_mode: ValidationMode,
    pub(crate) trace_url_template: Option<String>,
    pub(crate) system_prompt: String,
}

impl Config {
    /// Returns the website checkout the tools work in.
    #[inline]
    pub fn website_dir(&self) -> &Path {
        &self.website_dir
    }

    /// Returns the log directory, or `None` when logging to disk is
    /// disabled.
    #[inline]
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }

    /// Returns the maximum number of partner calls per instruction.
    #[inline]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Returns how replayed prompts are validated.
    #[inline]
    pub fn validation_mode(&self) -> ValidationMode {
        self.validation_mode
    }

    /// Returns the template of trace links.
    #[inline]
    pub fn trace_url_template(&self) -> Option<&str> {
        self.trace_url_template.as_deref()
    }

    /// Returns the system prompt.
    #[inline]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

impl Default for Config {
    #[inline]
    fn default() -> Self {
        ConfigBuilder::new().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.website_dir(), Path::new("."));
        assert_eq!(config.log_dir(), Some(Path::new(DEFAULT_LOG_DIR)));
        assert_eq!(config.max_iterations(), 10);
        assert_eq!(config.validation_mode(), ValidationMode::Warn);
        assert_eq!(config.trace_url_template(), None);
        assert!(!config.system_prompt().is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = ConfigBuilder::new()
            .with_website_dir("site")
            .with_log_dir("logs")
            .without_log()
            .with_max_iterations(3)
            .with_strict_replay(true)
            .with_trace_url_template("https://traces.example.com/{trace_id}")
            .with_system_prompt("Be brief.")
            .build();
        assert_eq!(config.website_dir(), Path::new("site"));
        assert_eq!(config.log_dir(), None);
        assert_eq!(config.max_iterations(), 3);
        assert_eq!(config.validation_mode(), ValidationMode::Strict);
        assert_eq!(
            config.trace_url_template(),
            Some("https://traces.example.com/{trace_id}")
        );
        assert_eq!(config.system_prompt(), "Be brief.");
    }
}
