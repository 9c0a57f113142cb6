use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A plain instruction sent to the partner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPrompt {
    /// The instruction text.
    pub text: String,
}

impl TextPrompt {
    /// Creates a text prompt.
    #[inline]
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self { text: text.into() }
    }
}

/// The outcome of one tool invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUseResult {
    /// The identifier of the [`ToolUse`](crate::ToolUse) this result
    /// answers.
    pub id: String,
    /// Arbitrary JSON payload produced by the tool dispatcher.
    pub result: Value,
}

/// A batch of tool results, sent back as the next prompt after the
/// partner requested tools.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUseResults {
    /// Results in the same order as the requests they answer.
    pub results: Vec<ToolUseResult>,
}

/// A prompt sent to the conversation partner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Prompt {
    /// A plain text instruction.
    #[serde(rename = "text")]
    Text(TextPrompt),
    /// Results of the tools requested by the previous response.
    #[serde(rename = "tool_results")]
    ToolResults(ToolUseResults),
}

impl Prompt {
    /// Returns the wire-level tag of this prompt.
    #[inline]
    pub fn kind(&self) -> &'static str {
        match self {
            Prompt::Text(_) => "text",
            Prompt::ToolResults(_) => "tool_results",
        }
    }

    /// Returns the text of a text prompt.
    #[inline]
    pub fn text(&self) -> Option<&str> {
        match self {
            Prompt::Text(prompt) => Some(&prompt.text),
            Prompt::ToolResults(_) => None,
        }
    }
}

impl From<TextPrompt> for Prompt {
    #[inline]
    fn from(prompt: TextPrompt) -> Self {
        Prompt::Text(prompt)
    }
}

impl From<ToolUseResults> for Prompt {
    #[inline]
    fn from(results: ToolUseResults) -> Self {
        Prompt::ToolResults(results)
    }
}
