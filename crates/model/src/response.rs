use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Describes a tool invocation request from the partner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUse {
    /// The name of the tool to call.
    pub tool_name: String,
    /// The unique identifier for the request, echoed back by its result.
    pub id: String,
    /// The arguments to pass to the tool.
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// The partner's response when it wants tools run before giving a final
/// answer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUseRequests {
    /// Requests to execute, in order.
    pub requests: Vec<ToolUse>,
    /// Optional text accompanying the requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Terminal output of the partner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalResponse {
    /// The answer text.
    pub text: String,
}

impl FinalResponse {
    /// Creates a final response.
    #[inline]
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self { text: text.into() }
    }
}

/// A response from the conversation partner.
///
/// New response shapes may be added in the future, so consumers must
/// handle unknown variants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
#[non_exhaustive]
pub enum Response {
    /// The conversation is complete.
    #[serde(rename = "final")]
    Final(FinalResponse),
    /// The partner needs tool results before it can answer.
    #[serde(rename = "tool_requests")]
    ToolRequests(ToolUseRequests),
}

impl Response {
    /// Returns the wire-level tag of this response.
    #[inline]
    pub fn kind(&self) -> &'static str {
        match self {
            Response::Final(_) => "final",
            Response::ToolRequests(_) => "tool_requests",
        }
    }

    /// Returns the text carried by this response, if any.
    #[inline]
    pub fn text(&self) -> Option<&str> {
        match self {
            Response::Final(response) => Some(&response.text),
            Response::ToolRequests(requests) => requests.text.as_deref(),
        }
    }
}

impl From<FinalResponse> for Response {
    #[inline]
    fn from(response: FinalResponse) -> Self {
        Response::Final(response)
    }
}

impl From<ToolUseRequests> for Response {
    #[inline]
    fn from(requests: ToolUseRequests) -> Self {
        Response::ToolRequests(requests)
    }
}
