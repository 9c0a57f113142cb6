//! Support for the legacy wire formats.
//!
//! Version `1.0` documents store exchanges as flat text with optional
//! tool call lists, and older partners embedded tool calls in the
//! response text. Both are converted into the typed model here, at the
//! boundary, and never used elsewhere.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::conversation::{Conversation, Exchange};
use crate::record::{deserialize_metadata, parse_timestamp};
use crate::request::{Prompt, TextPrompt, ToolUseResult, ToolUseResults};
use crate::response::{FinalResponse, Response, ToolUse, ToolUseRequests};

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```tool\s*(\{.*?\})\s*```").expect("valid regex")
});

static TAGGED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<tool>\s*(.*?)\s*</tool>\s*<arguments>\s*(.*?)\s*</arguments>")
        .expect("valid regex")
});

#[derive(Deserialize)]
struct FencedCall {
    #[serde(alias = "tool_name", alias = "tool")]
    name: String,
    #[serde(default, alias = "parameters")]
    arguments: Map<String, Value>,
}

/// Extracts tool calls written in the legacy text syntax.
///
/// Two syntaxes are recognized, in text order:
///
/// ````text
/// ```tool
/// { "name": "list_files", "arguments": { "directory": "." } }
/// ```
/// ````
///
/// and
///
/// ```text
/// <tool>list_files</tool>
/// <arguments>{ "directory": "." }</arguments>
/// ```
///
/// Request ids are `<id_prefix>-<n>`, 1-indexed. Blocks whose JSON does
/// not parse stay in the text. Returns `None` if no call was found.
pub fn parse_tool_calls(text: &str, id_prefix: &str) -> Option<ToolUseRequests> {
    let mut calls: Vec<(usize, usize, String, Map<String, Value>)> = vec![];

    for captures in FENCED_BLOCK.captures_iter(text) {
        let (Some(block), Some(body)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let Ok(call) = serde_json::from_str::<FencedCall>(body.as_str()) else {
            continue;
        };
        calls.push((block.start(), block.end(), call.name, call.arguments));
    }

    for captures in TAGGED_BLOCK.captures_iter(text) {
        let (Some(block), Some(name), Some(body)) =
            (captures.get(0), captures.get(1), captures.get(2))
        else {
            continue;
        };
        let Ok(arguments) = serde_json::from_str::<Map<String, Value>>(body.as_str())
        else {
            continue;
        };
        calls.push((block.start(), block.end(), name.as_str().to_owned(), arguments));
    }

    if calls.is_empty() {
        return None;
    }
    calls.sort_by_key(|(start, ..)| *start);

    let mut remaining = String::new();
    let mut cursor = 0;
    let mut requests = Vec::with_capacity(calls.len());
    for (start, end, tool_name, parameters) in calls {
        if start < cursor {
            // Overlaps a block that was already taken.
            continue;
        }
        remaining.push_str(&text[cursor..start]);
        cursor = end;
        requests.push(ToolUse {
            tool_name,
            id: format!("{id_prefix}-{}", requests.len() + 1),
            parameters,
        });
    }
    remaining.push_str(&text[cursor..]);

    let remaining = remaining.trim();
    Some(ToolUseRequests {
        requests,
        text: (!remaining.is_empty()).then(|| remaining.to_owned()),
    })
}

#[derive(Deserialize)]
pub(crate) struct LegacyDocument {
    #[serde(default)]
    conversation_id: String,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    system_prompt: String,
    #[serde(default, deserialize_with = "deserialize_metadata")]
    metadata: Map<String, Value>,
    exchanges: Vec<LegacyExchange>,
}

#[derive(Deserialize)]
struct LegacyExchange {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    prompt: LegacyPrompt,
    #[serde(default)]
    response: LegacyResponse,
}

#[derive(Default, Deserialize)]
struct LegacyPrompt {
    #[serde(default, alias = "prompt_text")]
    text: String,
    #[serde(default)]
    tool_calls: Vec<LegacyToolCall>,
}

#[derive(Default, Deserialize)]
struct LegacyResponse {
    #[serde(default, alias = "response_text")]
    text: String,
    #[serde(default)]
    tool_calls: Vec<LegacyToolCall>,
}

#[derive(Deserialize)]
struct LegacyToolCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(alias = "name")]
    tool_name: String,
    #[serde(default, alias = "arguments")]
    parameters: Map<String, Value>,
    #[serde(default)]
    result: Value,
}

impl LegacyDocument {
    pub(crate) fn into_conversation(self) -> Conversation {
        let timestamp = self
            .timestamp
            .as_deref()
            .and_then(|text| parse_timestamp(text).ok())
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        let exchanges = self
            .exchanges
            .into_iter()
            .enumerate()
            .map(|(idx, exchange)| exchange.into_exchange(idx + 1))
            .collect();

        Conversation {
            conversation_id: self.conversation_id,
            timestamp,
            system_prompt: self.system_prompt,
            tool_list: vec![],
            exchanges,
            metadata: self.metadata,
        }
    }
}

impl LegacyExchange {
    fn into_exchange(self, number: usize) -> Exchange {
        let prompt = if self.prompt.tool_calls.is_empty() {
            Prompt::Text(TextPrompt::new(self.prompt.text))
        } else {
            // Results answer the calls requested by the previous exchange.
            let results = self
                .prompt
                .tool_calls
                .into_iter()
                .enumerate()
                .map(|(idx, call)| ToolUseResult {
                    id: call
                        .id
                        .unwrap_or_else(|| format!("legacy-{}-{}", number - 1, idx + 1)),
                    result: call.result,
                })
                .collect();
            Prompt::ToolResults(ToolUseResults { results })
        };

        let response = if self.response.tool_calls.is_empty() {
            let prefix = format!("legacy-{number}");
            match parse_tool_calls(&self.response.text, &prefix) {
                Some(requests) => Response::ToolRequests(requests),
                None => Response::Final(FinalResponse::new(self.response.text)),
            }
        } else {
            let requests = self
                .response
                .tool_calls
                .into_iter()
                .enumerate()
                .map(|(idx, call)| ToolUse {
                    id: call
                        .id
                        .unwrap_or_else(|| format!("legacy-{number}-{}", idx + 1)),
                    tool_name: call.tool_name,
                    parameters: call.parameters,
                })
                .collect();
            let text = self.response.text.trim();
            Response::ToolRequests(ToolUseRequests {
                requests,
                text: (!text.is_empty()).then(|| text.to_owned()),
            })
        };

        Exchange {
            id: self.id.unwrap_or_else(|| Exchange::id_for_index(number - 1)),
            prompt,
            response,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_fenced_block() {
        let text = r#"I'll help you update the hero section. First, let me look.

```tool
{
  "name": "list_files",
  "arguments": {
    "directory": "."
  }
}
```"#;
        let requests = parse_tool_calls(text, "call").unwrap();
        assert_eq!(requests.requests.len(), 1);
        assert_eq!(requests.requests[0].tool_name, "list_files");
        assert_eq!(requests.requests[0].id, "call-1");
        assert_eq!(
            Value::Object(requests.requests[0].parameters.clone()),
            json!({ "directory": "." })
        );
        assert_eq!(
            requests.text.as_deref(),
            Some("I'll help you update the hero section. First, let me look.")
        );
    }

    #[test]
    fn test_parse_tagged_blocks_in_order() {
        let text = r#"<tool>read_file</tool>
<arguments>{ "file_path": "index.html" }</arguments>
Then:
```tool
{ "tool": "write_file", "parameters": { "file_path": "index.html", "content": "x" } }
```"#;
        let requests = parse_tool_calls(text, "t").unwrap();
        let names: Vec<_> = requests
            .requests
            .iter()
            .map(|r| r.tool_name.as_str())
            .collect();
        assert_eq!(names, ["read_file", "write_file"]);
        assert_eq!(requests.requests[1].id, "t-2");
        assert_eq!(requests.text.as_deref(), Some("Then:"));
    }

    #[test]
    fn test_malformed_block_is_kept() {
        assert!(parse_tool_calls("```tool\n{ not json }\n```", "t").is_none());
        assert!(parse_tool_calls("All done.", "t").is_none());
    }

    #[test]
    fn test_read_legacy_document() {
        let conversation = Conversation::from_record(json!({
            "version": "1.0",
            "conversation_id": "abc",
            "timestamp": "2025-04-20T12:00:00",
            "exchanges": [
                {
                    "id": "exchange-1",
                    "prompt": { "text": "update tagline", "metadata": { "temperature": 0.7 } },
                    "response": {
                        "text": "Looking.",
                        "tool_calls": [
                            {
                                "tool_name": "list_files",
                                "parameters": { "directory": "." },
                                "result": null
                            }
                        ]
                    }
                },
                {
                    "prompt": {
                        "prompt_text": "results",
                        "tool_calls": [
                            {
                                "tool_name": "list_files",
                                "parameters": {},
                                "result": { "files": ["index.html"] }
                            }
                        ]
                    },
                    "response": { "response_text": "Done" }
                }
            ]
        }))
        .unwrap();

        assert_eq!(conversation.conversation_id, "abc");
        assert_eq!(conversation.exchanges.len(), 2);

        let first = &conversation.exchanges[0];
        assert_eq!(first.prompt, Prompt::Text(TextPrompt::new("update tagline")));
        let Response::ToolRequests(requests) = &first.response else {
            panic!("expected tool requests, got {:?}", first.response);
        };
        assert_eq!(requests.requests[0].id, "legacy-1-1");
        assert_eq!(requests.text.as_deref(), Some("Looking."));

        let second = &conversation.exchanges[1];
        assert_eq!(second.id, "exchange-2");
        let Prompt::ToolResults(results) = &second.prompt else {
            panic!("expected tool results, got {:?}", second.prompt);
        };
        assert_eq!(results.results[0].id, "legacy-1-1");
        assert_eq!(results.results[0].result, json!({ "files": ["index.html"] }));
        assert_eq!(second.response, Response::Final(FinalResponse::new("Done")));
    }

    #[test]
    fn test_legacy_text_calls_become_requests() {
        let conversation = Conversation::from_record(json!({
            "version": "1.0",
            "exchanges": [{
                "prompt": { "text": "hi" },
                "response": { "text": "<tool>list_files</tool><arguments>{}</arguments>" }
            }]
        }))
        .unwrap();
        let Response::ToolRequests(requests) = &conversation.exchanges[0].response else {
            panic!("expected tool requests");
        };
        assert_eq!(requests.requests[0].id, "legacy-1-1");
        assert_eq!(requests.text, None);
    }
}
