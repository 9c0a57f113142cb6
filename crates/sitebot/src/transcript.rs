//! Renders a recorded conversation for reading in a terminal.
//!
//! Prompts are drawn as speech bubbles on the left, responses as speech
//! bubbles on the right, followed by the tool calls they requested.

use std::mem;
use std::path::Path;

use sitebot_model::{Conversation, Exchange, Prompt, Response};
use sitebot_replay::{LoadError, ReplayProvider};
use unicode_width::UnicodeWidthStr;

/// The width rendered transcripts are laid out for unless told otherwise.
pub const DEFAULT_WIDTH: usize = 80;

const MIN_BUBBLE_WIDTH: usize = 20;

/// Renders a conversation laid out for a terminal `width` columns wide.
pub fn render(conversation: &Conversation, width: usize) -> String {
    let rule = "=".repeat(width);
    let mut lines = vec![
        rule.clone(),
        format!("Conversation: {}", conversation.conversation_id),
        format!("Started: {}", conversation.timestamp.to_rfc3339()),
    ];
    if !conversation.tool_list.is_empty() {
        let names: Vec<_> = conversation
            .tool_list
            .iter()
            .map(|tool| tool.name.as_str())
            .collect();
        lines.push(format!("Tools: {}", names.join(", ")));
    }
    lines.push(rule.clone());

    for exchange in &conversation.exchanges {
        render_exchange(&mut lines, exchange, width);
        lines.push(rule.clone());
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// Loads a conversation document, either version, and renders it.
pub fn render_file<P: AsRef<Path>>(
    path: P,
    width: usize,
) -> Result<String, LoadError> {
    let provider = ReplayProvider::from_file(path)?;
    Ok(render(provider.conversation(), width))
}

fn render_exchange(lines: &mut Vec<String>, exchange: &Exchange, width: usize) {
    let bubble_width = (width / 2).saturating_sub(10).max(MIN_BUBBLE_WIDTH);

    lines.push(format!("[{}]", exchange.id));
    lines.extend(bubble(&prompt_text(&exchange.prompt), bubble_width));
    lines.push("    \\".to_owned());
    lines.push("     agent".to_owned());

    let response = response_text(&exchange.response);
    let partner = bubble(&response, bubble_width);
    let partner_width = partner.iter().map(|line| line.width()).max();
    let pad = " ".repeat(width.saturating_sub(partner_width.unwrap_or(0)));
    lines.extend(partner.into_iter().map(|line| format!("{pad}{line}")));
    lines.push(format!("{pad}   /"));
    lines.push(format!("{pad}partner"));

    if let Response::ToolRequests(requests) = &exchange.response {
        lines.push("Tool calls:".to_owned());
        for request in &requests.requests {
            lines.push(format!(
                "  - {} ({}): {}",
                request.tool_name,
                request.id,
                serde_json::Value::Object(request.parameters.clone())
            ));
        }
    }
}

fn prompt_text(prompt: &Prompt) -> String {
    match prompt {
        Prompt::Text(prompt) => prompt.text.clone(),
        Prompt::ToolResults(results) => results
            .results
            .iter()
            .map(|result| format!("result of {}: {}", result.id, result.result))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn response_text(response: &Response) -> String {
    match response.text() {
        Some(text) if !text.is_empty() => text.to_owned(),
        _ => format!("({})", response.kind()),
    }
}

fn bubble(text: &str, max_width: usize) -> Vec<String> {
    let lines = wrap(text, max_width);
    let inner = lines.iter().map(|line| line.width()).max().unwrap_or(0);
    let last = lines.len().saturating_sub(1);

    let mut bubble = vec![format!(" {}", "_".repeat(inner + 2))];
    for (index, line) in lines.iter().enumerate() {
        let (open, close) = if lines.len() == 1 {
            ('<', '>')
        } else if index == 0 {
            ('/', '\\')
        } else if index == last {
            ('\\', '/')
        } else {
            ('|', '|')
        };
        let fill = " ".repeat(inner - line.width());
        bubble.push(format!("{open} {line}{fill} {close}"));
    }
    bubble.push(format!(" {}", "-".repeat(inner + 2)));
    bubble
}

/// Wraps `text` at word boundaries. Words longer than `max_width` get a
/// line of their own.
fn wrap(text: &str, max_width: usize) -> Vec<String> {
    let mut lines = vec![];
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            if !line.is_empty() && line.width() + 1 + word.width() > max_width {
                lines.push(mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sitebot_model::{
        FinalResponse, TextPrompt, ToolUse, ToolUseRequests, ToolUseResult,
        ToolUseResults,
    };
    use sitebot_replay::ConversationScript;

    use super::*;

    #[test]
    fn test_wrap() {
        assert_eq!(wrap("one two three", 7), ["one two", "three"]);
        assert_eq!(wrap("first\nsecond", 80), ["first", "second"]);
        assert_eq!(wrap("", 10), [""]);
        assert_eq!(wrap("unbreakable", 4), ["unbreakable"]);
    }

    #[test]
    fn test_bubble() {
        assert_eq!(bubble("Hi", 20), [" ____", "< Hi >", " ----"]);
        assert_eq!(
            bubble("one two three", 7),
            [" _________", "/ one two \\", "\\ three   /", " ---------"]
        );
    }

    #[test]
    fn test_render() {
        let mut parameters = serde_json::Map::new();
        parameters.insert("directory".to_owned(), json!("."));
        let conversation = ConversationScript::default()
            .exchange(
                TextPrompt::new("rename hero tagline"),
                ToolUseRequests {
                    requests: vec![ToolUse {
                        tool_name: "list_files".to_owned(),
                        id: "t1".to_owned(),
                        parameters,
                    }],
                    text: None,
                },
            )
            .exchange(
                ToolUseResults {
                    results: vec![ToolUseResult {
                        id: "t1".to_owned(),
                        result: json!({ "success": true }),
                    }],
                },
                FinalResponse::new("Done"),
            )
            .build();

        let text = render(&conversation, DEFAULT_WIDTH);
        assert!(text.contains(&conversation.conversation_id));
        assert!(text.contains("< rename hero tagline >"));
        assert!(text.contains("< (tool_requests) >"));
        assert!(text.contains("  - list_files (t1): {\"directory\":\".\"}"));
        assert!(text.contains("< result of t1: {\"success\":true} >"));
        let done = text.lines().find(|line| line.ends_with("< Done >")).unwrap();
        assert_eq!(done.width(), DEFAULT_WIDTH);
    }

    #[test]
    fn test_render_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversation.json");
        let conversation = ConversationScript::default()
            .exchange(TextPrompt::new("Hi"), FinalResponse::new("Hello"))
            .build();
        std::fs::write(&path, conversation.to_json().unwrap()).unwrap();

        let text = render_file(&path, DEFAULT_WIDTH).unwrap();
        assert!(text.contains("< Hello >"));
        assert!(render_file(dir.path().join("missing.json"), 80).is_err());
    }
}
