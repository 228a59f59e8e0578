//! Translate Claude Messages API requests into `OpenAI` Chat Completions requests.
//!
//! Structured `tool_use` / `tool_result` blocks are flattened into marker text:
//! they describe tool executions that already happened, which the target model
//! only needs as context. Only the response direction produces structured
//! tool calls.

use super::claude_types::{ContentBlock, Message, MessageContent, MessagesRequest};
use super::openai_types::{ChatCompletionRequest, ChatMessage, ChatTool};

/// Translate a Claude Messages API request into an `OpenAI` Chat Completions request.
/// Pure function: `max_tokens` is copied as requested; the caller clamps it.
pub fn claude_to_openai(req: &MessagesRequest, target_model: &str) -> ChatCompletionRequest {
    let mut messages = Vec::with_capacity(req.messages.len() + 1);

    if let Some(ref system) = req.system {
        messages.push(ChatMessage::text("system", system.as_text()));
    }

    messages.extend(req.messages.iter().map(translate_message));

    let tools = req.tools.as_ref().map(|tools| {
        tools
            .iter()
            .map(|t| {
                ChatTool::function(
                    t.name.clone(),
                    t.description.clone().unwrap_or_default(),
                    t.input_schema.clone(),
                )
            })
            .collect()
    });

    ChatCompletionRequest {
        model: target_model.to_string(),
        messages,
        max_tokens: req.max_tokens,
        temperature: req.temperature,
        top_p: req.top_p,
        tools,
        tool_choice: req.tool_choice.clone(),
        stop: req.stop_sequences.clone(),
        stream: false,
    }
}

fn translate_message(msg: &Message) -> ChatMessage {
    let content = match &msg.content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Blocks(blocks) => flatten_blocks(blocks),
    };
    ChatMessage::text(msg.role.as_str(), content)
}

/// Flatten content blocks into one newline-joined string, in block order.
/// Block types without a text rendering are skipped.
pub fn flatten_blocks(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.clone()),
            ContentBlock::ToolUse { name, input, .. } => Some(format_tool_use(name, input)),
            ContentBlock::ToolResult { content, .. } => Some(format_tool_result(content)),
            ContentBlock::Unsupported => {
                tracing::debug!("Skipping unsupported content block");
                None
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `[Tool Use: <name>] <json-input>`
pub fn format_tool_use(name: &str, input: &serde_json::Value) -> String {
    format!("[Tool Use: {name}] {input}")
}

/// `<tool_result><json-content></tool_result>`
pub fn format_tool_result(content: &serde_json::Value) -> String {
    format!("<tool_result>{content}</tool_result>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::claude_types::*;
    use serde_json::json;

    fn request(messages: Vec<Message>) -> MessagesRequest {
        MessagesRequest {
            model: "claude-sonnet-4-20250514".to_string(),
            messages,
            max_tokens: Some(1024),
            system: None,
            temperature: None,
            top_p: None,
            stop_sequences: None,
            tools: None,
            tool_choice: None,
            stream: None,
        }
    }

    fn blocks(role: Role, blocks: Vec<ContentBlock>) -> Message {
        Message {
            role,
            content: MessageContent::Blocks(blocks),
        }
    }

    #[test]
    fn test_plain_text_is_copied_verbatim() {
        let req = request(vec![
            Message {
                role: Role::User,
                content: MessageContent::Text("Hello\n  there".to_string()),
            },
            Message {
                role: Role::Assistant,
                content: MessageContent::Text(String::new()),
            },
        ]);

        let result = claude_to_openai(&req, "kimi");

        assert_eq!(result.model, "kimi");
        assert_eq!(result.messages[0], ChatMessage::text("user", "Hello\n  there"));
        assert_eq!(result.messages[1], ChatMessage::text("assistant", ""));
        assert!(!result.stream);
    }

    #[test]
    fn test_tool_result_marker() {
        let req = request(vec![blocks(
            Role::User,
            vec![ContentBlock::ToolResult {
                tool_use_id: "t1".to_string(),
                content: json!({"ok": true}),
            }],
        )]);

        let result = claude_to_openai(&req, "m");
        let text = result.messages[0].content.clone().unwrap();
        assert!(text.contains(r#"<tool_result>{"ok":true}</tool_result>"#));
    }

    #[test]
    fn test_blocks_flatten_in_order() {
        let flattened = flatten_blocks(&[
            ContentBlock::Text {
                text: "Checking.".to_string(),
            },
            ContentBlock::ToolUse {
                id: "toolu_1".to_string(),
                name: "get_weather".to_string(),
                input: json!({"city": "Paris"}),
            },
            ContentBlock::Unsupported,
            ContentBlock::ToolResult {
                tool_use_id: "toolu_1".to_string(),
                content: json!("sunny"),
            },
        ]);

        assert_eq!(
            flattened,
            "Checking.\n[Tool Use: get_weather] {\"city\":\"Paris\"}\n<tool_result>\"sunny\"</tool_result>"
        );
    }

    #[test]
    fn test_system_and_passthrough_fields() {
        let mut req = request(vec![Message {
            role: Role::User,
            content: MessageContent::Text("hi".to_string()),
        }]);
        req.system = Some(SystemContent::Text("Be brief".to_string()));
        req.temperature = Some(0.2);
        req.top_p = Some(0.9);
        req.stop_sequences = Some(vec!["END".to_string(), "STOP".to_string()]);
        req.max_tokens = Some(50000);
        req.tool_choice = Some(json!({"type": "tool", "name": "lookup"}));
        req.tools = Some(vec![
            Tool {
                name: "lookup".to_string(),
                description: None,
                input_schema: json!({"type": "object"}),
            },
            Tool {
                name: "search".to_string(),
                description: Some("Search the web".to_string()),
                input_schema: json!({"type": "object", "properties": {"q": {"type": "string"}}}),
            },
        ]);

        let result = claude_to_openai(&req, "m");

        assert_eq!(result.messages[0], ChatMessage::text("system", "Be brief"));
        assert_eq!(result.messages[1].role, "user");
        assert_eq!(result.temperature, Some(0.2));
        assert_eq!(result.top_p, Some(0.9));
        assert_eq!(
            result.stop,
            Some(vec!["END".to_string(), "STOP".to_string()])
        );
        // clamping is the caller's job
        assert_eq!(result.max_tokens, Some(50000));
        assert_eq!(result.tool_choice, Some(json!({"type": "tool", "name": "lookup"})));

        let tools = result.tools.unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].tool_type, "function");
        assert_eq!(tools[0].function.name, "lookup");
        assert_eq!(tools[0].function.description, "");
        assert_eq!(tools[1].function.description, "Search the web");
        assert_eq!(tools[1].function.parameters["properties"]["q"]["type"], "string");
    }

    #[test]
    fn test_input_is_not_mutated() {
        let req = request(vec![blocks(
            Role::Assistant,
            vec![ContentBlock::ToolUse {
                id: "a".to_string(),
                name: "n".to_string(),
                input: json!({"k": [1, 2]}),
            }],
        )]);
        let before = serde_json::to_value(&req).unwrap();
        let _ = claude_to_openai(&req, "m");
        assert_eq!(serde_json::to_value(&req).unwrap(), before);
    }
}
