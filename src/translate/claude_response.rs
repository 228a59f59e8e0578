use super::claude_types::{MessagesResponse, ResponseContentBlock, Usage};
use super::openai_types::{ChatCompletionResponse, ChatToolCall};
use crate::error::{BridgeError, Result};

/// Translate an `OpenAI` Chat Completion response into a Claude Messages response.
/// `reported_model` is echoed back so the caller can see which model served it.
///
/// # Errors
/// Returns `BridgeError::Translation` when the response has no choices or a
/// tool call carries arguments that are not valid JSON.
pub fn openai_to_claude(
    resp: &ChatCompletionResponse,
    reported_model: &str,
) -> Result<MessagesResponse> {
    let choice = resp
        .choices
        .first()
        .ok_or_else(|| BridgeError::translation("Upstream response contained no choices"))?;

    let (content, stop_reason) = match choice.message.non_empty_tool_calls() {
        Some(calls) => (
            calls.iter().map(tool_use_block).collect::<Result<Vec<_>>>()?,
            "tool_use",
        ),
        None => (
            vec![ResponseContentBlock::Text {
                text: choice.message.content.clone().unwrap_or_default(),
            }],
            "end_turn",
        ),
    };

    let usage = resp.usage.as_ref().map_or_else(Usage::default, |u| Usage {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
    });

    Ok(MessagesResponse {
        id: format!("msg_{}", uuid::Uuid::new_v4().simple()),
        response_type: "message".to_string(),
        role: "assistant".to_string(),
        content,
        model: reported_model.to_string(),
        stop_reason: stop_reason.to_string(),
        stop_sequence: None,
        usage,
    })
}

fn tool_use_block(call: &ChatToolCall) -> Result<ResponseContentBlock> {
    Ok(ResponseContentBlock::ToolUse {
        id: call.id.clone(),
        name: call.function.name.clone(),
        input: parse_arguments(call)?,
    })
}

/// Parse a tool call's JSON-encoded arguments. Malformed arguments mean the
/// upstream model produced bad output, so this fails rather than substituting.
pub fn parse_arguments(call: &ChatToolCall) -> Result<serde_json::Value> {
    serde_json::from_str(&call.function.arguments).map_err(|e| {
        BridgeError::translation(format!(
            "Tool call '{}' has invalid JSON arguments: {}",
            call.function.name, e
        ))
    })
}
