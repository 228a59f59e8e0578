use super::claude_response::parse_arguments;
use super::gemini_types::{
    Candidate, Content, FunctionCall, GenerateContentResponse, Part, UsageMetadata,
};
use super::openai_types::ChatCompletionResponse;
use crate::error::{BridgeError, Result};

/// Translate an `OpenAI` Chat Completion response into a Gemini `generateContent` response.
/// `requested_model` is the model name from the caller's URL, echoed as `modelVersion`.
///
/// # Errors
/// Returns `BridgeError::Translation` when the response has no choices or a
/// tool call carries arguments that are not valid JSON.
pub fn openai_to_gemini(
    resp: &ChatCompletionResponse,
    requested_model: &str,
) -> Result<GenerateContentResponse> {
    let choice = resp
        .choices
        .first()
        .ok_or_else(|| BridgeError::translation("Upstream response contained no choices"))?;

    let mut parts = Vec::new();

    if let Some(text) = choice.message.content.as_deref().filter(|t| !t.is_empty()) {
        parts.push(Part::Text {
            text: text.to_string(),
        });
    }

    for call in choice.message.tool_calls.iter().flatten() {
        parts.push(Part::FunctionCall {
            function_call: FunctionCall {
                name: call.function.name.clone(),
                args: parse_arguments(call)?,
            },
        });
    }

    let usage_metadata = resp
        .usage
        .as_ref()
        .map_or_else(UsageMetadata::default, |u| UsageMetadata {
            prompt_token_count: u.prompt_tokens,
            candidates_token_count: u.completion_tokens,
            total_token_count: u.total_tokens,
        });

    Ok(GenerateContentResponse {
        candidates: vec![Candidate {
            content: Content {
                role: "model".to_string(),
                parts,
            },
            finish_reason: map_finish_reason(choice.finish_reason.as_deref()).to_string(),
            index: 0,
        }],
        usage_metadata,
        model_version: requested_model.to_string(),
    })
}

/// Map `OpenAI` `finish_reason` to Gemini `finishReason`. Only `length` is
/// distinguished; everything else, tool calls included, is a normal stop.
#[must_use]
pub fn map_finish_reason(reason: Option<&str>) -> &'static str {
    match reason {
        Some("length") => "MAX_TOKENS",
        _ => "STOP",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::gemini_request::gemini_to_openai;
    use crate::translate::gemini_types::GenerateContentRequest;
    use crate::translate::openai_types::*;
    use serde_json::json;

    fn response(message: ChoiceMessage, finish_reason: &str) -> ChatCompletionResponse {
        ChatCompletionResponse {
            id: "chatcmpl-1".to_string(),
            model: "kimi".to_string(),
            choices: vec![Choice {
                index: 0,
                message,
                finish_reason: Some(finish_reason.to_string()),
            }],
            usage: Some(ChatUsage {
                prompt_tokens: 7,
                completion_tokens: 5,
                total_tokens: 12,
            }),
        }
    }

    #[test]
    fn test_text_response_envelope() {
        let resp = response(
            ChoiceMessage {
                content: Some("Hi there".to_string()),
                ..ChoiceMessage::default()
            },
            "stop",
        );
        let result = openai_to_gemini(&resp, "gemini-2.0-flash").unwrap();

        assert_eq!(result.model_version, "gemini-2.0-flash");
        assert_eq!(result.candidates.len(), 1);
        let candidate = &result.candidates[0];
        assert_eq!(candidate.index, 0);
        assert_eq!(candidate.finish_reason, "STOP");
        assert_eq!(candidate.content.role, "model");
        assert_eq!(
            candidate.content.parts,
            vec![Part::Text {
                text: "Hi there".to_string()
            }]
        );
        assert_eq!(
            result.usage_metadata,
            UsageMetadata {
                prompt_token_count: 7,
                candidates_token_count: 5,
                total_token_count: 12,
            }
        );
    }

    #[test]
    fn test_empty_text_produces_no_part() {
        let mut resp = response(
            ChoiceMessage {
                content: Some(String::new()),
                ..ChoiceMessage::default()
            },
            "stop",
        );
        resp.usage = None;
        let result = openai_to_gemini(&resp, "m").unwrap();
        assert!(result.candidates[0].content.parts.is_empty());
        assert_eq!(result.usage_metadata, UsageMetadata::default());
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(map_finish_reason(Some("length")), "MAX_TOKENS");
        assert_eq!(map_finish_reason(Some("stop")), "STOP");
        assert_eq!(map_finish_reason(Some("tool_calls")), "STOP");
        assert_eq!(map_finish_reason(Some("content_filter")), "STOP");
        assert_eq!(map_finish_reason(None), "STOP");
    }

    #[test]
    fn test_malformed_arguments_fail() {
        let resp = response(
            ChoiceMessage {
                tool_calls: Some(vec![ChatToolCall {
                    id: "c".to_string(),
                    call_type: "function".to_string(),
                    function: ChatToolCallFunction {
                        name: "f".to_string(),
                        arguments: "not json".to_string(),
                    },
                }]),
                ..ChoiceMessage::default()
            },
            "tool_calls",
        );
        assert!(matches!(
            openai_to_gemini(&resp, "m"),
            Err(BridgeError::Translation { .. })
        ));
    }

    #[test]
    fn test_function_call_round_trip() {
        let req: GenerateContentRequest = serde_json::from_value(json!({
            "contents": [{"role": "model", "parts": [{"functionCall": {"name": "f", "args": {"x": 1}}}]}]
        }))
        .unwrap();

        let openai_req = gemini_to_openai(&req, "m");
        let upstream = response(
            ChoiceMessage {
                role: Some("assistant".to_string()),
                content: openai_req.messages[0].content.clone(),
                tool_calls: openai_req.messages[0].tool_calls.clone(),
            },
            "tool_calls",
        );

        let result = openai_to_gemini(&upstream, "m").unwrap();
        let candidate = &result.candidates[0];

        assert_eq!(candidate.finish_reason, "STOP");
        assert_eq!(
            candidate.content.parts,
            vec![Part::FunctionCall {
                function_call: FunctionCall {
                    name: "f".to_string(),
                    args: json!({"x": 1}),
                }
            }]
        );
    }
}
