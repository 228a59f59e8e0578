//! Translate Gemini `generateContent` requests into `OpenAI` Chat Completions requests.
//!
//! Gemini has no tool-call ids, so every `functionCall` part gets an id
//! synthesized by [`CallIdGenerator`]. A later `functionResponse` with the same
//! function name is paired with the oldest unanswered call of that name and
//! becomes an `OpenAI` `tool` message.

use std::collections::{HashMap, VecDeque};

use rand::{distributions::Alphanumeric, Rng};

use super::gemini_types::{Content, GenerateContentRequest, Part};
use super::openai_types::{
    ChatCompletionRequest, ChatMessage, ChatTool, ChatToolCall, ChatToolCallFunction,
};

const CALL_ID_SUFFIX_LEN: usize = 8;

/// Produces `call_<suffix><n>` ids: a random lowercase suffix fixed for the
/// generator's lifetime, followed by a counter, so ids never repeat within
/// one translation.
#[derive(Debug)]
pub struct CallIdGenerator {
    suffix: String,
    next: u64,
}

impl CallIdGenerator {
    #[must_use]
    pub fn new() -> Self {
        let suffix = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(CALL_ID_SUFFIX_LEN)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect();
        Self { suffix, next: 0 }
    }

    pub fn next_id(&mut self) -> String {
        let id = format!("call_{}{}", self.suffix, self.next);
        self.next += 1;
        id
    }
}

impl Default for CallIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Translate a Gemini request into an `OpenAI` Chat Completions request.
/// Pure apart from id synthesis: `max_tokens` is copied as requested and the
/// caller clamps it.
pub fn gemini_to_openai(req: &GenerateContentRequest, target_model: &str) -> ChatCompletionRequest {
    let mut ids = CallIdGenerator::new();
    let mut pending: HashMap<String, VecDeque<String>> = HashMap::new();
    let mut messages = Vec::with_capacity(req.contents.len() + 1);

    if let Some(ref instruction) = req.system_instruction {
        let text = text_parts(instruction).join("\n");
        if !text.is_empty() {
            messages.push(ChatMessage::text("system", text));
        }
    }

    for content in &req.contents {
        translate_content(content, &mut ids, &mut pending, &mut messages);
    }

    let declarations: Vec<ChatTool> = req
        .tools
        .iter()
        .flatten()
        .flat_map(|tool| &tool.function_declarations)
        .map(|decl| {
            ChatTool::function(
                decl.name.clone(),
                decl.description.clone(),
                decl.parameters.clone(),
            )
        })
        .collect();
    let tools = (!declarations.is_empty()).then_some(declarations);

    let config = req.generation_config.clone().unwrap_or_default();

    ChatCompletionRequest {
        model: target_model.to_string(),
        messages,
        max_tokens: config.max_output_tokens,
        temperature: config.temperature,
        top_p: config.top_p,
        tools,
        tool_choice: None,
        stop: config.stop_sequences,
        stream: false,
    }
}

/// Gemini's `model` role is `OpenAI`'s `assistant`; anything else is forwarded as-is.
pub fn map_role(role: &str) -> &str {
    match role {
        "model" => "assistant",
        other => other,
    }
}

fn translate_content(
    content: &Content,
    ids: &mut CallIdGenerator,
    pending: &mut HashMap<String, VecDeque<String>>,
    out: &mut Vec<ChatMessage>,
) {
    let role = map_role(&content.role);
    let mut texts: Vec<String> = Vec::new();
    let mut calls: Vec<ChatToolCall> = Vec::new();
    let mut results: Vec<ChatMessage> = Vec::new();

    for part in &content.parts {
        match part {
            Part::Text { text } => texts.push(text.clone()),
            Part::FunctionCall { function_call } => {
                let id = ids.next_id();
                pending
                    .entry(function_call.name.clone())
                    .or_default()
                    .push_back(id.clone());
                let arguments = if function_call.args.is_null() {
                    "{}".to_string()
                } else {
                    function_call.args.to_string()
                };
                calls.push(ChatToolCall {
                    id,
                    call_type: "function".to_string(),
                    function: ChatToolCallFunction {
                        name: function_call.name.clone(),
                        arguments,
                    },
                });
            }
            Part::FunctionResponse { function_response } => {
                let matched = pending
                    .get_mut(&function_response.name)
                    .and_then(VecDeque::pop_front);
                match matched {
                    Some(id) => results.push(ChatMessage {
                        role: "tool".to_string(),
                        content: Some(function_response.response.to_string()),
                        tool_calls: None,
                        tool_call_id: Some(id),
                    }),
                    None => texts.push(format_function_response(
                        &function_response.name,
                        &function_response.response,
                    )),
                }
            }
            Part::InlineData { inline_data } => {
                tracing::debug!(mime_type = %inline_data.mime_type, "Dropping inline data part");
            }
            Part::Other(_) => tracing::debug!("Dropping unrecognised Gemini part"),
        }
    }

    let had_results = !results.is_empty();
    out.append(&mut results);

    if !calls.is_empty() {
        out.push(ChatMessage {
            role: role.to_string(),
            content: (!texts.is_empty()).then(|| texts.join("\n")),
            tool_calls: Some(calls),
            tool_call_id: None,
        });
    } else if !texts.is_empty() || !had_results {
        out.push(ChatMessage::text(role, texts.join("\n")));
    }
}

fn text_parts(content: &Content) -> Vec<String> {
    content
        .parts
        .iter()
        .filter_map(|p| match p {
            Part::Text { text } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

/// Text rendering for a function response with no matching call in the request.
pub fn format_function_response(name: &str, response: &serde_json::Value) -> String {
    format!("<function_response name=\"{name}\">{response}</function_response>")
}
