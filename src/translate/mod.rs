//! Schema translation between the Claude Messages, Gemini `generateContent`
//! and `OpenAI` Chat Completions formats.
//!
//! All translation functions are pure apart from id synthesis (no I/O, no
//! shared state) and never mutate their input.

pub mod claude_request;
pub mod claude_response;
pub mod claude_types;
pub mod gemini_request;
pub mod gemini_response;
pub mod gemini_types;
pub mod openai_types;
