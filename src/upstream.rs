//! Request-scoped client for the OpenAI-compatible upstream.
//!
//! A fresh [`UpstreamClient`] is built for every inbound request from the
//! resolved base URL and the caller's forwarded credential. Nothing is shared
//! between requests.

use crate::error::{BridgeError, Result};
use crate::translate::openai_types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatErrorResponse,
};
use std::time::Duration;

#[derive(Debug)]
pub struct UpstreamClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl UpstreamClient {
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one buffered chat completion and return the parsed response.
    ///
    /// # Errors
    /// `UpstreamTimeout` when the call times out, `Upstream` for transport
    /// failures, non-success statuses and unparsable bodies.
    pub async fn complete(&self, req: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        tracing::debug!(url = %self.url, model = %req.model, "POST upstream");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;

        tracing::debug!(status, body_len = body.len(), "Upstream responded");

        if !(200..300).contains(&status) {
            let message = serde_json::from_str::<ChatErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| {
                    format!("Provider returned status {}: {}", status, truncate(&body, 500))
                });
            tracing::warn!(status, %message, "Upstream error");
            return Err(BridgeError::upstream(Some(status), message));
        }

        serde_json::from_str(&body).map_err(|e| {
            BridgeError::upstream(
                Some(status),
                format!(
                    "Failed to parse provider response: {}. Body: {}",
                    e,
                    truncate(&body, 300)
                ),
            )
        })
    }
}

fn transport_error(e: reqwest::Error) -> BridgeError {
    if e.is_timeout() {
        BridgeError::UpstreamTimeout
    } else {
        BridgeError::upstream(None, format!("Request failed: {e}"))
    }
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_base() {
        let client =
            UpstreamClient::new("https://api.groq.com/openai/v1/", "k", Duration::from_secs(1))
                .unwrap();
        assert_eq!(client.url(), "https://api.groq.com/openai/v1/chat/completions");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("abcdef", 3), "abc");
    }
}
