use crate::config::TargetSource;
use crate::credentials;
use crate::error::{BridgeError, Result};
use crate::logging::{ExchangeRecord, Protocol, SharedExchangeLog};
use crate::translate::claude_request::claude_to_openai;
use crate::translate::claude_response::openai_to_claude;
use crate::translate::claude_types::{self, MessagesRequest, MessagesResponse};
use crate::translate::gemini_request::gemini_to_openai;
use crate::translate::gemini_response::openai_to_gemini;
use crate::translate::gemini_types::{self, GenerateContentRequest, GenerateContentResponse};
use crate::upstream::UpstreamClient;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub target: Arc<dyn TargetSource>,
    pub upstream_timeout: Duration,
    pub exchanges: SharedExchangeLog,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/v1/messages", post(handle_messages))
        .route("/v1beta/models/:model_action", post(handle_generate_content))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Claude Messages
// ---------------------------------------------------------------------------

async fn handle_messages(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut record = ExchangeRecord::new(Protocol::Claude, "");

    match claude_exchange(&state, &headers, &body, &mut record).await {
        Ok(resp) => {
            state.exchanges.record(record.served(
                resp.model.clone(),
                resp.usage.input_tokens,
                resp.usage.output_tokens,
            ));
            Json(resp).into_response()
        }
        Err(e) => {
            warn!(protocol = "claude", error = %e, "Request failed");
            let status = status_of(&e);
            state
                .exchanges
                .record(record.failed(status.as_u16(), e.to_string()));
            (status, Json(claude_types::ErrorResponse::new(e.to_string()))).into_response()
        }
    }
}

async fn claude_exchange(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
    record: &mut ExchangeRecord,
) -> Result<MessagesResponse> {
    let api_key = credentials::from_request(headers, "x-api-key", None)?;

    let req: MessagesRequest = serde_json::from_slice(body)
        .map_err(|e| BridgeError::malformed(format!("Invalid request body: {e}")))?;
    record.requested_model = req.model.clone();

    if req.stream == Some(true) {
        warn!(model = %req.model, "Streaming requested; returning a buffered response");
    }

    let target = state.target.resolve_target()?;

    let mut openai_req = claude_to_openai(&req, &target.model);
    openai_req.max_tokens = Some(target.clamp(openai_req.max_tokens));

    info!(
        protocol = "claude",
        requested = %req.model,
        provider = %target.provider_name,
        model = %target.model,
        messages = openai_req.messages.len(),
        max_tokens = openai_req.max_tokens,
        "Forwarding request"
    );

    let upstream = UpstreamClient::new(&target.base_url, api_key, state.upstream_timeout)?;
    let openai_resp = upstream.complete(&openai_req).await?;
    let resp = openai_to_claude(&openai_resp, &target.reported_model())?;

    info!(
        protocol = "claude",
        stop_reason = %resp.stop_reason,
        input_tokens = resp.usage.input_tokens,
        output_tokens = resp.usage.output_tokens,
        "Completed"
    );

    Ok(resp)
}

// ---------------------------------------------------------------------------
// Gemini generateContent
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct GeminiQuery {
    pub key: Option<String>,
}

async fn handle_generate_content(
    State(state): State<Arc<AppState>>,
    Path(model_action): Path<String>,
    Query(query): Query<GeminiQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let (model, method) = split_model_action(&model_action);
    let record = ExchangeRecord::new(Protocol::Gemini, model);

    match gemini_exchange(&state, model, method, &headers, query.key.as_deref(), &body).await {
        Ok((resp, served_model)) => {
            state.exchanges.record(record.served(
                served_model,
                resp.usage_metadata.prompt_token_count,
                resp.usage_metadata.candidates_token_count,
            ));
            Json(resp).into_response()
        }
        Err(e) => {
            warn!(protocol = "gemini", error = %e, "Request failed");
            let status = status_of(&e);
            state
                .exchanges
                .record(record.failed(status.as_u16(), e.to_string()));
            let body =
                gemini_types::ErrorResponse::new(status.as_u16(), e.to_string(), e.rpc_status());
            (status, Json(body)).into_response()
        }
    }
}

async fn gemini_exchange(
    state: &AppState,
    model: &str,
    method: &str,
    headers: &HeaderMap,
    query_key: Option<&str>,
    body: &[u8],
) -> Result<(GenerateContentResponse, String)> {
    let api_key = credentials::from_request(headers, "x-goog-api-key", query_key)?;

    if method != "generateContent" {
        return Err(BridgeError::malformed(format!(
            "Unsupported method '{method}': only generateContent is served"
        )));
    }

    let req: GenerateContentRequest = serde_json::from_slice(body)
        .map_err(|e| BridgeError::malformed(format!("Invalid request body: {e}")))?;

    let target = state.target.resolve_target()?;

    let mut openai_req = gemini_to_openai(&req, &target.model);
    openai_req.max_tokens = Some(target.clamp(openai_req.max_tokens));

    info!(
        protocol = "gemini",
        requested = %model,
        provider = %target.provider_name,
        model = %target.model,
        messages = openai_req.messages.len(),
        max_tokens = openai_req.max_tokens,
        "Forwarding request"
    );

    let upstream = UpstreamClient::new(&target.base_url, api_key, state.upstream_timeout)?;
    let openai_resp = upstream.complete(&openai_req).await?;
    let resp = openai_to_gemini(&openai_resp, model)?;

    info!(
        protocol = "gemini",
        prompt_tokens = resp.usage_metadata.prompt_token_count,
        candidates_tokens = resp.usage_metadata.candidates_token_count,
        "Completed"
    );

    Ok((resp, target.reported_model()))
}

/// Split `gemini-pro:generateContent` into model and method. A bare model
/// name means `generateContent`.
fn split_model_action(model_action: &str) -> (&str, &str) {
    model_action
        .rsplit_once(':')
        .unwrap_or((model_action, "generateContent"))
}

// ---------------------------------------------------------------------------
// Misc
// ---------------------------------------------------------------------------

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn status_of(err: &BridgeError) -> StatusCode {
    StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::BAD_GATEWAY)
}
