//! Caller credential lookup.
//!
//! The bridge never validates a key: whatever the caller sends is forwarded
//! to the upstream provider as a bearer token.

use crate::error::{BridgeError, Result};
use axum::http::HeaderMap;

const BEARER_PREFIX: &str = "Bearer ";

/// Strip a `Bearer ` prefix if present, otherwise return the value verbatim.
#[must_use]
pub fn extract(header_value: Option<&str>) -> Option<&str> {
    let value = header_value?;
    Some(value.strip_prefix(BEARER_PREFIX).unwrap_or(value))
}

/// Look up the caller's credential, checking `Authorization` first, then the
/// protocol-specific `alternate_header`, then an optional query value.
/// A source that is empty after stripping `Bearer ` counts as absent.
pub fn from_request(
    headers: &HeaderMap,
    alternate_header: &str,
    query_key: Option<&str>,
) -> Result<String> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    [header("authorization"), header(alternate_header), query_key]
        .into_iter()
        .filter_map(extract)
        .find(|v| !v.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            BridgeError::authentication(format!(
                "Missing API key: provide an Authorization header or {alternate_header}"
            ))
        })
}
