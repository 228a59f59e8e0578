//! Error types for the bridge.

use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("Authentication error: {message}")]
    Authentication { message: String },

    #[error("Malformed input: {message}")]
    MalformedInput { message: String },

    #[error("Translation error: {message}")]
    Translation { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Upstream error: {message}")]
    Upstream { status: Option<u16>, message: String },

    #[error("Upstream request timed out")]
    UpstreamTimeout,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl BridgeError {
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication {
            message: msg.into(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: msg.into(),
        }
    }

    pub fn translation(msg: impl Into<String>) -> Self {
        Self::Translation {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn upstream(status: Option<u16>, msg: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: msg.into(),
        }
    }

    /// HTTP status this error surfaces as at the protocol boundary.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Authentication { .. } => 401,
            Self::MalformedInput { .. } | Self::Json(_) => 400,
            Self::Config { .. } | Self::Io(_) | Self::Toml(_) => 500,
            Self::Upstream {
                status: Some(s), ..
            } if (400..600).contains(s) => *s,
            Self::Translation { .. } | Self::Upstream { .. } | Self::Http(_) => 502,
            Self::UpstreamTimeout => 504,
        }
    }

    /// Google RPC status string matching [`Self::status_code`].
    #[must_use]
    pub fn rpc_status(&self) -> &'static str {
        match self.status_code() {
            400 => "INVALID_ARGUMENT",
            401 => "UNAUTHENTICATED",
            504 => "DEADLINE_EXCEEDED",
            500 => "INTERNAL",
            _ => "UNAVAILABLE",
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(BridgeError::authentication("x").status_code(), 401);
        assert_eq!(BridgeError::malformed("x").status_code(), 400);
        assert_eq!(BridgeError::config("x").status_code(), 500);
        assert_eq!(BridgeError::translation("x").status_code(), 502);
        assert_eq!(BridgeError::UpstreamTimeout.status_code(), 504);
    }

    #[test]
    fn test_upstream_status_passthrough() {
        assert_eq!(BridgeError::upstream(Some(429), "slow down").status_code(), 429);
        assert_eq!(BridgeError::upstream(Some(200), "bad body").status_code(), 502);
        assert_eq!(BridgeError::upstream(None, "refused").status_code(), 502);
    }

    #[test]
    fn test_rpc_status() {
        assert_eq!(BridgeError::authentication("x").rpc_status(), "UNAUTHENTICATED");
        assert_eq!(BridgeError::malformed("x").rpc_status(), "INVALID_ARGUMENT");
        assert_eq!(BridgeError::UpstreamTimeout.rpc_status(), "DEADLINE_EXCEEDED");
        assert_eq!(BridgeError::upstream(Some(503), "down").rpc_status(), "UNAVAILABLE");
    }
}
