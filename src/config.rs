use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "moonshotai/kimi-k2-instruct";
pub const DEFAULT_PROVIDER: &str = "groq";
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MAX_TOKENS: u64 = 16384;

pub const ENV_MODEL: &str = "TARGET_MODEL";
pub const ENV_PROVIDER: &str = "TARGET_PROVIDER";
pub const ENV_BASE_URL: &str = "TARGET_BASE_URL";
pub const ENV_MAX_TOKENS: &str = "TARGET_MAX_TOKENS";

/// Server-level settings loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
    /// Fallback target values, used where the environment leaves a field unset.
    #[serde(default)]
    pub target: RawTargetConfig,
}

/// Unvalidated target settings, exactly as an operator wrote them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTargetConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<String>,
}

/// Resolved provider target for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConfig {
    pub model: String,
    pub provider_name: String,
    pub base_url: String,
    pub max_tokens: u64,
}

fn default_port() -> u16 {
    8787
}

fn default_upstream_timeout_secs() -> u64 {
    300
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            target: RawTargetConfig::default(),
        }
    }
}

impl BridgeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file.
    /// Priority: CLI arg > CWD > XDG config > home dir. With no file anywhere,
    /// the built-in defaults apply and targets come from the environment.
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in &config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(candidate);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }
}

impl RawTargetConfig {
    /// Read the four target variables from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            model: lookup(ENV_MODEL),
            provider: lookup(ENV_PROVIDER),
            base_url: lookup(ENV_BASE_URL),
            max_tokens: lookup(ENV_MAX_TOKENS),
        }
    }

    /// Fill every absent or empty field from `fallback`.
    #[must_use]
    pub fn overlay(self, fallback: &RawTargetConfig) -> Self {
        let pick = |own: Option<String>, other: &Option<String>| {
            non_empty(own).or_else(|| non_empty(other.clone()))
        };
        Self {
            model: pick(self.model, &fallback.model),
            provider: pick(self.provider, &fallback.provider),
            base_url: pick(self.base_url, &fallback.base_url),
            max_tokens: pick(self.max_tokens, &fallback.max_tokens),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolve raw settings into a target, applying defaults to absent or empty fields.
///
/// # Errors
/// Returns `BridgeError::Config` when `max_tokens` is present but is not a
/// positive base-10 integer.
pub fn resolve(raw: &RawTargetConfig) -> Result<TargetConfig> {
    let text = |v: &Option<String>, default: &str| {
        non_empty(v.clone()).unwrap_or_else(|| default.to_string())
    };

    let max_tokens = match non_empty(raw.max_tokens.clone()) {
        None => DEFAULT_MAX_TOKENS,
        Some(value) => match value.trim().parse::<u64>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(BridgeError::config(format!(
                    "max_tokens must be a positive integer, got '{value}'"
                )))
            }
        },
    };

    Ok(TargetConfig {
        model: text(&raw.model, DEFAULT_MODEL),
        provider_name: text(&raw.provider, DEFAULT_PROVIDER),
        base_url: text(&raw.base_url, DEFAULT_BASE_URL),
        max_tokens,
    })
}

/// Clamp a requested token budget to the provider ceiling.
/// An absent or zero request means "as much as the ceiling allows".
#[must_use]
pub fn clamp_max_tokens(requested: Option<u64>, ceiling: u64) -> u64 {
    requested
        .filter(|&n| n > 0)
        .unwrap_or(ceiling)
        .min(ceiling)
}

impl TargetConfig {
    #[must_use]
    pub fn clamp(&self, requested: Option<u64>) -> u64 {
        clamp_max_tokens(requested, self.max_tokens)
    }

    /// Model name shown to Claude callers, e.g. `groq/moonshotai/kimi-k2-instruct`.
    #[must_use]
    pub fn reported_model(&self) -> String {
        format!("{}/{}", self.provider_name, self.model)
    }
}

/// Supplies unresolved target settings for each request.
pub trait TargetSource: Send + Sync {
    fn raw_target(&self) -> RawTargetConfig;

    fn resolve_target(&self) -> Result<TargetConfig> {
        resolve(&self.raw_target())
    }
}

impl TargetSource for RawTargetConfig {
    fn raw_target(&self) -> RawTargetConfig {
        self.clone()
    }
}

/// Reads the environment on every call, falling back to file-provided values.
#[derive(Debug, Clone, Default)]
pub struct EnvTargetSource {
    pub fallback: RawTargetConfig,
}

impl EnvTargetSource {
    #[must_use]
    pub fn new(fallback: RawTargetConfig) -> Self {
        Self { fallback }
    }
}

impl TargetSource for EnvTargetSource {
    fn raw_target(&self) -> RawTargetConfig {
        RawTargetConfig::from_env().overlay(&self.fallback)
    }
}

pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("llm-bridge.toml")];

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        paths.push(PathBuf::from(xdg).join("llm-bridge").join("config.toml"));
    }
    if let Some(home) = home_dir() {
        paths.push(home.join(".config").join("llm-bridge").join("config.toml"));
        paths.push(home.join(".llm-bridge.toml"));
    }

    paths
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
