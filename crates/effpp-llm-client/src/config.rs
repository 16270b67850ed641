//! Describer client configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{LlmError, LlmResult};

/// Endpoint shape spoken by a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiFlavor {
    /// `{model, messages, max_tokens, temperature}` -> `choices[].message.content`
    ChatCompletions,
    /// `{contents:[{role, parts}]}` -> `candidates[].content.parts[].text`
    GenerateContent,
}

impl ApiFlavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiFlavor::ChatCompletions => "chat",
            ApiFlavor::GenerateContent => "gemini",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ApiFlavor::ChatCompletions => "https://api.openai.com",
            ApiFlavor::GenerateContent => "https://generativelanguage.googleapis.com",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ApiFlavor::ChatCompletions => "gpt-4.1-mini",
            ApiFlavor::GenerateContent => "gemini-2.0-flash",
        }
    }

    /// Provider-specific key variable consulted when `LLM_API_KEYS` is unset.
    pub fn key_env_var(&self) -> &'static str {
        match self {
            ApiFlavor::ChatCompletions => "OPENAI_API_KEY",
            ApiFlavor::GenerateContent => "GEMINI_API_KEY",
        }
    }
}

impl fmt::Display for ApiFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ApiFlavor {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chat" | "chatgpt" | "openai" | "chat_completions" => Ok(ApiFlavor::ChatCompletions),
            "gemini" | "generate_content" => Ok(ApiFlavor::GenerateContent),
            other => Err(LlmError::config_error(format!("Unknown API flavor: {}", other))),
        }
    }
}

/// One credential and endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct SlotConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub flavor: ApiFlavor,
    /// Minimum time between two requests on this slot
    pub min_interval: Duration,
    pub extra_headers: Vec<(String, String)>,
}

impl fmt::Debug for SlotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("flavor", &self.flavor)
            .field("min_interval", &self.min_interval)
            .finish()
    }
}

impl SlotConfig {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        flavor: ApiFlavor,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            flavor,
            min_interval: Duration::ZERO,
            extra_headers: Vec::new(),
        }
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }
}

/// Retry budget and linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries allowed per describe call.
    pub max_retries: u32,
    /// Backoff unit; attempt `n` sleeps `n * retry_delay`.
    pub retry_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `attempt`, growing linearly.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(attempt)
    }
}

/// Generation parameters shared by all slots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 160,
            temperature: 0.2,
        }
    }
}

/// Client configuration: official slots, optional proxy and retry policy.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmClientConfig {
    /// Official slots in round-robin order
    pub official: Vec<SlotConfig>,
    pub proxy: Option<SlotConfig>,
    /// Start every session on the proxy slot
    pub force_proxy: bool,
    pub retry: RetryConfig,
    /// Per-call timeout
    pub timeout: Duration,
    pub generation: GenerationParams,
}

impl LlmClientConfig {
    pub fn new(official: Vec<SlotConfig>) -> Self {
        Self {
            official,
            proxy: None,
            force_proxy: false,
            retry: RetryConfig::default(),
            timeout: Duration::from_secs(180),
            generation: GenerationParams::default(),
        }
    }

    /// Add the proxy slot used after escalation.
    pub fn with_proxy(mut self, proxy: SlotConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Start every session on the proxy.
    pub fn with_force_proxy(mut self, force: bool) -> Self {
        self.force_proxy = force;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create config from environment variables.
    ///
    /// Official keys come from `LLM_API_KEYS` (comma-separated), falling
    /// back to the provider variable of `flavor`. Missing credentials are
    /// reported by [`validate`](Self::validate), not here.
    pub fn from_env(flavor: ApiFlavor) -> Self {
        let keys = std::env::var("LLM_API_KEYS")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| std::env::var(flavor.key_env_var()).ok())
            .unwrap_or_default();

        let base_url = std::env::var("LLM_BASE_URL")
            .ok()
            .or_else(|| match flavor {
                ApiFlavor::ChatCompletions => std::env::var("OPENAI_BASE_URL").ok(),
                ApiFlavor::GenerateContent => None,
            })
            .unwrap_or_else(|| flavor.default_base_url().to_string());
        let model = std::env::var("LLM_MODEL")
            .unwrap_or_else(|_| flavor.default_model().to_string());
        let min_interval = Duration::from_millis(
            std::env::var("LLM_MIN_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(4000),
        );

        let official = keys
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|key| {
                SlotConfig::new(key, base_url.clone(), model.clone(), flavor)
                    .with_min_interval(min_interval)
            })
            .collect();

        let proxy = match (
            std::env::var("LLM_PROXY_BASE_URL").ok(),
            std::env::var("LLM_PROXY_API_KEY").ok(),
        ) {
            (Some(proxy_url), Some(proxy_key)) if !proxy_key.trim().is_empty() => {
                let proxy_flavor = std::env::var("LLM_PROXY_FLAVOR")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(flavor);
                let proxy_model =
                    std::env::var("LLM_PROXY_MODEL").unwrap_or_else(|_| model.clone());
                let proxy_interval = Duration::from_millis(
                    std::env::var("LLM_PROXY_MIN_INTERVAL_MS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(0),
                );
                Some(
                    SlotConfig::new(proxy_key.trim(), proxy_url, proxy_model, proxy_flavor)
                        .with_min_interval(proxy_interval),
                )
            }
            _ => None,
        };

        Self {
            official,
            proxy,
            force_proxy: std::env::var("LLM_FORCE_PROXY")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            retry: RetryConfig {
                max_retries: std::env::var("LLM_RETRY_BUDGET")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3),
                retry_delay: Duration::from_millis(
                    std::env::var("LLM_RETRY_DELAY_MS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(5000),
                ),
            },
            timeout: Duration::from_secs(
                std::env::var("LLM_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(180),
            ),
            generation: GenerationParams {
                max_tokens: std::env::var("LLM_MAX_TOKENS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(160),
                temperature: std::env::var("LLM_TEMPERATURE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0.2),
            },
        }
    }

    /// Reject configurations no session could run with.
    pub fn validate(&self) -> LlmResult<()> {
        if self.official.is_empty() && self.proxy.is_none() {
            return Err(LlmError::config_error(
                "no API keys configured (set LLM_API_KEYS or a provider key)",
            ));
        }
        if self.force_proxy && self.proxy.is_none() {
            return Err(LlmError::config_error(
                "force_proxy is set but no proxy slot is configured",
            ));
        }
        let slots = self.official.iter().chain(self.proxy.iter());
        for slot in slots {
            if slot.api_key.trim().is_empty() {
                return Err(LlmError::config_error("empty API key"));
            }
            if !(slot.base_url.starts_with("http://") || slot.base_url.starts_with("https://")) {
                return Err(LlmError::config_error(format!(
                    "base URL must be http(s): {}",
                    slot.base_url
                )));
            }
        }
        Ok(())
    }

    /// Total slots, proxy included.
    pub fn slot_count(&self) -> usize {
        self.official.len() + usize::from(self.proxy.is_some())
    }
}
