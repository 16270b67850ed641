//! Key slots and the session's active-slot selector.

use std::fmt;
use std::time::Duration;

use crate::config::{ApiFlavor, SlotConfig};

/// Whether a slot is an official endpoint or the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Official,
    Proxy,
}

impl SlotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKind::Official => "official",
            SlotKind::Proxy => "proxy",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resolved endpoint, credential headers and pacing interval.
///
/// Immutable once built; the request timestamp lives in [`SlotPacer`].
#[derive(Clone)]
pub struct KeySlot {
    pub kind: SlotKind,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub model: String,
    pub flavor: ApiFlavor,
    pub min_interval: Duration,
}

impl fmt::Debug for KeySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySlot")
            .field("kind", &self.kind)
            .field("url", &self.url)
            .field("model", &self.model)
            .field("flavor", &self.flavor)
            .field("min_interval", &self.min_interval)
            .finish()
    }
}

impl KeySlot {
    /// Resolve the request URL and headers for a slot.
    ///
    /// # Arguments
    /// * `kind` - Official or proxy
    /// * `config` - Key, base URL, model and API flavor
    pub fn from_config(kind: SlotKind, config: &SlotConfig) -> Self {
        let base = config.base_url.trim_end_matches('/');
        let (url, auth) = match config.flavor {
            ApiFlavor::ChatCompletions => {
                let url = if base.ends_with("/v1") {
                    format!("{}/chat/completions", base)
                } else {
                    format!("{}/v1/chat/completions", base)
                };
                (
                    url,
                    (
                        "Authorization".to_string(),
                        format!("Bearer {}", config.api_key),
                    ),
                )
            }
            ApiFlavor::GenerateContent => (
                format!("{}/v1beta/models/{}:generateContent", base, config.model),
                ("x-goog-api-key".to_string(), config.api_key.clone()),
            ),
        };

        let mut headers = vec![auth];
        headers.extend(config.extra_headers.iter().cloned());

        Self {
            kind,
            url,
            headers,
            model: config.model.clone(),
            flavor: config.flavor,
            min_interval: config.min_interval,
        }
    }

    /// Host part of the endpoint URL.
    pub fn provider(&self) -> &str {
        let rest = self
            .url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.url);
        rest.split('/').next().unwrap_or(rest)
    }
}

/// Which slot the session talks to. Replaced whole, never edited in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveSlot {
    pub index: usize,
    /// Set once the session has moved to the proxy; never cleared.
    pub escalated: bool,
}

/// Last request time per slot.
#[derive(Debug, Clone)]
pub struct SlotPacer {
    last_request: Vec<Option<Duration>>,
}

impl SlotPacer {
    /// Pacing state for `slots` slots, none used yet.
    pub fn new(slots: usize) -> Self {
        Self {
            last_request: vec![None; slots],
        }
    }

    /// Time left before `slot` may be used again at `now`.
    pub fn remaining(&self, index: usize, interval: Duration, now: Duration) -> Duration {
        match self.last_request.get(index).copied().flatten() {
            Some(last) => interval.saturating_sub(now.saturating_sub(last)),
            None => Duration::ZERO,
        }
    }

    /// Record that slot `index` sent a request at `now`.
    pub fn mark(&mut self, index: usize, now: Duration) {
        if let Some(entry) = self.last_request.get_mut(index) {
            *entry = Some(now);
        }
    }

    pub fn last_request(&self, index: usize) -> Option<Duration> {
        self.last_request.get(index).copied().flatten()
    }
}
