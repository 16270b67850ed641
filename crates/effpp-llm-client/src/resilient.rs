//! Multi-key session with round-robin rotation and proxy escalation.
//!
//! A session owns an ordered list of official key slots plus an optional
//! proxy slot. Rate-limit responses first rotate through the official slots
//! for free; once `official + 1` limits have been seen in a row the session
//! moves to the proxy for good. Every other retryable failure spends one
//! unit of the retry budget and backs off linearly.

use std::fmt;
use std::sync::Arc;

use effpp_models::{DescriberKind, DescriberProvenance};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{LlmClientConfig, RetryConfig};
use crate::describer::Describer;
use crate::error::{LlmError, LlmResult};
use crate::http::RequestCore;
use crate::metrics;
use crate::prompt::{text_prompt, DescribeContext};
use crate::slot::{ActiveSlot, KeySlot, SlotKind, SlotPacer};
use crate::transport::HttpTransport;

/// Where the session stands in its request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingWindow,
    RequestInFlight,
    Success,
    LimitedAdvance,
    LimitedEscalate,
    Failed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::AwaitingWindow => "awaiting_window",
            SessionState::RequestInFlight => "request_in_flight",
            SessionState::Success => "success",
            SessionState::LimitedAdvance => "limited_advance",
            SessionState::LimitedEscalate => "limited_escalate",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What to do after a rate-limit response.
enum LimitAction {
    Advance(usize),
    Escalate(usize),
    Backoff(Option<usize>),
}

/// Describer session that rotates official keys and escalates to the proxy.
///
/// Rate limits rotate to the next official slot for free. Once every official
/// slot has been limited the session moves to the proxy for good. Other
/// retryable failures spend the retry budget with exponential backoff.
pub struct ResilientSession {
    core: RequestCore,
    /// Official slots first, proxy (if any) last.
    slots: Vec<KeySlot>,
    official_count: usize,
    proxy_index: Option<usize>,
    pacer: SlotPacer,
    active: ActiveSlot,
    consecutive_limits: usize,
    retry: RetryConfig,
    state: SessionState,
}

impl ResilientSession {
    pub fn new(
        config: &LlmClientConfig,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> LlmResult<Self> {
        config.validate()?;

        let mut slots: Vec<KeySlot> = config
            .official
            .iter()
            .map(|slot| KeySlot::from_config(SlotKind::Official, slot))
            .collect();
        let official_count = slots.len();
        let proxy_index = config.proxy.as_ref().map(|proxy| {
            slots.push(KeySlot::from_config(SlotKind::Proxy, proxy));
            official_count
        });

        let active = match proxy_index {
            Some(index) if config.force_proxy || official_count == 0 => ActiveSlot {
                index,
                escalated: true,
            },
            _ => ActiveSlot {
                index: 0,
                escalated: false,
            },
        };

        debug!(
            official = official_count,
            proxy = proxy_index.is_some(),
            start_slot = active.index,
            escalated = active.escalated,
            "Created resilient describer session"
        );

        Ok(Self {
            core: RequestCore::new(transport, clock, config.timeout, config.generation),
            pacer: SlotPacer::new(slots.len()),
            slots,
            official_count,
            proxy_index,
            active,
            consecutive_limits: 0,
            retry: config.retry,
            state: SessionState::Idle,
        })
    }

    pub fn active_slot(&self) -> ActiveSlot {
        self.active
    }

    pub fn active_kind(&self) -> SlotKind {
        self.slots[self.active.index].kind
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the session has moved to the proxy.
    pub fn is_escalated(&self) -> bool {
        self.active.escalated
    }

    /// Rate limits seen since the last success.
    pub fn consecutive_limits(&self) -> usize {
        self.consecutive_limits
    }

    /// Limits in a row that trigger escalation.
    fn limit_threshold(&self) -> usize {
        self.official_count + 1
    }

    fn next_official(&self) -> usize {
        if self.official_count == 0 {
            return self.active.index;
        }
        (self.active.index + 1) % self.official_count
    }

    fn on_rate_limit(&mut self) -> LimitAction {
        self.consecutive_limits += 1;
        if self.active.escalated {
            return LimitAction::Backoff(None);
        }
        if self.consecutive_limits < self.limit_threshold() {
            return LimitAction::Advance(self.next_official());
        }
        match self.proxy_index {
            Some(index) => LimitAction::Escalate(index),
            None => LimitAction::Backoff(Some(self.next_official())),
        }
    }

    fn spend_budget(&mut self, attempt: &mut u32, error: LlmError) -> LlmResult<()> {
        *attempt += 1;
        if *attempt > self.retry.max_retries {
            self.state = SessionState::Failed;
            warn!(
                attempts = *attempt - 1,
                slot = self.active.index,
                error = %error,
                "Retry budget exhausted"
            );
            return Err(LlmError::RetryExhausted {
                attempts: *attempt - 1,
                last: Box::new(error),
            });
        }
        let delay = self.retry.delay_for(*attempt);
        warn!(
            attempt = *attempt,
            delay_ms = delay.as_millis() as u64,
            slot = self.active.index,
            status = ?error.status(),
            "Describer request failed, retrying: {}",
            error
        );
        metrics::record_retry(error.outcome_label());
        self.core.clock().sleep(delay);
        Ok(())
    }
}

impl Describer for ResilientSession {
    fn describe(&mut self, ctx: &DescribeContext) -> LlmResult<String> {
        let prompt = text_prompt(ctx);
        let mut attempt = 0u32;

        loop {
            let index = self.active.index;
            self.state = SessionState::AwaitingWindow;
            self.core.await_window(&self.pacer, index, &self.slots[index]);

            self.state = SessionState::RequestInFlight;
            let error = match self.core.send(&mut self.pacer, index, &self.slots[index], &prompt) {
                Ok(text) => {
                    self.state = SessionState::Success;
                    self.consecutive_limits = 0;
                    return Ok(text);
                }
                Err(e) if e.is_terminal() => {
                    self.state = SessionState::Failed;
                    return Err(e);
                }
                Err(e) => e,
            };

            if !error.is_rate_limited() {
                self.spend_budget(&mut attempt, error)?;
                continue;
            }

            match self.on_rate_limit() {
                LimitAction::Advance(next) => {
                    self.state = SessionState::LimitedAdvance;
                    debug!(
                        from = index,
                        to = next,
                        consecutive = self.consecutive_limits,
                        "Rate limited, rotating key"
                    );
                    metrics::record_rotation();
                    self.active = ActiveSlot {
                        index: next,
                        escalated: false,
                    };
                }
                LimitAction::Escalate(proxy) => {
                    self.state = SessionState::LimitedEscalate;
                    info!(
                        from = index,
                        proxy_slot = proxy,
                        identity = %ctx.identity,
                        rank = ctx.rank,
                        "Official keys exhausted, escalating to proxy"
                    );
                    metrics::record_escalation();
                    self.active = ActiveSlot {
                        index: proxy,
                        escalated: true,
                    };
                    self.consecutive_limits = 0;
                }
                LimitAction::Backoff(next) => {
                    self.spend_budget(&mut attempt, error)?;
                    if let Some(next) = next {
                        self.active = ActiveSlot {
                            index: next,
                            escalated: false,
                        };
                    }
                }
            }
        }
    }

    fn provenance(&self) -> DescriberProvenance {
        let slot = &self.slots[self.active.index];
        DescriberProvenance {
            kind: DescriberKind::Resilient,
            model: Some(slot.model.clone()),
            provider: Some(slot.provider().to_string()),
            active_slot_index: Some(self.active.index),
            active_slot_kind: Some(slot.kind.as_str().to_string()),
            escalated_to_proxy: self.active.escalated,
            retry_budget: self.retry.max_retries,
            retry_delay_ms: self.retry.retry_delay.as_millis() as u64,
        }
    }
}
