//! Single-key HTTP session and the request core shared with the resilient
//! session.

use std::sync::Arc;
use std::time::Duration;

use effpp_models::{DescriberKind, DescriberProvenance};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::{GenerationParams, LlmClientConfig, RetryConfig};
use crate::describer::Describer;
use crate::error::{LlmError, LlmResult};
use crate::metrics;
use crate::prompt::{text_prompt, DescribeContext, Prompt};
use crate::slot::{KeySlot, SlotKind, SlotPacer};
use crate::transport::{HttpRequest, HttpTransport};
use crate::wire;

/// Sends prompts to one slot at a time. Holds no per-slot state itself.
pub(crate) struct RequestCore {
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    generation: GenerationParams,
}

impl RequestCore {
    pub(crate) fn new(
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        timeout: Duration,
        generation: GenerationParams,
    ) -> Self {
        Self {
            transport,
            clock,
            timeout,
            generation,
        }
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Sleep until `slot`'s pacing window opens.
    pub(crate) fn await_window(&self, pacer: &SlotPacer, index: usize, slot: &KeySlot) {
        let wait = pacer.remaining(index, slot.min_interval, self.clock.now());
        if !wait.is_zero() {
            debug!(slot = index, wait_ms = wait.as_millis() as u64, "Waiting for pacing window");
            metrics::record_pacing_wait(wait);
            self.clock.sleep(wait);
        }
    }

    /// Issue one request. The slot's timestamp is stamped before sending so
    /// pacing holds whatever the outcome.
    pub(crate) fn send(
        &self,
        pacer: &mut SlotPacer,
        index: usize,
        slot: &KeySlot,
        prompt: &Prompt,
    ) -> LlmResult<String> {
        let started = self.clock.now();
        pacer.mark(index, started);

        let request = HttpRequest {
            url: slot.url.clone(),
            headers: slot.headers.clone(),
            body: wire::request_body(slot.flavor, &slot.model, prompt, &self.generation)?,
            timeout: self.timeout,
        };

        let result = self.transport.post_json(&request).and_then(|response| {
            if response.status == 200 {
                wire::extract_text(slot.flavor, &response.body)
            } else {
                Err(LlmError::from_http_status(response.status, &response.body))
            }
        });

        let latency = self.clock.now().saturating_sub(started);
        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.outcome_label(),
        };
        metrics::record_request(slot.kind, outcome, latency);
        result
    }
}

/// Retry loop over a single fixed slot.
pub struct HttpSession {
    core: RequestCore,
    slot: KeySlot,
    pacer: SlotPacer,
    retry: RetryConfig,
}

impl HttpSession {
    /// Build from the first official slot of `config`.
    pub fn new(
        config: &LlmClientConfig,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> LlmResult<Self> {
        config.validate()?;
        let (kind, slot_config) = match config.official.first() {
            Some(slot) => (SlotKind::Official, slot),
            None => match &config.proxy {
                Some(proxy) => (SlotKind::Proxy, proxy),
                None => return Err(LlmError::config_error("no API key configured")),
            },
        };
        Ok(Self {
            core: RequestCore::new(transport, clock, config.timeout, config.generation),
            slot: KeySlot::from_config(kind, slot_config),
            pacer: SlotPacer::new(1),
            retry: config.retry,
        })
    }

    pub fn last_request(&self) -> Option<Duration> {
        self.pacer.last_request(0)
    }
}

impl Describer for HttpSession {
    fn describe(&mut self, ctx: &DescribeContext) -> LlmResult<String> {
        let prompt = text_prompt(ctx);
        let mut attempt = 0u32;
        loop {
            self.core.await_window(&self.pacer, 0, &self.slot);
            let error = match self.core.send(&mut self.pacer, 0, &self.slot, &prompt) {
                Ok(text) => return Ok(text),
                Err(e) if e.is_terminal() => return Err(e),
                Err(e) => e,
            };

            attempt += 1;
            if attempt > self.retry.max_retries {
                warn!(attempts = attempt - 1, error = %error, "Retry budget exhausted");
                return Err(LlmError::RetryExhausted {
                    attempts: attempt - 1,
                    last: Box::new(error),
                });
            }
            let delay = self.retry.delay_for(attempt);
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                status = ?error.status(),
                "Describer request failed, retrying: {}",
                error
            );
            metrics::record_retry(error.outcome_label());
            self.core.clock().sleep(delay);
        }
    }

    fn provenance(&self) -> DescriberProvenance {
        DescriberProvenance {
            kind: DescriberKind::Http,
            model: Some(self.slot.model.clone()),
            provider: Some(self.slot.provider().to_string()),
            active_slot_index: Some(0),
            active_slot_kind: Some(self.slot.kind.as_str().to_string()),
            escalated_to_proxy: false,
            retry_budget: self.retry.max_retries,
            retry_delay_ms: self.retry.retry_delay.as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{ApiFlavor, SlotConfig};
    use crate::test_support::{chat_ok, context, status, ScriptedTransport};

    fn config(retries: u32) -> LlmClientConfig {
        LlmClientConfig::new(vec![SlotConfig::new(
            "k",
            "https://api.openai.com",
            "gpt-4.1-mini",
            ApiFlavor::ChatCompletions,
        )
        .with_min_interval(Duration::from_secs(4))])
        .with_retry(RetryConfig {
            max_retries: retries,
            retry_delay: Duration::from_secs(5),
        })
    }

    #[test]
    fn test_success_and_pacing() {
        let clock = ManualClock::new();
        let transport = ScriptedTransport::queue(clock.clone(), vec![chat_ok("a"), chat_ok("b")]);
        let mut session =
            HttpSession::new(&config(3), transport.clone(), Arc::new(clock.clone())).unwrap();

        assert_eq!(session.describe(&context()).unwrap(), "a");
        assert_eq!(session.describe(&context()).unwrap(), "b");

        let times = transport.call_times();
        assert_eq!(times.len(), 2);
        assert!(times[1] - times[0] >= Duration::from_secs(4));
    }

    #[test]
    fn test_retryable_failures_back_off_linearly() {
        let clock = ManualClock::new();
        let transport = ScriptedTransport::queue(
            clock.clone(),
            vec![status(500, "boom"), status(429, "slow down"), chat_ok("done")],
        );
        let mut session =
            HttpSession::new(&config(3), transport.clone(), Arc::new(clock.clone())).unwrap();

        assert_eq!(session.describe(&context()).unwrap(), "done");
        // Backoff 5s then 10s; both already exceed the 4s interval.
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5), Duration::from_secs(10)]);
    }

    #[test]
    fn test_terminal_status_not_retried() {
        let clock = ManualClock::new();
        let transport =
            ScriptedTransport::queue(clock.clone(), vec![status(401, "bad key"), chat_ok("x")]);
        let mut session = HttpSession::new(&config(3), transport.clone(), Arc::new(clock)).unwrap();

        let err = session.describe(&context()).unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(transport.call_count(), 1);
    }

    #[test]
    fn test_budget_exhaustion_reports_last_error() {
        let clock = ManualClock::new();
        let transport = ScriptedTransport::queue(
            clock.clone(),
            vec![status(502, "a"), status(502, "b"), status(504, "c")],
        );
        let mut session = HttpSession::new(&config(2), transport.clone(), Arc::new(clock)).unwrap();

        match session.describe(&context()).unwrap_err() {
            LlmError::RetryExhausted { attempts, last } => {
                assert_eq!(attempts, 2);
                assert_eq!(last.status(), Some(504));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(transport.call_count(), 3);
    }

    #[test]
    fn test_missing_credentials_fail_construction() {
        let clock = ManualClock::new();
        let transport = ScriptedTransport::queue(clock.clone(), Vec::new());
        let result =
            HttpSession::new(&LlmClientConfig::new(Vec::new()), transport, Arc::new(clock));
        assert!(matches!(result, Err(LlmError::Config(_))));
    }
}
