//! Per-worker describer construction.
//!
//! The orchestrator holds one factory and asks it for a fresh session per
//! worker, so rotation and pacing state is never shared across threads.

use std::sync::{Arc, Mutex};

use effpp_models::DescriberKind;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config::LlmClientConfig;
use crate::describer::{Describer, LocalModel, LocalModelSession, PlaceholderDescriber};
use crate::error::{LlmError, LlmResult};
use crate::http::HttpSession;
use crate::resilient::ResilientSession;
use crate::transport::{HttpTransport, ReqwestTransport};

/// Source of describer sessions.
///
/// One session is created per worker; sessions are never shared.
pub trait DescriberFactory: Send + Sync {
    /// Build an independent session.
    fn create(&self) -> LlmResult<Box<dyn Describer>>;

    /// Kind stamped into record provenance.
    fn kind(&self) -> DescriberKind;

    /// Whether several sessions may run at once.
    fn supports_parallel(&self) -> bool;
}

/// Sessions that return fixed text without any network call.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderFactory;

impl DescriberFactory for PlaceholderFactory {
    fn create(&self) -> LlmResult<Box<dyn Describer>> {
        Ok(Box::new(PlaceholderDescriber))
    }

    fn kind(&self) -> DescriberKind {
        DescriberKind::Placeholder
    }

    fn supports_parallel(&self) -> bool {
        true
    }
}

/// Builds [`HttpSession`]s for a single key and [`ResilientSession`]s otherwise.
pub struct HttpDescriberFactory {
    config: LlmClientConfig,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
}

impl HttpDescriberFactory {
    /// Create a factory backed by a real HTTP client.
    ///
    /// # Arguments
    /// * `config` - Validated here; slots, proxy and retry policy
    pub fn new(config: LlmClientConfig) -> LlmResult<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Self::with_transport(
            config,
            Arc::new(transport),
            Arc::new(SystemClock::new()),
        ))
    }

    /// Create a factory over a custom transport and clock.
    ///
    /// # Arguments
    /// * `config` - Slots, proxy and retry policy
    /// * `transport` - Sends every request
    /// * `clock` - Drives pacing and backoff sleeps
    pub fn with_transport(
        config: LlmClientConfig,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            transport,
            clock,
        }
    }

    pub fn config(&self) -> &LlmClientConfig {
        &self.config
    }

    fn is_single_slot(&self) -> bool {
        self.config.official.len() == 1 && self.config.proxy.is_none()
    }
}

impl DescriberFactory for HttpDescriberFactory {
    fn create(&self) -> LlmResult<Box<dyn Describer>> {
        if self.is_single_slot() {
            let session =
                HttpSession::new(&self.config, self.transport.clone(), self.clock.clone())?;
            return Ok(Box::new(session));
        }
        let session =
            ResilientSession::new(&self.config, self.transport.clone(), self.clock.clone())?;
        Ok(Box::new(session))
    }

    fn kind(&self) -> DescriberKind {
        if self.is_single_slot() {
            DescriberKind::Http
        } else {
            DescriberKind::Resilient
        }
    }

    fn supports_parallel(&self) -> bool {
        true
    }
}

/// Hands out the one loaded model. A second `create` is an error.
pub struct LocalModelFactory<M: LocalModel + 'static> {
    model: Mutex<Option<M>>,
}

impl<M: LocalModel + 'static> LocalModelFactory<M> {
    /// Wrap the loaded model for a single session.
    pub fn new(model: M) -> Self {
        Self {
            model: Mutex::new(Some(model)),
        }
    }
}

impl<M: LocalModel + 'static> DescriberFactory for LocalModelFactory<M> {
    fn create(&self) -> LlmResult<Box<dyn Describer>> {
        let model = self
            .model
            .lock()
            .map_err(|_| LlmError::local_model("model lock poisoned"))?
            .take()
            .ok_or_else(|| LlmError::config_error("local model session already created"))?;
        info!(model = model.model_name(), "Local model session created");
        Ok(Box::new(LocalModelSession::new(model)))
    }

    fn kind(&self) -> DescriberKind {
        DescriberKind::LocalModel
    }

    fn supports_parallel(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{ApiFlavor, SlotConfig};
    use crate::test_support::{chat_ok, context, status, ScriptedTransport};
    use crate::transport::{HttpRequest, HttpResponse};

    const PROXY: &str = "https://relay.example";

    fn slot(base: &str) -> SlotConfig {
        SlotConfig::new("key", base, "gpt-4.1-mini", ApiFlavor::ChatCompletions)
            .with_min_interval(Duration::ZERO)
    }

    struct NullModel;

    impl LocalModel for NullModel {
        fn generate(&mut self, _image_path: &Path, _prompt: &str) -> LlmResult<String> {
            Ok(String::new())
        }

        fn model_name(&self) -> &str {
            "null"
        }
    }

    #[test]
    fn test_kind_follows_slot_count() {
        let clock = Arc::new(ManualClock::new());
        let transport = ScriptedTransport::queue(ManualClock::new(), Vec::new());

        let single = HttpDescriberFactory::with_transport(
            LlmClientConfig::new(vec![slot("https://a.example")]),
            transport.clone(),
            clock.clone(),
        );
        assert_eq!(single.kind(), DescriberKind::Http);
        assert_eq!(single.create().unwrap().provenance().kind, DescriberKind::Http);

        let multi = HttpDescriberFactory::with_transport(
            LlmClientConfig::new(vec![slot("https://a.example")]).with_proxy(slot(PROXY)),
            transport,
            clock,
        );
        assert_eq!(multi.kind(), DescriberKind::Resilient);
        assert!(multi.supports_parallel());
    }

    #[test]
    fn test_invalid_config_fails_at_create() {
        let factory = HttpDescriberFactory::with_transport(
            LlmClientConfig::new(Vec::new()),
            ScriptedTransport::queue(ManualClock::new(), Vec::new()),
            Arc::new(ManualClock::new()),
        );
        assert!(matches!(factory.create(), Err(LlmError::Config(_))));
    }

    #[test]
    fn test_local_model_is_single_session() {
        let factory = LocalModelFactory::new(NullModel);
        assert!(!factory.supports_parallel());
        assert!(factory.create().is_ok());
        assert!(matches!(factory.create(), Err(LlmError::Config(_))));
    }

    /// Identity "A" is throttled on every official key; "B" never is.
    fn by_identity(request: &HttpRequest) -> LlmResult<HttpResponse> {
        let user = request.body["messages"][1]["content"].as_str().unwrap_or_default();
        if request.url.starts_with(PROXY) {
            return chat_ok("proxy");
        }
        if user.starts_with("Identity A,") {
            status(429, "rate limit exceeded")
        } else {
            chat_ok("official")
        }
    }

    #[test]
    fn test_parallel_sessions_do_not_share_rotation_state() {
        let clock = ManualClock::new();
        let transport = ScriptedTransport::routed(clock.clone(), by_identity);
        let slots = vec![slot("https://a.example"), slot("https://b.example")];
        let config = LlmClientConfig::new(slots).with_proxy(slot(PROXY));
        let factory = HttpDescriberFactory::with_transport(config, transport, Arc::new(clock));

        let results: Vec<(String, bool)> = std::thread::scope(|scope| {
            let handles: Vec<_> = ["A", "B"]
                .into_iter()
                .map(|identity| {
                    let factory = &factory;
                    scope.spawn(move || {
                        let mut session = factory.create().unwrap();
                        let mut ctx = context();
                        ctx.identity = identity.into();
                        let mut last = String::new();
                        for rank in 0..3 {
                            ctx.rank = rank;
                            last = session.describe(&ctx).unwrap();
                        }
                        (last, session.provenance().escalated_to_proxy)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results[0], ("proxy".to_string(), true));
        assert_eq!(results[1], ("official".to_string(), false));
    }
}
