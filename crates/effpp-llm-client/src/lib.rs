//! Describer backends for EFF++ annotations.
//!
//! This crate provides:
//! - The `Describer` capability with placeholder, local-model, single-key
//!   HTTP and multi-key resilient backends
//! - Key-slot rotation, per-slot pacing and one-way proxy escalation
//! - Both supported endpoint shapes (chat completions, generateContent)
//! - Per-worker session factories

pub mod clock;
pub mod config;
pub mod describer;
pub mod error;
pub mod factory;
pub mod http;
pub mod metrics;
pub mod prompt;
pub mod resilient;
pub mod slot;
pub mod transport;
pub mod wire;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ApiFlavor, GenerationParams, LlmClientConfig, RetryConfig, SlotConfig};
pub use describer::{
    Describer, LocalModel, LocalModelSession, PlaceholderDescriber, PLACEHOLDER_TEXT,
};
pub use error::{LlmError, LlmResult};
pub use factory::{DescriberFactory, HttpDescriberFactory, LocalModelFactory, PlaceholderFactory};
pub use http::HttpSession;
pub use prompt::{DescribeContext, Prompt};
pub use resilient::{ResilientSession, SessionState};
pub use slot::{ActiveSlot, KeySlot, SlotKind};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
