//! Describer request metrics.
//!
//! Provides standardized metrics for monitoring describer traffic:
//! - Request counters by slot kind and outcome
//! - Latency histograms
//! - Retry, rotation and escalation counters

use std::time::Duration;

use metrics::{counter, histogram};

use crate::slot::SlotKind;

/// Metric name constants for consistency.
pub mod names {
    /// Describer HTTP requests by slot kind and outcome.
    pub const REQUESTS_TOTAL: &str = "effpp_describer_requests_total";

    /// Request latency in seconds by slot kind.
    pub const LATENCY_SECONDS: &str = "effpp_describer_latency_seconds";

    /// Budgeted retries by reason.
    pub const RETRIES_TOTAL: &str = "effpp_describer_retries_total";

    /// Round-robin moves between official slots.
    pub const ROTATIONS_TOTAL: &str = "effpp_describer_rotations_total";

    /// Permanent switches to the proxy slot.
    pub const ESCALATIONS_TOTAL: &str = "effpp_describer_proxy_escalations_total";

    /// Time spent waiting for a slot's pacing window.
    pub const PACING_WAIT_SECONDS: &str = "effpp_describer_pacing_wait_seconds";
}

/// Record one HTTP request.
///
/// # Arguments
/// * `kind` - Slot kind that sent it
/// * `outcome` - Label such as "success" or "rate_limited"
/// * `latency` - Time until the response
pub fn record_request(kind: SlotKind, outcome: &'static str, latency: Duration) {
    counter!(
        names::REQUESTS_TOTAL,
        "slot_kind" => kind.as_str(),
        "outcome" => outcome
    )
    .increment(1);

    histogram!(names::LATENCY_SECONDS, "slot_kind" => kind.as_str()).record(latency.as_secs_f64());
}

/// Record a retry that spent budget.
pub fn record_retry(reason: &'static str) {
    counter!(names::RETRIES_TOTAL, "reason" => reason).increment(1);
}

/// Record a rotation to another official slot.
pub fn record_rotation() {
    counter!(names::ROTATIONS_TOTAL).increment(1);
}

/// Record a move to the proxy.
pub fn record_escalation() {
    counter!(names::ESCALATIONS_TOTAL).increment(1);
}

pub fn record_pacing_wait(wait: Duration) {
    histogram!(names::PACING_WAIT_SECONDS).record(wait.as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::REQUESTS_TOTAL.contains("requests"));
        assert!(names::RETRIES_TOTAL.contains("retries"));
        assert!(names::LATENCY_SECONDS.contains("latency"));
        assert!(names::ESCALATIONS_TOTAL.contains("escalations"));
    }
}
