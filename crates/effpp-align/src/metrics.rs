//! Alignment metrics.
//!
//! - Identities accepted by split consistency
//! - Identities rejected by reason
//! - Pairs resolved and missing frames per variant

use effpp_models::{RejectReason, Variant};
use metrics::counter;

/// Metric name constants for consistency.
pub mod names {
    /// Identities accepted into alignment.
    pub const IDENTITIES_ACCEPTED: &str = "effpp_alignment_identities_accepted_total";

    /// Identities rejected, by reason.
    pub const IDENTITIES_REJECTED: &str = "effpp_alignment_identities_rejected_total";

    /// Pairs included in pair manifests, by variant.
    pub const PAIRS_RESOLVED: &str = "effpp_pairs_resolved_total";

    /// Missing frame files, by variant and side.
    pub const FRAMES_MISSING: &str = "effpp_frames_missing_total";
}

/// Record an identity that passed grouping.
pub fn record_identity_accepted(split_consistent: bool) {
    let bucket = if split_consistent {
        "same_split"
    } else {
        "cross_split"
    };
    counter!(names::IDENTITIES_ACCEPTED, "split" => bucket).increment(1);
}

/// Record an identity dropped during grouping.
pub fn record_identity_rejected(reason: RejectReason) {
    counter!(names::IDENTITIES_REJECTED, "reason" => reason.as_str()).increment(1);
}

/// Record the outcome of one pair manifest.
pub fn record_pairs(
    variant: Variant,
    resolved: usize,
    missing_authentic: u32,
    missing_target: u32,
) {
    counter!(names::PAIRS_RESOLVED, "variant" => variant.as_str()).increment(resolved as u64);
    if missing_authentic > 0 {
        counter!(
            names::FRAMES_MISSING,
            "variant" => variant.as_str(),
            "side" => "authentic"
        )
        .increment(u64::from(missing_authentic));
    }
    if missing_target > 0 {
        counter!(
            names::FRAMES_MISSING,
            "variant" => variant.as_str(),
            "side" => "target"
        )
        .increment(u64::from(missing_target));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::IDENTITIES_ACCEPTED.contains("accepted"));
        assert!(names::IDENTITIES_REJECTED.contains("rejected"));
        assert!(names::FRAMES_MISSING.starts_with("effpp_"));
    }
}
