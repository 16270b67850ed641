//! Frame Alignment Engine.
//!
//! Picks one common, strictly increasing set of frame offsets per identity,
//! bounded by the shortest of its five videos.

use std::collections::BTreeMap;

use effpp_models::{
    AlignmentRecord, AlignmentSummary, IdentityFamily, IdentityKey, RejectReason, SplitHistogram,
    Variant,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::grouper::GroupingOutcome;
use crate::metrics;

/// Default number of frames sampled per identity.
pub const DEFAULT_TARGET_K: usize = 128;

/// Default shuffle seed.
pub const DEFAULT_SEED: u64 = 2025;

/// Evenly spaced offsets in `[0, length)`.
///
/// - `length == 0` or `k == 0`: empty
/// - `k >= length`: `0..length`
/// - `k == 1`: `[0]`
/// - otherwise `round(i * step)` with `step = (length-1)/(k-1)`, ties to
///   even, pushed forward past the previous offset and clamped to
///   `length-1`.
pub fn compute_frame_offsets(length: u32, k: usize) -> Vec<u32> {
    if length == 0 || k == 0 {
        return Vec::new();
    }
    if k >= length as usize {
        return (0..length).collect();
    }
    if k == 1 {
        return vec![0];
    }

    let last = length - 1;
    let step = f64::from(last) / (k - 1) as f64;
    let mut offsets: Vec<u32> = Vec::with_capacity(k);
    for rank in 0..k {
        let mut position = ((rank as f64) * step).round_ties_even() as u32;
        if let Some(&previous) = offsets.last() {
            if position <= previous {
                position = (previous + 1).min(last);
            }
        }
        offsets.push(position.min(last));
    }
    // step > 1 whenever k < length, so neither the push-forward nor the
    // clamp ever produces a repeated offset.
    debug_assert!(offsets.windows(2).all(|w| w[0] < w[1]));
    offsets
}

/// Align one family.
pub fn align(family: &IdentityFamily, k: usize) -> Result<AlignmentRecord, RejectReason> {
    if Variant::ALL.iter().any(|v| family.video(*v).is_none()) {
        return Err(RejectReason::MissingVariant);
    }
    let min_length = family.min_length();
    if min_length == 0 {
        return Err(RejectReason::ZeroLength);
    }
    let primary_split = family
        .primary_split()
        .cloned()
        .ok_or(RejectReason::MissingVariant)?;

    Ok(AlignmentRecord {
        identity: family.identity.clone(),
        primary_split,
        min_length,
        frame_offsets: compute_frame_offsets(min_length, k),
        split_consistent: family.split_consistent(),
        split_histogram: family.split_histogram(),
        videos: family.videos.clone(),
    })
}

/// Alignment parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentPlan {
    pub k: usize,
    pub seed: u64,
    /// Drop identities whose variants come from different splits.
    pub require_consistent: bool,
}

impl Default for AlignmentPlan {
    fn default() -> Self {
        Self {
            k: DEFAULT_TARGET_K,
            seed: DEFAULT_SEED,
            require_consistent: false,
        }
    }
}

/// Accepted records in shuffled order plus the global summary.
#[derive(Debug, Clone)]
pub struct AlignmentRun {
    pub records: Vec<AlignmentRecord>,
    pub summary: AlignmentSummary,
}

impl AlignmentRun {
    /// Record for `identity`, if it was aligned.
    pub fn record(&self, identity: &IdentityKey) -> Option<&AlignmentRecord> {
        self.records.iter().find(|r| &r.identity == identity)
    }
}

/// Align every grouped family.
///
/// Acceptance and offsets depend only on the families and `plan.k`; the
/// seeded shuffle touches output order alone.
pub fn build_alignment(grouping: &GroupingOutcome, plan: &AlignmentPlan) -> AlignmentRun {
    let mut summary = AlignmentSummary {
        k: plan.k,
        seed: plan.seed,
        require_consistent: plan.require_consistent,
        ..AlignmentSummary::default()
    };
    let mut histogram = SplitHistogram::default();

    for (identity, reason) in &grouping.rejected {
        debug!(identity = %identity, reason = %reason, "Counting grouping rejection");
        summary.record_rejection(*reason);
        metrics::record_identity_rejected(*reason);
    }

    let mut records = Vec::with_capacity(grouping.families.len());
    for family in &grouping.families {
        let record = match align(family, plan.k) {
            Ok(record) => record,
            Err(reason) => {
                debug!(identity = %family.identity, reason = %reason, "Identity rejected");
                summary.record_rejection(reason);
                metrics::record_identity_rejected(reason);
                continue;
            }
        };

        if record.split_consistent {
            histogram.same_split += 1;
        } else if plan.require_consistent {
            histogram.excluded_cross_split += 1;
            summary.record_rejection(RejectReason::SplitInconsistent);
            metrics::record_identity_rejected(RejectReason::SplitInconsistent);
            continue;
        } else {
            histogram.cross_split += 1;
        }

        metrics::record_identity_accepted(record.split_consistent);
        records.push(record);
    }

    let mut rng = StdRng::seed_from_u64(plan.seed);
    records.shuffle(&mut rng);

    let mut per_split: BTreeMap<String, usize> = BTreeMap::new();
    for record in &records {
        *per_split
            .entry(record.primary_split.as_str().to_string())
            .or_insert(0) += 1;
    }

    summary.total_records = records.len();
    summary.histogram = histogram;
    summary.per_split = per_split;

    info!(
        accepted = summary.total_records,
        rejected = summary.rejected_total(),
        same_split = summary.histogram.same_split,
        cross_split = summary.histogram.cross_split,
        excluded_cross_split = summary.histogram.excluded_cross_split,
        k = plan.k,
        "Alignment complete"
    );

    AlignmentRun { records, summary }
}
