//! Annotation run metrics.

use effpp_models::Variant;
use metrics::counter;

pub mod names {
    /// Annotation records written by variant.
    pub const ANNOTATIONS_WRITTEN: &str = "effpp_annotations_written_total";

    /// Pairs whose describe call failed, by variant.
    pub const ANNOTATIONS_FAILED: &str = "effpp_annotations_failed_total";

    /// Records left alone because they already existed.
    pub const ANNOTATIONS_SKIPPED: &str = "effpp_annotations_skipped_total";

    /// (rank, variant) slots with no resolved pair.
    pub const PAIRS_UNAVAILABLE: &str = "effpp_annotation_pairs_unavailable_total";
}

/// Record a written annotation.
pub fn record_written(variant: Variant) {
    counter!(names::ANNOTATIONS_WRITTEN, "variant" => variant.as_str()).increment(1);
}

/// Record a pair that failed to annotate.
pub fn record_failed(variant: Variant) {
    counter!(names::ANNOTATIONS_FAILED, "variant" => variant.as_str()).increment(1);
}

/// Record a pair kept from an earlier run.
pub fn record_skipped() {
    counter!(names::ANNOTATIONS_SKIPPED).increment(1);
}

/// Record a pair whose frames are missing.
pub fn record_unavailable(variant: Variant) {
    counter!(names::PAIRS_UNAVAILABLE, "variant" => variant.as_str()).increment(1);
}
