//! Textual quality checks over written annotation records.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use effpp_align::write_json;
use effpp_models::{AnnotationRecord, EvidenceTagTable, Variant};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::answer::{word_count, yes_no_prefix};
use crate::error::WorkerResult;
use crate::records::{find_records, load_record};

/// Fewest evidence tags a record should carry.
pub const MIN_TAGS: usize = 2;

/// Pass/fail tallies for each textual check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityCounters {
    pub total: usize,
    pub yes_no_ok: usize,
    pub yes_no_fail: usize,
    pub manipulated_consistent: usize,
    pub manipulated_inconsistent: usize,
    pub word_limit_ok: usize,
    pub word_limit_fail: usize,
    pub tag_count_ok: usize,
    pub tag_count_fail: usize,
    pub tag_vocab_ok: usize,
    pub tag_vocab_fail: usize,
}

/// Aggregate quality of an annotation tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub word_limit: usize,
    pub identities: usize,
    pub average_word_count: f64,
    pub max_word_count: usize,
    pub overall: QualityCounters,
    pub per_variant: BTreeMap<Variant, QualityCounters>,
    /// Record files that could not be parsed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unreadable: Vec<PathBuf>,
}

struct Checks {
    yes_no: bool,
    consistent: bool,
    within_limit: bool,
    tag_count: bool,
    tag_vocab: bool,
}

impl QualityCounters {
    fn add(&mut self, checks: &Checks) {
        self.total += 1;
        let tally = |ok: bool, pass: &mut usize, fail: &mut usize| {
            if ok {
                *pass += 1;
            } else {
                *fail += 1;
            }
        };
        tally(checks.yes_no, &mut self.yes_no_ok, &mut self.yes_no_fail);
        tally(
            checks.consistent,
            &mut self.manipulated_consistent,
            &mut self.manipulated_inconsistent,
        );
        tally(checks.within_limit, &mut self.word_limit_ok, &mut self.word_limit_fail);
        tally(checks.tag_count, &mut self.tag_count_ok, &mut self.tag_count_fail);
        tally(checks.tag_vocab, &mut self.tag_vocab_ok, &mut self.tag_vocab_fail);
    }
}

fn check(
    record: &AnnotationRecord,
    word_limit: usize,
    vocabulary: &BTreeSet<&str>,
) -> (Checks, usize) {
    let label = yes_no_prefix(&record.answer_text);
    let words = word_count(&record.answer_text);
    let checks = Checks {
        yes_no: label.is_some(),
        consistent: label == Some(record.manipulated),
        within_limit: words <= word_limit,
        tag_count: record.rationale_tags.len() >= MIN_TAGS,
        tag_vocab: record
            .rationale_tags
            .iter()
            .all(|t| vocabulary.contains(t.as_str())),
    };
    (checks, words)
}

/// Evaluate every record below `dir`.
///
/// Answers are counted with their Yes/No label against `word_limit`.
/// Unreadable record files are listed in the report and skipped.
///
/// # Arguments
/// * `dir` - Annotation tree to scan
/// * `word_limit` - Maximum words an answer may carry
/// * `tags` - Table whose tags form the accepted vocabulary
pub fn evaluate_annotations(
    dir: &Path,
    word_limit: usize,
    tags: &EvidenceTagTable,
) -> WorkerResult<QualityReport> {
    let vocabulary = tags.vocabulary();
    let mut overall = QualityCounters::default();
    let mut per_variant: BTreeMap<Variant, QualityCounters> = BTreeMap::new();
    let mut identities = BTreeSet::new();
    let mut unreadable = Vec::new();
    let mut total_words = 0usize;
    let mut max_word_count = 0usize;

    for path in find_records(dir)? {
        let record = match load_record(&path) {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable annotation record");
                unreadable.push(path);
                continue;
            }
        };

        let (checks, words) = check(&record, word_limit, &vocabulary);
        overall.add(&checks);
        per_variant.entry(record.pair.variant).or_default().add(&checks);
        identities.insert(record.pair.identity.clone());
        total_words += words;
        max_word_count = max_word_count.max(words);
    }

    let average_word_count = if overall.total == 0 {
        0.0
    } else {
        ((total_words as f64 / overall.total as f64) * 100.0).round() / 100.0
    };

    let report = QualityReport {
        word_limit,
        identities: identities.len(),
        average_word_count,
        max_word_count,
        overall,
        per_variant,
        unreadable,
    };

    info!(
        records = report.overall.total,
        identities = report.identities,
        yes_no_ok = report.overall.yes_no_ok,
        consistent = report.overall.manipulated_consistent,
        word_limit_ok = report.overall.word_limit_ok,
        tag_count_ok = report.overall.tag_count_ok,
        average_words = report.average_word_count,
        "Annotation quality evaluated"
    );
    Ok(report)
}

/// Persist the report as pretty JSON.
pub fn write_quality_report(path: &Path, report: &QualityReport) -> WorkerResult<()> {
    write_json(path, report)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{record_path, write_record};
    use chrono::Utc;
    use effpp_models::{
        AlignmentParams, DescriberKind, DescriberProvenance, IdentityKey, PairReference,
        RunMetadata, Split, ANNOTATION_QUESTION,
    };
    use tempfile::TempDir;
    use uuid::Uuid;

    fn record(identity: &str, variant: Variant, answer: &str, tags: &[&str]) -> AnnotationRecord {
        AnnotationRecord {
            question: ANNOTATION_QUESTION.to_string(),
            manipulated: variant.is_manipulated(),
            answer_text: answer.to_string(),
            rationale: answer.to_string(),
            rationale_tags: tags.iter().map(|t| t.to_string()).collect(),
            technique_summary: String::new(),
            pair: PairReference {
                identity: IdentityKey::from(identity),
                rank: 0,
                offset: 0,
                variant,
                split: Split::from("val"),
                video_id: identity.to_string(),
                authentic_frame_path: PathBuf::from("a.jpg"),
                target_frame_path: PathBuf::from("t.jpg"),
            },
            run_metadata: RunMetadata {
                run_id: Uuid::nil(),
                created_at: Utc::now(),
                alignment: AlignmentParams { k: 8, seed: 1 },
                describer: DescriberProvenance::simple(DescriberKind::Placeholder, None),
            },
        }
    }

    fn write(dir: &Path, rank: u32, record: &AnnotationRecord) {
        let path = record_path(
            dir,
            &record.pair.split,
            record.pair.variant,
            &record.pair.identity,
            rank,
        );
        write_record(&path, record).unwrap();
    }

    #[test]
    fn test_counts_each_check() {
        let dir = TempDir::new().unwrap();
        let long = format!("Yes, {}", vec!["w"; 60].join(" "));
        write(
            dir.path(),
            0,
            &record(
                "001",
                Variant::Real,
                "No, even lighting.",
                &["natural_consistency", "lighting_shadow"],
            ),
        );
        write(
            dir.path(),
            0,
            &record(
                "001",
                Variant::Deepfakes,
                "No, looks fine.",
                &["boundary_blend", "skin_texture"],
            ),
        );
        write(dir.path(), 1, &record("001", Variant::Deepfakes, &long, &["boundary_blend"]));
        write(
            dir.path(),
            0,
            &record("002", Variant::FaceSwap, "Warped jaw.", &["geometry_distortion", "made_up"]),
        );
        std::fs::write(dir.path().join("val/real/001/frame_0009.ann.json"), "{broken").unwrap();

        let report = evaluate_annotations(dir.path(), 55, &EvidenceTagTable::default()).unwrap();

        assert_eq!(report.overall.total, 4);
        assert_eq!(report.identities, 2);
        assert_eq!(report.overall.yes_no_ok, 3);
        assert_eq!(report.overall.manipulated_consistent, 2);
        assert_eq!(report.overall.word_limit_fail, 1);
        assert_eq!(report.overall.tag_count_fail, 1);
        assert_eq!(report.overall.tag_vocab_fail, 1);
        assert_eq!(report.max_word_count, 61);
        assert_eq!(report.unreadable.len(), 1);

        let deepfakes = report.per_variant[&Variant::Deepfakes];
        assert_eq!(deepfakes.total, 2);
        assert_eq!(deepfakes.manipulated_inconsistent, 1);
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let report = evaluate_annotations(dir.path(), 55, &EvidenceTagTable::default()).unwrap();
        assert_eq!(report.overall.total, 0);
        assert_eq!(report.average_word_count, 0.0);

        let out = dir.path().join("quality_report.json");
        write_quality_report(&out, &report).unwrap();
        assert!(out.is_file());
    }
}
