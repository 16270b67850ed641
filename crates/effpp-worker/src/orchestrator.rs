//! Run orchestrator.
//!
//! Identities are split into contiguous chunks, one per worker. Every worker
//! owns a describer session built by the factory for it alone and walks its
//! chunk in ascending (identity, rank, variant) order. A failed pair is
//! recorded and skipped; only configuration problems abort the run.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use effpp_llm_client::{DescribeContext, Describer, DescriberFactory, LlmError};
use effpp_models::{
    AlignmentParams, AlignmentRecord, AnnotationRecord, DescriberKind, DescriberProvenance,
    EvidenceTagTable, FramePair, IdentityKey, PairManifest, PairReference, RunMetadata,
    TechniqueSummaries, Variant, ANNOTATION_QUESTION,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::answer::{build_answer, truncate_words, DEFAULT_WORD_LIMIT, EMPTY_ANSWER_TEXT};
use crate::error::{WorkerError, WorkerResult};
use crate::logging::IdentityLogger;
use crate::metrics;
use crate::records::{record_path, write_record};

/// One identity's alignment plus its resolved manifests.
#[derive(Debug, Clone)]
pub struct IdentityWork {
    pub record: AlignmentRecord,
    pub manifests: BTreeMap<Variant, PairManifest>,
}

impl IdentityWork {
    /// Bundle a record with its resolved manifests.
    ///
    /// # Arguments
    /// * `record` - Aligned offsets for the identity
    /// * `manifests` - One manifest per variant that has a video
    pub fn new(record: AlignmentRecord, manifests: impl IntoIterator<Item = PairManifest>) -> Self {
        Self {
            record,
            manifests: manifests.into_iter().map(|m| (m.variant, m)).collect(),
        }
    }

    pub fn identity(&self) -> &IdentityKey {
        &self.record.identity
    }
}

/// Per-run settings shared by every worker.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub annotations_dir: PathBuf,
    pub alignment: AlignmentParams,
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub max_frames: Option<usize>,
    pub overwrite: bool,
    pub word_limit: usize,
}

impl RunSettings {
    /// Settings with defaults: every rank, existing records kept, the default word limit.
    ///
    /// # Arguments
    /// * `annotations_dir` - Root of the annotation tree
    /// * `alignment` - Parameters stamped into each record
    pub fn new(annotations_dir: impl Into<PathBuf>, alignment: AlignmentParams) -> Self {
        Self {
            annotations_dir: annotations_dir.into(),
            alignment,
            run_id: Uuid::new_v4(),
            created_at: Utc::now(),
            max_frames: None,
            overwrite: false,
            word_limit: DEFAULT_WORD_LIMIT,
        }
    }

    /// Annotate only the first `max_frames` ranks of each identity.
    pub fn with_max_frames(mut self, max_frames: Option<usize>) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Rewrite records that already exist.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_word_limit(mut self, word_limit: usize) -> Self {
        self.word_limit = word_limit;
        self
    }
}

/// A pair whose describe call or record write failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairFailure {
    pub identity: IdentityKey,
    pub rank: u32,
    pub variant: Variant,
    /// Last HTTP status seen, if the failure came from a provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub error: String,
}

/// Counters for one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub worker: usize,
    pub identities: usize,
    pub annotated: usize,
    pub failed: usize,
    pub escalated_to_proxy: bool,
    /// Session state after the last pair
    pub describer: DescriberProvenance,
}

/// Outcome of one annotation run.
///
/// Written next to the annotations so a rerun can be compared against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub describer: DescriberKind,
    pub identities: usize,
    pub annotated: usize,
    /// Records that already existed and were left alone
    pub skipped: usize,
    /// (rank, variant) slots without a resolved pair
    pub missing_pairs: usize,
    pub failures: Vec<PairFailure>,
    pub workers: Vec<WorkerSummary>,
    /// Workers that stopped abnormally before finishing their chunk
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aborted_workers: Vec<usize>,
}

impl RunReport {
    fn empty(run_id: Uuid, describer: DescriberKind) -> Self {
        Self {
            run_id,
            describer,
            identities: 0,
            annotated: 0,
            skipped: 0,
            missing_pairs: 0,
            failures: Vec::new(),
            workers: Vec::new(),
            aborted_workers: Vec::new(),
        }
    }

    fn absorb(&mut self, outcome: ChunkOutcome) {
        self.identities += outcome.summary.identities;
        self.annotated += outcome.summary.annotated;
        self.skipped += outcome.skipped;
        self.missing_pairs += outcome.missing_pairs;
        self.failures.extend(outcome.failures);
        self.workers.push(outcome.summary);
    }

    /// Pairs that produced no record.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

struct ChunkOutcome {
    summary: WorkerSummary,
    skipped: usize,
    missing_pairs: usize,
    failures: Vec<PairFailure>,
}

/// Fans identities out to workers and writes one record per frame pair.
///
/// Each worker owns whole identities and its own describer session.
pub struct Orchestrator<'a> {
    factory: &'a dyn DescriberFactory,
    tags: &'a EvidenceTagTable,
    summaries: &'a TechniqueSummaries,
    settings: RunSettings,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        factory: &'a dyn DescriberFactory,
        tags: &'a EvidenceTagTable,
        summaries: &'a TechniqueSummaries,
        settings: RunSettings,
    ) -> Self {
        Self {
            factory,
            tags,
            summaries,
            settings,
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Annotate every pair of `work` with up to `worker_count` workers.
    ///
    /// All sessions are built before any pair is touched, so a missing
    /// credential fails the run without partial output.
    pub fn run(&self, work: &[IdentityWork], worker_count: usize) -> WorkerResult<RunReport> {
        if worker_count == 0 {
            return Err(WorkerError::config_error("workers must be at least 1"));
        }
        if worker_count > 1 && !self.factory.supports_parallel() {
            return Err(WorkerError::config_error(format!(
                "{} describer cannot run with {} workers",
                self.factory.kind(),
                worker_count
            )));
        }

        let chunk_size = work.len().div_ceil(worker_count).max(1);
        let chunks: Vec<&[IdentityWork]> = work.chunks(chunk_size).collect();
        let sessions = (0..chunks.len().max(1))
            .map(|_| self.factory.create())
            .collect::<Result<Vec<_>, LlmError>>()?;

        info!(
            run_id = %self.settings.run_id,
            describer = %self.factory.kind(),
            identities = work.len(),
            workers = chunks.len(),
            "Starting annotation run"
        );

        let mut report = RunReport::empty(self.settings.run_id, self.factory.kind());

        if chunks.len() <= 1 {
            for (chunk, mut session) in chunks.into_iter().zip(sessions) {
                report.absorb(self.process_chunk(0, session.as_mut(), chunk));
            }
        } else {
            let results: Vec<Result<ChunkOutcome, usize>> = std::thread::scope(|scope| {
                let handles: Vec<_> = chunks
                    .into_iter()
                    .zip(sessions)
                    .enumerate()
                    .map(|(worker, (chunk, mut session))| {
                        scope.spawn(move || self.process_chunk(worker, session.as_mut(), chunk))
                    })
                    .collect();
                handles
                    .into_iter()
                    .enumerate()
                    .map(|(worker, handle)| handle.join().map_err(|_| worker))
                    .collect()
            });

            for result in results {
                match result {
                    Ok(outcome) => report.absorb(outcome),
                    Err(worker) => {
                        error!(worker, "Worker thread panicked; its chunk is incomplete");
                        report.aborted_workers.push(worker);
                    }
                }
            }
        }

        info!(
            run_id = %report.run_id,
            identities = report.identities,
            annotated = report.annotated,
            skipped = report.skipped,
            missing_pairs = report.missing_pairs,
            failed = report.failed(),
            "Annotation run finished"
        );
        Ok(report)
    }

    fn process_chunk(
        &self,
        worker: usize,
        session: &mut dyn Describer,
        chunk: &[IdentityWork],
    ) -> ChunkOutcome {
        let mut outcome = ChunkOutcome {
            summary: WorkerSummary {
                worker,
                identities: 0,
                annotated: 0,
                failed: 0,
                escalated_to_proxy: false,
                describer: session.provenance(),
            },
            skipped: 0,
            missing_pairs: 0,
            failures: Vec::new(),
        };

        for item in chunk {
            self.process_identity(worker, session, item, &mut outcome);
            outcome.summary.identities += 1;
        }

        outcome.summary.describer = session.provenance();
        outcome.summary.escalated_to_proxy = outcome.summary.describer.escalated_to_proxy;
        outcome.summary.failed = outcome.failures.len();
        outcome
    }

    fn process_identity(
        &self,
        worker: usize,
        session: &mut dyn Describer,
        item: &IdentityWork,
        outcome: &mut ChunkOutcome,
    ) {
        let record = &item.record;
        let logger = IdentityLogger::new(&record.identity, "annotate", worker);
        let _span = logger.create_span().entered();

        let ranks = self
            .settings
            .max_frames
            .map_or(record.frame_count(), |max| max.min(record.frame_count()));
        logger.log_start(&format!("{} ranks", ranks));

        let before = (
            outcome.summary.annotated,
            outcome.failures.len(),
            outcome.skipped,
        );

        for rank in 0..ranks as u32 {
            for &variant in Variant::ALL {
                let Some(manifest) = item.manifests.get(&variant) else {
                    outcome.missing_pairs += 1;
                    metrics::record_unavailable(variant);
                    continue;
                };
                let Some(pair) = manifest.pair_at(rank) else {
                    outcome.missing_pairs += 1;
                    metrics::record_unavailable(variant);
                    continue;
                };

                let path = record_path(
                    &self.settings.annotations_dir,
                    &manifest.split,
                    variant,
                    &record.identity,
                    rank,
                );
                if path.exists() && !self.settings.overwrite {
                    outcome.skipped += 1;
                    metrics::record_skipped();
                    continue;
                }

                match self.annotate_pair(session, &logger, record, manifest, pair, &path) {
                    Ok(()) => {
                        outcome.summary.annotated += 1;
                        metrics::record_written(variant);
                    }
                    Err(failure) => {
                        metrics::record_failed(variant);
                        outcome.failures.push(failure);
                    }
                }
            }
        }

        let annotated = outcome.summary.annotated - before.0;
        let failed = outcome.failures.len() - before.1;
        let kept = outcome.skipped - before.2;
        if kept > 0 {
            logger.log_progress(&format!("{} existing records kept", kept));
        }
        if failed > 0 {
            logger.log_warning(&format!("{} pairs failed", failed));
        }
        logger.log_completion(&format!("{} records written", annotated));
    }

    fn annotate_pair(
        &self,
        session: &mut dyn Describer,
        logger: &IdentityLogger,
        record: &AlignmentRecord,
        manifest: &PairManifest,
        pair: &FramePair,
        path: &std::path::Path,
    ) -> Result<(), PairFailure> {
        let variant = manifest.variant;
        let manipulated = variant.is_manipulated();
        let ctx = DescribeContext {
            identity: record.identity.clone(),
            rank: pair.rank,
            offset: pair.offset,
            variant,
            split: manifest.split.clone(),
            manipulated,
            technique_summary: self.summaries.summary_for(variant).to_string(),
            evidence_tags: self.tags.tags_for(variant).to_vec(),
            image_path: pair.target_frame_path.clone(),
        };

        let failure = |status: Option<u16>, message: String| {
            logger.log_error(pair.rank, variant, status, &message);
            PairFailure {
                identity: record.identity.clone(),
                rank: pair.rank,
                variant,
                status,
                error: message,
            }
        };

        let raw = {
            let _span = logger.pair_span(pair.rank, variant).entered();
            session.describe(&ctx)
        }
        .map_err(|e| failure(e.status(), e.to_string()))?;

        let mut rationale = truncate_words(&raw, self.settings.word_limit);
        if rationale.is_empty() {
            rationale = EMPTY_ANSWER_TEXT.to_string();
        }

        let annotation = AnnotationRecord {
            question: ANNOTATION_QUESTION.to_string(),
            manipulated,
            answer_text: build_answer(&raw, manipulated, self.settings.word_limit),
            rationale,
            rationale_tags: ctx.evidence_tags,
            technique_summary: ctx.technique_summary,
            pair: PairReference {
                identity: record.identity.clone(),
                rank: pair.rank,
                offset: pair.offset,
                variant,
                split: manifest.split.clone(),
                video_id: record
                    .video(variant)
                    .map(|v| v.video_id.clone())
                    .unwrap_or_default(),
                authentic_frame_path: pair.authentic_frame_path.clone(),
                target_frame_path: pair.target_frame_path.clone(),
            },
            run_metadata: RunMetadata {
                run_id: self.settings.run_id,
                created_at: self.settings.created_at,
                alignment: self.settings.alignment,
                describer: session.provenance(),
            },
        };

        write_record(path, &annotation).map_err(|e| failure(None, e.to_string()))
    }
}
