//! Pipeline stages: align, manifest, annotate, evaluate.
//!
//! Each stage reads what the previous one persisted, so any suffix of the
//! pipeline can be rerun on its own.

use effpp_align::{
    build_alignment, build_all_pairs, build_pairs, load_alignment_records, load_pair_manifest,
    load_split_metadata, write_alignment, write_json, write_pair_manifest, AlignmentPlan,
    AlignmentRun, FrameCountIndex, FrameLayout, IdentityGrouper,
};
use effpp_llm_client::{
    ApiFlavor, DescriberFactory, HttpDescriberFactory, LlmClientConfig, PlaceholderFactory,
};
use effpp_models::{
    AlignmentParams, AlignmentRecord, EvidenceTagTable, PairManifest, TechniqueSummaries, Variant,
};
use tracing::{info, warn};

use crate::config::{AnnotatorConfig, DescriberMode, Stage};
use crate::error::{WorkerError, WorkerResult};
use crate::evaluate::{evaluate_annotations, write_quality_report, QualityReport};
use crate::orchestrator::{IdentityWork, Orchestrator, RunReport, RunSettings};

/// What a full invocation produced, stage by stage.
#[derive(Debug, Default)]
pub struct PipelineOutcome {
    pub alignment: Option<AlignmentRun>,
    pub manifests_written: Option<usize>,
    pub annotation: Option<RunReport>,
    pub quality: Option<QualityReport>,
}

fn frame_layout(config: &AnnotatorConfig) -> FrameLayout {
    FrameLayout::new(&config.frames_dir).with_ext(config.frame_ext.clone())
}

fn alignment_params(config: &AnnotatorConfig) -> AlignmentParams {
    AlignmentParams {
        k: config.k,
        seed: config.seed,
    }
}

/// Configured evidence tag table, or the built-in one.
pub fn load_tag_table(config: &AnnotatorConfig) -> WorkerResult<EvidenceTagTable> {
    match &config.tag_table {
        Some(path) => Ok(EvidenceTagTable::from_json_file(path)?),
        None => Ok(EvidenceTagTable::default()),
    }
}

/// Configured technique summaries, or the built-in ones.
pub fn load_technique_summaries(config: &AnnotatorConfig) -> WorkerResult<TechniqueSummaries> {
    match &config.technique_summaries {
        Some(path) => Ok(TechniqueSummaries::from_json_file(path)?),
        None => Ok(TechniqueSummaries::default()),
    }
}

/// Group identities, sample aligned offsets and persist the records.
pub fn run_align(config: &AnnotatorConfig) -> WorkerResult<AlignmentRun> {
    let frame_counts = FrameCountIndex::load(&config.frame_counts_dir)?;
    let entries = load_split_metadata(&config.split_metadata)?;
    let grouping = IdentityGrouper::new(&frame_counts).group(&entries, config.identity_limit);

    let run = build_alignment(
        &grouping,
        &AlignmentPlan {
            k: config.k,
            seed: config.seed,
            require_consistent: config.require_consistent,
        },
    );
    write_alignment(&config.alignment_dir, &run)?;

    info!(
        records = run.summary.total_records,
        rejected = run.summary.rejected_total(),
        dir = %config.alignment_dir.display(),
        "Alignment stage complete"
    );
    Ok(run)
}

/// Resolve and persist the pair manifests of every aligned identity.
pub fn run_manifest(config: &AnnotatorConfig) -> WorkerResult<usize> {
    let records = load_alignment_records(&config.alignment_dir)?;
    let manifests = build_all_pairs(&frame_layout(config), &records)?;
    for manifest in &manifests {
        write_pair_manifest(&config.pairs_dir, manifest)?;
    }

    let pairs: usize = manifests.iter().map(|m| m.len()).sum();
    info!(
        identities = records.len(),
        manifests = manifests.len(),
        pairs,
        dir = %config.pairs_dir.display(),
        "Manifest stage complete"
    );
    Ok(manifests.len())
}

/// Whether a persisted manifest was resolved against `record`'s offsets.
fn manifest_is_current(record: &AlignmentRecord, manifest: &PairManifest) -> bool {
    manifest.identity == record.identity
        && record
            .video(manifest.variant)
            .is_some_and(|video| video.split == manifest.split)
        && manifest
            .pairs
            .iter()
            .all(|pair| record.offset_at(pair.rank as usize) == Some(pair.offset))
}

/// Attach manifests to each record.
///
/// A persisted manifest is used only while it still matches the record's
/// offsets; otherwise the pairs are resolved again from the frame tree.
///
/// # Arguments
/// * `config` - Supplies the pairs directory and the frame layout
/// * `records` - Alignment records of the current run
pub fn load_identity_work(
    config: &AnnotatorConfig,
    records: Vec<AlignmentRecord>,
) -> WorkerResult<Vec<IdentityWork>> {
    let layout = frame_layout(config);
    let mut work = Vec::with_capacity(records.len());

    for record in records {
        let mut manifests = Vec::with_capacity(Variant::ALL.len());
        for &variant in Variant::ALL {
            let Some(video) = record.video(variant) else {
                warn!(
                    identity = %record.identity,
                    variant = %variant,
                    "Alignment record has no video"
                );
                continue;
            };
            let persisted =
                load_pair_manifest(&config.pairs_dir, &video.split, variant, &record.identity)?;
            let manifest = match persisted {
                Some(manifest) if manifest_is_current(&record, &manifest) => manifest,
                Some(_) => {
                    warn!(
                        identity = %record.identity,
                        variant = %variant,
                        "Persisted pair manifest is out of date, resolving again"
                    );
                    build_pairs(&layout, &record, variant)?
                }
                None => build_pairs(&layout, &record, variant)?,
            };
            manifests.push(manifest);
        }
        work.push(IdentityWork::new(record, manifests));
    }

    work.sort_by(|a, b| a.identity().cmp(b.identity()));
    Ok(work)
}

/// Describer factory for the configured mode.
pub fn build_factory(config: &AnnotatorConfig) -> WorkerResult<Box<dyn DescriberFactory>> {
    let flavor = match config.describer {
        DescriberMode::Placeholder => return Ok(Box::new(PlaceholderFactory)),
        DescriberMode::Chat => ApiFlavor::ChatCompletions,
        DescriberMode::Gemini => ApiFlavor::GenerateContent,
        DescriberMode::Local => {
            return Err(WorkerError::config_error(
                "local describer needs an embedded model and is not available from the CLI",
            ))
        }
    };
    let factory = HttpDescriberFactory::new(LlmClientConfig::from_env(flavor))?;
    Ok(Box::new(factory))
}

/// Annotate every aligned pair and write the run report.
pub fn run_annotate(config: &AnnotatorConfig) -> WorkerResult<RunReport> {
    let factory = build_factory(config)?;
    let tags = load_tag_table(config)?;
    let summaries = load_technique_summaries(config)?;

    let records = load_alignment_records(&config.alignment_dir)?;
    let work = load_identity_work(config, records)?;

    let settings = RunSettings::new(&config.annotations_dir, alignment_params(config))
        .with_max_frames(config.max_frames)
        .with_overwrite(config.overwrite)
        .with_word_limit(config.word_limit);
    let orchestrator = Orchestrator::new(factory.as_ref(), &tags, &summaries, settings);
    let report = orchestrator.run(&work, config.workers)?;

    write_json(&config.run_report_path(), &report)?;
    if !report.aborted_workers.is_empty() {
        return Err(WorkerError::WorkerAborted {
            worker: report.aborted_workers[0],
            message: format!(
                "{} of {} workers did not finish",
                report.aborted_workers.len(),
                report.aborted_workers.len() + report.workers.len()
            ),
        });
    }
    Ok(report)
}

/// Check written annotations and write the quality report.
pub fn run_evaluate(config: &AnnotatorConfig) -> WorkerResult<QualityReport> {
    let tags = load_tag_table(config)?;
    let report = evaluate_annotations(&config.annotations_dir, config.word_limit, &tags)?;
    write_quality_report(&config.quality_report_path(), &report)?;
    Ok(report)
}

/// Run the selected stages in pipeline order.
pub fn run_pipeline(config: &AnnotatorConfig) -> WorkerResult<PipelineOutcome> {
    config.validate()?;
    let mut outcome = PipelineOutcome::default();

    for &stage in Stage::ALL {
        if !config.runs(stage) {
            continue;
        }
        info!(stage = %stage, "Running stage");
        match stage {
            Stage::Align => outcome.alignment = Some(run_align(config)?),
            Stage::Manifest => outcome.manifests_written = Some(run_manifest(config)?),
            Stage::Annotate => outcome.annotation = Some(run_annotate(config)?),
            Stage::Evaluate => outcome.quality = Some(run_evaluate(config)?),
        }
    }
    Ok(outcome)
}
