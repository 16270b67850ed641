//! EFF++ run orchestration.
//!
//! This crate provides:
//! - Environment configuration for the align, manifest, annotate and
//!   evaluate stages
//! - The multi-worker annotation orchestrator and its run report
//! - Annotation record persistence and answer post-processing
//! - Textual quality evaluation of written records

pub mod answer;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod records;
pub mod stages;

pub use config::{AnnotatorConfig, DescriberMode, Stage};
pub use error::{WorkerError, WorkerResult};
pub use evaluate::{evaluate_annotations, QualityCounters, QualityReport};
pub use logging::IdentityLogger;
pub use orchestrator::{
    IdentityWork, Orchestrator, PairFailure, RunReport, RunSettings, WorkerSummary,
};
pub use stages::{
    build_factory, run_align, run_annotate, run_evaluate, run_manifest, run_pipeline,
    PipelineOutcome,
};
