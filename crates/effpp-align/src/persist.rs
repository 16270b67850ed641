//! Alignment and pair manifest files.
//!
//! Layout of the alignment directory:
//! - `<identity>.json`: one [`AlignmentRecord`]
//! - `manifest_<split>.json`: rows for identities whose primary split is `<split>`
//! - `manifest.json`: rows for every identity
//! - `summary.json`: the [`AlignmentSummary`]

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use effpp_models::{
    AlignmentRecord, AlignmentSummary, IdentityKey, PairManifest, Split, SplitManifestEntry,
    Variant,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{AlignError, AlignResult};
use crate::pairs::pair_manifest_path;
use crate::sampler::AlignmentRun;

pub const SUMMARY_FILE: &str = "summary.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Pretty JSON with a trailing newline. Output is stable for equal input.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> AlignResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');
    std::fs::write(path, body)?;
    Ok(())
}

fn is_auxiliary_file(name: &str) -> bool {
    name == SUMMARY_FILE || name == MANIFEST_FILE || name.starts_with("manifest_")
}

/// Remove record and per-split manifest files left by an earlier run.
///
/// Returns the number of files removed. Files that are not JSON are left
/// alone.
fn clear_previous_run(dir: &Path) -> AlignResult<usize> {
    let mut removed = 0usize;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !path.is_file() || !name.ends_with(".json") {
            continue;
        }
        if name == SUMMARY_FILE || name == MANIFEST_FILE {
            continue;
        }
        std::fs::remove_file(&path)?;
        removed += 1;
    }
    Ok(removed)
}

/// Write every alignment output into `dir`.
///
/// The directory always reflects exactly one run: records and per-split
/// manifests from a previous run are removed first, so identities the
/// current run rejected never reach later stages.
///
/// # Arguments
/// * `dir` - Alignment output directory, created when missing
/// * `run` - Accepted records and the run summary
pub fn write_alignment(dir: &Path, run: &AlignmentRun) -> AlignResult<()> {
    std::fs::create_dir_all(dir)?;
    let removed = clear_previous_run(dir)?;
    if removed > 0 {
        debug!(dir = %dir.display(), removed, "Removed alignment files from a previous run");
    }

    let mut per_split: BTreeMap<String, Vec<SplitManifestEntry>> = BTreeMap::new();
    let mut combined = Vec::with_capacity(run.records.len());
    for record in &run.records {
        write_json(&dir.join(format!("{}.json", record.identity)), record)?;
        let entry = SplitManifestEntry::from(record);
        per_split
            .entry(record.primary_split.as_str().to_string())
            .or_default()
            .push(entry.clone());
        combined.push(entry);
    }

    for (split, entries) in &per_split {
        write_json(&dir.join(format!("manifest_{}.json", split)), entries)?;
    }
    write_json(&dir.join(MANIFEST_FILE), &combined)?;
    write_json(&dir.join(SUMMARY_FILE), &run.summary)?;

    info!(
        dir = %dir.display(),
        records = run.records.len(),
        splits = per_split.len(),
        "Wrote alignment outputs"
    );
    Ok(())
}

/// Identities listed in `manifest.json`, `None` when the file is absent.
fn listed_identities(dir: &Path) -> AlignResult<Option<BTreeSet<IdentityKey>>> {
    let path = dir.join(MANIFEST_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let entries: Vec<SplitManifestEntry> =
        serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    Ok(Some(entries.into_iter().map(|e| e.identity).collect()))
}

/// Load the alignment records of the last run written to `dir`, sorted by
/// identity.
///
/// When `manifest.json` is present only the identities it lists are
/// returned; any other record file in the directory is ignored.
pub fn load_alignment_records(dir: &Path) -> AlignResult<Vec<AlignmentRecord>> {
    if !dir.is_dir() {
        return Err(AlignError::InputNotFound(dir.to_path_buf()));
    }
    let listed = listed_identities(dir)?;

    let mut records = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(".json") || is_auxiliary_file(name) {
            continue;
        }
        let raw = std::fs::read_to_string(&path)?;
        match serde_json::from_str::<AlignmentRecord>(&raw) {
            Ok(record) if listed.as_ref().is_some_and(|ids| !ids.contains(&record.identity)) => {
                warn!(path = %path.display(), "Ignoring alignment record not listed in manifest");
            }
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable alignment record")
            }
        }
    }

    records.sort_by(|a, b| a.identity.cmp(&b.identity));
    debug!(dir = %dir.display(), records = records.len(), "Loaded alignment records");
    Ok(records)
}

/// Read `summary.json` from an alignment directory.
pub fn load_alignment_summary(dir: &Path) -> AlignResult<AlignmentSummary> {
    let path = dir.join(SUMMARY_FILE);
    if !path.is_file() {
        return Err(AlignError::InputNotFound(path));
    }
    Ok(serde_json::from_str(&std::fs::read_to_string(&path)?)?)
}

/// Persist one pair manifest under its target split. Returns the path.
pub fn write_pair_manifest(dir: &Path, manifest: &PairManifest) -> AlignResult<PathBuf> {
    let path = pair_manifest_path(dir, &manifest.split, manifest.variant, &manifest.identity);
    write_json(&path, manifest)?;
    Ok(path)
}

/// Load a pair manifest, `None` when it was never written.
pub fn load_pair_manifest(
    dir: &Path,
    split: &Split,
    variant: Variant,
    identity: &IdentityKey,
) -> AlignResult<Option<PairManifest>> {
    let path = pair_manifest_path(dir, split, variant, identity);
    if !path.is_file() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&std::fs::read_to_string(&path)?)?))
}
