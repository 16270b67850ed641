//! Annotation record layout on disk.
//!
//! Records live at `<dir>/<split>/<variant>/<identity>/frame_<rank:04>.ann.json`.
//! Each (split, variant, identity) subtree is written by exactly one worker.

use std::path::{Path, PathBuf};

use effpp_models::{AnnotationRecord, IdentityKey, Split, Variant};

use crate::error::WorkerResult;

/// Suffix shared by every record file.
pub const RECORD_SUFFIX: &str = ".ann.json";

/// Path of the record for one frame pair.
///
/// # Arguments
/// * `dir` - Root of the annotation tree
/// * `split` - Split of the target video
/// * `variant` - Variant of the target frame
/// * `identity` - Identity the pair belongs to
/// * `rank` - Rank of the pair within the identity
pub fn record_path(
    dir: &Path,
    split: &Split,
    variant: Variant,
    identity: &IdentityKey,
    rank: u32,
) -> PathBuf {
    dir.join(split.as_str())
        .join(variant.as_str())
        .join(identity.as_str())
        .join(AnnotationRecord::file_name(rank))
}

/// Pretty JSON with a trailing newline; parent directories are created.
pub fn write_record(path: &Path, record: &AnnotationRecord) -> WorkerResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut json = serde_json::to_string_pretty(record)?;
    json.push('\n');
    std::fs::write(path, json)?;
    Ok(())
}

/// Parse one record file.
pub fn load_record(path: &Path) -> WorkerResult<AnnotationRecord> {
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}

/// Every record file below `dir`, sorted.
pub fn find_records(dir: &Path) -> WorkerResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    if dir.is_dir() {
        collect(dir, &mut found)?;
    }
    found.sort();
    Ok(found)
}

fn collect(dir: &Path, found: &mut Vec<PathBuf>) -> WorkerResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect(&path, found)?;
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(RECORD_SUFFIX))
        {
            found.push(path);
        }
    }
    Ok(())
}
