//! Split metadata loading and the Identity Grouper.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use effpp_models::{IdentityFamily, IdentityKey, RejectReason, Split, Variant, VideoDescriptor};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AlignError, AlignResult};
use crate::frame_counts::FrameCountIndex;

/// One raw row of the split metadata file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitEntry {
    pub method: String,
    pub video_id: String,
    pub path: String,
    pub split: String,
}

/// Load the split metadata array.
pub fn load_split_metadata(path: &Path) -> AlignResult<Vec<SplitEntry>> {
    if !path.exists() {
        return Err(AlignError::InputNotFound(path.to_path_buf()));
    }
    let raw = std::fs::read_to_string(path)?;
    let entries: Vec<SplitEntry> = serde_json::from_str(raw.trim_start_matches('\u{feff}'))?;
    if entries.is_empty() {
        return Err(AlignError::invalid_metadata(format!(
            "{} contains no entries",
            path.display()
        )));
    }
    info!(entries = entries.len(), path = %path.display(), "Loaded split metadata");
    Ok(entries)
}

/// Families that passed grouping plus the identities that did not.
#[derive(Debug, Default)]
pub struct GroupingOutcome {
    pub families: Vec<IdentityFamily>,
    pub rejected: Vec<(IdentityKey, RejectReason)>,
}

#[derive(Default)]
struct PendingIdentity {
    entries: BTreeMap<Variant, SplitEntry>,
    duplicate: bool,
}

/// Groups metadata rows into complete identity families.
pub struct IdentityGrouper<'a> {
    frame_counts: &'a FrameCountIndex,
}

impl<'a> IdentityGrouper<'a> {
    /// Grouper that reads frame counts from `frame_counts`.
    pub fn new(frame_counts: &'a FrameCountIndex) -> Self {
        Self { frame_counts }
    }

    /// Group `entries` by identity and validate each group.
    ///
    /// Identities are processed in sorted order; `identity_limit` truncates
    /// that list before validation. Unknown methods are ignored.
    pub fn group(&self, entries: &[SplitEntry], identity_limit: Option<usize>) -> GroupingOutcome {
        let mut pending: BTreeMap<IdentityKey, PendingIdentity> = BTreeMap::new();
        let mut ignored = BTreeSet::new();

        for entry in entries {
            let Ok(variant) = entry.method.parse::<Variant>() else {
                ignored.insert(entry.method.clone());
                continue;
            };
            let identity = IdentityKey::from_video_id(variant, &entry.video_id);
            let slot = pending.entry(identity).or_default();
            match slot.entries.get(&variant) {
                Some(existing) if existing.video_id == entry.video_id => {
                    debug!(video_id = %entry.video_id, "Repeated metadata row ignored");
                }
                Some(_) => slot.duplicate = true,
                None => {
                    slot.entries.insert(variant, entry.clone());
                }
            }
        }

        if !ignored.is_empty() {
            debug!(methods = ?ignored, "Ignored unknown methods");
        }

        let limit = identity_limit.unwrap_or(usize::MAX);
        let mut outcome = GroupingOutcome::default();
        for (identity, group) in pending.into_iter().take(limit) {
            match self.validate(&identity, group) {
                Ok(family) => outcome.families.push(family),
                Err(reason) => {
                    debug!(identity = %identity, reason = %reason, "Identity rejected");
                    outcome.rejected.push((identity, reason));
                }
            }
        }

        info!(
            families = outcome.families.len(),
            rejected = outcome.rejected.len(),
            "Grouped identities"
        );
        outcome
    }

    fn validate(
        &self,
        identity: &IdentityKey,
        group: PendingIdentity,
    ) -> Result<IdentityFamily, RejectReason> {
        if group.duplicate {
            return Err(RejectReason::DuplicateVariant);
        }
        if Variant::ALL.iter().any(|v| !group.entries.contains_key(v)) {
            return Err(RejectReason::MissingVariant);
        }

        let mut videos = BTreeMap::new();
        for (variant, entry) in group.entries {
            let frame_count = self
                .frame_counts
                .get(variant, &entry.video_id)
                .ok_or(RejectReason::MissingFrameCount)?;
            videos.insert(
                variant,
                VideoDescriptor {
                    variant,
                    video_id: entry.video_id,
                    path: entry.path,
                    split: Split::new(entry.split),
                    frame_count,
                },
            );
        }

        IdentityFamily::new(identity.clone(), videos)
    }
}
