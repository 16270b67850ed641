//! Evidence tag table and technique summaries.
//!
//! Both are explicit configuration passed into the annotation engine at
//! construction; nothing here is process-global.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::{ModelError, ModelResult};
use crate::variant::Variant;

/// Parse a JSON object keyed by variant name, tolerating a UTF-8 BOM.
fn read_variant_map<T: serde::de::DeserializeOwned>(
    raw: &str,
) -> ModelResult<BTreeMap<Variant, T>> {
    let raw = raw.trim_start_matches('\u{feff}');
    let parsed: BTreeMap<String, T> = serde_json::from_str(raw)?;
    let mut out = BTreeMap::new();
    for (key, value) in parsed {
        let variant: Variant = key.parse()?;
        out.insert(variant, value);
    }
    Ok(out)
}

/// Default evidence tags per variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EvidenceTagTable {
    tags: BTreeMap<Variant, Vec<String>>,
}

impl Default for EvidenceTagTable {
    fn default() -> Self {
        let preset = |tags: &[&str]| tags.iter().map(|t| t.to_string()).collect::<Vec<_>>();
        let mut tags = BTreeMap::new();
        tags.insert(
            Variant::Real,
            preset(&["natural_consistency", "lighting_shadow"]),
        );
        tags.insert(Variant::Deepfakes, preset(&["boundary_blend", "skin_texture"]));
        tags.insert(
            Variant::Face2Face,
            preset(&["mouth_artifact", "lighting_shadow"]),
        );
        tags.insert(
            Variant::FaceSwap,
            preset(&["geometry_distortion", "hairline_mismatch"]),
        );
        tags.insert(
            Variant::NeuralTextures,
            preset(&["specular_inconsistency", "detail_smearing"]),
        );
        Self { tags }
    }
}

impl EvidenceTagTable {
    /// Defaults overlaid with the entries of a JSON object
    /// `{ "<variant>": ["tag", ...] }`.
    pub fn from_json_str(raw: &str) -> ModelResult<Self> {
        let overrides: BTreeMap<Variant, Vec<String>> = read_variant_map(raw)?;
        let mut table = Self::default();
        for (variant, tags) in overrides {
            if tags.iter().all(|t| t.trim().is_empty()) {
                return Err(ModelError::invalid_evidence_table(format!(
                    "no tags for {}",
                    variant
                )));
            }
            table.tags.insert(variant, tags);
        }
        Ok(table)
    }

    pub fn from_json_file(path: &Path) -> ModelResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Tags for `variant`. Every variant always has an entry.
    pub fn tags_for(&self, variant: Variant) -> &[String] {
        self.tags.get(&variant).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Every tag any variant uses.
    pub fn vocabulary(&self) -> BTreeSet<&str> {
        self.tags.values().flatten().map(String::as_str).collect()
    }
}

/// One-sentence description of each manipulation technique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TechniqueSummaries {
    summaries: BTreeMap<Variant, String>,
}

impl TechniqueSummaries {
    pub fn new(summaries: BTreeMap<Variant, String>) -> Self {
        Self { summaries }
    }

    pub fn from_json_str(raw: &str) -> ModelResult<Self> {
        Ok(Self {
            summaries: read_variant_map(raw)?,
        })
    }

    pub fn from_json_file(path: &Path) -> ModelResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Summary for `variant`, empty when none was configured.
    pub fn summary_for(&self, variant: Variant) -> &str {
        self.summaries
            .get(&variant)
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}
