//! Frame Count Index.
//!
//! One CSV table per variant (`original.csv`, `Deepfakes.csv`, ...) with a
//! header row naming at least `File Path` and `Frame Count`. Rows are keyed
//! by the stem of the file path.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use effpp_models::Variant;
use tracing::{debug, info};

use crate::error::{AlignError, AlignResult};

const FILE_PATH_COLUMN: &str = "File Path";
const FRAME_COUNT_COLUMN: &str = "Frame Count";

/// Stem of a path that may use either separator.
fn path_stem(path: &str) -> &str {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

/// Frame counts of every known video, per variant.
#[derive(Debug, Clone, Default)]
pub struct FrameCountIndex {
    tables: BTreeMap<Variant, HashMap<String, u32>>,
}

impl FrameCountIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one table. Rows that are too short or carry a non-numeric count
    /// are skipped.
    pub fn parse_table(name: &str, raw: &str) -> AlignResult<HashMap<String, u32>> {
        let mut lines = raw.trim_start_matches('\u{feff}').lines();
        let header: Vec<&str> = lines
            .next()
            .unwrap_or("")
            .trim()
            .split(',')
            .map(str::trim)
            .collect();

        let idx_file = header
            .iter()
            .position(|c| *c == FILE_PATH_COLUMN)
            .ok_or_else(|| AlignError::missing_column(name, FILE_PATH_COLUMN))?;
        let idx_frames = header
            .iter()
            .position(|c| *c == FRAME_COUNT_COLUMN)
            .ok_or_else(|| AlignError::missing_column(name, FRAME_COUNT_COLUMN))?;
        let needed = idx_file.max(idx_frames);

        let mut table = HashMap::new();
        let mut skipped = 0usize;
        for line in lines {
            let parts: Vec<&str> = line.trim().split(',').collect();
            if parts.len() <= needed {
                skipped += 1;
                continue;
            }
            let count = parts[idx_frames].trim();
            if count.is_empty() || !count.bytes().all(|b| b.is_ascii_digit()) {
                skipped += 1;
                continue;
            }
            let Ok(count) = count.parse::<u32>() else {
                skipped += 1;
                continue;
            };
            table.insert(path_stem(parts[idx_file].trim()).to_string(), count);
        }

        if skipped > 0 {
            debug!(table = name, skipped, "Skipped malformed frame count rows");
        }
        Ok(table)
    }

    /// Load all five tables from `csv_dir`.
    pub fn load(csv_dir: &Path) -> AlignResult<Self> {
        let mut index = Self::new();
        for variant in Variant::ALL {
            let file_name = format!("{}.csv", variant.frame_count_table());
            let path = csv_dir.join(&file_name);
            if !path.exists() {
                return Err(AlignError::InputNotFound(path));
            }
            let raw = std::fs::read_to_string(&path)?;
            let table = Self::parse_table(&file_name, &raw)?;
            info!(variant = %variant, videos = table.len(), "Loaded frame counts");
            index.insert_table(*variant, table);
        }
        Ok(index)
    }

    /// Add or replace the frame counts of one variant.
    pub fn insert_table(&mut self, variant: Variant, table: HashMap<String, u32>) {
        self.tables.insert(variant, table);
    }

    /// Frame count of `video_id` in `variant`'s table.
    pub fn get(&self, variant: Variant, video_id: &str) -> Option<u32> {
        self.tables.get(&variant)?.get(video_id).copied()
    }

    pub fn len(&self, variant: Variant) -> usize {
        self.tables.get(&variant).map(|t| t.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table_keys_by_stem() {
        let raw = "Index,File Path,Frame Count\n\
                   0,original_sequences/youtube/c23/videos/000.mp4,396\n\
                   1,manipulated\\FaceSwap\\001_870.mp4,280\n";
        let table = FrameCountIndex::parse_table("x.csv", raw).unwrap();
        assert_eq!(table.get("000"), Some(&396));
        assert_eq!(table.get("001_870"), Some(&280));
    }

    #[test]
    fn test_parse_table_skips_bad_rows() {
        let raw = "File Path,Frame Count\n\
                   a.mp4,12\n\
                   b.mp4\n\
                   c.mp4,n/a\n\
                   d.mp4,-3\n";
        let table = FrameCountIndex::parse_table("x.csv", raw).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("a"), Some(&12));
    }

    #[test]
    fn test_parse_table_missing_column() {
        let err = FrameCountIndex::parse_table("FaceSwap.csv", "File Path,Frames\n").unwrap_err();
        assert!(matches!(
            err,
            AlignError::MissingColumn { ref column, .. } if column == "Frame Count"
        ));
    }

    #[test]
    fn test_load_requires_every_table() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("original.csv"), "File Path,Frame Count\n000.mp4,10\n")
            .unwrap();
        let err = FrameCountIndex::load(dir.path()).unwrap_err();
        assert!(matches!(err, AlignError::InputNotFound(_)));
    }

    #[test]
    fn test_load_all_tables() {
        let dir = tempfile::tempdir().unwrap();
        for variant in Variant::ALL {
            std::fs::write(
                dir.path().join(format!("{}.csv", variant.frame_count_table())),
                "File Path,Frame Count\n000.mp4,10\n000_001.mp4,20\n",
            )
            .unwrap();
        }
        let index = FrameCountIndex::load(dir.path()).unwrap();
        assert_eq!(index.get(Variant::Real, "000"), Some(10));
        assert_eq!(index.get(Variant::NeuralTextures, "000_001"), Some(20));
        assert_eq!(index.get(Variant::FaceSwap, "999"), None);
        assert_eq!(index.len(Variant::Face2Face), 2);
    }
}
