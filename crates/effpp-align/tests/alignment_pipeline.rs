//! Metadata to pair manifests, through the filesystem.

use std::path::Path;

use effpp_align::{
    build_alignment, build_pairs, load_alignment_records, load_split_metadata, write_alignment,
    write_pair_manifest, AlignmentPlan, FrameCountIndex, FrameLayout, IdentityGrouper,
};
use effpp_models::{IdentityKey, RejectReason, Split, Variant};
use serde_json::json;

const SOURCE: &str = "003";

fn video_id(identity: &str, variant: Variant) -> String {
    if variant.is_manipulated() {
        format!("{}_{}", identity, SOURCE)
    } else {
        identity.to_string()
    }
}

/// Writes metadata plus CSV tables for `(identity, [real, df, f2f, fs, nt])`.
fn write_inputs(root: &Path, families: &[(&str, [u32; 5])]) {
    let mut entries = Vec::new();
    let csv_dir = root.join("csv");
    std::fs::create_dir_all(&csv_dir).unwrap();

    for (i, variant) in Variant::ALL.iter().enumerate() {
        let mut csv = String::from("Index,File Path,Frame Count\n");
        for (identity, lengths) in families {
            let id = video_id(identity, *variant);
            csv.push_str(&format!("{},{}/{}.mp4,{}\n", i, variant, id, lengths[i]));
            entries.push(json!({
                "method": variant.as_str(),
                "video_id": id,
                "path": format!("{}/{}.mp4", variant, id),
                "split": "train",
            }));
        }
        std::fs::write(
            csv_dir.join(format!("{}.csv", variant.frame_count_table())),
            csv,
        )
        .unwrap();
    }

    std::fs::write(
        root.join("split.json"),
        serde_json::to_string_pretty(&entries).unwrap(),
    )
    .unwrap();
}

fn touch_frames(
    layout: &FrameLayout,
    identity: &str,
    offsets: &[u32],
    skip: Option<(Variant, u32)>,
) {
    for variant in Variant::ALL {
        for offset in offsets {
            if skip == Some((*variant, *offset)) {
                continue;
            }
            let path = layout.frame_path(
                &Split::from("train"),
                *variant,
                &IdentityKey::from(identity),
                *offset,
            );
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, b"frame").unwrap();
        }
    }
}

#[test]
fn missing_faceswap_frame_only_shrinks_its_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_inputs(root, &[("000", [50, 48, 50, 52, 49]), ("001", [0, 30, 30, 30, 30])]);

    let counts = FrameCountIndex::load(&root.join("csv")).unwrap();
    let entries = load_split_metadata(&root.join("split.json")).unwrap();
    let grouping = IdentityGrouper::new(&counts).group(&entries, None);
    assert_eq!(grouping.families.len(), 2);

    let run = build_alignment(
        &grouping,
        &AlignmentPlan {
            k: 10,
            seed: 2025,
            require_consistent: false,
        },
    );
    assert_eq!(run.records.len(), 1);
    assert_eq!(run.summary.rejected.get(&RejectReason::ZeroLength), Some(&1));

    let record = &run.records[0];
    assert_eq!(record.min_length, 48);
    assert_eq!(record.frame_offsets.len(), 10);
    assert!(record.frame_offsets.windows(2).all(|w| w[0] < w[1]));
    assert!(record.frame_offsets.iter().all(|o| *o <= 47));

    let layout = FrameLayout::new(root.join("crops"));
    let dropped = record.frame_offsets[4];
    touch_frames(&layout, "000", &record.frame_offsets, Some((Variant::FaceSwap, dropped)));

    for variant in Variant::ALL {
        let manifest = build_pairs(&layout, record, *variant).unwrap();
        if *variant == Variant::FaceSwap {
            assert_eq!(manifest.pairs.len(), 9);
            assert_eq!(manifest.missing_target_count, 1);
            assert!(manifest.pair_at(4).is_none());
        } else {
            assert_eq!(manifest.pairs.len(), 10);
            assert_eq!(manifest.missing_target_count, 0);
            let ranks: Vec<u32> = manifest.pairs.iter().map(|p| p.rank).collect();
            assert_eq!(ranks, (0..10).collect::<Vec<_>>());
        }
        assert_eq!(manifest.missing_authentic_count, 0);
    }
}

#[test]
fn pair_manifests_are_byte_identical_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_inputs(root, &[("000", [20, 20, 20, 20, 20])]);

    let counts = FrameCountIndex::load(&root.join("csv")).unwrap();
    let entries = load_split_metadata(&root.join("split.json")).unwrap();
    let grouping = IdentityGrouper::new(&counts).group(&entries, None);
    let run = build_alignment(&grouping, &AlignmentPlan { k: 6, ..AlignmentPlan::default() });
    write_alignment(&root.join("alignment"), &run).unwrap();

    let records = load_alignment_records(&root.join("alignment")).unwrap();
    let layout = FrameLayout::new(root.join("crops"));
    touch_frames(&layout, "000", &records[0].frame_offsets, Some((Variant::Deepfakes, 0)));

    let manifests_dir = root.join("manifests");
    let mut first = Vec::new();
    for variant in Variant::ALL {
        let manifest = build_pairs(&layout, &records[0], *variant).unwrap();
        let path = write_pair_manifest(&manifests_dir, &manifest).unwrap();
        first.push((path.clone(), std::fs::read(&path).unwrap()));
    }

    for variant in Variant::ALL {
        let manifest = build_pairs(&layout, &records[0], *variant).unwrap();
        write_pair_manifest(&manifests_dir, &manifest).unwrap();
    }
    for (path, bytes) in first {
        assert_eq!(std::fs::read(&path).unwrap(), bytes, "{}", path.display());
    }

    // Frame files are untouched by manifest construction.
    let frames = walk_count(&root.join("crops"));
    assert_eq!(frames, 5 * 6 - 1);
}

fn walk_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| {
            let path = e.unwrap().path();
            if path.is_dir() {
                walk_count(&path)
            } else {
                1
            }
        })
        .sum()
}
