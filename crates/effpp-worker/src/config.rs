//! Annotator configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use effpp_align::{DEFAULT_FRAME_EXT, DEFAULT_SEED, DEFAULT_TARGET_K};

use crate::answer::DEFAULT_WORD_LIMIT;
use crate::error::{WorkerError, WorkerResult};

/// Pipeline stages, run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Align,
    Manifest,
    Annotate,
    Evaluate,
}

impl Stage {
    pub const ALL: &'static [Stage] = &[
        Stage::Align,
        Stage::Manifest,
        Stage::Annotate,
        Stage::Evaluate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Align => "align",
            Stage::Manifest => "manifest",
            Stage::Annotate => "annotate",
            Stage::Evaluate => "evaluate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Stage {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "align" => Ok(Stage::Align),
            "manifest" | "pairs" => Ok(Stage::Manifest),
            "annotate" => Ok(Stage::Annotate),
            "evaluate" | "eval" => Ok(Stage::Evaluate),
            other => Err(WorkerError::config_error(format!("unknown stage: {}", other))),
        }
    }
}

/// Describer backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriberMode {
    Placeholder,
    /// Chat-completions endpoint shape
    Chat,
    /// generateContent endpoint shape
    Gemini,
    /// In-process image model; needs an embedding application
    Local,
}

impl DescriberMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DescriberMode::Placeholder => "placeholder",
            DescriberMode::Chat => "chat",
            DescriberMode::Gemini => "gemini",
            DescriberMode::Local => "local",
        }
    }
}

impl FromStr for DescriberMode {
    type Err = WorkerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "placeholder" => Ok(DescriberMode::Placeholder),
            "chat" | "chatgpt" | "openai" => Ok(DescriberMode::Chat),
            "gemini" => Ok(DescriberMode::Gemini),
            "local" | "llava" => Ok(DescriberMode::Local),
            other => Err(WorkerError::config_error(format!("unknown describer mode: {}", other))),
        }
    }
}

/// Annotator configuration.
///
/// Built from `EFFPP_*` environment variables and overridden by CLI flags.
#[derive(Debug, Clone)]
pub struct AnnotatorConfig {
    /// Root every default path below hangs off
    pub data_root: PathBuf,
    /// JSON array of `{method, video_id, path, split}`
    pub split_metadata: PathBuf,
    /// Directory of per-variant frame count CSVs
    pub frame_counts_dir: PathBuf,
    /// Extracted frames, `<split>/<variant>/<identity>/frame_<offset>.<ext>`
    pub frames_dir: PathBuf,
    pub alignment_dir: PathBuf,
    pub pairs_dir: PathBuf,
    pub annotations_dir: PathBuf,
    pub stages: Vec<Stage>,
    pub k: usize,
    pub seed: u64,
    pub require_consistent: bool,
    pub identity_limit: Option<usize>,
    /// Ranks annotated per identity
    pub max_frames: Option<usize>,
    pub workers: usize,
    pub describer: DescriberMode,
    pub frame_ext: String,
    /// Rewrite annotation records that already exist
    pub overwrite: bool,
    pub word_limit: usize,
    pub tag_table: Option<PathBuf>,
    pub technique_summaries: Option<PathBuf>,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self::with_data_root("data")
    }
}

impl AnnotatorConfig {
    /// Defaults with every path under `root`.
    pub fn with_data_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            split_metadata: root.join("splits.json"),
            frame_counts_dir: root.join("frame_counts"),
            frames_dir: root.join("crops"),
            alignment_dir: root.join("frame_indices"),
            pairs_dir: root.join("pairs"),
            annotations_dir: root.join("annotations"),
            data_root: root,
            stages: Stage::ALL.to_vec(),
            k: DEFAULT_TARGET_K,
            seed: DEFAULT_SEED,
            require_consistent: false,
            identity_limit: None,
            max_frames: None,
            workers: 1,
            describer: DescriberMode::Placeholder,
            frame_ext: DEFAULT_FRAME_EXT.to_string(),
            overwrite: false,
            word_limit: DEFAULT_WORD_LIMIT,
            tag_table: None,
            technique_summaries: None,
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let root = std::env::var("EFFPP_DATA_ROOT").unwrap_or_else(|_| "data".to_string());
        let mut config = Self::with_data_root(root);

        let path_var = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
        };

        if let Some(p) = path_var("EFFPP_SPLIT_METADATA") {
            config.split_metadata = p;
        }
        if let Some(p) = path_var("EFFPP_FRAME_COUNTS_DIR") {
            config.frame_counts_dir = p;
        }
        if let Some(p) = path_var("EFFPP_FRAMES_DIR") {
            config.frames_dir = p;
        }
        if let Some(p) = path_var("EFFPP_ALIGNMENT_DIR") {
            config.alignment_dir = p;
        }
        if let Some(p) = path_var("EFFPP_PAIRS_DIR") {
            config.pairs_dir = p;
        }
        if let Some(p) = path_var("EFFPP_ANNOTATIONS_DIR") {
            config.annotations_dir = p;
        }
        config.tag_table = path_var("EFFPP_TAG_TABLE");
        config.technique_summaries = path_var("EFFPP_TECHNIQUE_SUMMARIES");

        if let Ok(stages) = std::env::var("EFFPP_STAGES") {
            let mut parsed = stages
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse)
                .collect::<WorkerResult<Vec<Stage>>>()?;
            parsed.sort();
            parsed.dedup();
            config.stages = parsed;
        }
        if let Ok(mode) = std::env::var("EFFPP_DESCRIBER") {
            config.describer = mode.parse()?;
        }

        config.k = std::env::var("EFFPP_K")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TARGET_K);
        config.seed = std::env::var("EFFPP_SEED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_SEED);
        config.require_consistent = env_flag("EFFPP_REQUIRE_CONSISTENT");
        config.identity_limit = std::env::var("EFFPP_IDENTITY_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok());
        config.max_frames = std::env::var("EFFPP_MAX_FRAMES")
            .ok()
            .and_then(|s| s.parse().ok());
        config.workers = std::env::var("EFFPP_WORKERS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);
        config.frame_ext = std::env::var("EFFPP_FRAME_EXT")
            .map(|s| s.trim_start_matches('.').to_string())
            .unwrap_or_else(|_| DEFAULT_FRAME_EXT.to_string());
        config.overwrite = env_flag("EFFPP_OVERWRITE");
        config.word_limit = std::env::var("EFFPP_WORD_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_WORD_LIMIT);

        config.validate()?;
        Ok(config)
    }

    /// Reject settings no stage can run with.
    pub fn validate(&self) -> WorkerResult<()> {
        if self.stages.is_empty() {
            return Err(WorkerError::config_error("no stages selected"));
        }
        if self.k == 0 {
            return Err(WorkerError::config_error("k must be at least 1"));
        }
        if self.workers == 0 {
            return Err(WorkerError::config_error("workers must be at least 1"));
        }
        if self.word_limit == 0 {
            return Err(WorkerError::config_error("word limit must be at least 1"));
        }
        if self.frame_ext.is_empty() {
            return Err(WorkerError::config_error("frame extension is empty"));
        }
        Ok(())
    }

    /// Whether `stage` was selected.
    pub fn runs(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    pub fn quality_report_path(&self) -> PathBuf {
        self.annotations_dir.join("quality_report.json")
    }

    pub fn run_report_path(&self) -> PathBuf {
        self.annotations_dir.join("run_report.json")
    }

    pub fn metrics_path(&self) -> PathBuf {
        self.data_root.join("metrics.prom")
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "EFFPP_DATA_ROOT",
        "EFFPP_STAGES",
        "EFFPP_DESCRIBER",
        "EFFPP_K",
        "EFFPP_WORKERS",
        "EFFPP_FRAME_EXT",
        "EFFPP_OVERWRITE",
        "EFFPP_MAX_FRAMES",
        "EFFPP_ANNOTATIONS_DIR",
    ];

    fn clear() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();
        let config = AnnotatorConfig::from_env().unwrap();
        assert_eq!(config.k, 128);
        assert_eq!(config.seed, 2025);
        assert_eq!(config.workers, 1);
        assert_eq!(config.word_limit, 55);
        assert_eq!(config.describer, DescriberMode::Placeholder);
        assert_eq!(config.stages, Stage::ALL.to_vec());
        assert_eq!(config.alignment_dir, PathBuf::from("data/frame_indices"));
        assert_eq!(config.frame_ext, "jpg");
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear();
        std::env::set_var("EFFPP_DATA_ROOT", "/srv/effpp");
        std::env::set_var("EFFPP_STAGES", "evaluate, annotate");
        std::env::set_var("EFFPP_DESCRIBER", "gemini");
        std::env::set_var("EFFPP_WORKERS", "4");
        std::env::set_var("EFFPP_FRAME_EXT", ".png");
        std::env::set_var("EFFPP_OVERWRITE", "true");
        std::env::set_var("EFFPP_MAX_FRAMES", "8");
        std::env::set_var("EFFPP_ANNOTATIONS_DIR", "/tmp/ann");

        let config = AnnotatorConfig::from_env().unwrap();
        assert_eq!(config.stages, vec![Stage::Annotate, Stage::Evaluate]);
        assert_eq!(config.describer, DescriberMode::Gemini);
        assert_eq!(config.workers, 4);
        assert_eq!(config.frame_ext, "png");
        assert!(config.overwrite);
        assert_eq!(config.max_frames, Some(8));
        assert_eq!(config.pairs_dir, PathBuf::from("/srv/effpp/pairs"));
        assert_eq!(config.annotations_dir, PathBuf::from("/tmp/ann"));
        assert_eq!(config.metrics_path(), PathBuf::from("/srv/effpp/metrics.prom"));
        clear();
    }

    #[test]
    #[serial]
    fn test_invalid_values_rejected() {
        clear();
        std::env::set_var("EFFPP_DESCRIBER", "oracle");
        assert!(AnnotatorConfig::from_env().is_err());
        clear();

        std::env::set_var("EFFPP_STAGES", "align,crop");
        assert!(AnnotatorConfig::from_env().is_err());
        clear();

        std::env::set_var("EFFPP_WORKERS", "0");
        assert!(matches!(AnnotatorConfig::from_env(), Err(WorkerError::ConfigError(_))));
        clear();
    }
}
