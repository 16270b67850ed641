//! Video and identity identifiers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::variant::Variant;

/// Shared identity token grouping one authentic and four manipulated videos.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
/// Source identity shared by the real video and its manipulations.
#[serde(transparent)]
pub struct IdentityKey(pub String);

impl IdentityKey {
    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Derive the identity from a video id.
    ///
    /// Authentic videos are keyed by their own id; manipulated videos are
    /// named `<target>_<source>` and keyed by the target prefix.
    pub fn from_video_id(variant: Variant, video_id: &str) -> Self {
        if variant.is_manipulated() {
            let prefix = video_id.split('_').next().unwrap_or(video_id);
            Self(prefix.to_string())
        } else {
            Self(video_id.to_string())
        }
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IdentityKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Dataset split a source video belongs to (`train`, `val`, `test`).
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
/// Dataset split name (e.g., "train").
#[serde(transparent)]
pub struct Split(pub String);

impl Split {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Split {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One video of an identity family. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VideoDescriptor {
    pub variant: Variant,
    pub video_id: String,
    /// Source video path relative to the data root
    pub path: String,
    pub split: Split,
    pub frame_count: u32,
}
