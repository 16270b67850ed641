//! Video variant definitions.
//!
//! Every identity appears in five video forms:
//!
//! - `Real`: the authentic source video
//! - `Deepfakes`: autoencoder face swap
//! - `Face2Face`: expression reenactment
//! - `FaceSwap`: graphics-based face swap
//! - `NeuralTextures`: learned texture rendering

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;

/// One of the five video forms associated with an identity.
///
/// Declaration order is the canonical processing order: authentic first,
/// then the manipulation methods alphabetically.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
/// Real footage or one of the manipulation techniques.
pub enum Variant {
    #[serde(rename = "real")]
    Real,
    Deepfakes,
    Face2Face,
    FaceSwap,
    NeuralTextures,
}

impl Variant {
    /// All variants in canonical order.
    pub const ALL: &'static [Variant] = &[
        Variant::Real,
        Variant::Deepfakes,
        Variant::Face2Face,
        Variant::FaceSwap,
        Variant::NeuralTextures,
    ];

    /// Manipulation methods only.
    pub const MANIPULATED: &'static [Variant] = &[
        Variant::Deepfakes,
        Variant::Face2Face,
        Variant::FaceSwap,
        Variant::NeuralTextures,
    ];

    /// Identifier used in metadata, directory names and annotation records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Real => "real",
            Variant::Deepfakes => "Deepfakes",
            Variant::Face2Face => "Face2Face",
            Variant::FaceSwap => "FaceSwap",
            Variant::NeuralTextures => "NeuralTextures",
        }
    }

    /// File stem of the per-variant frame count table.
    pub fn frame_count_table(&self) -> &'static str {
        match self {
            Variant::Real => "original",
            other => other.as_str(),
        }
    }

    /// Returns true for the four manipulation methods.
    pub fn is_manipulated(&self) -> bool {
        !matches!(self, Variant::Real)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Variant {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "real" | "original" => Ok(Variant::Real),
            "Deepfakes" => Ok(Variant::Deepfakes),
            "Face2Face" => Ok(Variant::Face2Face),
            "FaceSwap" => Ok(Variant::FaceSwap),
            "NeuralTextures" => Ok(Variant::NeuralTextures),
            _ => Err(ModelError::UnknownVariant(s.to_string())),
        }
    }
}
