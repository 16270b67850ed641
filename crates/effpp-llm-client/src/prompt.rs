//! Prompts for every describer backend.

use std::path::PathBuf;

use effpp_models::{IdentityKey, Split, Variant};

/// Everything a describer may use for one (identity, rank, variant).
#[derive(Debug, Clone, PartialEq)]
pub struct DescribeContext {
    pub identity: IdentityKey,
    pub rank: u32,
    pub offset: u32,
    pub variant: Variant,
    pub split: Split,
    pub manipulated: bool,
    pub technique_summary: String,
    pub evidence_tags: Vec<String>,
    /// Target frame shown to image-capable backends
    pub image_path: PathBuf,
}

/// System and user turns of a text-only request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// System prompt for the HTTP backends.
pub const SYSTEM_PROMPT: &str =
    "You are writing concise visual evidence statements for face forensics. \
     Produce at most 55 English words describing observable cues. \
     Focus on the listed evidence tags.";

pub const LOCAL_MANIPULATED_PROMPT: &str =
    "Identify visible manipulation artefacts (boundary seams, lighting mismatch, \
     texture loss, warped geometry, color bleed). Provide at most 55 English words.";

pub const LOCAL_AUTHENTIC_PROMPT: &str =
    "Explain why this face appears authentic. Describe consistent lighting, \
     textures, or geometry in at most 55 English words.";

/// Prompt for the HTTP backends.
pub fn text_prompt(ctx: &DescribeContext) -> Prompt {
    let user = format!(
        "Identity {}, frame {}. Manipulated: {}. Technique summary: {}. Evidence tags: {}. \
         Describe what a reviewer should look for.",
        ctx.identity,
        ctx.rank,
        if ctx.manipulated { "yes" } else { "no" },
        ctx.technique_summary,
        ctx.evidence_tags.join(", "),
    );
    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}

/// Instruction given to an image-conditioned local model.
pub fn local_prompt(manipulated: bool) -> &'static str {
    if manipulated {
        LOCAL_MANIPULATED_PROMPT
    } else {
        LOCAL_AUTHENTIC_PROMPT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> DescribeContext {
        DescribeContext {
            identity: IdentityKey::from("071"),
            rank: 4,
            offset: 33,
            variant: Variant::Face2Face,
            split: Split::from("train"),
            manipulated: true,
            technique_summary: "expression reenactment".to_string(),
            evidence_tags: vec!["mouth_artifact".into(), "lighting_shadow".into()],
            image_path: PathBuf::from("crops/train/Face2Face/071/frame_0033.jpg"),
        }
    }

    #[test]
    fn test_text_prompt_carries_context() {
        let prompt = text_prompt(&context());
        assert!(prompt.system.contains("at most 55 English words"));
        assert!(prompt.user.starts_with("Identity 071, frame 4. Manipulated: yes."));
        assert!(prompt.user.contains("Technique summary: expression reenactment."));
        assert!(prompt.user.contains("Evidence tags: mouth_artifact, lighting_shadow."));
        assert!(prompt.user.ends_with("Describe what a reviewer should look for."));
    }

    #[test]
    fn test_local_prompt_by_label() {
        assert!(local_prompt(true).starts_with("Identify visible manipulation"));
        assert!(local_prompt(false).starts_with("Explain why this face appears authentic"));
    }
}
