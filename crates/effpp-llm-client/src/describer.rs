//! The describer capability and its in-process backends.

use std::path::Path;

use effpp_models::{DescriberKind, DescriberProvenance};
use tracing::debug;

use crate::error::{LlmError, LlmResult};
use crate::prompt::{local_prompt, DescribeContext};

/// Text returned by the placeholder backend.
pub const PLACEHOLDER_TEXT: &str = "explanation pending";

/// Produces one short rationale per frame pair.
///
/// A session is owned by exactly one worker thread; `&mut self` carries
/// any pacing or rotation state the backend keeps.
pub trait Describer: Send {
    fn describe(&mut self, ctx: &DescribeContext) -> LlmResult<String>;

    /// State snapshot stamped into the record produced by the last call.
    fn provenance(&self) -> DescriberProvenance;
}

/// Dry-run backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderDescriber;

impl Describer for PlaceholderDescriber {
    fn describe(&mut self, _ctx: &DescribeContext) -> LlmResult<String> {
        Ok(PLACEHOLDER_TEXT.to_string())
    }

    fn provenance(&self) -> DescriberProvenance {
        DescriberProvenance::simple(DescriberKind::Placeholder, None)
    }
}

/// A loaded, image-conditioned model living in this process.
pub trait LocalModel: Send {
    fn generate(&mut self, image_path: &Path, prompt: &str) -> LlmResult<String>;

    fn model_name(&self) -> &str;
}

/// Wraps one long-lived [`LocalModel`]. Not shareable across workers.
pub struct LocalModelSession<M: LocalModel> {
    model: M,
}

impl<M: LocalModel> LocalModelSession<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }
}

impl<M: LocalModel> Describer for LocalModelSession<M> {
    fn describe(&mut self, ctx: &DescribeContext) -> LlmResult<String> {
        if !ctx.image_path.is_file() {
            return Err(LlmError::local_model(format!(
                "image not found: {}",
                ctx.image_path.display()
            )));
        }
        let prompt = local_prompt(ctx.manipulated);
        debug!(
            model = self.model.model_name(),
            image = %ctx.image_path.display(),
            "Running local model"
        );
        let text = self.model.generate(&ctx.image_path, prompt)?;
        Ok(text.trim().to_string())
    }

    fn provenance(&self) -> DescriberProvenance {
        DescriberProvenance::simple(
            DescriberKind::LocalModel,
            Some(self.model.model_name().to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context;
    use std::path::PathBuf;

    struct EchoModel {
        seen: Vec<(PathBuf, String)>,
    }

    impl LocalModel for EchoModel {
        fn generate(&mut self, image_path: &Path, prompt: &str) -> LlmResult<String> {
            self.seen.push((image_path.to_path_buf(), prompt.to_string()));
            Ok(format!("  {}  ", prompt.len()))
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    #[test]
    fn test_placeholder_is_constant() {
        let mut describer = PlaceholderDescriber;
        assert_eq!(describer.describe(&context()).unwrap(), "explanation pending");
        assert_eq!(describer.provenance().kind, DescriberKind::Placeholder);
    }

    #[test]
    fn test_local_session_picks_prompt_by_label() {
        let dir = std::env::temp_dir().join(format!("effpp-local-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let image = dir.join("frame_0001.jpg");
        std::fs::write(&image, b"jpg").unwrap();

        let mut session = LocalModelSession::new(EchoModel { seen: Vec::new() });
        let mut ctx = context();
        ctx.image_path = image.clone();
        ctx.manipulated = false;

        let text = session.describe(&ctx).unwrap();
        assert_eq!(text, crate::prompt::LOCAL_AUTHENTIC_PROMPT.len().to_string());
        assert_eq!(session.model.seen[0].0, image);
        assert_eq!(session.provenance().model.as_deref(), Some("echo"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_local_session_missing_image() {
        let mut session = LocalModelSession::new(EchoModel { seen: Vec::new() });
        let mut ctx = context();
        ctx.image_path = PathBuf::from("/nonexistent/frame.jpg");
        assert!(matches!(session.describe(&ctx), Err(LlmError::LocalModel(_))));
        assert!(session.model.seen.is_empty());
    }
}
