//! The generation orchestrator: render a prompt, stream it through the
//! selected model and hand back the full text.

use std::io::{self, Write};
use std::sync::Arc;

use mcq_llm::{collect, CancellationToken, StreamingBackend};

use crate::models::ResolvedModel;
use crate::prompt::{PromptConfig, TemplateManager, LARGE_PROMPT_CHARS};
use crate::user_error::{self, Operation, UserError};

/// Where progress markers go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Stderr,
    Silent,
}

pub struct Generator {
    templates: Arc<TemplateManager>,
    backend: Arc<dyn StreamingBackend>,
    model: ResolvedModel,
    cancel: CancellationToken,
    progress: Progress,
}

impl Generator {
    pub fn new(
        templates: Arc<TemplateManager>,
        backend: Arc<dyn StreamingBackend>,
        model: ResolvedModel,
    ) -> Self {
        Self {
            templates,
            backend,
            model,
            cancel: CancellationToken::new(),
            progress: Progress::Stderr,
        }
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Cancelling this token aborts every call made through this generator.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn model(&self) -> &ResolvedModel {
        &self.model
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Render `config`, stream the response into `out` as it arrives and
    /// return it whole. A trailing newline is written after the last delta.
    pub async fn generate(
        &self,
        config: &PromptConfig,
        out: &mut dyn Write,
    ) -> Result<String, UserError> {
        let prompt = self
            .templates
            .render(config)
            .map_err(|e| user_error::classify(e, Operation::Templates))?;

        let chars = prompt.chars().count();
        tracing::info!(kind = %config.kind, chars, "rendered prompt");
        if chars > LARGE_PROMPT_CHARS {
            tracing::warn!(
                chars,
                "prompt is very large; consider --no-context or fewer context sections"
            );
        }

        self.mark(&format!("Connecting to {}...", self.model.descriptor.display_name));
        let request = self.model.request(prompt);
        let stream = self.backend.stream(request, self.cancel.child_token());
        self.mark("Streaming response...");

        let text = collect(stream, out).await.map_err(|failure| {
            tracing::debug!(
                partial_chars = failure.partial.chars().count(),
                error = %failure.error,
                "generation failed"
            );
            user_error::from_stream_failure(failure)
        })?;
        writeln!(out)
            .and_then(|_| out.flush())
            .map_err(|e| user_error::from_llm_error(e.into()))?;

        tracing::debug!(chars = text.chars().count(), "generation complete");
        Ok(text)
    }

    fn mark(&self, message: &str) {
        if self.progress == Progress::Stderr {
            let _ = writeln!(io::stderr(), "{message}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
