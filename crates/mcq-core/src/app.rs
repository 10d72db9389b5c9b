//! The composition root: one [`App`] per invocation owns the configuration
//! and every capability the pipeline needs.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mcq_llm::{CancellationToken, ProviderClient, StreamingBackend};

use crate::config::Config;
use crate::context::{self, ContextConfig, ContextOutcome, RepoContext};
use crate::error::McqError;
use crate::generate::Generator;
use crate::issue::IssueView;
use crate::jira::{CreatedIssue, JiraClient};
use crate::markup::{markdown_to_wiki, UserCache};
use crate::models::{self, Credentials, ResolvedModel};
use crate::prompt::{PromptConfig, TemplateManager};
use crate::prompter::{StdinPrompter, UserPrompter};
use crate::system::{HostSystem, SystemCalls};
use crate::title::{self, ExtractedTitle};
use crate::user_error::{self, ErrorCode, Operation, UserError};

pub type Outcome<T> = std::result::Result<T, UserError>;

pub struct App {
    pub config: Config,
    pub root: PathBuf,
    pub credentials: Credentials,
    pub templates: Arc<TemplateManager>,
    pub system: Arc<dyn SystemCalls>,
    pub prompter: Arc<dyn UserPrompter>,
    pub backend: Arc<dyn StreamingBackend>,
    cancel: CancellationToken,
}

/// A generated story plus the model that wrote it.
#[derive(Debug, Clone)]
pub struct Story {
    pub request: String,
    pub text: String,
    pub model: ResolvedModel,
}

impl App {
    /// Wire the real capabilities: host subprocesses, stdin prompts and the
    /// HTTP provider client built from `config`.
    pub fn from_config(config: Config, root: PathBuf) -> Outcome<Self> {
        let client = ProviderClient::new(config.llm.client_options())
            .map_err(user_error::from_llm_error)?;
        let templates = Arc::new(TemplateManager::new(config.prompts_dir.clone()));
        Ok(Self {
            root,
            credentials: Credentials::from_env(),
            templates,
            system: Arc::new(HostSystem),
            prompter: Arc::new(StdinPrompter),
            backend: Arc::new(client),
            cancel: CancellationToken::new(),
            config,
        })
    }

    /// Assemble from explicit parts, for tests and embedding.
    pub fn with_parts(
        config: Config,
        root: PathBuf,
        credentials: Credentials,
        system: Arc<dyn SystemCalls>,
        prompter: Arc<dyn UserPrompter>,
        backend: Arc<dyn StreamingBackend>,
    ) -> Self {
        let templates = Arc::new(TemplateManager::new(config.prompts_dir.clone()));
        Self {
            config,
            root,
            credentials,
            templates,
            system,
            prompter,
            backend,
            cancel: CancellationToken::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Parent token for every generation started by this app.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    // -----------------------------------------------------------------------
    // Context and model
    // -----------------------------------------------------------------------

    /// Context flags with the configured limits applied.
    pub fn context_config(&self) -> ContextConfig {
        ContextConfig::auto().with_settings(&self.config.context)
    }

    pub fn gather_context(&self, config: &ContextConfig) -> ContextOutcome {
        context::gather(&self.root, config, self.system.as_ref())
    }

    /// Gather context for a generation. Failure to collect anything is a
    /// warning and the pipeline continues without context.
    pub fn context_for_generation(&self, config: &ContextConfig) -> Option<RepoContext> {
        let outcome = self.gather_context(config);
        if outcome.gathering_failed() {
            let reasons: Vec<String> = outcome
                .diagnostics
                .iter()
                .map(|d| format!("{}: {}", d.subtask, d.message))
                .collect();
            let warning =
                UserError::new(ErrorCode::ContextGatheringFailed).with_detail(reasons.join("; "));
            tracing::warn!(code = %warning.code, detail = ?warning.detail, "{}", warning.summary);
        } else {
            for d in &outcome.diagnostics {
                tracing::debug!(subtask = %d.subtask, message = %d.message, "context subtask skipped");
            }
        }
        outcome.context
    }

    /// Resolve `explicit`, falling back to the configured default model.
    pub fn select_model(&self, explicit: Option<&str>) -> Outcome<ResolvedModel> {
        let wanted = explicit.or(self.config.llm.default_model.as_deref());
        models::select(wanted, &self.credentials, self.prompter.as_ref())
            .map_err(|e| user_error::classify(e, Operation::ModelSelect))
    }

    pub fn generator(&self, model: ResolvedModel) -> Generator {
        Generator::new(Arc::clone(&self.templates), Arc::clone(&self.backend), model)
            .with_cancel(self.cancel.child_token())
    }

    // -----------------------------------------------------------------------
    // Generation flows
    // -----------------------------------------------------------------------

    /// Run one prompt end to end, streaming into `out`.
    pub async fn run_prompt(
        &self,
        model: Option<&str>,
        prompt: PromptConfig,
        out: &mut dyn Write,
    ) -> Outcome<String> {
        let model = self.select_model(model)?;
        self.generator(model).generate(&prompt, out).await
    }

    /// Gather context, then generate a user story for `request`.
    pub async fn generate_story(
        &self,
        request: &str,
        model: Option<&str>,
        context: &ContextConfig,
        out: &mut dyn Write,
    ) -> Outcome<Story> {
        let model = self.select_model(model)?;
        let ctx = self.context_for_generation(context);
        let prompt = PromptConfig::user_story(request, ctx);
        let text = self.generator(model.clone()).generate(&prompt, out).await?;
        Ok(Story {
            request: request.to_string(),
            text,
            model,
        })
    }

    pub async fn extract_title(&self, story: &Story) -> ExtractedTitle {
        let generator = self.generator(story.model.clone());
        title::extract_title(&generator, self.prompter.as_ref(), &story.text, &story.request).await
    }

    /// Best-effort clipboard copy; the returned warning is non-fatal.
    pub fn copy_to_clipboard(&self, text: &str) -> Option<UserError> {
        match self.system.copy_to_clipboard(text) {
            Ok(()) => None,
            Err(e) => Some(user_error::classify(e, Operation::Clipboard)),
        }
    }

    // -----------------------------------------------------------------------
    // JIRA
    // -----------------------------------------------------------------------

    pub fn jira_client(&self) -> Outcome<JiraClient> {
        let creds = self
            .config
            .jira
            .require()
            .map_err(|e| user_error::classify(e, Operation::JiraConfig))?;
        JiraClient::new(creds, crate::jira::DEFAULT_TIMEOUT)
            .map_err(|e| user_error::classify(e, Operation::JiraConfig))
    }

    /// File `story` under `title`, converting its Markdown to wiki markup.
    pub fn create_issue(
        &self,
        jira: &JiraClient,
        title: &str,
        story: &str,
    ) -> Outcome<CreatedIssue> {
        jira.create_issue(title, &markdown_to_wiki(story))
            .map_err(|e| user_error::classify(e, Operation::JiraCreate))
    }

    /// Fetch an issue and its comments, ready for display.
    pub fn show_issue(&self, key: &str) -> Outcome<IssueView> {
        let jira = self.jira_client()?;
        let fetch = |e: McqError| user_error::classify(e, Operation::JiraFetch);
        let issue = jira.get_issue(key).map_err(fetch)?;
        let comments = jira.get_comments(key).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "could not load comments");
            Vec::new()
        });
        let url = jira.browse_url(key);
        let users = UserCache::new(jira);
        Ok(IssueView::build(issue, comments, url, &users))
    }

    /// Check the JIRA credentials; returns the authenticated display name.
    pub fn check_jira(&self) -> Outcome<String> {
        let jira = self.jira_client()?;
        let me = jira
            .myself()
            .map_err(|e| user_error::classify(e, Operation::JiraConfig))?;
        Ok(me.display_name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
