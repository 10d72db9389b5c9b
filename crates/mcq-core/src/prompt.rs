//! Prompt kinds, their inputs, and template resolution.
//!
//! Each [`PromptKind`] has a built-in template compiled into the binary. A
//! user directory may override any of them with `<kind>.tpl`; kinds without
//! an override keep the built-in.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use rust_embed::Embed;
use serde::Serialize;

use crate::context::{ProjectType, RepoContext};
use crate::error::{McqError, Result};
use crate::template::{Helpers, Template, Value, Vars};

/// Prompts longer than this are logged as a warning before sending.
pub const LARGE_PROMPT_CHARS: usize = 100_000;

#[derive(Embed)]
#[folder = "templates/"]
struct BuiltinTemplates;

// ---------------------------------------------------------------------------
// PromptKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    UserStory,
    TitleExtraction,
    DescriptionImprovement,
    DescriptionFromTitle,
}

impl PromptKind {
    pub fn all() -> &'static [PromptKind] {
        &[
            PromptKind::UserStory,
            PromptKind::TitleExtraction,
            PromptKind::DescriptionImprovement,
            PromptKind::DescriptionFromTitle,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PromptKind::UserStory => "user_story",
            PromptKind::TitleExtraction => "title_extraction",
            PromptKind::DescriptionImprovement => "description_improvement",
            PromptKind::DescriptionFromTitle => "description_from_title",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.tpl", self.as_str())
    }

    pub fn description(self) -> &'static str {
        match self {
            PromptKind::UserStory => "turn a feature request into a user story",
            PromptKind::TitleExtraction => "derive a short issue title from a story",
            PromptKind::DescriptionImprovement => "rewrite an existing issue description",
            PromptKind::DescriptionFromTitle => "draft a description from an issue title",
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PromptKind::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown prompt kind: {s}"))
    }
}

// ---------------------------------------------------------------------------
// PromptConfig
// ---------------------------------------------------------------------------

/// Inputs for one prompt. Which optional fields are set depends on `kind`.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptConfig {
    pub kind: PromptKind,
    pub feature_request: Option<String>,
    pub original_description: Option<String>,
    pub user_story: Option<String>,
    pub repo_context: Option<RepoContext>,
}

impl PromptConfig {
    fn empty(kind: PromptKind) -> Self {
        Self {
            kind,
            feature_request: None,
            original_description: None,
            user_story: None,
            repo_context: None,
        }
    }

    pub fn user_story(feature_request: impl Into<String>, ctx: Option<RepoContext>) -> Self {
        Self {
            feature_request: Some(feature_request.into()),
            repo_context: ctx,
            ..Self::empty(PromptKind::UserStory)
        }
    }

    pub fn title_extraction(feature_request: impl Into<String>, story: impl Into<String>) -> Self {
        Self {
            feature_request: Some(feature_request.into()),
            user_story: Some(story.into()),
            ..Self::empty(PromptKind::TitleExtraction)
        }
    }

    pub fn description_improvement(description: impl Into<String>, ctx: Option<RepoContext>) -> Self {
        Self {
            original_description: Some(description.into()),
            repo_context: ctx,
            ..Self::empty(PromptKind::DescriptionImprovement)
        }
    }

    /// The title travels as `feature_request`.
    pub fn description_from_title(title: impl Into<String>, ctx: Option<RepoContext>) -> Self {
        Self {
            feature_request: Some(title.into()),
            repo_context: ctx,
            ..Self::empty(PromptKind::DescriptionFromTitle)
        }
    }

    /// Every field populated with plausible data, for template validation.
    pub fn synthetic(kind: PromptKind) -> Self {
        let ctx = RepoContext {
            project_name: "example".into(),
            module_path: "github.com/example/example".into(),
            language_version: "1.22".into(),
            dependencies: vec!["github.com/spf13/cobra".into()],
            readme: "# Example\nAn example command line tool.".into(),
            recent_commits: vec!["abc1234 Initial commit".into()],
            directory_structure: "cmd/\n  example/\n    main.go\n".into(),
            config_files: [("Makefile".to_string(), "build:\n\tgo build ./...".to_string())]
                .into_iter()
                .collect(),
            project_type: ProjectType::Cli,
        };
        Self {
            kind,
            feature_request: Some("Add a --json flag to the list command".into()),
            original_description: Some("list cmd should output json too".into()),
            user_story: Some(
                "As a user, I want JSON output so that I can script the list command.".into(),
            ),
            repo_context: Some(ctx),
        }
    }

    /// Template variables for this config. Every name is always present so
    /// templates can test optional inputs with `#if`.
    pub fn vars(&self) -> Vars {
        let ctx = self.repo_context.as_ref();
        let text = |f: &dyn Fn(&RepoContext) -> String| -> Value {
            ctx.map(|c| Value::Text(f(c))).unwrap_or(Value::Null)
        };

        let mut vars = Vars::new();
        vars.insert("feature_request".into(), self.feature_request.clone().into());
        vars.insert("user_story".into(), self.user_story.clone().into());
        vars.insert(
            "original_description".into(),
            self.original_description.clone().into(),
        );
        vars.insert(
            "repository_context".into(),
            ctx.map(|c| Value::Repo(Box::new(c.clone())))
                .unwrap_or(Value::Null),
        );
        vars.insert("project_name".into(), text(&|c: &RepoContext| c.project_name.clone()));
        vars.insert("module_path".into(), text(&|c: &RepoContext| c.module_path.clone()));
        vars.insert("language_version".into(), text(&|c: &RepoContext| c.language_version.clone()));
        vars.insert("readme".into(), text(&|c: &RepoContext| c.readme.clone()));
        vars.insert("directory_structure".into(), text(&|c: &RepoContext| c.directory_structure.clone()));
        vars.insert(
            "project_type".into(),
            ctx.map(|c| Value::Text(c.project_type.as_str().into()))
                .unwrap_or(Value::Null),
        );
        vars.insert(
            "recent_commits".into(),
            ctx.map(|c| c.recent_commits.clone().into())
                .unwrap_or(Value::Null),
        );
        vars.insert(
            "dependencies".into(),
            ctx.map(|c| c.dependencies.clone().into())
                .unwrap_or(Value::Null),
        );
        vars.insert(
            "config_files".into(),
            ctx.map(|c| c.config_files.clone().into())
                .unwrap_or(Value::Null),
        );
        vars.insert(
            "now".into(),
            Value::Text(chrono::Local::now().format("%Y-%m-%d %H:%M").to_string()),
        );
        vars
    }
}

// ---------------------------------------------------------------------------
// TemplateManager
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "path", rename_all = "snake_case")]
pub enum TemplateSource {
    Builtin,
    Custom(PathBuf),
}

impl fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateSource::Builtin => f.write_str("built-in"),
            TemplateSource::Custom(p) => write!(f, "{}", p.display()),
        }
    }
}

#[derive(Debug)]
pub struct LoadedTemplate {
    pub kind: PromptKind,
    pub source: TemplateSource,
    template: Template,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub kind: PromptKind,
    pub source: TemplateSource,
    pub error: Option<String>,
}

impl ValidationReport {
    pub fn ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Resolves and caches one template per kind: cache, then the custom
/// directory, then the built-in.
pub struct TemplateManager {
    custom_dir: Option<PathBuf>,
    helpers: Helpers,
    cache: Mutex<HashMap<PromptKind, Arc<LoadedTemplate>>>,
}

impl TemplateManager {
    pub fn new(custom_dir: Option<PathBuf>) -> Self {
        Self {
            custom_dir,
            helpers: Helpers::default(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn custom_dir(&self) -> Option<&Path> {
        self.custom_dir.as_deref()
    }

    /// Raw text of the compiled-in template for `kind`.
    pub fn builtin_source(kind: PromptKind) -> Result<String> {
        let file = <BuiltinTemplates as Embed>::get(&kind.file_name()).ok_or_else(|| McqError::Template {
            name: kind.file_name(),
            message: "built-in template missing from binary".into(),
        })?;
        Ok(String::from_utf8_lossy(&file.data).into_owned())
    }

    fn custom_path(&self, kind: PromptKind) -> Option<PathBuf> {
        self.custom_dir
            .as_ref()
            .map(|d| d.join(kind.file_name()))
            .filter(|p| p.is_file())
    }

    /// Where `kind` would be loaded from, without parsing it.
    pub fn source_of(&self, kind: PromptKind) -> TemplateSource {
        match self.custom_path(kind) {
            Some(p) => TemplateSource::Custom(p),
            None => TemplateSource::Builtin,
        }
    }

    fn load_builtin(kind: PromptKind) -> Result<LoadedTemplate> {
        let src = Self::builtin_source(kind)?;
        let template = Template::parse(&src).map_err(|e| McqError::Template {
            name: kind.file_name(),
            message: e.to_string(),
        })?;
        Ok(LoadedTemplate {
            kind,
            source: TemplateSource::Builtin,
            template,
        })
    }

    /// Load without any fallback, so broken overrides surface.
    fn load_strict(&self, kind: PromptKind) -> Result<LoadedTemplate> {
        let Some(path) = self.custom_path(kind) else {
            return Self::load_builtin(kind);
        };
        let src = std::fs::read_to_string(&path)?;
        let template = Template::parse(&src).map_err(|e| McqError::Template {
            name: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(LoadedTemplate {
            kind,
            source: TemplateSource::Custom(path),
            template,
        })
    }

    pub fn load(&self, kind: PromptKind) -> Result<Arc<LoadedTemplate>> {
        if let Some(hit) = self.cache.lock().ok().and_then(|c| c.get(&kind).cloned()) {
            return Ok(hit);
        }

        let loaded = match self.load_strict(kind) {
            Ok(t) => t,
            Err(e) if self.custom_path(kind).is_some() => {
                tracing::warn!(kind = %kind, error = %e, "custom template unusable, using built-in");
                Self::load_builtin(kind)?
            }
            Err(e) => return Err(e),
        };
        tracing::debug!(kind = %kind, source = %loaded.source, "loaded prompt template");

        let loaded = Arc::new(loaded);
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(kind, Arc::clone(&loaded));
        }
        Ok(loaded)
    }

    /// Render the prompt for `config`. A custom template that fails to
    /// render is replaced by the built-in for this call.
    pub fn render(&self, config: &PromptConfig) -> Result<String> {
        let loaded = self.load(config.kind)?;
        let vars = config.vars();
        match loaded.template.render(&vars, &self.helpers) {
            Ok(s) => Ok(s),
            Err(e) if loaded.source != TemplateSource::Builtin => {
                tracing::warn!(
                    kind = %config.kind,
                    source = %loaded.source,
                    error = %e,
                    "custom template failed to render, using built-in"
                );
                let builtin = Self::load_builtin(config.kind)?;
                builtin
                    .template
                    .render(&vars, &self.helpers)
                    .map_err(|e| McqError::Template {
                        name: config.kind.file_name(),
                        message: e.to_string(),
                    })
            }
            Err(e) => Err(McqError::Template {
                name: config.kind.file_name(),
                message: e.to_string(),
            }),
        }
    }

    /// Parse and execute every template against synthetic inputs.
    pub fn validate(&self) -> Vec<ValidationReport> {
        PromptKind::all()
            .iter()
            .map(|&kind| {
                let source = self.source_of(kind);
                let error = self.load_strict(kind).and_then(|loaded| {
                    loaded
                        .template
                        .render(&PromptConfig::synthetic(kind).vars(), &self.helpers)
                        .map(|_| ())
                        .map_err(|e| McqError::Template {
                            name: kind.file_name(),
                            message: e.to_string(),
                        })
                });
                ValidationReport {
                    kind,
                    source,
                    error: error.err().map(|e| e.to_string()),
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn user_story_contains_request() {
        let tm = TemplateManager::new(None);
        let out = tm
            .render(&PromptConfig::user_story("Add dark mode", None))
            .unwrap();
        assert!(out.contains("Add dark mode"));
        assert!(out.contains("Acceptance Criteria"));
        assert!(!out.contains("Repository Context"));
    }

    #[test]
    fn user_story_includes_formatted_context() {
        let tm = TemplateManager::new(None);
        let ctx = PromptConfig::synthetic(PromptKind::UserStory).repo_context;
        let out = tm.render(&PromptConfig::user_story("X", ctx)).unwrap();
        assert!(out.contains("### Project Information"));
        assert!(out.contains("github.com/example/example"));
    }

    #[test]
    fn title_prompt_asks_for_title_only() {
        let tm = TemplateManager::new(None);
        let out = tm
            .render(&PromptConfig::title_extraction("req", "As a user, I want x"))
            .unwrap();
        assert!(out.contains("Respond with ONLY the title"));
        assert!(out.contains("As a user, I want x"));
        assert!(!out.contains("Acceptance Criteria"));
    }

    #[test]
    fn every_builtin_validates() {
        let tm = TemplateManager::new(None);
        let reports = tm.validate();
        assert_eq!(reports.len(), 4);
        assert!(reports.iter().all(|r| r.ok()), "{reports:?}");
    }

    #[test]
    fn override_applies_per_kind() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("user_story.tpl"), "CUSTOM {{feature_request}}").unwrap();
        let tm = TemplateManager::new(Some(dir.path().to_path_buf()));

        let story = tm.render(&PromptConfig::user_story("X", None)).unwrap();
        assert_eq!(story, "CUSTOM X");

        let title = tm
            .render(&PromptConfig::title_extraction("X", "story"))
            .unwrap();
        assert!(title.contains("Respond with ONLY the title"));

        assert!(matches!(
            tm.source_of(PromptKind::UserStory),
            TemplateSource::Custom(_)
        ));
        assert_eq!(tm.source_of(PromptKind::TitleExtraction), TemplateSource::Builtin);
    }

    #[test]
    fn broken_override_falls_back_but_fails_validation() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("user_story.tpl"), "{{feature_reqest}}").unwrap();
        let tm = TemplateManager::new(Some(dir.path().to_path_buf()));

        let out = tm.render(&PromptConfig::user_story("Add dark mode", None)).unwrap();
        assert!(out.contains("Acceptance Criteria"));

        let reports = tm.validate();
        let story = reports.iter().find(|r| r.kind == PromptKind::UserStory).unwrap();
        assert!(story.error.as_deref().unwrap().contains("feature_reqest"));
        assert!(reports.iter().filter(|r| r.kind != PromptKind::UserStory).all(|r| r.ok()));
    }

    #[test]
    fn unparseable_override_falls_back_at_load() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("title_extraction.tpl"), "{{#if x}}").unwrap();
        let tm = TemplateManager::new(Some(dir.path().to_path_buf()));
        let loaded = tm.load(PromptKind::TitleExtraction).unwrap();
        assert_eq!(loaded.source, TemplateSource::Builtin);
    }

    #[test]
    fn loads_are_cached() {
        let tm = TemplateManager::new(None);
        let a = tm.load(PromptKind::UserStory).unwrap();
        let b = tm.load(PromptKind::UserStory).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in PromptKind::all() {
            assert_eq!(kind.as_str().parse::<PromptKind>().unwrap(), *kind);
        }
        assert!("summary".parse::<PromptKind>().is_err());
    }
}
