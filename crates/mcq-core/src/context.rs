//! Bounded repository snapshot fed into prompts.
//!
//! [`gather`] runs a fixed sequence of independent sub-collectors (module
//! manifest, README and docs, commits, directory structure, config files).
//! A failing sub-collector leaves its fields empty and records a
//! [`ContextDiagnostic`]; the caller never sees an error.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::config::{default_max_commits, default_max_file_size, ContextSettings};
use crate::error::{McqError, Result};
use crate::io::{read_bounded, read_lossy};
use crate::paths;
use crate::system::SystemCalls;

/// Context larger than this is likely to crowd the model's window.
pub const LARGE_CONTEXT_CHARS: usize = 100_000;

/// Path substrings that exclude an entry from the structure listing.
pub const SKIP_DIRS: &[&str] = &[
    "vendor",
    "node_modules",
    ".git",
    "build",
    "dist",
    "target",
    "bin",
    "obj",
];

/// Directories are listed down to this depth (root children are depth 0).
pub const MAX_STRUCTURE_DEPTH: usize = 3;

const IMPORTANT_EXTENSIONS: &[&str] = &[
    "go", "mod", "sum", "md", "yaml", "yml", "json", "toml", "proto", "sql", "sh", "mk",
];

const IMPORTANT_FILES: &[&str] = &[
    "Makefile",
    "Dockerfile",
    "LICENSE",
    "README",
    "Procfile",
    ".env.example",
    ".golangci.yml",
];

/// Root-level files captured verbatim when small enough.
pub const CONFIG_ALLOWLIST: &[&str] = &[
    "go.mod",
    "go.sum",
    "Makefile",
    "Dockerfile",
    "Dockerfile.dev",
    "docker-compose.yml",
    "docker-compose.yaml",
    ".env",
    ".env.local",
    ".env.example",
    ".env.sample",
    ".golangci.yml",
    ".golangci.yaml",
    ".goreleaser.yml",
    ".goreleaser.yaml",
    "config.yaml",
    "config.yml",
    "config.json",
    ".gitignore",
];

const WEB_FRAMEWORKS: &[&str] = &[
    "gin-gonic/gin",
    "labstack/echo",
    "gofiber/fiber",
    "gorilla/mux",
    "go-chi/chi",
    "grpc",
];

const CLI_FRAMEWORKS: &[&str] = &["spf13/cobra", "urfave/cli", "alecthomas/kong"];

// ---------------------------------------------------------------------------
// ContextConfig
// ---------------------------------------------------------------------------

/// What the collector should look at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Turn every sub-collector on with default limits.
    pub auto_detect: bool,
    pub include_readme: bool,
    pub include_go_mod: bool,
    pub include_commits: bool,
    pub include_structure: bool,
    pub include_configs: bool,
    pub max_commits: usize,
    pub max_file_size: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self::auto()
    }
}

impl ContextConfig {
    pub fn auto() -> Self {
        Self {
            auto_detect: true,
            include_readme: true,
            include_go_mod: true,
            include_commits: true,
            include_structure: true,
            include_configs: true,
            max_commits: default_max_commits(),
            max_file_size: default_max_file_size(),
        }
    }

    /// Everything off; `gather` returns no context.
    pub fn disabled() -> Self {
        Self {
            auto_detect: false,
            include_readme: false,
            include_go_mod: false,
            include_commits: false,
            include_structure: false,
            include_configs: false,
            max_commits: default_max_commits(),
            max_file_size: default_max_file_size(),
        }
    }

    /// Apply configured limits in place of the built-in defaults.
    pub fn with_settings(mut self, settings: &ContextSettings) -> Self {
        self.max_commits = settings.max_commits;
        self.max_file_size = settings.max_file_size;
        self
    }

    /// The effective configuration: `auto_detect` forces every flag on and
    /// replaces zero limits with defaults.
    pub fn resolved(&self) -> Self {
        if !self.auto_detect {
            return self.clone();
        }
        Self {
            auto_detect: true,
            include_readme: true,
            include_go_mod: true,
            include_commits: true,
            include_structure: true,
            include_configs: true,
            max_commits: if self.max_commits == 0 {
                default_max_commits()
            } else {
                self.max_commits
            },
            max_file_size: if self.max_file_size == 0 {
                default_max_file_size()
            } else {
                self.max_file_size
            },
        }
    }

    pub fn any_enabled(&self) -> bool {
        let c = self.resolved();
        c.include_readme
            || c.include_go_mod
            || c.include_commits
            || c.include_structure
            || c.include_configs
    }
}

// ---------------------------------------------------------------------------
// RepoContext
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectType {
    #[serde(rename = "CLI")]
    Cli,
    #[serde(rename = "WebAPI")]
    WebApi,
    Library,
    #[default]
    Application,
}

impl ProjectType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectType::Cli => "CLI",
            ProjectType::WebApi => "WebAPI",
            ProjectType::Library => "Library",
            ProjectType::Application => "Application",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the working tree taken once per invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoContext {
    pub project_name: String,
    pub module_path: String,
    pub language_version: String,
    pub dependencies: Vec<String>,
    pub readme: String,
    pub recent_commits: Vec<String>,
    pub directory_structure: String,
    pub config_files: BTreeMap<String, String>,
    pub project_type: ProjectType,
}

impl RepoContext {
    pub fn total_chars(&self) -> usize {
        let lists: usize = self
            .dependencies
            .iter()
            .chain(self.recent_commits.iter())
            .map(|s| s.chars().count())
            .sum();
        let configs: usize = self
            .config_files
            .iter()
            .map(|(k, v)| k.chars().count() + v.chars().count())
            .sum();
        self.project_name.chars().count()
            + self.module_path.chars().count()
            + self.language_version.chars().count()
            + self.readme.chars().count()
            + self.directory_structure.chars().count()
            + lists
            + configs
    }

    fn is_empty(&self) -> bool {
        self.project_name.is_empty()
            && self.module_path.is_empty()
            && self.language_version.is_empty()
            && self.dependencies.is_empty()
            && self.readme.is_empty()
            && self.recent_commits.is_empty()
            && self.directory_structure.is_empty()
            && self.config_files.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subtask {
    GoMod,
    Readme,
    Commits,
    Structure,
    Configs,
}

impl Subtask {
    pub fn as_str(self) -> &'static str {
        match self {
            Subtask::GoMod => "go_mod",
            Subtask::Readme => "readme",
            Subtask::Commits => "commits",
            Subtask::Structure => "structure",
            Subtask::Configs => "configs",
        }
    }
}

impl fmt::Display for Subtask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDiagnostic {
    pub subtask: Subtask,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ContextOutcome {
    pub context: Option<RepoContext>,
    pub diagnostics: Vec<ContextDiagnostic>,
}

impl ContextOutcome {
    /// Context was requested but nothing at all could be collected.
    pub fn gathering_failed(&self) -> bool {
        self.context.is_none() && !self.diagnostics.is_empty()
    }
}

// ---------------------------------------------------------------------------
// gather
// ---------------------------------------------------------------------------

pub fn gather(root: &Path, config: &ContextConfig, system: &dyn SystemCalls) -> ContextOutcome {
    let cfg = config.resolved();
    let mut outcome = ContextOutcome::default();
    if !cfg.any_enabled() {
        return outcome;
    }

    let mut ctx = RepoContext::default();
    let mut record = |subtask: Subtask, err: McqError| {
        tracing::debug!(subtask = %subtask, error = %err, "context subtask failed");
        outcome.diagnostics.push(ContextDiagnostic {
            subtask,
            message: err.to_string(),
        });
    };

    if cfg.include_go_mod {
        match parse_go_mod_file(root) {
            Ok(module) => {
                ctx.project_name = module.project_name();
                ctx.module_path = module.module_path;
                ctx.language_version = module.go_version;
                ctx.dependencies = module.dependencies;
            }
            Err(e) => record(Subtask::GoMod, e),
        }
    }

    if cfg.include_readme {
        match collect_readme(root) {
            Ok(readme) => ctx.readme = readme,
            Err(e) => record(Subtask::Readme, e),
        }
    }

    if cfg.include_commits {
        match system.git_log(root, cfg.max_commits) {
            Ok(commits) => ctx.recent_commits = commits,
            Err(e) => record(Subtask::Commits, e),
        }
    }

    if cfg.include_structure {
        match directory_structure(root) {
            Ok(structure) => ctx.directory_structure = structure,
            Err(e) => record(Subtask::Structure, e),
        }
    }

    if cfg.include_configs {
        match collect_config_files(root, cfg.max_file_size) {
            Ok(files) => ctx.config_files = files,
            Err(e) => record(Subtask::Configs, e),
        }
    }

    if ctx.is_empty() {
        tracing::debug!(
            diagnostics = outcome.diagnostics.len(),
            "no repository context collected"
        );
        return outcome;
    }

    ctx.project_type = classify_project(&ctx);

    let total = ctx.total_chars();
    tracing::info!(
        readme_chars = ctx.readme.chars().count(),
        structure_chars = ctx.directory_structure.chars().count(),
        total_chars = total,
        commits = ctx.recent_commits.len(),
        dependencies = ctx.dependencies.len(),
        project_type = %ctx.project_type,
        "gathered repository context"
    );
    if total > LARGE_CONTEXT_CHARS {
        tracing::warn!(
            total_chars = total,
            "repository context is very large; consider --no-readme or --no-structure"
        );
    }

    outcome.context = Some(ctx);
    outcome
}

// ---------------------------------------------------------------------------
// go.mod
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoModule {
    pub module_path: String,
    pub go_version: String,
    pub dependencies: Vec<String>,
}

impl GoModule {
    /// Last path segment of the module, e.g. `mcq` for `github.com/acme/mcq`.
    pub fn project_name(&self) -> String {
        self.module_path
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

fn parse_go_mod_file(root: &Path) -> Result<GoModule> {
    let path = paths::go_mod_path(root);
    if !path.is_file() {
        return Err(McqError::ManifestNotFound(root.display().to_string()));
    }
    let data = std::fs::read_to_string(&path)?;
    Ok(parse_go_mod(&data))
}

/// Line-oriented parse of `module`, `go` and `require` directives.
pub fn parse_go_mod(data: &str) -> GoModule {
    let mut module = GoModule::default();
    let mut in_require = false;
    let mut in_other_block = false;

    for raw in data.lines() {
        let line = raw.split("//").next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        if in_require || in_other_block {
            if line == ")" {
                in_require = false;
                in_other_block = false;
            } else if in_require {
                push_dependency(&mut module.dependencies, line);
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("module ") {
            module.module_path = rest.trim().trim_matches('"').to_string();
        } else if let Some(rest) = line.strip_prefix("go ") {
            module.go_version = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("require") {
            let rest = rest.trim();
            if rest == "(" {
                in_require = true;
            } else {
                push_dependency(&mut module.dependencies, rest);
            }
        } else if line.ends_with('(') {
            // replace / exclude / retract blocks
            in_other_block = true;
        }
    }
    module
}

fn push_dependency(deps: &mut Vec<String>, line: &str) {
    if let Some(id) = line.split_whitespace().next() {
        deps.push(id.to_string());
    }
}

// ---------------------------------------------------------------------------
// README and docs
// ---------------------------------------------------------------------------

fn collect_readme(root: &Path) -> Result<String> {
    let mut sections: Vec<String> = Vec::new();

    if let Some(body) = paths::find_readme(root).and_then(|p| read_section(&p)) {
        sections.push(body);
    }

    let docs = root.join(paths::DOCS_DIR);
    if docs.is_dir() {
        let docs_readme = paths::find_readme(&docs);
        if let Some(body) = docs_readme.as_deref().and_then(read_section) {
            sections.push(format!("## Documentation\n\n{body}"));
        }

        let mut pages: Vec<_> = WalkDir::new(&docs)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|x| x == "md"))
            .map(|e| e.into_path())
            .filter(|p| Some(p) != docs_readme.as_ref())
            .collect();
        pages.sort();

        for page in pages {
            let Some(body) = read_section(&page) else {
                continue;
            };
            let stem = page
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            sections.push(format!("## {}\n\n{body}", section_title(&stem)));
        }
    }

    if sections.is_empty() {
        return Err(McqError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no readable README or docs/ found",
        )));
    }
    Ok(sections.join("\n\n"))
}

/// One unreadable page is skipped rather than losing the others.
fn read_section(path: &Path) -> Option<String> {
    match read_lossy(path) {
        Ok(body) => Some(body),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "skipping unreadable doc");
            None
        }
    }
}

/// `getting-started_guide` -> `Getting Started Guide`.
pub fn section_title(stem: &str) -> String {
    stem.replace(['-', '_'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Directory structure
// ---------------------------------------------------------------------------

fn directory_structure(root: &Path) -> Result<String> {
    let mut out = String::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(MAX_STRUCTURE_DEPTH + 1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 {
                return true;
            }
            let is_dir = e.file_type().is_dir();
            if is_dir && e.depth() > MAX_STRUCTURE_DEPTH {
                return false;
            }
            if is_dir && e.file_name().to_string_lossy().starts_with('.') {
                return false;
            }
            let rel = e.path().strip_prefix(root).unwrap_or(e.path());
            !is_skipped(&rel.to_string_lossy())
        });

    for entry in walker {
        let entry = entry.map_err(|e| McqError::Io(std::io::Error::other(e.to_string())))?;
        let name = entry.file_name().to_string_lossy();
        let depth = entry.depth() - 1;
        if entry.file_type().is_dir() {
            out.push_str(&format!("{}{}/\n", "  ".repeat(depth), name));
        } else if is_important(&name) {
            out.push_str(&format!("{}{}\n", "  ".repeat(depth), name));
        }
    }
    Ok(out)
}

fn is_skipped(rel_path: &str) -> bool {
    SKIP_DIRS.iter().any(|skip| rel_path.contains(skip))
}

pub fn is_important(file_name: &str) -> bool {
    if IMPORTANT_FILES.contains(&file_name) {
        return true;
    }
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMPORTANT_EXTENSIONS.contains(&ext))
}

// ---------------------------------------------------------------------------
// Config files
// ---------------------------------------------------------------------------

fn collect_config_files(root: &Path, max_file_size: u64) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();
    for name in CONFIG_ALLOWLIST {
        let path = root.join(name);
        if !path.is_file() {
            continue;
        }
        match read_bounded(&path, max_file_size)? {
            Some(content) => {
                files.insert((*name).to_string(), content);
            }
            None => tracing::debug!(file = name, max_file_size, "skipping oversized config file"),
        }
    }
    Ok(files)
}

// ---------------------------------------------------------------------------
// Project classification
// ---------------------------------------------------------------------------

pub fn classify_project(ctx: &RepoContext) -> ProjectType {
    let readme_lower = ctx.readme.to_lowercase();
    if ctx.readme.contains("CLI") || readme_lower.contains("command") {
        return ProjectType::Cli;
    }
    if ctx.readme.contains("API") || readme_lower.contains("server") {
        return ProjectType::WebApi;
    }
    if readme_lower.contains("library") || readme_lower.contains("package") {
        return ProjectType::Library;
    }

    let uses = |frameworks: &[&str]| {
        ctx.dependencies
            .iter()
            .any(|d| frameworks.iter().any(|f| d.contains(f)))
    };
    if uses(WEB_FRAMEWORKS) {
        return ProjectType::WebApi;
    }
    if uses(CLI_FRAMEWORKS) {
        return ProjectType::Cli;
    }

    let structure = &ctx.directory_structure;
    if structure.contains("cmd/") {
        return ProjectType::Cli;
    }
    if structure.contains("api/") || structure.contains("server/") {
        return ProjectType::WebApi;
    }
    ProjectType::Application
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::StubSystem;
    use tempfile::TempDir;

    const GO_MOD: &str = "module github.com/acme/widgets\n\ngo 1.22\n\nrequire (\n\tgithub.com/spf13/cobra v1.8.0\n\tgithub.com/stretchr/testify v1.9.0 // indirect\n)\n\nrequire golang.org/x/sync v0.7.0\n\nreplace (\n\tgithub.com/old/dep => ../dep\n)\n";

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn parses_go_mod_directives() {
        let m = parse_go_mod(GO_MOD);
        assert_eq!(m.module_path, "github.com/acme/widgets");
        assert_eq!(m.go_version, "1.22");
        assert_eq!(
            m.dependencies,
            vec![
                "github.com/spf13/cobra",
                "github.com/stretchr/testify",
                "golang.org/x/sync"
            ]
        );
        assert_eq!(m.project_name(), "widgets");
    }

    #[test]
    fn all_flags_off_returns_nothing() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "go.mod", GO_MOD);
        let outcome = gather(dir.path(), &ContextConfig::disabled(), &StubSystem::default());
        assert!(outcome.context.is_none());
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn partial_failure_keeps_what_was_found() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "go.mod", GO_MOD);
        write(dir.path(), "README.md", "# Widgets\nA tool for widgets.");
        let outcome = gather(dir.path(), &ContextConfig::auto(), &StubSystem::default());

        let ctx = outcome.context.expect("context");
        assert_eq!(ctx.project_name, "widgets");
        assert!(ctx.readme.contains("A tool for widgets."));
        assert!(ctx.recent_commits.is_empty());
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].subtask, Subtask::Commits);
    }

    #[test]
    fn auto_detect_on_empty_dir_is_never_silent() {
        let dir = TempDir::new().unwrap();
        let outcome = gather(dir.path(), &ContextConfig::auto(), &StubSystem::default());
        assert!(outcome.context.is_some() || !outcome.diagnostics.is_empty());
        assert!(outcome.gathering_failed());
    }

    #[test]
    fn commits_are_capped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "go.mod", GO_MOD);
        let system = StubSystem {
            commits: Some((0..20).map(|i| format!("c{i} change {i}")).collect()),
            ..Default::default()
        };
        let cfg = ContextConfig {
            max_commits: 3,
            ..ContextConfig::auto()
        };
        let ctx = gather(dir.path(), &cfg, &system).context.unwrap();
        assert_eq!(ctx.recent_commits.len(), 3);
    }

    #[test]
    fn readme_preference_and_docs_sections() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "README.txt", "text readme");
        write(dir.path(), "README.md", "markdown readme");
        write(dir.path(), "docs/README.md", "docs index");
        write(dir.path(), "docs/getting-started.md", "install it");
        write(dir.path(), "docs/api/error_codes.md", "codes");
        write(dir.path(), "docs/notes.txt", "ignored");

        let readme = collect_readme(dir.path()).unwrap();
        assert!(readme.starts_with("markdown readme"));
        assert!(!readme.contains("text readme"));
        assert!(readme.contains("## Documentation\n\ndocs index"));
        assert!(readme.contains("## Getting Started\n\ninstall it"));
        assert!(readme.contains("## Error Codes\n\ncodes"));
        assert!(!readme.contains("ignored"));
        assert_eq!(readme.matches("docs index").count(), 1);
    }

    #[test]
    fn nested_docs_readme_is_kept() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "docs/README.md", "docs index");
        write(dir.path(), "docs/api/README.md", "api overview");

        let readme = collect_readme(dir.path()).unwrap();
        assert_eq!(readme.matches("docs index").count(), 1);
        assert!(readme.contains("api overview"));
    }

    #[test]
    fn non_utf8_doc_page_keeps_root_readme() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "README.md", "root readme");
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/latin1.md"), b"caf\xe9").unwrap();

        let readme = collect_readme(dir.path()).unwrap();
        assert!(readme.starts_with("root readme"));
        assert!(readme.contains("## Latin1\n\ncaf\u{fffd}"));
    }

    #[test]
    fn section_titles() {
        assert_eq!(section_title("getting-started_guide"), "Getting Started Guide");
        assert_eq!(section_title("FAQ"), "FAQ");
    }

    #[test]
    fn structure_respects_skip_list_depth_and_importance() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "main.go", "");
        write(root, "notes.bin", "");
        write(root, "cmd/mcq/main.go", "");
        write(root, "internal/a/b/c/deep.go", "");
        write(root, "vendor/x/y.go", "");
        write(root, "node_modules/z/index.js", "");
        write(root, ".hidden/secret.go", "");
        write(root, "internal/a/b/keep.go", "");

        let s = directory_structure(root).unwrap();
        assert!(s.contains("main.go\n"));
        assert!(s.contains("cmd/\n  mcq/\n    main.go\n"));
        assert!(s.contains("      keep.go\n"));
        assert!(!s.contains("c/"));
        assert!(!s.contains("deep.go"));
        assert!(!s.contains("vendor"));
        assert!(!s.contains("node_modules"));
        assert!(!s.contains(".hidden"));
        assert!(!s.contains("notes.bin"));

        for line in s.lines() {
            let depth = (line.len() - line.trim_start().len()) / 2;
            if line.ends_with('/') {
                assert!(depth < MAX_STRUCTURE_DEPTH, "directory too deep: {line}");
            } else {
                assert!(is_important(line.trim()), "unimportant file listed: {line}");
            }
        }
    }

    #[test]
    fn config_files_respect_size_limit() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Makefile", "build:\n\tgo build ./...\n");
        write(dir.path(), "Dockerfile", &"RUN true\n".repeat(100));
        write(dir.path(), ".env", "PORT=8080");
        write(dir.path(), "notes.txt", "not allowlisted");
        let files = collect_config_files(dir.path(), 100).unwrap();
        assert!(files.contains_key("Makefile"));
        assert!(files.contains_key(".env"));
        assert!(!files.contains_key("Dockerfile"));
        assert!(!files.contains_key("notes.txt"));
        assert!(files.values().all(|v| v.len() <= 100));
    }

    #[test]
    fn classification_priorities() {
        let mut ctx = RepoContext {
            readme: "A small HTTP server".into(),
            dependencies: vec!["github.com/spf13/cobra".into()],
            ..Default::default()
        };
        assert_eq!(classify_project(&ctx), ProjectType::WebApi);

        ctx.readme = String::new();
        assert_eq!(classify_project(&ctx), ProjectType::Cli);

        ctx.dependencies = vec!["github.com/gin-gonic/gin".into()];
        assert_eq!(classify_project(&ctx), ProjectType::WebApi);

        ctx.dependencies.clear();
        ctx.directory_structure = "pkg/\n  util.go\n".into();
        assert_eq!(classify_project(&ctx), ProjectType::Application);

        ctx.directory_structure = "cmd/\n".into();
        assert_eq!(classify_project(&ctx), ProjectType::Cli);

        ctx.directory_structure.clear();
        ctx.readme = "Reusable library for parsing".into();
        assert_eq!(classify_project(&ctx), ProjectType::Library);
    }

    #[test]
    fn resolved_auto_detect_turns_everything_on() {
        let cfg = ContextConfig {
            auto_detect: true,
            include_readme: false,
            max_commits: 0,
            ..ContextConfig::disabled()
        };
        let r = cfg.resolved();
        assert!(r.include_readme && r.include_commits && r.include_configs);
        assert_eq!(r.max_commits, 10);
    }
}
