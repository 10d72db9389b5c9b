use crate::error::{McqError, Result};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const MCQ_DIR: &str = ".mcq";
pub const CONFIG_FILE: &str = "config.yaml";
pub const PROMPTS_DIR: &str = "prompts";

pub const GO_MOD: &str = "go.mod";
pub const DOCS_DIR: &str = "docs";

/// README extensions in order of preference; the empty string is a bare `README`.
pub const README_EXTENSIONS: &[&str] = &[".md", ".rst", ".txt", ""];

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn home_dir() -> Result<PathBuf> {
    home::home_dir().ok_or(McqError::HomeNotFound)
}

/// `~/.mcq`
pub fn mcq_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(MCQ_DIR))
}

/// `~/.mcq/config.yaml`
pub fn config_path() -> Result<PathBuf> {
    Ok(mcq_dir()?.join(CONFIG_FILE))
}

/// `~/.mcq/prompts`, the default target of `templates generate`.
pub fn default_prompts_dir() -> Result<PathBuf> {
    Ok(mcq_dir()?.join(PROMPTS_DIR))
}

pub fn go_mod_path(root: &Path) -> PathBuf {
    root.join(GO_MOD)
}

/// First existing `README{ext}` under `dir`, by extension preference.
pub fn find_readme(dir: &Path) -> Option<PathBuf> {
    README_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("README{ext}")))
        .find(|p| p.is_file())
}
