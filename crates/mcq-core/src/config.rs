use crate::error::{McqError, Result};
use crate::io;
use mcq_llm::{mask_key, ClientOptions, Provider};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// LlmSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_stream_timeout")]
    pub stream_timeout_secs: u64,
    /// Registry key used when no `--model` is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai_base_url: Option<String>,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_stream_timeout() -> u64 {
    300
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            stream_timeout_secs: default_stream_timeout(),
            default_model: None,
            anthropic_base_url: None,
            openai_base_url: None,
        }
    }
}

impl LlmSettings {
    pub fn client_options(&self) -> ClientOptions {
        let defaults = ClientOptions::default();
        ClientOptions {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            stream_timeout: Duration::from_secs(self.stream_timeout_secs),
            anthropic_base_url: self
                .anthropic_base_url
                .clone()
                .unwrap_or(defaults.anthropic_base_url),
            openai_base_url: self
                .openai_base_url
                .clone()
                .unwrap_or(defaults.openai_base_url),
        }
    }

    pub fn base_url(&self, provider: Provider) -> &str {
        let configured = match provider {
            Provider::Anthropic => self.anthropic_base_url.as_deref(),
            Provider::OpenAi => self.openai_base_url.as_deref(),
        };
        configured.unwrap_or(provider.default_base_url())
    }
}

// ---------------------------------------------------------------------------
// ContextSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSettings {
    #[serde(default = "default_max_commits")]
    pub max_commits: usize,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

pub fn default_max_commits() -> usize {
    10
}

pub fn default_max_file_size() -> u64 {
    10 * 1024
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            max_commits: default_max_commits(),
            max_file_size: default_max_file_size(),
        }
    }
}

// ---------------------------------------------------------------------------
// JiraSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JiraSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Project key new issues are filed under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_prefix: Option<String>,
}

/// Fully populated JIRA settings, ready for a client.
#[derive(Clone)]
pub struct JiraCredentials {
    pub instance_url: String,
    pub username: String,
    pub api_token: String,
    pub project_key: String,
}

impl std::fmt::Debug for JiraCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraCredentials")
            .field("instance_url", &self.instance_url)
            .field("username", &self.username)
            .field("api_token", &mask_key(&self.api_token))
            .field("project_key", &self.project_key)
            .finish()
    }
}

impl JiraSettings {
    /// Names of the environment variables whose values are still missing.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.instance_url) {
            missing.push("JIRA_INSTANCE_URL");
        }
        if is_blank(&self.username) {
            missing.push("JIRA_USERNAME");
        }
        if is_blank(&self.api_token) {
            missing.push("JIRA_API_TOKEN");
        }
        if is_blank(&self.project_prefix) {
            missing.push("JIRA_PROJECT_PREFIX");
        }
        missing
    }

    pub fn require(&self) -> Result<JiraCredentials> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(McqError::JiraConfigMissing(missing.join(", ")));
        }
        Ok(JiraCredentials {
            instance_url: self
                .instance_url
                .clone()
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            username: self.username.clone().unwrap_or_default(),
            api_token: self.api_token.clone().unwrap_or_default(),
            project_key: self.project_prefix.clone().unwrap_or_default(),
        })
    }
}

fn is_blank(v: &Option<String>) -> bool {
    v.as_deref().map_or(true, |s| s.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub context: ContextSettings,
    #[serde(default)]
    pub jira: JiraSettings,
    /// Directory holding `<kind>.tpl` overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts_dir: Option<PathBuf>,
}

impl Config {
    /// Load from `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load `~/.mcq/config.yaml` and layer the process environment on top.
    pub fn load_effective() -> Result<Self> {
        let mut cfg = Self::load(&crate::paths::config_path()?)?;
        cfg.apply_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        io::atomic_write(path, data.as_bytes())
    }

    /// Override file values with environment variables. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("JIRA_INSTANCE_URL") {
            self.jira.instance_url = Some(v);
        }
        if let Some(v) = get("JIRA_USERNAME") {
            self.jira.username = Some(v);
        }
        if let Some(v) = get("JIRA_API_TOKEN").or_else(|| get("JIRA_PASSWORD")) {
            self.jira.api_token = Some(v);
        }
        if let Some(v) = get("JIRA_PROJECT_PREFIX") {
            self.jira.project_prefix = Some(v);
        }
        if let Some(v) = get("MCQ_PROMPTS_DIR") {
            self.prompts_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("MCQ_MODEL") {
            self.llm.default_model = Some(v);
        }
        if let Some(v) = get("MCQ_STREAM_TIMEOUT_SECS") {
            match v.trim().parse::<u64>() {
                Ok(secs) => self.llm.stream_timeout_secs = secs,
                Err(_) => tracing::warn!(value = %v, "ignoring non-numeric MCQ_STREAM_TIMEOUT_SECS"),
            }
        }
        if let Some(v) = get("ANTHROPIC_BASE_URL") {
            self.llm.anthropic_base_url = Some(v);
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.llm.openai_base_url = Some(v);
        }
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        let missing = self.jira.missing();
        if !missing.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "JIRA is not fully configured (missing {}); `jira` commands will fail",
                    missing.join(", ")
                ),
            });
        }

        if self.llm.request_timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "llm.request_timeout_secs is 0; every request would time out".into(),
            });
        }
        if self.llm.stream_timeout_secs == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "llm.stream_timeout_secs is 0; every stream would time out".into(),
            });
        } else if self.llm.stream_timeout_secs < self.llm.request_timeout_secs {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "llm.stream_timeout_secs ({}) is shorter than llm.request_timeout_secs ({})",
                    self.llm.stream_timeout_secs, self.llm.request_timeout_secs
                ),
            });
        }

        if let Some(model) = &self.llm.default_model {
            if crate::models::get(model).is_none() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("default model '{model}' is not a known model key"),
                });
            }
        }

        if let Some(dir) = &self.prompts_dir {
            if !dir.is_dir() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "prompts directory '{}' does not exist; built-in templates will be used",
                        dir.display()
                    ),
                });
            }
        }

        warnings
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        if let Some(token) = &cfg.jira.api_token {
            cfg.jira.api_token = Some(mask_key(token));
        }
        cfg
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = Config::load(&dir.path().join("config.yaml")).unwrap();
        assert_eq!(cfg.llm.request_timeout_secs, 30);
        assert_eq!(cfg.llm.stream_timeout_secs, 300);
        assert_eq!(cfg.context.max_commits, 10);
        assert_eq!(cfg.context.max_file_size, 10240);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "llm:\n  stream_timeout_secs: 600\n").unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.llm.stream_timeout_secs, 600);
        assert_eq!(cfg.llm.request_timeout_secs, 30);
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub/config.yaml");
        let mut cfg = Config::default();
        cfg.jira.project_prefix = Some("MCQ".into());
        cfg.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.jira.project_prefix.as_deref(), Some("MCQ"));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = Config::default();
        cfg.jira.username = Some("file-user".into());
        cfg.apply_env(env(&[
            ("JIRA_USERNAME", "env-user"),
            ("JIRA_PASSWORD", "pw"),
            ("MCQ_STREAM_TIMEOUT_SECS", "42"),
            ("MCQ_PROMPTS_DIR", "/tmp/prompts"),
            ("ANTHROPIC_BASE_URL", "http://localhost:1234"),
        ]));
        assert_eq!(cfg.jira.username.as_deref(), Some("env-user"));
        assert_eq!(cfg.jira.api_token.as_deref(), Some("pw"));
        assert_eq!(cfg.llm.stream_timeout_secs, 42);
        assert_eq!(cfg.prompts_dir, Some(PathBuf::from("/tmp/prompts")));
        assert_eq!(cfg.llm.base_url(Provider::Anthropic), "http://localhost:1234");
        assert_eq!(cfg.llm.base_url(Provider::OpenAi), "https://api.openai.com");
    }

    #[test]
    fn api_token_wins_over_password() {
        let mut cfg = Config::default();
        cfg.apply_env(env(&[("JIRA_API_TOKEN", "tok"), ("JIRA_PASSWORD", "pw")]));
        assert_eq!(cfg.jira.api_token.as_deref(), Some("tok"));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut cfg = Config::default();
        cfg.jira.instance_url = Some("https://x.atlassian.net".into());
        cfg.apply_env(env(&[("JIRA_INSTANCE_URL", "  ")]));
        assert_eq!(cfg.jira.instance_url.as_deref(), Some("https://x.atlassian.net"));
    }

    #[test]
    fn require_lists_missing_variables() {
        let settings = JiraSettings {
            instance_url: Some("https://x".into()),
            ..Default::default()
        };
        let err = settings.require().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("JIRA_USERNAME"));
        assert!(msg.contains("JIRA_API_TOKEN"));
        assert!(!msg.contains("JIRA_INSTANCE_URL"));
    }

    #[test]
    fn require_trims_trailing_slash() {
        let settings = JiraSettings {
            instance_url: Some("https://x.atlassian.net/".into()),
            username: Some("u".into()),
            api_token: Some("t".into()),
            project_prefix: Some("MCQ".into()),
        };
        assert_eq!(settings.require().unwrap().instance_url, "https://x.atlassian.net");
    }

    #[test]
    fn validate_flags_zero_timeouts_and_unknown_model() {
        let mut cfg = Config::default();
        cfg.llm.stream_timeout_secs = 0;
        cfg.llm.default_model = Some("gpt-2".into());
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("stream_timeout")));
        assert!(warnings.iter().any(|w| w.message.contains("gpt-2")));
    }

    #[test]
    fn redacted_masks_token() {
        let mut cfg = Config::default();
        cfg.jira.api_token = Some("abcdefgh1234".into());
        assert_eq!(cfg.redacted().jira.api_token.as_deref(), Some("***1234"));
    }
}
