use thiserror::Error;

#[derive(Debug, Error)]
pub enum McqError {
    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error("go.mod not found in {0}")]
    ManifestNotFound(String),

    #[error("git: {0}")]
    Git(String),

    #[error("no clipboard tool found (tried pbcopy, wl-copy, xclip, xsel)")]
    NoClipboardTool,

    #[error("clipboard: {0}")]
    Clipboard(String),

    #[error("template '{name}': {message}")]
    Template { name: String, message: String },

    #[error("unknown model '{0}'")]
    UnknownModel(String),

    #[error("model '{model}' needs {env} to be set")]
    MissingCredential { model: String, env: &'static str },

    #[error("no API key found: set ANTHROPIC_API_KEY or OPENAI_API_KEY")]
    NoCredentials,

    #[error("invalid model choice '{0}'")]
    InvalidChoice(String),

    #[error("JIRA request failed with HTTP {status}: {message}")]
    Jira { status: u16, message: String },

    #[error("JIRA is not configured: missing {0}")]
    JiraConfigMissing(String),

    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("prompt input: {0}")]
    Prompt(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl McqError {
    /// HTTP status carried by the error, when it came from a remote service.
    pub fn status(&self) -> Option<u16> {
        match self {
            McqError::Jira { status, .. } => Some(*status),
            McqError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, McqError>;
