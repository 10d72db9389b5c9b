//! User-facing error taxonomy.
//!
//! Low-level failures are classified once, at the outermost boundary of an
//! operation, into a closed set of [`ErrorCode`]s that carry a summary, a
//! one-line suggestion and ordered remediation steps.

use std::error::Error as StdError;
use std::fmt;

use mcq_llm::{LlmError, StreamFailure};
use serde::Serialize;

use crate::error::McqError;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    JiraAuthFailed,
    JiraConfigMissing,
    ModelNotAvailable,
    IssueNotFound,
    ContextGatheringFailed,
    ClipboardFailed,
    ModelTokenLimit,
    StreamTimeout,
    StreamNetwork,
    StreamProtocol,
    UnknownError,
}

impl ErrorCode {
    pub fn all() -> &'static [ErrorCode] {
        &[
            ErrorCode::JiraAuthFailed,
            ErrorCode::JiraConfigMissing,
            ErrorCode::ModelNotAvailable,
            ErrorCode::IssueNotFound,
            ErrorCode::ContextGatheringFailed,
            ErrorCode::ClipboardFailed,
            ErrorCode::ModelTokenLimit,
            ErrorCode::StreamTimeout,
            ErrorCode::StreamNetwork,
            ErrorCode::StreamProtocol,
            ErrorCode::UnknownError,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::JiraAuthFailed => "JIRA_AUTH_FAILED",
            ErrorCode::JiraConfigMissing => "JIRA_CONFIG_MISSING",
            ErrorCode::ModelNotAvailable => "MODEL_NOT_AVAILABLE",
            ErrorCode::IssueNotFound => "ISSUE_NOT_FOUND",
            ErrorCode::ContextGatheringFailed => "CONTEXT_GATHERING_FAILED",
            ErrorCode::ClipboardFailed => "CLIPBOARD_FAILED",
            ErrorCode::ModelTokenLimit => "MODEL_TOKEN_LIMIT",
            ErrorCode::StreamTimeout => "STREAM_TIMEOUT",
            ErrorCode::StreamNetwork => "STREAM_NETWORK",
            ErrorCode::StreamProtocol => "STREAM_PROTOCOL",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }

    pub fn summary(self) -> &'static str {
        match self {
            ErrorCode::JiraAuthFailed => "JIRA authentication failed",
            ErrorCode::JiraConfigMissing => "JIRA configuration is incomplete",
            ErrorCode::ModelNotAvailable => "The requested AI model is not available",
            ErrorCode::IssueNotFound => "JIRA issue not found",
            ErrorCode::ContextGatheringFailed => "Could not gather repository context",
            ErrorCode::ClipboardFailed => "Could not copy to the clipboard",
            ErrorCode::ModelTokenLimit => "The prompt is too large for the model",
            ErrorCode::StreamTimeout => "The AI response timed out",
            ErrorCode::StreamNetwork => "Network error while talking to the AI provider",
            ErrorCode::StreamProtocol => "The AI provider sent a response that could not be read",
            ErrorCode::UnknownError => "An unexpected error occurred",
        }
    }

    pub fn suggestion(self) -> &'static str {
        match self {
            ErrorCode::JiraAuthFailed => "Check your JIRA username and API token.",
            ErrorCode::JiraConfigMissing => "Set the JIRA environment variables or run `mcq config setup`.",
            ErrorCode::ModelNotAvailable => "Set an API key for the model's provider or pick another model.",
            ErrorCode::IssueNotFound => "Check the issue key and your access to the project.",
            ErrorCode::ContextGatheringFailed => "Continuing without repository context.",
            ErrorCode::ClipboardFailed => "Copy the output from the terminal instead.",
            ErrorCode::ModelTokenLimit => "Reduce the amount of repository context sent with the prompt.",
            ErrorCode::StreamTimeout => "Try again, or use a faster model.",
            ErrorCode::StreamNetwork => "Check your network connection and try again.",
            ErrorCode::StreamProtocol => "Try again; if it persists, try a different model.",
            ErrorCode::UnknownError => "Re-run with -v for details.",
        }
    }

    pub fn remediation(self) -> Vec<&'static str> {
        match self {
            ErrorCode::JiraAuthFailed => vec![
                "Verify JIRA_USERNAME is the email address of your JIRA account",
                "Create a new API token at https://id.atlassian.com/manage-profile/security/api-tokens",
                "Export it as JIRA_API_TOKEN",
                "Run `mcq config test` to check the connection",
            ],
            ErrorCode::JiraConfigMissing => vec![
                "Export JIRA_INSTANCE_URL, JIRA_USERNAME, JIRA_API_TOKEN and JIRA_PROJECT_PREFIX",
                "Or run `mcq config setup` and fill in ~/.mcq/config.yaml",
                "Run `mcq config show` to see the effective values",
            ],
            ErrorCode::ModelNotAvailable => vec![
                "Export ANTHROPIC_API_KEY for claude",
                "Export OPENAI_API_KEY for the gpt-* models",
                "Pass --model with one of: claude, gpt-5, gpt-5-mini, gpt-5-nano, gpt-4o",
            ],
            ErrorCode::IssueNotFound => vec![
                "Check the key format, e.g. PROJ-123",
                "Open the issue in a browser to confirm you can see it",
            ],
            ErrorCode::ContextGatheringFailed => vec![
                "Run `mcq context test` to see which collectors failed",
                "Run from the repository root, or pass --root",
            ],
            ErrorCode::ClipboardFailed => vec![
                "Install pbcopy (macOS), wl-copy (Wayland), xclip or xsel (X11)",
            ],
            ErrorCode::ModelTokenLimit => vec![
                "Re-run with --no-context",
                "Or drop parts of the context: --no-readme, --no-structure, --no-configs",
                "Lower --max-commits or --max-file-size",
                "Use a model with a larger context window or a faster tier",
            ],
            ErrorCode::StreamTimeout => vec![
                "Re-run the command",
                "Raise llm.stream_timeout_secs or MCQ_STREAM_TIMEOUT_SECS",
                "Use a faster model, e.g. --model gpt-5-mini",
            ],
            ErrorCode::StreamNetwork => vec![
                "Check connectivity to the provider endpoint",
                "Check proxy settings and ANTHROPIC_BASE_URL/OPENAI_BASE_URL",
                "Re-run the command",
            ],
            ErrorCode::StreamProtocol => vec![
                "Re-run the command",
                "Try another model with --model",
                "Re-run with -vv and report the logged payload",
            ],
            ErrorCode::UnknownError => vec![
                "Re-run with -v to see the underlying error",
            ],
        }
    }

    /// Non-fatal codes are reported as warnings and the operation continues.
    pub fn is_fatal(self) -> bool {
        !matches!(
            self,
            ErrorCode::ContextGatheringFailed | ErrorCode::ClipboardFailed
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// UserError
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct UserError {
    pub code: ErrorCode,
    pub summary: String,
    pub suggestion: String,
    pub remediation: Vec<String>,
    /// Extra detail shown under the summary (partial output, provider text).
    pub detail: Option<String>,
    pub wrapped: Option<BoxError>,
}

impl UserError {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            summary: code.summary().to_string(),
            suggestion: code.suggestion().to_string(),
            remediation: code.remediation().into_iter().map(String::from).collect(),
            detail: None,
            wrapped: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn wrap<E>(mut self, err: E) -> Self
    where
        E: Into<BoxError>,
    {
        self.wrapped = Some(err.into());
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.code.is_fatal()
    }

    /// Multi-line rendering used by the binary before exiting.
    pub fn report(&self, verbose: bool) -> String {
        let mut out = format!("error[{}]: {}\n", self.code, self.summary);
        if let Some(detail) = &self.detail {
            out.push_str(&format!("  {detail}\n"));
        }
        out.push_str(&format!("  {}\n", self.suggestion));
        if !self.remediation.is_empty() {
            out.push_str("\nTo fix:\n");
            for (i, step) in self.remediation.iter().enumerate() {
                out.push_str(&format!("  {}. {step}\n", i + 1));
            }
        }
        if verbose {
            if let Some(wrapped) = &self.wrapped {
                out.push_str(&format!("\nCaused by: {wrapped}\n"));
                let mut source = wrapped.source();
                while let Some(s) = source {
                    out.push_str(&format!("  {s}\n"));
                    source = s.source();
                }
            }
        }
        out
    }
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.summary)?;
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

impl StdError for UserError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.wrapped
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// What the caller was doing when the error happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Generate,
    JiraCreate,
    JiraFetch,
    JiraConfig,
    Clipboard,
    Context,
    ModelSelect,
    Templates,
}

impl Operation {
    fn is_jira(self) -> bool {
        matches!(
            self,
            Operation::JiraCreate | Operation::JiraFetch | Operation::JiraConfig
        )
    }
}

/// Classify an error from the core library.
pub fn classify(err: McqError, op: Operation) -> UserError {
    let code = match &err {
        McqError::UnknownModel(_)
        | McqError::MissingCredential { .. }
        | McqError::NoCredentials
        | McqError::InvalidChoice(_) => Some(ErrorCode::ModelNotAvailable),
        McqError::JiraConfigMissing(_) => Some(ErrorCode::JiraConfigMissing),
        McqError::NoClipboardTool | McqError::Clipboard(_) => Some(ErrorCode::ClipboardFailed),
        _ => match err.status() {
            Some(401 | 403) if op.is_jira() => Some(ErrorCode::JiraAuthFailed),
            Some(404) if op == Operation::JiraFetch => Some(ErrorCode::IssueNotFound),
            _ => None,
        },
    };
    let code = code.unwrap_or_else(|| match op {
        Operation::Clipboard => ErrorCode::ClipboardFailed,
        Operation::Context => ErrorCode::ContextGatheringFailed,
        _ => classify_message(&err.to_string(), op),
    });
    let detail = err.to_string();
    UserError::new(code).with_detail(detail).wrap(err)
}

/// Classify a provider failure, reporting any text that arrived before it.
pub fn from_stream_failure(failure: StreamFailure) -> UserError {
    let code = classify_llm(&failure.error);
    let mut detail = match failure.error.provider_message() {
        Some(message) => message.to_string(),
        None => failure.error.to_string(),
    };
    if failure.has_partial() {
        let chars = failure.partial.chars().count();
        detail.push_str(&format!(
            " (response incomplete: {chars} characters received before the failure)"
        ));
    }
    UserError::new(code).with_detail(detail).wrap(failure)
}

pub fn from_llm_error(err: LlmError) -> UserError {
    from_stream_failure(StreamFailure::from(err))
}

fn classify_llm(err: &LlmError) -> ErrorCode {
    match err {
        LlmError::Timeout { .. } => ErrorCode::StreamTimeout,
        LlmError::Parse { .. } | LlmError::EmptyResponse => ErrorCode::StreamProtocol,
        LlmError::Connect(_) | LlmError::Network(_) | LlmError::Io(_) => ErrorCode::StreamNetwork,
        LlmError::Cancelled => ErrorCode::UnknownError,
        LlmError::Http { status: 401 | 403, .. } => ErrorCode::ModelNotAvailable,
        LlmError::Http { status: 404, .. } => ErrorCode::ModelNotAvailable,
        LlmError::Http { status: 408 | 504, .. } => ErrorCode::StreamTimeout,
        _ => classify_message(&err.to_string(), Operation::Generate),
    }
}

const AUTH_PHRASES: &[&str] = &["authentication", "unauthorized", "invalid api key", "invalid x-api-key"];
const NOT_FOUND_PHRASES: &[&str] = &["not found", "404"];
const TOKEN_LIMIT_PHRASES: &[&str] = &[
    "context length",
    "context_length",
    "maximum context",
    "too many tokens",
    "prompt is too long",
];
const CREDENTIAL_PHRASES: &[&str] = &["api key", "api_key", "token"];
const TIMEOUT_PHRASES: &[&str] = &["timeout", "timed out", "deadline exceeded"];
const NETWORK_PHRASES: &[&str] = &["connection", "network", "dial", "broken pipe"];
const PROTOCOL_PHRASES: &[&str] = &["unmarshal", "json", "decode"];

/// Ordered substring rules; first match wins.
pub fn classify_message(message: &str, op: Operation) -> ErrorCode {
    let m = message.to_lowercase();
    let any = |phrases: &[&str]| phrases.iter().any(|p| m.contains(p));

    if any(AUTH_PHRASES) {
        return if op.is_jira() {
            ErrorCode::JiraAuthFailed
        } else {
            ErrorCode::ModelNotAvailable
        };
    }
    if op == Operation::JiraFetch && any(NOT_FOUND_PHRASES) {
        return ErrorCode::IssueNotFound;
    }
    if any(TOKEN_LIMIT_PHRASES) {
        return ErrorCode::ModelTokenLimit;
    }
    if any(CREDENTIAL_PHRASES) {
        return if op.is_jira() {
            ErrorCode::JiraAuthFailed
        } else {
            ErrorCode::ModelNotAvailable
        };
    }
    if any(TIMEOUT_PHRASES) {
        return ErrorCode::StreamTimeout;
    }
    if any(NETWORK_PHRASES) {
        return ErrorCode::StreamNetwork;
    }
    if any(PROTOCOL_PHRASES) {
        return ErrorCode::StreamProtocol;
    }
    ErrorCode::UnknownError
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
