use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Provider ─────────────────────────────────────────────────────────────

/// The hosted LLM services this crate can stream from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Anthropic,
    OpenAi,
}

impl Provider {
    pub fn all() -> &'static [Provider] {
        &[Provider::Anthropic, Provider::OpenAi]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Anthropic => "Anthropic",
            Provider::OpenAi => "OpenAI",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn credential_env(self) -> &'static str {
        match self {
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::Anthropic => "https://api.anthropic.com",
            Provider::OpenAi => "https://api.openai.com",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── MaxTokens ────────────────────────────────────────────────────────────

/// How the `max_tokens` request field is populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "value", rename_all = "snake_case")]
pub enum MaxTokens {
    /// Leave the field out of the request entirely.
    Omit,
    Fixed(u32),
}

/// Default cap for OpenAI models that still accept `max_tokens`.
pub const OPENAI_DEFAULT_MAX_TOKENS: u32 = 4000;

/// Wire id prefix of the OpenAI family that rejects `max_tokens`.
pub const OPENAI_NO_MAX_TOKENS_PREFIX: &str = "gpt-5";

impl MaxTokens {
    pub fn for_openai(wire_id: &str) -> MaxTokens {
        if wire_id.starts_with(OPENAI_NO_MAX_TOKENS_PREFIX) {
            MaxTokens::Omit
        } else {
            MaxTokens::Fixed(OPENAI_DEFAULT_MAX_TOKENS)
        }
    }

    pub fn value(self) -> Option<u32> {
        match self {
            MaxTokens::Omit => None,
            MaxTokens::Fixed(n) => Some(n),
        }
    }
}

impl fmt::Display for MaxTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxTokens::Omit => f.write_str("omitted"),
            MaxTokens::Fixed(n) => write!(f, "{n}"),
        }
    }
}

// ─── CompletionRequest ────────────────────────────────────────────────────

/// One streaming completion: a single user message against one model.
#[derive(Clone)]
pub struct CompletionRequest {
    pub provider: Provider,
    /// Model identifier sent on the wire.
    pub model: String,
    pub api_key: String,
    pub prompt: String,
    pub max_tokens: MaxTokens,
}

impl fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &mask_key(&self.api_key))
            .field("prompt_chars", &self.prompt.chars().count())
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Render a credential for logs: `***` plus its last four characters.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "***".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("***{tail}")
}

// ─── StreamEvent ──────────────────────────────────────────────────────────

/// Provider-neutral unit of a streaming response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A non-empty piece of generated text.
    Delta(String),
    /// The provider signalled the end of the response.
    Done,
    /// The provider reported a failure inside the stream.
    Error(StreamErrorInfo),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamErrorInfo {
    pub kind: Option<String>,
    pub message: String,
}

// ─── Shared wire pieces ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl WireMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// `{"error": {"type": ..., "message": ...}}` — the error envelope both
/// providers use for non-2xx bodies and in-stream failures.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: WireError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireError {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}

impl From<WireError> for StreamErrorInfo {
    fn from(e: WireError) -> Self {
        StreamErrorInfo {
            kind: e.kind,
            message: e.message,
        }
    }
}

// ─── Anthropic messages API ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct AnthropicRequest {
    pub model: String,
    pub max_tokens: u32,
    pub stream: bool,
    pub messages: Vec<WireMessage>,
}

/// One `data:` payload of the messages SSE stream. Discriminated by `type`;
/// only the fields this client reads are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub delta: Option<AnthropicDelta>,
    #[serde(default)]
    pub content_block: Option<AnthropicContentBlock>,
    #[serde(default)]
    pub error: Option<WireError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicDelta {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicContentBlock {
    #[serde(default)]
    pub text: Option<String>,
}

// ─── OpenAI chat completions ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct OpenAiRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChunk {
    #[serde(default)]
    pub choices: Vec<OpenAiChoice>,
    #[serde(default)]
    pub error: Option<WireError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChoice {
    #[serde(default)]
    pub delta: OpenAiDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl OpenAiChunk {
    /// Text carried by `choices[0].delta.content`, if non-empty.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
            .filter(|t| !t.is_empty())
    }
}
