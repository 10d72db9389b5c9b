use std::fmt;

use thiserror::Error;

/// Where a deadline was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutStage {
    /// Establishing the connection and receiving response headers.
    Request,
    /// Reading the body of an already-open stream.
    Stream,
}

impl fmt::Display for TimeoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeoutStage::Request => f.write_str("waiting for the provider to respond"),
            TimeoutStage::Stream => f.write_str("while streaming the response"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP request could not be sent (DNS, connect, TLS).
    #[error("connection error: {0}")]
    Connect(#[source] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("provider returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The provider reported an error inside an otherwise healthy stream.
    #[error("provider error: {message}")]
    Provider {
        kind: Option<String>,
        message: String,
    },

    /// The body stream broke after it started.
    #[error("network error while streaming: {0}")]
    Network(String),

    #[error("deadline exceeded {stage}")]
    Timeout { stage: TimeoutStage },

    #[error("failed to decode stream payload: {source}\n  line: {line}")]
    Parse {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("generation cancelled")]
    Cancelled,

    #[error("empty response from provider")]
    EmptyResponse,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl LlmError {
    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Http { status, .. } => Some(*status),
            LlmError::Connect(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The provider's own message, when it sent one.
    pub fn provider_message(&self) -> Option<&str> {
        match self {
            LlmError::Http { message, .. } | LlmError::Provider { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// A stream that failed, together with whatever text arrived before it did.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct StreamFailure {
    #[source]
    pub error: LlmError,
    /// Deltas accumulated before the failure, in arrival order.
    pub partial: String,
}

impl StreamFailure {
    pub fn new(error: LlmError, partial: impl Into<String>) -> Self {
        Self {
            error,
            partial: partial.into(),
        }
    }

    pub fn has_partial(&self) -> bool {
        !self.partial.is_empty()
    }
}

impl From<LlmError> for StreamFailure {
    fn from(error: LlmError) -> Self {
        StreamFailure::new(error, String::new())
    }
}
