//! `mcq-llm` — streaming clients for hosted chat-completion APIs.
//!
//! Two providers are supported behind one contract: a single user prompt
//! goes out as a long-lived HTTP POST, and the response comes back as an
//! ordered stream of normalized [`StreamEvent`]s.
//!
//! # Architecture
//!
//! ```text
//! CompletionRequest
//!     │
//!     ▼
//! ProviderClient   ← picks the adapter for request.provider
//!     │              (anthropic: SSE, openai: chunked data lines)
//!     ▼
//! EventStream      ← implements futures::Stream<Item = Result<StreamEvent>>
//!     │              background task + mpsc channel, cancellable
//!     ▼
//! collect()        ← echoes deltas to a writer, returns the full text
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use mcq_llm::{collect, ClientOptions, CompletionRequest, MaxTokens, Provider,
//!               ProviderClient, StreamingBackend};
//! use tokio_util::sync::CancellationToken;
//!
//! let client = ProviderClient::new(ClientOptions::default())?;
//! let request = CompletionRequest {
//!     provider: Provider::Anthropic,
//!     model: "claude-sonnet-4-20250514".into(),
//!     api_key: std::env::var("ANTHROPIC_API_KEY")?,
//!     prompt: "Say hello".into(),
//!     max_tokens: MaxTokens::Fixed(4096),
//! };
//! let stream = client.stream(request, CancellationToken::new());
//! let text = collect(stream, &mut std::io::stdout()).await?;
//! ```

pub mod anthropic;
pub mod client;
pub mod error;
pub mod openai;
pub mod runner;
pub mod sse;
pub mod stream;
pub mod types;

#[cfg(test)]
mod tests;

pub use client::{ClientOptions, ProviderClient, StreamingBackend};
pub use error::{LlmError, StreamFailure, TimeoutStage};
pub use runner::collect;
pub use stream::{EventSender, EventStream};
pub use types::{
    mask_key, CompletionRequest, MaxTokens, Provider, StreamErrorInfo, StreamEvent,
};

pub use tokio_util::sync::CancellationToken;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, LlmError>;
