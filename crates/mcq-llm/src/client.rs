use std::time::Duration;

use futures::StreamExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::sse::LineDecoder;
use crate::stream::{EventSender, EventStream};
use crate::types::{CompletionRequest, ErrorEnvelope, Provider, StreamEvent};
use crate::{anthropic, openai, LlmError, Result, TimeoutStage};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(300);

// ─── StreamingBackend ─────────────────────────────────────────────────────

/// Anything that can turn a [`CompletionRequest`] into an [`EventStream`].
///
/// [`ProviderClient`] is the real implementation; the seam exists so the
/// generation pipeline can be driven by scripted streams.
pub trait StreamingBackend: Send + Sync {
    fn stream(&self, request: CompletionRequest, cancel: CancellationToken) -> EventStream;
}

// ─── ClientOptions ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Deadline for connecting and receiving response headers.
    pub request_timeout: Duration,
    /// Deadline for the whole streamed body, measured from the request start.
    pub stream_timeout: Duration,
    pub anthropic_base_url: String,
    pub openai_base_url: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            stream_timeout: DEFAULT_STREAM_TIMEOUT,
            anthropic_base_url: Provider::Anthropic.default_base_url().to_string(),
            openai_base_url: Provider::OpenAi.default_base_url().to_string(),
        }
    }
}

impl ClientOptions {
    pub fn base_url(&self, provider: Provider) -> &str {
        match provider {
            Provider::Anthropic => &self.anthropic_base_url,
            Provider::OpenAi => &self.openai_base_url,
        }
    }
}

// ─── ProviderClient ───────────────────────────────────────────────────────

/// HTTP client that dispatches each request to the adapter for its provider.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    options: ClientOptions,
}

impl ProviderClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(options.request_timeout)
            .user_agent(concat!("mcq/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(LlmError::Client)?;
        Ok(Self { http, options })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }
}

impl StreamingBackend for ProviderClient {
    fn stream(&self, request: CompletionRequest, cancel: CancellationToken) -> EventStream {
        let base_url = self.options.base_url(request.provider).to_string();
        tracing::debug!(?request, base_url = %base_url, "starting completion stream");

        let (builder, decode): (reqwest::RequestBuilder, LineDecodeFn) = match request.provider {
            Provider::Anthropic => (
                anthropic::build_request(&self.http, &base_url, &request),
                anthropic::decode_line,
            ),
            Provider::OpenAi => (
                openai::build_request(&self.http, &base_url, &request),
                openai::decode_line,
            ),
        };
        let deadlines = Deadlines {
            request: self.options.request_timeout,
            stream: self.options.stream_timeout,
        };

        EventStream::spawn(move |tx| async move {
            if let Err(e) = drive(builder, decode, deadlines, &tx, cancel).await {
                let _ = tx.send(Err(e)).await;
            }
        })
    }
}

// ─── Shared driver ────────────────────────────────────────────────────────

/// What a provider adapter made of one body line.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum LineOutcome {
    Skip,
    Event(StreamEvent),
    /// End-of-stream marker; no further lines are read.
    Finished,
}

pub(crate) type LineDecodeFn = fn(&str) -> Result<LineOutcome>;

#[derive(Debug, Clone, Copy)]
struct Deadlines {
    request: Duration,
    stream: Duration,
}

async fn drive(
    builder: reqwest::RequestBuilder,
    decode: LineDecodeFn,
    deadlines: Deadlines,
    tx: &EventSender,
    cancel: CancellationToken,
) -> Result<()> {
    let stream_deadline = Instant::now() + deadlines.stream;

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(LlmError::Cancelled),
        sent = tokio::time::timeout(deadlines.request, builder.send()) => match sent {
            Err(_) => return Err(LlmError::Timeout { stage: TimeoutStage::Request }),
            Ok(Err(e)) if e.is_timeout() => {
                return Err(LlmError::Timeout { stage: TimeoutStage::Request })
            }
            Ok(Err(e)) => return Err(LlmError::Connect(e)),
            Ok(Ok(response)) => response,
        },
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Http {
            status: status.as_u16(),
            message: error_message(&body, status.canonical_reason()),
        });
    }
    tracing::debug!(status = status.as_u16(), "stream opened");

    let mut body = response.bytes_stream();
    let mut lines = LineDecoder::new();
    let deadline = tokio::time::sleep_until(stream_deadline);
    tokio::pin!(deadline);

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LlmError::Cancelled),
            _ = &mut deadline => return Err(LlmError::Timeout { stage: TimeoutStage::Stream }),
            chunk = body.next() => chunk,
        };
        match chunk {
            None => break,
            Some(Err(e)) if e.is_timeout() => {
                return Err(LlmError::Timeout {
                    stage: TimeoutStage::Stream,
                })
            }
            Some(Err(e)) => return Err(LlmError::Network(e.to_string())),
            Some(Ok(bytes)) => {
                for line in lines.push(&bytes) {
                    if !forward(&line, decode, tx).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    if let Some(line) = lines.finish() {
        if !forward(&line, decode, tx).await? {
            return Ok(());
        }
    }

    // EOF without an explicit marker still ends the response.
    let _ = tx.send(Ok(StreamEvent::Done)).await;
    Ok(())
}

/// Decode one line and pass its event on. Returns `false` once nothing more
/// should be read: the stream finished, failed, or the receiver went away.
async fn forward(line: &str, decode: LineDecodeFn, tx: &EventSender) -> Result<bool> {
    let event = match decode(line)? {
        LineOutcome::Skip => return Ok(true),
        LineOutcome::Finished => StreamEvent::Done,
        LineOutcome::Event(event) => event,
    };
    let terminal = matches!(event, StreamEvent::Done | StreamEvent::Error(_));
    if tx.send(Ok(event)).await.is_err() {
        return Ok(false);
    }
    Ok(!terminal)
}

/// Best-effort human message from a non-2xx response body.
pub(crate) fn error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        if !envelope.error.message.is_empty() {
            return envelope.error.message;
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return reason.unwrap_or("no response body").to_string();
    }
    trimmed.chars().take(500).collect()
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_json_envelope() {
        let body = r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#;
        assert_eq!(error_message(body, Some("Unauthorized")), "invalid x-api-key");
    }

    #[test]
    fn error_message_falls_back_to_body_then_reason() {
        assert_eq!(error_message("upstream exploded", None), "upstream exploded");
        assert_eq!(error_message("  ", Some("Bad Gateway")), "Bad Gateway");
    }

    #[test]
    fn base_url_per_provider() {
        let opts = ClientOptions {
            anthropic_base_url: "http://a".into(),
            openai_base_url: "http://o".into(),
            ..Default::default()
        };
        assert_eq!(opts.base_url(Provider::Anthropic), "http://a");
        assert_eq!(opts.base_url(Provider::OpenAi), "http://o");
    }
}
