use std::io::Write;

use futures::StreamExt;

use crate::stream::EventStream;
use crate::types::StreamEvent;
use crate::{LlmError, StreamFailure};

// ─── Public API ───────────────────────────────────────────────────────────

/// Consume an [`EventStream`], echoing every delta to `sink` as it arrives
/// and returning the concatenation.
///
/// The stream ends at the first `Done`, or when the channel closes. Errors
/// and in-stream provider failures come back as a [`StreamFailure`] that
/// keeps whatever text had already arrived. A response with no visible text
/// is an [`LlmError::EmptyResponse`].
///
/// ```rust,ignore
/// let stream = client.stream(request, CancellationToken::new());
/// let text = mcq_llm::collect(stream, &mut std::io::stdout()).await?;
/// ```
pub async fn collect<W>(stream: EventStream, sink: &mut W) -> Result<String, StreamFailure>
where
    W: Write + ?Sized,
{
    let mut stream = stream;
    let mut text = String::new();

    while let Some(event) = stream.next().await {
        match event {
            Ok(StreamEvent::Delta(delta)) => {
                if let Err(e) = sink.write_all(delta.as_bytes()).and_then(|_| sink.flush()) {
                    return Err(StreamFailure::new(LlmError::Io(e), text));
                }
                text.push_str(&delta);
            }
            Ok(StreamEvent::Done) => break,
            Ok(StreamEvent::Error(info)) => {
                let error = LlmError::Provider {
                    kind: info.kind,
                    message: info.message,
                };
                return Err(StreamFailure::new(error, text));
            }
            Err(error) => return Err(StreamFailure::new(error, text)),
        }
    }

    if text.trim().is_empty() {
        return Err(StreamFailure::new(LlmError::EmptyResponse, text));
    }
    Ok(text)
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StreamErrorInfo;

    #[tokio::test]
    async fn accumulates_deltas_in_order_and_echoes_them() {
        let stream = EventStream::from_events(vec![
            Ok(StreamEvent::Delta("As a user, ".into())),
            Ok(StreamEvent::Delta("I want dark mode so that my eyes hurt less.".into())),
            Ok(StreamEvent::Done),
        ]);
        let mut sink = Vec::new();
        let text = collect(stream, &mut sink).await.unwrap();
        assert_eq!(text, "As a user, I want dark mode so that my eyes hurt less.");
        assert_eq!(String::from_utf8(sink).unwrap(), text);
    }

    #[tokio::test]
    async fn stops_reading_at_done() {
        let stream = EventStream::from_events(vec![
            Ok(StreamEvent::Delta("kept".into())),
            Ok(StreamEvent::Done),
            Ok(StreamEvent::Delta("ignored".into())),
        ]);
        let text = collect(stream, &mut Vec::new()).await.unwrap();
        assert_eq!(text, "kept");
    }

    #[tokio::test]
    async fn no_deltas_is_empty_response() {
        let stream = EventStream::from_events(vec![Ok(StreamEvent::Done)]);
        let failure = collect(stream, &mut Vec::new()).await.unwrap_err();
        assert!(matches!(failure.error, LlmError::EmptyResponse));
        assert!(!failure.has_partial());
    }

    #[tokio::test]
    async fn whitespace_only_is_empty_response() {
        let stream = EventStream::from_events(vec![Ok(StreamEvent::Delta("  \n".into()))]);
        let failure = collect(stream, &mut Vec::new()).await.unwrap_err();
        assert!(matches!(failure.error, LlmError::EmptyResponse));
    }

    #[tokio::test]
    async fn provider_error_keeps_partial_text() {
        let stream = EventStream::from_events(vec![
            Ok(StreamEvent::Delta("partial ".into())),
            Ok(StreamEvent::Error(StreamErrorInfo {
                kind: Some("overloaded_error".into()),
                message: "Overloaded".into(),
            })),
        ]);
        let failure = collect(stream, &mut Vec::new()).await.unwrap_err();
        assert_eq!(failure.partial, "partial ");
        assert_eq!(failure.error.provider_message(), Some("Overloaded"));
    }

    #[tokio::test]
    async fn transport_error_keeps_partial_text() {
        let stream = EventStream::from_events(vec![
            Ok(StreamEvent::Delta("abc".into())),
            Err(LlmError::Network("connection reset".into())),
        ]);
        let failure = collect(stream, &mut Vec::new()).await.unwrap_err();
        assert_eq!(failure.partial, "abc");
        assert!(matches!(failure.error, LlmError::Network(_)));
    }
}
