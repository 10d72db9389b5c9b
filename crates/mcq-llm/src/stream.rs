use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::types::StreamEvent;
use crate::Result;

/// Sending half handed to the task that drives a provider request.
pub type EventSender = mpsc::Sender<Result<StreamEvent>>;

const CHANNEL_CAPACITY: usize = 64;

// ─── EventStream ──────────────────────────────────────────────────────────

/// An async stream of [`StreamEvent`]s from one provider response.
///
/// Backed by a Tokio mpsc channel. A background task owns the HTTP response
/// and forwards normalized events in arrival order until the provider
/// finishes, fails, or the request is cancelled. Dropping `EventStream`
/// closes the receiver, which makes the background task stop at its next
/// send.
///
/// ```rust,ignore
/// use futures::StreamExt;
///
/// let mut stream = client.stream(request, CancellationToken::new());
/// while let Some(event) = stream.next().await {
///     if let Ok(StreamEvent::Delta(text)) = event {
///         print!("{text}");
///     }
/// }
/// ```
pub struct EventStream {
    rx: mpsc::Receiver<Result<StreamEvent>>,
}

impl EventStream {
    /// Run `drive` on the Tokio runtime, exposing what it sends as a stream.
    pub(crate) fn spawn<F, Fut>(drive: F) -> Self
    where
        F: FnOnce(EventSender) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        tokio::spawn(drive(tx));
        EventStream { rx }
    }

    /// Wrap a raw receiver. Lets callers plug in their own event sources,
    /// such as a scripted backend in tests.
    pub fn from_channel(rx: mpsc::Receiver<Result<StreamEvent>>) -> Self {
        Self { rx }
    }

    /// A finished stream that yields `events` in order.
    pub fn from_events(events: Vec<Result<StreamEvent>>) -> Self {
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            // Capacity covers every event, so this cannot fail.
            let _ = tx.try_send(event);
        }
        Self { rx }
    }
}

impl Stream for EventStream {
    type Item = Result<StreamEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LlmError;
    use futures::StreamExt;

    #[tokio::test]
    async fn from_events_yields_in_order_then_ends() {
        let stream = EventStream::from_events(vec![
            Ok(StreamEvent::Delta("a".into())),
            Ok(StreamEvent::Delta("b".into())),
            Ok(StreamEvent::Done),
        ]);
        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], Ok(StreamEvent::Delta(t)) if t == "a"));
        assert!(matches!(&events[1], Ok(StreamEvent::Delta(t)) if t == "b"));
        assert!(matches!(&events[2], Ok(StreamEvent::Done)));
    }

    #[tokio::test]
    async fn from_events_with_no_events_is_empty() {
        let stream = EventStream::from_events(vec![]);
        let events: Vec<_> = stream.collect().await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn spawn_forwards_task_output() {
        let stream = EventStream::spawn(|tx| async move {
            let _ = tx.send(Ok(StreamEvent::Delta("hi".into()))).await;
            let _ = tx.send(Err(LlmError::Cancelled)).await;
        });
        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], Err(LlmError::Cancelled)));
    }
}
