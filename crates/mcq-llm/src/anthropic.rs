//! Anthropic messages API: JSON request, SSE response.

use crate::client::LineOutcome;
use crate::sse::{data_payload, DONE_MARKER};
use crate::types::{
    AnthropicEvent, AnthropicRequest, CompletionRequest, StreamErrorInfo, StreamEvent, WireMessage,
};
use crate::{LlmError, Result};

pub const MESSAGES_PATH: &str = "/v1/messages";
pub const API_VERSION: &str = "2023-06-01";

/// Used when a request for this provider carries [`MaxTokens::Omit`],
/// since the messages API requires the field.
///
/// [`MaxTokens::Omit`]: crate::MaxTokens::Omit
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

pub(crate) fn build_request(
    http: &reqwest::Client,
    base_url: &str,
    request: &CompletionRequest,
) -> reqwest::RequestBuilder {
    let body = request_body(request);
    http.post(format!("{}{}", base_url.trim_end_matches('/'), MESSAGES_PATH))
        .header("x-api-key", &request.api_key)
        .header("anthropic-version", API_VERSION)
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .json(&body)
}

pub fn request_body(request: &CompletionRequest) -> AnthropicRequest {
    AnthropicRequest {
        model: request.model.clone(),
        max_tokens: request.max_tokens.value().unwrap_or(DEFAULT_MAX_TOKENS),
        stream: true,
        messages: vec![WireMessage::user(request.prompt.clone())],
    }
}

pub(crate) fn decode_line(line: &str) -> Result<LineOutcome> {
    let Some(payload) = data_payload(line) else {
        return Ok(LineOutcome::Skip);
    };
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(LineOutcome::Skip);
    }
    if payload == DONE_MARKER {
        return Ok(LineOutcome::Finished);
    }

    let event: AnthropicEvent =
        serde_json::from_str(payload).map_err(|source| LlmError::Parse {
            line: payload.to_owned(),
            source,
        })?;

    let outcome = match event.kind.as_str() {
        "content_block_delta" => text_outcome(event.delta.and_then(|d| d.text)),
        "message_stop" => LineOutcome::Finished,
        "error" => {
            let info = event.error.map(StreamErrorInfo::from).unwrap_or(StreamErrorInfo {
                kind: None,
                message: "provider reported an unspecified error".into(),
            });
            LineOutcome::Event(StreamEvent::Error(info))
        }
        _ => LineOutcome::Skip,
    };
    Ok(outcome)
}

fn text_outcome(text: Option<String>) -> LineOutcome {
    match text {
        Some(t) if !t.is_empty() => LineOutcome::Event(StreamEvent::Delta(t)),
        _ => LineOutcome::Skip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientOptions, ProviderClient, StreamingBackend};
    use crate::types::{MaxTokens, Provider};
    use futures::StreamExt;
    use tokio_util::sync::CancellationToken;

    fn request(prompt: &str) -> CompletionRequest {
        CompletionRequest {
            provider: Provider::Anthropic,
            model: "claude-sonnet-4-20250514".into(),
            api_key: "sk-ant-test-1234".into(),
            prompt: prompt.into(),
            max_tokens: MaxTokens::Fixed(4096),
        }
    }

    fn delta(text: &str) -> String {
        format!(
            "event: content_block_delta\ndata: {}\n\n",
            serde_json::json!({
                "type": "content_block_delta",
                "index": 0,
                "delta": {"type": "text_delta", "text": text}
            })
        )
    }

    #[test]
    fn decodes_text_delta() {
        let line = r#"data: {"type":"content_block_delta","delta":{"type":"text_delta","text":"Hi"}}"#;
        assert_eq!(
            decode_line(line).unwrap(),
            LineOutcome::Event(StreamEvent::Delta("Hi".into()))
        );
    }

    #[test]
    fn skips_empty_delta_and_bookkeeping_events() {
        let empty = r#"data: {"type":"content_block_delta","delta":{"text":""}}"#;
        assert_eq!(decode_line(empty).unwrap(), LineOutcome::Skip);
        let start = r#"data: {"type":"content_block_start","index":0,"content_block":{"type":"text","text":"Hi"}}"#;
        assert_eq!(decode_line(start).unwrap(), LineOutcome::Skip);
        let ping = r#"data: {"type":"ping"}"#;
        assert_eq!(decode_line(ping).unwrap(), LineOutcome::Skip);
        assert_eq!(decode_line("event: ping").unwrap(), LineOutcome::Skip);
    }

    #[test]
    fn done_marker_and_message_stop_finish() {
        assert_eq!(decode_line("data: [DONE]").unwrap(), LineOutcome::Finished);
        let stop = r#"data: {"type":"message_stop"}"#;
        assert_eq!(decode_line(stop).unwrap(), LineOutcome::Finished);
    }

    #[test]
    fn error_event_carries_provider_message() {
        let line = r#"data: {"type":"error","error":{"type":"invalid_request_error","message":"prompt exceeds maximum context"}}"#;
        let LineOutcome::Event(StreamEvent::Error(info)) = decode_line(line).unwrap() else {
            panic!("expected error event")
        };
        assert_eq!(info.kind.as_deref(), Some("invalid_request_error"));
        assert!(info.message.contains("maximum context"));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = decode_line("data: {not json").unwrap_err();
        assert!(matches!(err, LlmError::Parse { .. }));
    }

    #[test]
    fn request_body_shape() {
        let body = serde_json::to_value(request_body(&request("Add dark mode"))).unwrap();
        assert_eq!(body["model"], "claude-sonnet-4-20250514");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Add dark mode");
    }

    #[tokio::test]
    async fn streams_deltas_from_http_server() {
        let mut server = mockito::Server::new_async().await;
        let body = format!(
            "{}{}data: [DONE]\n\n",
            delta("As a user, "),
            delta("I want dark mode.")
        );
        let mock = server
            .mock("POST", MESSAGES_PATH)
            .match_header("x-api-key", "sk-ant-test-1234")
            .match_header("anthropic-version", API_VERSION)
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await;

        let client = ProviderClient::new(ClientOptions {
            anthropic_base_url: server.url(),
            ..Default::default()
        })
        .unwrap();
        let events: Vec<_> = client
            .stream(request("x"), CancellationToken::new())
            .collect()
            .await;

        mock.assert_async().await;
        let texts: Vec<String> = events
            .iter()
            .filter_map(|e| match e {
                Ok(StreamEvent::Delta(t)) => Some(t.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["As a user, ", "I want dark mode."]);
        assert!(matches!(events.last(), Some(Ok(StreamEvent::Done))));
    }

    #[tokio::test]
    async fn http_error_status_is_reported_with_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", MESSAGES_PATH)
            .with_status(401)
            .with_body(r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#)
            .create_async()
            .await;

        let client = ProviderClient::new(ClientOptions {
            anthropic_base_url: server.url(),
            ..Default::default()
        })
        .unwrap();
        let events: Vec<_> = client
            .stream(request("x"), CancellationToken::new())
            .collect()
            .await;

        assert_eq!(events.len(), 1);
        match &events[0] {
            Err(LlmError::Http { status, message }) => {
                assert_eq!(*status, 401);
                assert_eq!(message, "invalid x-api-key");
            }
            other => panic!("expected HTTP error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_token_aborts_before_request() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let client = ProviderClient::new(ClientOptions {
            anthropic_base_url: "http://127.0.0.1:9".into(),
            ..Default::default()
        })
        .unwrap();
        let events: Vec<_> = client.stream(request("x"), cancel).collect().await;
        assert!(matches!(events.as_slice(), [Err(LlmError::Cancelled)]));
    }
}
