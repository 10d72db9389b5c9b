/// Deserialization tests for provider payloads captured from real streams,
/// plus deadline behaviour against servers that stall.
#[cfg(test)]
mod unit {
    use crate::types::{AnthropicEvent, ErrorEnvelope, OpenAiChunk};

    #[test]
    fn parse_anthropic_message_start() {
        let json = r#"{
            "type": "message_start",
            "message": {
                "id": "msg_01",
                "type": "message",
                "role": "assistant",
                "content": [],
                "model": "claude-sonnet-4-20250514",
                "usage": {"input_tokens": 25, "output_tokens": 1}
            }
        }"#;
        let event: AnthropicEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind, "message_start");
        assert!(event.delta.is_none());
    }

    #[test]
    fn parse_anthropic_content_block_start() {
        let json = r#"{"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}"#;
        let event: AnthropicEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.content_block.unwrap().text.as_deref(), Some(""));
    }

    #[test]
    fn parse_anthropic_message_delta_without_text() {
        let json = r#"{"type":"message_delta","delta":{"stop_reason":"end_turn","stop_sequence":null},"usage":{"output_tokens":15}}"#;
        let event: AnthropicEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind, "message_delta");
        assert!(event.delta.unwrap().text.is_none());
    }

    #[test]
    fn parse_openai_chunk_with_usage_and_no_choices() {
        let json = r#"{"id":"c1","object":"chat.completion.chunk","choices":[],"usage":{"prompt_tokens":9,"completion_tokens":12}}"#;
        let chunk: OpenAiChunk = serde_json::from_str(json).unwrap();
        assert!(chunk.first_content().is_none());
    }

    #[test]
    fn parse_error_envelope_with_code() {
        let json = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error","param":null,"code":"invalid_api_key"}}"#;
        let env: ErrorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(env.error.message, "Incorrect API key provided");
        assert_eq!(env.error.code.unwrap(), "invalid_api_key");
    }
}

#[cfg(test)]
mod deadlines {
    use std::time::Duration;

    use futures::StreamExt;
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use crate::client::{ClientOptions, ProviderClient, StreamingBackend};
    use crate::types::{CompletionRequest, MaxTokens, Provider, StreamEvent};
    use crate::{collect, LlmError, TimeoutStage};

    /// Accepts connections and never writes a byte back.
    async fn silent_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{addr}")
    }

    /// Answers with headers and one text delta, then holds the body open.
    async fn stalling_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 16 * 1024];
                    let _ = socket.read(&mut buf).await;
                    let event = "event: content_block_delta\n\
                        data: {\"type\":\"content_block_delta\",\"index\":0,\
                        \"delta\":{\"type\":\"text_delta\",\"text\":\"Partial\"}}\n\n";
                    let head = "HTTP/1.1 200 OK\r\n\
                        content-type: text/event-stream\r\n\
                        transfer-encoding: chunked\r\n\r\n";
                    let chunk = format!("{head}{:x}\r\n{event}\r\n", event.len());
                    let _ = socket.write_all(chunk.as_bytes()).await;
                    let _ = socket.flush().await;
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    drop(socket);
                });
            }
        });
        format!("http://{addr}")
    }

    fn anthropic_request() -> CompletionRequest {
        CompletionRequest {
            provider: Provider::Anthropic,
            model: "claude-sonnet-4-20250514".into(),
            api_key: "k".into(),
            prompt: "p".into(),
            max_tokens: MaxTokens::Fixed(4096),
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            provider: Provider::OpenAi,
            model: "gpt-4o".into(),
            api_key: "k".into(),
            prompt: "p".into(),
            max_tokens: MaxTokens::for_openai("gpt-4o"),
        }
    }

    #[tokio::test]
    async fn unanswered_request_times_out() {
        let url = silent_server().await;
        let client = ProviderClient::new(ClientOptions {
            request_timeout: Duration::from_millis(200),
            openai_base_url: url,
            ..Default::default()
        })
        .unwrap();

        let events: Vec<_> = client
            .stream(request(), CancellationToken::new())
            .collect()
            .await;
        assert!(matches!(
            events.as_slice(),
            [Err(LlmError::Timeout {
                stage: TimeoutStage::Request
            })]
        ));
    }

    #[tokio::test]
    async fn cancelling_mid_request_aborts_promptly() {
        let url = silent_server().await;
        let client = ProviderClient::new(ClientOptions {
            openai_base_url: url,
            ..Default::default()
        })
        .unwrap();

        let cancel = CancellationToken::new();
        let stream = client.stream(request(), cancel.clone());
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });

        let events: Vec<_> = tokio::time::timeout(Duration::from_secs(5), stream.collect())
            .await
            .expect("cancellation should end the stream quickly");
        assert!(matches!(events.as_slice(), [Err(LlmError::Cancelled)]));
    }

    #[tokio::test]
    async fn stalled_body_times_out_after_partial_output() {
        let url = stalling_server().await;
        let client = ProviderClient::new(ClientOptions {
            stream_timeout: Duration::from_millis(500),
            anthropic_base_url: url,
            ..Default::default()
        })
        .unwrap();

        let events: Vec<_> = tokio::time::timeout(
            Duration::from_secs(5),
            client.stream(anthropic_request(), CancellationToken::new()).collect(),
        )
        .await
        .expect("stream deadline should end the stream");
        assert!(matches!(
            events.as_slice(),
            [
                Ok(StreamEvent::Delta(text)),
                Err(LlmError::Timeout {
                    stage: TimeoutStage::Stream
                })
            ] if text == "Partial"
        ));
    }

    #[tokio::test]
    async fn collect_keeps_partial_text_on_stream_timeout() {
        let url = stalling_server().await;
        let client = ProviderClient::new(ClientOptions {
            stream_timeout: Duration::from_millis(500),
            anthropic_base_url: url,
            ..Default::default()
        })
        .unwrap();

        let mut sink = Vec::new();
        let stream = client.stream(anthropic_request(), CancellationToken::new());
        let failure = collect(stream, &mut sink).await.unwrap_err();
        assert!(matches!(
            failure.error,
            LlmError::Timeout {
                stage: TimeoutStage::Stream
            }
        ));
        assert_eq!(failure.partial, "Partial");
        assert_eq!(sink, b"Partial");
    }

    #[tokio::test]
    async fn cancelling_mid_body_keeps_delivered_deltas() {
        let url = stalling_server().await;
        let client = ProviderClient::new(ClientOptions {
            anthropic_base_url: url,
            ..Default::default()
        })
        .unwrap();

        let cancel = CancellationToken::new();
        let mut stream = client.stream(anthropic_request(), cancel.clone());
        let first = stream.next().await;
        assert!(matches!(first, Some(Ok(StreamEvent::Delta(ref t))) if t == "Partial"));

        cancel.cancel();
        let rest: Vec<_> = tokio::time::timeout(Duration::from_secs(5), stream.collect())
            .await
            .expect("cancellation should end the stream quickly");
        assert!(matches!(rest.as_slice(), [Err(LlmError::Cancelled)]));
    }
}
