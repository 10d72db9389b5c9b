//! OpenAI chat completions: JSON request, chunked `data:` stream response.

use crate::client::LineOutcome;
use crate::sse::{data_payload, DONE_MARKER};
use crate::types::{CompletionRequest, OpenAiChunk, OpenAiRequest, StreamEvent, WireMessage};
use crate::{LlmError, Result};

pub const COMPLETIONS_PATH: &str = "/v1/chat/completions";

pub(crate) fn build_request(
    http: &reqwest::Client,
    base_url: &str,
    request: &CompletionRequest,
) -> reqwest::RequestBuilder {
    let body = request_body(request);
    http.post(format!(
        "{}{}",
        base_url.trim_end_matches('/'),
        COMPLETIONS_PATH
    ))
    .bearer_auth(&request.api_key)
    .json(&body)
}

pub fn request_body(request: &CompletionRequest) -> OpenAiRequest {
    OpenAiRequest {
        model: request.model.clone(),
        messages: vec![WireMessage::user(request.prompt.clone())],
        stream: true,
        max_tokens: request.max_tokens.value(),
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

    let chunk: OpenAiChunk = serde_json::from_str(payload).map_err(|source| LlmError::Parse {
        line: payload.to_owned(),
        source,
    })?;

    if let Some(error) = chunk.error {
        return Ok(LineOutcome::Event(StreamEvent::Error(error.into())));
    }
    Ok(match chunk.first_content() {
        Some(text) => LineOutcome::Event(StreamEvent::Delta(text.to_string())),
        None => LineOutcome::Skip,
    })
}
