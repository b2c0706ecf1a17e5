/// LLM Client: the single point of entry for all Claude API calls in Artisan.
///
/// No other module may call the Anthropic API directly. Structured answers
/// (résumés, ATS audits, interview questions) go through `call_json`, short
/// plain answers through `call_text`, and cover letters are streamed through
/// `stream_text`.
use std::time::Duration;

use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls in Artisan.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("No API key configured (set ANTHROPIC_API_KEY)")]
    MissingCredential,

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

impl LlmError {
    /// True when the failure is the API key itself, not the request.
    pub fn is_credential(&self) -> bool {
        match self {
            LlmError::MissingCredential => true,
            LlmError::Api { status, .. } => matches!(status, 401 | 403),
            _ => false,
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// The single LLM client used by the generation handlers.
/// Wraps the Anthropic Messages API with retry logic, structured output and
/// streamed text.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: Option<String>,
    api_url: String,
}

impl LlmClient {
    /// A missing key is not a startup failure; calls fail with
    /// `LlmError::MissingCredential` instead.
    pub fn new(api_key: Option<String>) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(120)).build()?,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_url: ANTHROPIC_API_URL.to_string(),
        })
    }

    /// Points the client at another Messages endpoint (a gateway or proxy).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Sends the request, retrying on 429 (rate limit) and 5xx errors with
    /// exponential backoff. Returns the successful response unread.
    async fn send(&self, request_body: &AnthropicRequest<'_>) -> Result<Response, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingCredential)?;
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&self.api_url)
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            return Ok(response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }

    /// Makes a raw call to the Claude API, returning the full response object.
    pub async fn call(&self, prompt: &str, system: &str, temperature: Option<f32>) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
            stream: false,
        };

        let llm_response: LlmResponse = self.send(&request_body).await?.json().await?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        Ok(llm_response)
    }

    /// Convenience method that calls the LLM and deserializes the text response as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
        temperature: Option<f32>,
    ) -> Result<T, LlmError> {
        let response = self.call(prompt, system, temperature).await?;

        let text = response.text().ok_or(LlmError::EmptyContent)?;

        // Strip markdown code fences if the model wraps JSON in them
        let text = strip_json_fences(text);

        serde_json::from_str(text).map_err(LlmError::Parse)
    }

    /// Calls the LLM for a short plain-text answer, trimmed.
    pub async fn call_text(&self, prompt: &str, system: &str, temperature: Option<f32>) -> Result<String, LlmError> {
        let response = self.call(prompt, system, temperature).await?;
        let text = response.text().map(str::trim).unwrap_or_default();
        if text.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(text.to_string())
    }

    /// Streams a plain-text completion. `on_delta` sees every text chunk in
    /// arrival order; the concatenation is returned once the stream ends.
    pub async fn stream_text<F>(
        &self,
        prompt: &str,
        system: &str,
        temperature: f32,
        mut on_delta: F,
    ) -> Result<String, LlmError>
    where
        F: FnMut(&str) + Send,
    {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
            temperature: Some(temperature),
            stream: true,
        };

        let mut response = self.send(&request_body).await?;
        let mut decoder = SseDecoder::default();
        let mut text = String::new();
        let mut chunks = 0usize;

        'read: while let Some(bytes) = response.chunk().await? {
            for event in decoder.push(&bytes) {
                match event {
                    StreamEvent::Delta(delta) => {
                        on_delta(&delta);
                        text.push_str(&delta);
                        chunks += 1;
                    }
                    StreamEvent::Stop => break 'read,
                    StreamEvent::Error(message) => return Err(LlmError::Stream(message)),
                }
            }
        }

        debug!(chunks, chars = text.len(), "LLM stream finished");

        if text.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(text)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Server-sent events
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Delta(String),
    Stop,
    Error(String),
}

#[derive(Debug, Deserialize)]
struct StreamPayload {
    #[serde(rename = "type")]
    kind: String,
    delta: Option<StreamDelta>,
    error: Option<AnthropicErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    text: Option<String>,
}

/// Incremental SSE decoder. Network chunks may split events (and UTF-8
/// sequences) anywhere; only complete events are emitted.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let raw: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(event) = parse_event(&String::from_utf8_lossy(&raw)) {
                events.push(event);
            }
        }
        events
    }
}

fn parse_event(raw: &str) -> Option<StreamEvent> {
    let data: Vec<&str> = raw
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect();
    if data.is_empty() {
        return None;
    }

    let payload: StreamPayload = match serde_json::from_str(&data.join("\n")) {
        Ok(p) => p,
        Err(e) => {
            debug!("Skipping unparseable stream event: {e}");
            return None;
        }
    };

    match payload.kind.as_str() {
        "content_block_delta" => payload
            .delta
            .and_then(|d| d.text)
            .map(StreamEvent::Delta),
        "message_stop" => Some(StreamEvent::Stop),
        "error" => Some(StreamEvent::Error(
            payload
                .error
                .map(|e| e.message)
                .unwrap_or_else(|| "unknown stream error".to_string()),
        )),
        _ => None,
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::http::header;
    use axum::response::IntoResponse;
    use serde_json::{json, Value};

    /// Local stand-in for the Messages API. Every request body is recorded;
    /// streaming requests get `reply` as two deltas, the rest one text block.
    pub(crate) struct MockApi {
        pub url: String,
        pub requests: Arc<Mutex<Vec<Value>>>,
    }

    impl MockApi {
        pub(crate) fn client(&self) -> LlmClient {
            LlmClient::new(Some("sk-test".to_string()))
                .unwrap()
                .with_api_url(self.url.clone())
        }

        pub(crate) fn last_prompt(&self) -> String {
            let requests = self.requests.lock().unwrap();
            let last = requests.last().expect("no request recorded");
            last["messages"][0]["content"].as_str().unwrap_or_default().to_string()
        }
    }

    pub(crate) async fn mock_api(reply: &str) -> MockApi {
        let reply = reply.to_string();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let app = axum::Router::new().route(
            "/v1/messages",
            axum::routing::post(move |axum::Json(body): axum::Json<Value>| {
                let reply = reply.clone();
                let recorded = Arc::clone(&recorded);
                async move {
                    let streaming = body["stream"].as_bool().unwrap_or(false);
                    recorded.lock().unwrap().push(body);
                    if streaming {
                        let mid = reply
                            .char_indices()
                            .nth(reply.chars().count() / 2)
                            .map_or(reply.len(), |(i, _)| i);
                        let (head, tail) = reply.split_at(mid);
                        let sse = format!(
                            "{}{}event: message_stop\ndata: {{\"type\":\"message_stop\"}}\n\n",
                            delta_event(head),
                            delta_event(tail)
                        );
                        ([(header::CONTENT_TYPE, "text/event-stream")], sse).into_response()
                    } else {
                        axum::Json(json!({
                            "content": [{ "type": "text", "text": reply }],
                            "usage": { "input_tokens": 1, "output_tokens": 1 }
                        }))
                        .into_response()
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        MockApi {
            url: format!("http://{addr}/v1/messages"),
            requests,
        }
    }

    pub(crate) fn delta_event(text: &str) -> String {
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
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_credential_statuses() {
        assert!(LlmError::MissingCredential.is_credential());
        for status in [401, 403] {
            assert!(LlmError::Api {
                status,
                message: String::new()
            }
            .is_credential());
        }
        assert!(!LlmError::Api {
            status: 500,
            message: String::new()
        }
        .is_credential());
        assert!(!LlmError::EmptyContent.is_credential());
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        assert!(!LlmClient::new(Some("  ".to_string())).unwrap().has_credential());
        assert!(LlmClient::new(Some("sk-test".to_string())).unwrap().has_credential());
    }

    #[tokio::test]
    async fn test_call_text_trims_and_sends_temperature() {
        let api = mock_api("  Add a Terraform bullet.\n").await;
        let text = api.client().call_text("prompt", "system", Some(0.5)).await.unwrap();
        assert_eq!(text, "Add a Terraform bullet.");
        let requests = api.requests.lock().unwrap();
        assert_eq!(requests[0]["temperature"], 0.5);
        assert!(requests[0].get("stream").is_none());
    }

    #[tokio::test]
    async fn test_call_text_rejects_blank_answer() {
        let api = mock_api("   ").await;
        let err = api.client().call_text("prompt", "system", None).await.unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }

    #[tokio::test]
    async fn test_stream_text_reports_each_delta() {
        let api = mock_api("Dear Hiring Manager, café").await;
        let mut seen = Vec::new();
        let text = api
            .client()
            .stream_text("prompt", "system", 0.7, |delta| seen.push(delta.to_string()))
            .await
            .unwrap();
        assert_eq!(text, "Dear Hiring Manager, café");
        assert_eq!(seen.len(), 2);
        assert_eq!(seen.concat(), text);
        assert_eq!(api.requests.lock().unwrap()[0]["stream"], true);
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_any_request() {
        let client = LlmClient::new(None).unwrap();
        let err = client.call("hi", "system", None).await.unwrap_err();
        assert!(matches!(err, LlmError::MissingCredential));
    }

    #[test]
    fn test_sse_deltas_concatenate_in_order() {
        let mut decoder = SseDecoder::default();
        let stream = format!(
            "event: message_start\ndata: {{\"type\":\"message_start\"}}\n\n{}{}event: message_stop\ndata: {{\"type\":\"message_stop\"}}\n\n",
            delta_event("Dear "),
            delta_event("Hiring Manager,")
        );
        let events = decoder.push(stream.as_bytes());
        assert_eq!(
            events,
            vec![
                StreamEvent::Delta("Dear ".to_string()),
                StreamEvent::Delta("Hiring Manager,".to_string()),
                StreamEvent::Stop,
            ]
        );
    }

    #[test]
    fn test_sse_event_split_across_chunks() {
        let mut decoder = SseDecoder::default();
        let event = delta_event("café");
        let bytes = event.as_bytes();
        // Split inside the two-byte 'é'.
        let split = event.find('é').unwrap() + 1;
        assert!(decoder.push(&bytes[..split]).is_empty());
        assert_eq!(
            decoder.push(&bytes[split..]),
            vec![StreamEvent::Delta("café".to_string())]
        );
    }

    #[test]
    fn test_sse_crlf_and_error_events() {
        let mut decoder = SseDecoder::default();
        let raw = "event: error\r\ndata: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\r\n\r\n";
        assert_eq!(
            decoder.push(raw.as_bytes()),
            vec![StreamEvent::Error("Overloaded".to_string())]
        );
    }

    #[test]
    fn test_sse_ignores_pings_and_garbage() {
        let mut decoder = SseDecoder::default();
        let raw = "event: ping\ndata: {\"type\":\"ping\"}\n\ndata: not json\n\n: comment\n\n";
        assert!(decoder.push(raw.as_bytes()).is_empty());
    }
}
