//! OpenAI-compatible chat completion provider (`/v1/chat/completions`).
//!
//! Exposes a single `complete(&str, Option<&str>) -> LlmResponse` interface
//! matching the rest of the `LlmProvider` abstraction. All OpenAI wire types
//! are private to this module — callers never see them.
//!
//! Both response modes are supported: a single JSON body, or a Server-Sent
//! Events stream whose `delta.content` / `delta.reasoning_content` fragments
//! are concatenated into the final text and reasoning.

use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace, warn};

use crate::core::config::{OpenAiConfig, ThinkingBudget};
use crate::llm::{LlmResponse, LlmUsage, ProviderError};

use super::sse::{SseDecoder, SseEvent};

// ── Public provider ───────────────────────────────────────────────────────────

/// Adapter for any HTTP endpoint implementing `/v1/chat/completions`.
///
/// Covers OpenAI, NVIDIA's hosted catalogue, and OpenAI-compatible local
/// servers (Ollama, LM Studio…). Constructed once at startup, then cheaply
/// cloned because `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    stream: bool,
    thinking: Option<ThinkingBudget>,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// Build a provider from config values and an optional API key.
    ///
    /// `api_key` is `None` for keyless local models. When present it is sent
    /// as `Authorization: Bearer <key>` on every request.
    pub fn new(config: &OpenAiConfig, api_key: Option<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
            stream: config.stream,
            thinking: config.thinking,
            api_key,
        })
    }

    /// Same endpoint and sampling, different credentials.
    pub fn with_api_key(&self, api_key: String) -> Self {
        Self { api_key: Some(api_key), ..self.clone() }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `content` as the user message and optionally `system` as the system prompt.
    ///
    /// History management is the caller's responsibility — this method is one
    /// round-trip only.
    pub async fn complete(&self, content: &str, system: Option<&str>) -> Result<LlmResponse, ProviderError> {
        // Some models (gpt-5 family) do not accept a temperature parameter.
        let temperature = if self.model.starts_with("gpt-5") {
            None
        } else {
            Some(self.temperature)
        };

        let mut messages = Vec::new();
        if let Some(sys) = system {
            messages.push(Message { role: "system".to_string(), content: sys.to_string() });
        }
        messages.push(Message { role: "user".to_string(), content: content.to_string() });

        let payload = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            stream: self.stream,
            min_thinking_tokens: self.thinking.map(|t| t.min_tokens),
            max_thinking_tokens: self.thinking.map(|t| t.max_tokens),
        };

        debug!(
            model = %payload.model,
            temperature = ?payload.temperature,
            stream = payload.stream,
            content_len = content.len(),
            "sending LLM request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full LLM request payload");
        }

        let mut req = self.client.post(&self.api_base_url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(url = %self.api_base_url, error = %e, "LLM HTTP request failed (transport)");
            ProviderError::Request(e.to_string())
        })?;

        let response = check_status(response).await?;

        let (text, reasoning, usage) = if self.stream {
            read_stream(response).await?
        } else {
            read_body(response).await?
        };

        let text = text.trim().to_string();
        if text.is_empty() {
            // The reasoning budget can use up `max_tokens` before any answer.
            warn!(
                model = %self.model,
                reasoning_len = reasoning.len(),
                "LLM response has no content"
            );
        }

        debug!(
            text_len = text.len(),
            reasoning_len = reasoning.len(),
            "received LLM response"
        );

        Ok(LlmResponse { text, reasoning: reasoning.trim().to_string(), usage })
    }
}

type Completion = (String, String, Option<LlmUsage>);

/// Non-streaming mode: one JSON body.
async fn read_body(response: reqwest::Response) -> Result<Completion, ProviderError> {
    let parsed = response.json::<ChatCompletionResponse>().await.map_err(|e| {
        error!(error = %e, "failed to deserialize LLM response");
        ProviderError::Request(format!("failed to parse response body: {e}"))
    })?;

    if tracing::enabled!(tracing::Level::TRACE) {
        let json = serde_json::to_string_pretty(&parsed)
            .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
        trace!(response = %json, "full LLM response payload");
    }

    let usage = parsed.usage.map(LlmUsage::from);
    let message = parsed.choices.into_iter().next().map(|c| c.message);
    let (text, reasoning) = match message {
        Some(m) => (m.content.unwrap_or_default(), m.reasoning_content.unwrap_or_default()),
        None => (String::new(), String::new()),
    };
    Ok((text, reasoning, usage))
}

/// Streaming mode: concatenate SSE deltas until `[DONE]` or end of body.
async fn read_stream(response: reqwest::Response) -> Result<Completion, ProviderError> {
    let mut decoder = SseDecoder::new();
    let mut acc = StreamAccumulator::default();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| {
            error!(error = %e, "LLM stream interrupted");
            ProviderError::Request(format!("stream interrupted: {e}"))
        })?;
        for event in decoder.push(&chunk) {
            if acc.apply(event)? {
                return Ok(acc.finish());
            }
        }
    }
    if let Some(event) = decoder.finish() {
        acc.apply(event)?;
    }
    if !acc.done {
        warn!("LLM stream ended without [DONE]");
    }
    Ok(acc.finish())
}

/// Folds decoded stream events into the final completion.
#[derive(Debug, Default)]
struct StreamAccumulator {
    text: String,
    reasoning: String,
    usage: Option<LlmUsage>,
    done: bool,
}

impl StreamAccumulator {
    /// Apply one event; returns `true` once the terminator has been seen.
    fn apply(&mut self, event: SseEvent) -> Result<bool, ProviderError> {
        let data = match event {
            SseEvent::Done => {
                self.done = true;
                return Ok(true);
            }
            SseEvent::Data(data) => data,
        };

        if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(&data) {
            return Err(ProviderError::Request(format!("stream error: {}", env.error.message)));
        }

        let chunk: ChatCompletionChunk = serde_json::from_str(&data)
            .map_err(|e| ProviderError::Stream(format!("{e}: {data}")))?;

        for choice in chunk.choices {
            if let Some(r) = choice.delta.reasoning_content {
                self.reasoning.push_str(&r);
            }
            if let Some(c) = choice.delta.content {
                self.text.push_str(&c);
            }
        }
        if let Some(u) = chunk.usage {
            self.usage = Some(u.into());
        }
        Ok(false)
    }

    fn finish(self) -> Completion {
        (self.text, self.reasoning, self.usage)
    }
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    top_p: f32,
    max_tokens: u32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_thinking_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_thinking_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<UsageData>,
}

#[derive(Debug, Serialize, Deserialize)]
struct UsageData {
    prompt_tokens: u64,
    completion_tokens: u64,
}

impl From<UsageData> for LlmUsage {
    fn from(u: UsageData) -> Self {
        Self { input_tokens: u.prompt_tokens, output_tokens: u.completion_tokens }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<UsageData>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Consume the response and return it if successful, or a structured error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(&body) {
        let code = env.error.code.map(|v| match v {
            serde_json::Value::String(s) => format!(" [code={s}]"),
            other => format!(" [code={other}]"),
        }).unwrap_or_default();
        format!("HTTP {status}{code}: {}", env.error.message)
    } else {
        format!("HTTP {status}: {body}")
    };

    error!(%status, %message, "LLM request returned HTTP error");
    Err(ProviderError::Request(message))
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::post};
    use serde_json::{Value, json};

    use super::*;

    /// Serve `reply` for every POST and remember the last request body.
    async fn mock_endpoint(
        status: StatusCode,
        content_type: &'static str,
        reply: String,
    ) -> (String, Arc<Mutex<Option<Value>>>) {
        let seen: Arc<Mutex<Option<Value>>> = Arc::new(Mutex::new(None));
        let seen_h = seen.clone();
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |Json(body): Json<Value>| {
                let seen = seen_h.clone();
                let reply = reply.clone();
                async move {
                    *seen.lock().unwrap() = Some(body);
                    (status, [(axum::http::header::CONTENT_TYPE, content_type)], reply).into_response()
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v1/chat/completions"), seen)
    }

    fn config(url: &str, stream: bool) -> OpenAiConfig {
        OpenAiConfig {
            api_base_url: url.to_string(),
            model: "nvidia/nvidia-nemotron-nano-9b-v2".into(),
            temperature: 0.7,
            top_p: 0.95,
            max_tokens: 1024,
            timeout_seconds: 5,
            stream,
            thinking: Some(ThinkingBudget { min_tokens: 256, max_tokens: 512 }),
        }
    }

    #[tokio::test]
    async fn json_body_response() {
        let body = json!({
            "choices": [{ "message": { "content": "  Hello there  ", "reasoning_content": "hmm" } }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 3 }
        });
        let (url, seen) = mock_endpoint(StatusCode::OK, "application/json", body.to_string()).await;
        let p = OpenAiCompatibleProvider::new(&config(&url, false), Some("k".into())).unwrap();

        let resp = p.complete("hi", Some("be brief")).await.unwrap();
        assert_eq!(resp.text, "Hello there");
        assert_eq!(resp.reasoning, "hmm");
        assert_eq!(resp.usage, Some(LlmUsage { input_tokens: 12, output_tokens: 3 }));

        let sent = seen.lock().unwrap().clone().unwrap();
        assert_eq!(sent["messages"][0]["role"], "system");
        assert_eq!(sent["messages"][1]["content"], "hi");
        assert_eq!(sent["max_tokens"], 1024);
        assert_eq!(sent["stream"], false);
        assert_eq!(sent["min_thinking_tokens"], 256);
        assert_eq!(sent["max_thinking_tokens"], 512);
    }

    #[tokio::test]
    async fn streamed_response_concatenates_deltas() {
        let sse = [
            r#"data: {"choices":[{"delta":{"reasoning_content":"Think"}}]}"#,
            r#"data: {"choices":[{"delta":{"reasoning_content":"ing."}}]}"#,
            r#"data: {"choices":[{"delta":{"content":"It is "}}]}"#,
            r#"data: {"choices":[{"delta":{"content":"9 AM."}}]}"#,
            "data: [DONE]",
        ]
        .map(|l| format!("{l}\n\n"))
        .concat();
        let (url, seen) = mock_endpoint(StatusCode::OK, "text/event-stream", sse).await;
        let p = OpenAiCompatibleProvider::new(&config(&url, true), None).unwrap();

        let resp = p.complete("hi", None).await.unwrap();
        assert_eq!(resp.text, "It is 9 AM.");
        assert_eq!(resp.reasoning, "Thinking.");
        assert_eq!(seen.lock().unwrap().as_ref().unwrap()["stream"], true);
    }

    #[tokio::test]
    async fn http_error_envelope_is_readable() {
        let body = json!({ "error": { "message": "invalid api key", "code": "unauthorized" } });
        let (url, _) = mock_endpoint(StatusCode::UNAUTHORIZED, "application/json", body.to_string()).await;
        let p = OpenAiCompatibleProvider::new(&config(&url, false), Some("bad".into())).unwrap();

        let err = p.complete("hi", None).await.unwrap_err().to_string();
        assert!(err.contains("401"), "{err}");
        assert!(err.contains("invalid api key"), "{err}");
        assert!(err.contains("code=unauthorized"), "{err}");
    }

    #[tokio::test]
    async fn empty_content_is_returned_with_reasoning() {
        let body = json!({ "choices": [{ "message": { "content": "   " } }] });
        let (url, _) = mock_endpoint(StatusCode::OK, "application/json", body.to_string()).await;
        let p = OpenAiCompatibleProvider::new(&config(&url, false), None).unwrap();
        let resp = p.complete("hi", None).await.unwrap();
        assert_eq!(resp.text, "");

        let sse = [
            r#"data: {"choices":[{"delta":{"reasoning_content":"thinking until budget"}}]}"#,
            "data: [DONE]",
        ]
        .map(|l| format!("{l}\n\n"))
        .concat();
        let (url, _) = mock_endpoint(StatusCode::OK, "text/event-stream", sse).await;
        let p = OpenAiCompatibleProvider::new(&config(&url, true), None).unwrap();
        let resp = p.complete("hi", None).await.unwrap();
        assert_eq!(resp.text, "");
        assert_eq!(resp.reasoning, "thinking until budget");
    }

    #[test]
    fn accumulator_surfaces_mid_stream_error() {
        let mut acc = StreamAccumulator::default();
        let err = acc
            .apply(SseEvent::Data(r#"{"error":{"message":"overloaded"}}"#.into()))
            .unwrap_err();
        assert!(err.to_string().contains("overloaded"));
    }

    #[test]
    fn accumulator_rejects_garbage() {
        let mut acc = StreamAccumulator::default();
        assert!(matches!(
            acc.apply(SseEvent::Data("not json".into())),
            Err(ProviderError::Stream(_))
        ));
    }

    #[test]
    fn with_api_key_keeps_settings() {
        let p = OpenAiCompatibleProvider::new(&config("http://127.0.0.1:9/x", true), None).unwrap();
        let q = p.with_api_key("secret".into());
        assert_eq!(q.model(), p.model());
        assert_eq!(q.api_key.as_deref(), Some("secret"));
    }
}
