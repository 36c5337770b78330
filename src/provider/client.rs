//! Gemini REST transport.
//!
//! One concrete implementation of [`GenerationTransport`] talking to the
//! `generativelanguage.googleapis.com` REST surface: blocking and SSE
//! streaming text generation, schema-constrained JSON generation (with
//! optional inline image), and the long-running video operation endpoints.
//! Rate-limit responses (HTTP 429 / `RESOURCE_EXHAUSTED`) map to
//! [`GenerationError::RateLimited`] so the retry layer can pick them out.

use async_trait::async_trait;
use base64::Engine;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::{GenerationError, Result};
use crate::normalize::Source;
use crate::tools::ImagePart;

/// A non-streaming grounded reply: full text plus extracted citations.
#[derive(Debug, Clone)]
pub struct GroundedReply {
    pub text: String,
    pub sources: Vec<Source>,
}

/// One unit of streamed output.
#[derive(Debug, Clone)]
pub enum StreamChunk {
    TextDelta(String),
    Done,
    Error(String),
}

/// Receiver side of an in-flight stream.
pub struct StreamHandle {
    pub rx: tokio::sync::mpsc::UnboundedReceiver<StreamChunk>,
}

/// Long-running provider operation, as returned by the video endpoints.
///
/// Created by `start_video`, refreshed by `poll_video`, terminal once
/// `done` is true.
#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<OperationError>,
    #[serde(default)]
    pub response: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub message: String,
}

impl Operation {
    /// Download URI of the finished video, if the response carries one.
    /// Both response layouts the API has shipped are checked.
    pub fn download_uri(&self) -> Option<&str> {
        let response = self.response.as_ref()?;
        for path in [
            &["generateVideoResponse", "generatedSamples"][..],
            &["generatedVideos"][..],
        ] {
            let mut node = response;
            for key in path {
                match node.get(key) {
                    Some(next) => node = next,
                    None => {
                        node = &Value::Null;
                        break;
                    }
                }
            }
            if let Some(uri) = node
                .get(0)
                .and_then(|sample| sample.get("video"))
                .and_then(|video| video.get("uri"))
                .and_then(Value::as_str)
            {
                return Some(uri);
            }
        }
        None
    }
}

/// Provider operations the orchestrator depends on.
///
/// The orchestrator only needs: a rate-limit error it can distinguish,
/// chunked text streaming, and video operations exposing `done` plus a
/// download URI. Tests substitute a scripted implementation.
#[async_trait]
pub trait GenerationTransport: Send + Sync {
    /// Single blocking call with web-search grounding.
    async fn generate_grounded(&self, prompt: &str) -> Result<GroundedReply>;

    /// Streaming call with web-search grounding. The handle yields text
    /// deltas until `Done` or `Error`.
    async fn generate_grounded_stream(&self, prompt: &str) -> Result<StreamHandle>;

    /// Schema-constrained JSON generation; returns the raw response text.
    async fn generate_structured(&self, prompt: &str, image: Option<&ImagePart>)
        -> Result<String>;

    /// Kick off asynchronous video generation.
    async fn start_video(&self, prompt: &str) -> Result<Operation>;

    /// Refresh the status of a video operation.
    async fn poll_video(&self, operation_name: &str) -> Result<Operation>;

    /// Fetch the finished video bytes through an authenticated download.
    async fn download_video(&self, uri: &str) -> Result<Vec<u8>>;
}

/// Direct Gemini REST client.
pub struct GeminiClient {
    api_key: String,
    api_base: String,
    text_model: String,
    video_model: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: &str, api_base: &str, text_model: &str, video_model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            text_model: text_model.to_string(),
            video_model: video_model.to_string(),
            client: Client::new(),
        }
    }

    fn model_url(&self, model: &str, method: &str, extra_query: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}?key={}{}",
            self.api_base, model, method, self.api_key, extra_query
        )
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Http(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::ResponseRead(e.to_string()))?;
        if !status.is_success() {
            return Err(map_error_response(status.as_u16(), &text));
        }
        serde_json::from_str(&text)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))
    }
}

/// Map a non-2xx provider response to the domain error, pulling the
/// rate-limit class out so the retry layer can match on it.
fn map_error_response(status: u16, body: &str) -> GenerationError {
    if status == 429 || body.contains("RESOURCE_EXHAUSTED") {
        return GenerationError::RateLimited {
            status,
            message: error_message(body),
        };
    }
    GenerationError::Http(format!("status {}: {}", status, error_message(body)))
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

/// First candidate's concatenated part text.
fn extract_text(response: &Value) -> Result<String> {
    let parts = response
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            GenerationError::MalformedResponse("response has no candidate parts".to_string())
        })?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        return Err(GenerationError::MalformedResponse(
            "candidate parts contain no text".to_string(),
        ));
    }
    Ok(text)
}

/// Citation sources from grounding metadata; entries missing a URI or title
/// are dropped.
fn extract_sources(response: &Value) -> Vec<Source> {
    response
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("groundingMetadata"))
        .and_then(|m| m.get("groundingChunks"))
        .and_then(Value::as_array)
        .map(|chunks| {
            chunks
                .iter()
                .filter_map(|chunk| {
                    let web = chunk.get("web")?;
                    let uri = web.get("uri").and_then(Value::as_str)?;
                    let title = web.get("title").and_then(Value::as_str)?;
                    if uri.is_empty() || title.is_empty() {
                        return None;
                    }
                    Some(Source {
                        uri: uri.to_string(),
                        title: title.to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// JSON schema the structured path constrains the model to.
fn content_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "sections": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "heading": { "type": "STRING" },
                        "content": { "type": "STRING" }
                    },
                    "required": ["heading", "content"]
                }
            }
        },
        "required": ["title", "sections"]
    })
}

fn grounded_body(prompt: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "tools": [{ "googleSearch": {} }]
    })
}

#[async_trait]
impl GenerationTransport for GeminiClient {
    async fn generate_grounded(&self, prompt: &str) -> Result<GroundedReply> {
        let url = self.model_url(&self.text_model, "generateContent", "");
        let response = self.post_json(&url, &grounded_body(prompt)).await?;
        let text = extract_text(&response)?;
        let sources = extract_sources(&response);
        debug!(sources = sources.len(), "grounded generation complete");
        Ok(GroundedReply { text, sources })
    }

    async fn generate_grounded_stream(&self, prompt: &str) -> Result<StreamHandle> {
        let url = self.model_url(&self.text_model, "streamGenerateContent", "&alt=sse");
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&grounded_body(prompt))
            .send()
            .await
            .map_err(|e| GenerationError::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(map_error_response(status.as_u16(), &text));
        }

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let byte_stream = response.bytes_stream();
        tokio::spawn(async move {
            parse_sse_stream(byte_stream, tx).await;
        });
        Ok(StreamHandle { rx })
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        image: Option<&ImagePart>,
    ) -> Result<String> {
        let mut parts = vec![json!({ "text": prompt })];
        if let Some(part) = image {
            parts.push(json!({
                "inlineData": {
                    "mimeType": part.mime_type,
                    "data": base64::engine::general_purpose::STANDARD.encode(&part.data)
                }
            }));
        }
        let body = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": content_schema()
            }
        });
        let url = self.model_url(&self.text_model, "generateContent", "");
        let response = self.post_json(&url, &body).await?;
        extract_text(&response)
    }

    async fn start_video(&self, prompt: &str) -> Result<Operation> {
        let body = json!({
            "instances": [{ "prompt": prompt }]
        });
        let url = self.model_url(&self.video_model, "predictLongRunning", "");
        let response = self.post_json(&url, &body).await?;
        serde_json::from_value(response)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))
    }

    async fn poll_video(&self, operation_name: &str) -> Result<Operation> {
        let url = format!(
            "{}/v1beta/{}?key={}",
            self.api_base,
            operation_name.trim_start_matches('/'),
            self.api_key
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GenerationError::Http(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::ResponseRead(e.to_string()))?;
        if !status.is_success() {
            return Err(map_error_response(status.as_u16(), &text));
        }
        serde_json::from_str(&text)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))
    }

    async fn download_video(&self, uri: &str) -> Result<Vec<u8>> {
        // The file endpoint authenticates via the same key query parameter.
        let separator = if uri.contains('?') { '&' } else { '?' };
        let url = format!("{}{}key={}", uri, separator, self.api_key);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GenerationError::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Download {
                status: status.as_u16(),
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| GenerationError::ResponseRead(e.to_string()))?;
        if bytes.is_empty() {
            return Err(GenerationError::Download {
                status: status.as_u16(),
            });
        }
        Ok(bytes.to_vec())
    }
}

/// Parse a Gemini SSE body into stream chunks.
///
/// Each `data: ` line carries a full JSON chunk whose candidate parts hold
/// a text delta. `Done` is sent when the body ends cleanly, `Error` when the
/// byte stream fails mid-flight.
async fn parse_sse_stream(
    byte_stream: impl futures_util::Stream<Item = std::result::Result<bytes::Bytes, reqwest::Error>>
        + Unpin,
    tx: tokio::sync::mpsc::UnboundedSender<StreamChunk>,
) {
    let mut line_buffer = String::new();
    let mut stream = Box::pin(byte_stream);

    while let Some(result) = stream.next().await {
        let bytes = match result {
            Ok(b) => b,
            Err(e) => {
                warn!("SSE stream error: {}", e);
                let _ = tx.send(StreamChunk::Error(e.to_string()));
                return;
            }
        };
        line_buffer.push_str(&String::from_utf8_lossy(&bytes));

        while let Some(newline_pos) = line_buffer.find('\n') {
            let line = line_buffer[..newline_pos]
                .trim_end_matches('\r')
                .to_string();
            line_buffer = line_buffer[newline_pos + 1..].to_string();

            let Some(data) = line.strip_prefix("data: ") else {
                continue;
            };
            match serde_json::from_str::<Value>(data) {
                Ok(chunk) => {
                    if let Ok(text) = extract_text(&chunk) {
                        let _ = tx.send(StreamChunk::TextDelta(text));
                    }
                }
                Err(e) => {
                    debug!("skipping unparseable SSE chunk: {}", e);
                }
            }
        }
    }
    let _ = tx.send(StreamChunk::Done);
}
