use crate::llm::client::{ChatMessage, ChunkStream, LlmClient};
use crate::CaiaError;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

pub struct AnthropicClient {
    api_key: String,
    model: String,
    max_tokens: u32,
    api_url: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_key: String, model: String, max_tokens: u32, api_url: String) -> Self {
        Self {
            api_key,
            model,
            max_tokens,
            api_url,
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

/// The subset of streaming events that carry text or failures
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: Delta },
    Error { error: ApiError },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

/// Reassembles server-sent-event `data:` payloads from arbitrary byte chunks.
///
/// Lines are only decoded once complete, so multi-byte characters split
/// across network reads survive.
#[derive(Default)]
struct SseBuffer {
    pending: Vec<u8>,
}

impl SseBuffer {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(newline) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\r', '\n']);
            if let Some(data) = line.strip_prefix("data:") {
                payloads.push(data.trim_start().to_string());
            }
        }
        payloads
    }
}

/// Text carried by one event payload, if any
fn parse_event(data: &str) -> Result<Option<String>, CaiaError> {
    let event: StreamEvent = match serde_json::from_str(data) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!("Ignoring unparseable stream event: {}", e);
            return Ok(None);
        }
    };

    match event {
        StreamEvent::ContentBlockDelta {
            delta: Delta::TextDelta { text },
        } => Ok(Some(text)),
        StreamEvent::Error { error } => Err(CaiaError::Llm(format!(
            "Stream error ({}): {}",
            error.kind, error.message
        ))),
        _ => Ok(None),
    }
}

#[async_trait::async_trait]
impl LlmClient for AnthropicClient {
    async fn stream_chat(
        &self,
        system: &str,
        messages: &[ChatMessage],
    ) -> Result<ChunkStream, CaiaError> {
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages,
            stream: true,
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!("Anthropic request failed with status {}", status);
            return Err(CaiaError::Llm(format!(
                "API request failed with status {}: {}",
                status, error_text
            )));
        }

        let chunks = response
            .bytes_stream()
            .scan(SseBuffer::default(), |buffer, item| {
                let results: Vec<Result<String, CaiaError>> = match item {
                    Ok(bytes) => buffer
                        .push(&bytes)
                        .iter()
                        .filter_map(|data| parse_event(data).transpose())
                        .collect(),
                    Err(e) => vec![Err(CaiaError::Http(e))],
                };
                futures::future::ready(Some(futures::stream::iter(results)))
            })
            .flatten()
            .boxed();

        Ok(chunks)
    }
}
