//! Streaming chat client for a local Ollama server.

use futures::future;
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;

use docqa_core::config::LlmSettings;
use docqa_core::error::{Error, Result};
use docqa_core::prompt::Prompt;
use docqa_core::traits::{Generator, TokenStream};

pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    name: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChatChunkMessage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChatChunkMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}

impl OllamaGenerator {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::ModelLoad(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            name: format!("ollama:{}", settings.model),
        })
    }

    /// Create a client and make sure the server answers and has the model.
    pub async fn connect(settings: &LlmSettings) -> Result<Self> {
        let generator = Self::new(settings)?;
        generator.ensure_model().await?;
        tracing::info!(model = %generator.model, url = %generator.base_url, "connected to Ollama");
        Ok(generator)
    }

    async fn ensure_model(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::ModelLoad(format!("Ollama unreachable at {}: {}", self.base_url, e)))?;
        if !response.status().is_success() {
            return Err(Error::ModelLoad(format!("Ollama health check failed: HTTP {}", response.status())));
        }
        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| Error::ModelLoad(format!("unexpected /api/tags response: {}", e)))?;
        let prefix = format!("{}:", self.model);
        if tags.models.iter().any(|m| m.name == self.model || m.name.starts_with(&prefix)) {
            Ok(())
        } else {
            Err(Error::ModelLoad(format!("model '{}' is not available on the Ollama server", self.model)))
        }
    }
}

impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, prompt: &Prompt) -> TokenStream {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage { role: "system", content: prompt.system.clone() },
                ChatMessage { role: "user", content: prompt.user_message() },
            ],
            stream: true,
            options: ChatOptions { temperature: self.temperature },
        };
        let client = self.client.clone();
        let url = format!("{}/api/chat", self.base_url);

        let response = async move {
            let response = client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::Generation(format!("chat request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Generation(format!("chat failed: HTTP {} - {}", status, body)));
            }

            Ok::<_, Error>(decode_chat_stream(response.bytes_stream()))
        };

        stream::once(response).try_flatten().boxed()
    }
}

/// Decode one NDJSON line of a chat stream. Lines without content (the final
/// `done` line, blank keep-alives) decode to `None`.
pub fn decode_chat_line(line: &str) -> Result<Option<String>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let chunk: ChatChunk = serde_json::from_str(line)
        .map_err(|e| Error::Generation(format!("malformed stream line: {}", e)))?;
    if let Some(error) = chunk.error {
        return Err(Error::Generation(error));
    }
    Ok(chunk.message.map(|m| m.content).filter(|c| !c.is_empty()))
}

/// Turn raw response bytes into content tokens. Network chunks may split a
/// line anywhere, including inside a UTF-8 sequence; bytes are buffered until
/// the line's newline arrives. A last line without a newline is decoded when
/// the byte stream ends.
pub fn decode_chat_stream<S, B, E>(bytes: S) -> impl Stream<Item = Result<String>>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    bytes
        .map(Some)
        .chain(stream::once(future::ready(None)))
        .scan(Vec::new(), |pending: &mut Vec<u8>, chunk| {
            let items = match chunk {
                Some(Ok(bytes)) => {
                    pending.extend_from_slice(bytes.as_ref());
                    drain_lines(pending)
                }
                Some(Err(e)) => vec![Err(Error::Generation(format!("stream interrupted: {}", e)))],
                None => decode_bytes(&std::mem::take(pending)).into_iter().collect(),
            };
            future::ready(Some(stream::iter(items)))
        })
        .flatten()
}

fn drain_lines(pending: &mut Vec<u8>) -> Vec<Result<String>> {
    let mut tokens = Vec::new();
    while let Some(end) = pending.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = pending.drain(..=end).collect();
        tokens.extend(decode_bytes(&line));
    }
    tokens
}

fn decode_bytes(line: &[u8]) -> Option<Result<String>> {
    decode_chat_line(&String::from_utf8_lossy(line)).transpose()
}
