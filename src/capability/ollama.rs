use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail, ensure};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Embedder, LanguageModel};

#[derive(Debug, Clone)]
pub struct OllamaSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: usize,
}

#[derive(Clone)]
struct OllamaTransport {
    client: Client,
    base_url: String,
    max_retries: usize,
}

impl OllamaTransport {
    fn new(settings: &OllamaSettings) -> Result<Self> {
        ensure!(
            !settings.base_url.trim().is_empty(),
            "missing Ollama base url"
        );
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(settings.timeout)
            .default_headers(headers)
            .build()
            .context("failed to build Ollama HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim().trim_end_matches('/').to_string(),
            max_retries: settings.max_retries,
        })
    }

    fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let text = self.post(path, body)?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse response from {}{}", self.base_url, path))
    }

    fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<String> {
        let endpoint = format!("{}{}", self.base_url, path);
        let mut attempt = 0usize;
        loop {
            match self.client.post(&endpoint).json(body).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return resp
                            .text()
                            .with_context(|| format!("failed to read response from {endpoint}"));
                    }

                    let text = resp
                        .text()
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt < self.max_retries {
                        attempt += 1;
                        warn!(endpoint = %endpoint, status = %status, attempt, "retrying Ollama request");
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    bail!("Ollama request to {endpoint} failed ({status}): {text}");
                }
                Err(err) => {
                    if is_retryable_error(&err) && attempt < self.max_retries {
                        attempt += 1;
                        warn!(endpoint = %endpoint, error = %err, attempt, "retrying Ollama request");
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    return Err(err).with_context(|| format!("failed to call {endpoint}"));
                }
            }
        }
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(250 * (1 << capped))
}

pub struct OllamaEmbedder {
    transport: OllamaTransport,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(settings: &OllamaSettings, model: String) -> Result<Self> {
        ensure!(!model.trim().is_empty(), "missing Ollama embedding model name");
        Ok(Self {
            transport: OllamaTransport::new(settings)?,
            model,
        })
    }
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };
        let response: EmbeddingResponse = self.transport.post_json("/api/embeddings", &request)?;
        ensure!(
            !response.embedding.is_empty(),
            "Ollama returned an empty embedding for model {}",
            self.model
        );
        Ok(response.embedding)
    }
}

pub struct OllamaChat {
    transport: OllamaTransport,
    model: String,
    temperature: f32,
}

impl OllamaChat {
    pub fn new(settings: &OllamaSettings, model: String, temperature: f32) -> Result<Self> {
        ensure!(!model.trim().is_empty(), "missing Ollama chat model name");
        Ok(Self {
            transport: OllamaTransport::new(settings)?,
            model,
            temperature,
        })
    }
}

impl LanguageModel for OllamaChat {
    fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        let body = self.transport.post("/api/chat", &request)?;
        Ok(chat_reply_from_body(&body))
    }
}

// A body that is not a chat envelope is handed on verbatim so the analyzer can judge it.
fn chat_reply_from_body(body: &str) -> String {
    match serde_json::from_str::<ChatResponse>(body) {
        Ok(response) => response
            .message
            .map(|message| message.content)
            .unwrap_or_default(),
        Err(err) => {
            warn!(error = %err, "chat response was not a chat envelope");
            body.to_string()
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    options: ChatOptions,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<AssistantMessage>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_trims_trailing_slash_from_base_url() {
        let settings = OllamaSettings {
            base_url: " http://localhost:11434/ ".to_string(),
            timeout: Duration::from_secs(1),
            max_retries: 0,
        };
        let transport = OllamaTransport::new(&settings).expect("transport should build");
        assert_eq!(transport.base_url, "http://localhost:11434");
    }

    #[test]
    fn chat_rejects_blank_model_name() {
        let settings = OllamaSettings {
            base_url: "http://localhost:11434".to_string(),
            timeout: Duration::from_secs(1),
            max_retries: 0,
        };
        assert!(OllamaChat::new(&settings, "  ".to_string(), 0.2).is_err());
    }

    #[test]
    fn chat_reply_reads_message_content() {
        let body = r#"{
            "model": "llama2",
            "message": {"role": "assistant", "content": "{\"missingSections\":[]}"},
            "done": true
        }"#;
        assert_eq!(chat_reply_from_body(body), "{\"missingSections\":[]}");
        assert_eq!(chat_reply_from_body(r#"{"done":true}"#), "");
    }

    #[test]
    fn chat_reply_passes_through_bodies_that_are_not_chat_json() {
        assert_eq!(chat_reply_from_body("<html>gateway</html>"), "<html>gateway</html>");
        assert_eq!(chat_reply_from_body(r#"{"message": 42}"#), r#"{"message": 42}"#);
    }

    #[test]
    fn retry_policy_covers_throttling_and_server_errors_only() {
        assert!(should_retry(StatusCode::TOO_MANY_REQUESTS));
        assert!(should_retry(StatusCode::BAD_GATEWAY));
        assert!(!should_retry(StatusCode::BAD_REQUEST));
        assert!(retry_backoff(1) < retry_backoff(2));
    }
}
