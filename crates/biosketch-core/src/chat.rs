//! OpenAI-compatible chat completion client (plain and SSE streaming).
//!
//! No retry and no backoff: a failed call is returned to the caller, which substitutes
//! a canned reply. The HTTP client carries a request timeout so a stuck call cannot
//! hold the session forever.

use crate::config::StudioConfig;
use crate::error::{SketchError, SketchResult};
use crate::stream::{SseDecoder, SseEvent};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const TOKEN_CHANNEL_CAPACITY: usize = 100;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completion client bound to one model and one key.
#[derive(Debug, Clone)]
pub struct ChatClient {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> SketchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SketchError::Chat(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into().trim().to_string(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: 300,
            client,
        })
    }

    /// Build from the studio config; fails when no API key is configured.
    pub fn from_config(config: &StudioConfig) -> SketchResult<Self> {
        let key = config
            .api_key()
            .ok_or_else(|| SketchError::MissingApiKey(config.mode.as_str().to_string()))?;
        Ok(Self::new(&config.api_base, key, &config.chat_model)?
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn request<'a>(&'a self, system: &'a str, user: &'a str, stream: bool, json: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: stream.then_some(true),
            response_format: json.then_some(ResponseFormat { kind: "json_object" }),
        }
    }

    async fn send(&self, body: &ChatRequest<'_>) -> SketchResult<reqwest::Response> {
        let res = self
            .client
            .post(self.url())
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            tracing::error!(
                target: "biosketch::chat",
                status = %status,
                "chat completion rejected: {}",
                body
            );
            return Err(SketchError::ChatStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(res)
    }

    /// One-shot completion. With `json` the endpoint is asked for a JSON object reply.
    pub async fn complete(&self, system: &str, user: &str, json: bool) -> SketchResult<String> {
        tracing::info!(target: "biosketch::chat", model = %self.model, json, "chat completion request");
        let body = self.request(system, user, false, json);
        let parsed: ChatResponse = self.send(&body).await?.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| SketchError::Chat("empty completion".to_string()))
    }

    /// Streamed completion. Tokens arrive on the returned channel; it closes on `[DONE]`,
    /// on a transport error, or when the receiver is dropped.
    pub async fn stream(&self, system: &str, user: &str) -> SketchResult<mpsc::Receiver<String>> {
        tracing::info!(target: "biosketch::chat", model = %self.model, "streaming session started");
        let body = self.request(system, user, true, false);
        let response = self.send(&body).await?;

        let (tx, rx) = mpsc::channel::<String>(TOKEN_CHANNEL_CAPACITY);
        let model = self.model.clone();
        tokio::spawn(async move {
            use futures_util::StreamExt;
            let mut body = response.bytes_stream();
            let mut decoder = SseDecoder::new();
            while let Some(chunk) = body.next().await {
                let bytes = match chunk {
                    Ok(b) => b,
                    Err(e) => {
                        tracing::warn!(target: "biosketch::chat", error = %e, "stream interrupted");
                        return;
                    }
                };
                for event in decoder.feed(&bytes) {
                    match event {
                        SseEvent::Token(token) => {
                            if tx.send(token).await.is_err() {
                                return;
                            }
                        }
                        SseEvent::Done => {
                            tracing::info!(target: "biosketch::chat", model = %model, "stream completed");
                            return;
                        }
                    }
                }
            }
        });
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassifierMode;

    #[test]
    fn request_serializes_json_mode() {
        let client = ChatClient::new("https://api.example.test/v1/", "k", "gpt-3.5-turbo").unwrap();
        let body = serde_json::to_value(client.request("sys", "hola", false, true)).unwrap();
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hola");
        assert!(body.get("stream").is_none());
        assert_eq!(client.url(), "https://api.example.test/v1/chat/completions");
    }

    #[test]
    fn streaming_request_sets_flag() {
        let client = ChatClient::new("http://localhost", "k", "m").unwrap();
        let body = serde_json::to_value(client.request("s", "u", true, false)).unwrap();
        assert_eq!(body["stream"], true);
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn from_config_requires_key() {
        let config = StudioConfig {
            mode: ClassifierMode::Hosted,
            ..Default::default()
        };
        assert!(matches!(
            ChatClient::from_config(&config),
            Err(SketchError::MissingApiKey(_))
        ));
    }
}
