use serde::{Deserialize, Serialize};

use super::{build_client, error_body, CompletionClient};
use crate::config::ModelConfig;
use crate::error::BridgeError;

const SERVICE: &str = "completion";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Deserialize, Default)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize, Default)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize, Default)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn first_content(self) -> String {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default()
    }
}

/// OpenAI-compatible `chat/completions` client (xAI by default). Each call is
/// a fresh two-message conversation: the system prompt plus the user text.
pub struct ChatCompletionClient {
    cfg: ModelConfig,
    client: reqwest::Client,
}

impl ChatCompletionClient {
    pub fn new(cfg: ModelConfig, timeout_ms: u64) -> Result<Self, BridgeError> {
        let client = build_client(timeout_ms)?;
        Ok(Self { cfg, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.cfg.api_base.trim_end_matches('/'))
    }

    fn request<'a>(&'a self, user_text: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.cfg.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &self.cfg.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_text,
                },
            ],
            temperature: self.cfg.temperature,
        }
    }
}

#[async_trait::async_trait]
impl CompletionClient for ChatCompletionClient {
    async fn complete(&self, user_text: &str) -> Result<String, BridgeError> {
        let mut rb = self.client.post(self.endpoint()).json(&self.request(user_text));
        if let Some(key) = &self.cfg.api_key {
            rb = rb.bearer_auth(key);
        }
        let resp = rb.send().await.map_err(BridgeError::transport(SERVICE))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(BridgeError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body: error_body(resp).await,
            });
        }
        let bytes = resp.bytes().await.map_err(BridgeError::transport(SERVICE))?;
        let parsed: ChatResponse = serde_json::from_slice(&bytes)
            .map_err(|source| BridgeError::Decode { service: SERVICE, source })?;
        Ok(parsed.first_content())
    }
}
