//! OpenAI-compatible chat-completions client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ModelConfig;
use crate::error::{Error, Result};

use super::llm::ChatModel;

/// Client for `<base_url>/chat/completions`
pub struct OpenAiCompatibleModel {
    client: Client,
    config: ModelConfig,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatibleModel {
    /// Create a client from model configuration
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatibleModel {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
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
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        tracing::debug!("Calling {} with model {}", self.endpoint(), self.config.model);

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::model(format!("Chat request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::model(format!(
                "Chat completion failed ({}): {}",
                status, body
            )));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::model(format!("Failed to parse chat response: {}", e)))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::model("No content in chat response"))
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_and_request_shape() {
        let config = ModelConfig {
            base_url: "http://localhost:8000/v1/".to_string(),
            ..ModelConfig::default()
        };
        let model = OpenAiCompatibleModel::new(&config).unwrap();
        assert_eq!(model.endpoint(), "http://localhost:8000/v1/chat/completions");
        assert_eq!(model.model(), "step-1-8k");

        let request = ChatRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            max_tokens: 10,
            temperature: 0.5,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["max_tokens"], 10);
    }

    #[test]
    fn test_reply_parsing() {
        let reply: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"答"}}]}"#,
        )
        .unwrap();
        assert_eq!(reply.choices[0].message.content.as_deref(), Some("答"));
    }
}
