
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{AnswerGenerator, Prompt};
use crate::config::GeneratorConfig;
use crate::embeddings::ollama::{build_agent, describe_http_error};
use crate::{RagError, Result};

/// Hosted generation through an OpenAI-compatible `/chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    base_url: Url,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl OpenAiGenerator {
    #[inline]
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.openai_url()?,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
            agent: build_agent(Duration::from_secs(config.timeout_secs)),
        })
    }

    fn request(&self, prompt: &Prompt, max_tokens: u32) -> anyhow::Result<String> {
        let url = self
            .base_url
            .join("chat/completions")
            .context("Failed to build chat completions URL")?;

        let user_message = prompt.render();
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &user_message,
                },
            ],
            max_tokens,
            temperature: self.temperature,
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize chat request")?;

        debug!("Requesting answer from {} at {}", self.model, url);

        let mut builder = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json");
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response_text = builder
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| anyhow!("Chat completion request failed: {}", describe_http_error(&e)))?;

        let response: ChatResponse =
            serde_json::from_str(&response_text).context("Failed to parse chat response")?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("Chat response contained no answer"))
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &Prompt, max_tokens: u32) -> Result<String> {
        self.request(prompt, max_tokens)
            .map_err(|e| RagError::Provider(format!("{:#}", e)))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
