
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{AnswerGenerator, Prompt};
use crate::config::Config;
use crate::embeddings::ollama::{build_agent, describe_http_error};
use crate::{RagError, Result};

/// Local generation through Ollama's `/api/generate`
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    base_url: Url,
    model: String,
    temperature: f32,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    /// Uses the `[ollama]` server with the `[generator]` model and limits
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config.ollama_url()?;

        Ok(Self {
            base_url,
            model: config.generator.model.clone(),
            temperature: config.generator.temperature,
            agent: build_agent(Duration::from_secs(config.generator.timeout_secs)),
        })
    }

    fn request(&self, prompt: &Prompt, max_tokens: u32) -> anyhow::Result<String> {
        let url = self
            .base_url
            .join("/api/generate")
            .context("Failed to build generate URL")?;

        let request = GenerateRequest {
            model: &self.model,
            system: &prompt.system,
            prompt: prompt.render(),
            stream: false,
            options: GenerateOptions {
                num_predict: max_tokens,
                temperature: self.temperature,
            },
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize generate request")?;

        debug!("Requesting answer from {} at {}", self.model, url);

        let response_text = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| anyhow!("Generate request failed: {}", describe_http_error(&e)))?;

        let response: GenerateResponse =
            serde_json::from_str(&response_text).context("Failed to parse generate response")?;
        Ok(response.response)
    }
}

#[async_trait]
impl AnswerGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &Prompt, max_tokens: u32) -> Result<String> {
        self.request(prompt, max_tokens)
            .map_err(|e| RagError::Provider(format!("{:#}", e)))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
