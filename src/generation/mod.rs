#[cfg(test)]
mod tests;

pub mod ollama;
pub mod openai;

use async_trait::async_trait;

use crate::Result;
use crate::config::{Config, GeneratorBackend};

pub use ollama::OllamaGenerator;
pub use openai::OpenAiGenerator;

/// Instruction sent with every question
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant. Use the following context to answer the question. \
If you don't know the answer, say you don't know. Keep answers concise and accurate.";

/// The full input of one generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub context: String,
    pub question: String,
}

impl Prompt {
    #[inline]
    pub fn new(context: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            system: SYSTEM_INSTRUCTION.to_string(),
            context: context.into(),
            question: question.into(),
        }
    }

    /// User message carrying the retrieved context and the question
    #[inline]
    pub fn render(&self) -> String {
        format!(
            "Context from PDF:\n{}\n\nQuestion: {}\n\nAnswer briefly using only the context above:",
            self.context, self.question
        )
    }
}

/// A language model that answers a prompt
///
/// One call is one request: implementations never retry, and report timeouts,
/// HTTP failures and malformed responses as [`crate::RagError::Provider`].
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &Prompt, max_tokens: u32) -> Result<String>;

    /// Model identifier, for logs and status output
    fn model(&self) -> &str;
}

/// Build the generator selected by `[generator] backend`
#[inline]
pub fn from_config(config: &Config) -> Result<Box<dyn AnswerGenerator>> {
    let generator: Box<dyn AnswerGenerator> = match config.generator.backend {
        GeneratorBackend::Ollama => Box::new(OllamaGenerator::new(config)?),
        GeneratorBackend::OpenAi => Box::new(OpenAiGenerator::new(&config.generator)?),
    };
    Ok(generator)
}
