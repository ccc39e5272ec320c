
pub mod ollama;

use async_trait::async_trait;

use crate::{RagError, Result};

pub use ollama::{ModelInfo, OllamaClient};

/// Turns text into fixed-dimension vectors
///
/// One call embeds a whole batch; implementations return exactly one vector per
/// input, in input order, all of the same dimension.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text, e.g. a query
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        match (vectors.pop(), vectors.is_empty()) {
            (Some(vector), true) => Ok(vector),
            (None, _) => Err(RagError::Provider(
                "embedding provider returned no vector".to_string(),
            )),
            (Some(_), false) => Err(RagError::Provider(format!(
                "embedding provider returned {} vectors for one text",
                vectors.len() + 1
            ))),
        }
    }
}
