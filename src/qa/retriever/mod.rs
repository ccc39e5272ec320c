#[cfg(test)]
mod tests;

use tracing::debug;

use crate::embeddings::EmbeddingProvider;
use crate::index::{RetrievalResult, VectorIndex};
use crate::{RagError, Result};

/// Embed `query` and fetch the `k` most similar chunks
///
/// An empty index fails with [`RagError::EmptyIndex`] before the provider is called.
#[inline]
pub async fn retrieve(
    query: &str,
    index: &dyn VectorIndex,
    provider: &dyn EmbeddingProvider,
    k: usize,
) -> Result<RetrievalResult> {
    if index.is_empty().await? {
        return Err(RagError::EmptyIndex);
    }
    if k == 0 {
        return Err(RagError::InvalidQuery("k must be at least 1".to_string()));
    }

    let vector = provider.embed_one(query).await?;
    let result = index.query(&vector, k).await?;

    // Backends rank already; re-ranking keeps the order guarantee independent of them
    let result = RetrievalResult::ranked(result.into_hits(), k);
    debug!(
        "Retrieved {} chunks (best score {:?})",
        result.len(),
        result.hits().first().map(|hit| hit.score)
    );
    Ok(result)
}
