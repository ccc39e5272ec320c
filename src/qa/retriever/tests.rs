use super::*;
use crate::chunking::Chunk;
use crate::index::{IndexEntry, MemoryIndex, Similarity};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Maps text to a vector by counting a few marker words
struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                ["rust", "python", "fourier"]
                    .iter()
                    .map(|word| t.to_lowercase().matches(word).count() as f32)
                    .collect()
            })
            .collect())
    }
}

fn chunk(text: &str) -> Chunk {
    Chunk {
        text: text.to_string(),
        source_id: "doc.pdf".to_string(),
        page_number: Some(1),
        last_page_number: Some(1),
        offset: 0,
    }
}

async fn index_of(texts: &[&str], provider: &KeywordEmbedder) -> MemoryIndex {
    let owned: Vec<String> = texts.iter().map(|t| (*t).to_string()).collect();
    let vectors = provider.embed(&owned).await.expect("embed");
    let mut index = MemoryIndex::new(Similarity::Cosine);
    index
        .add(
            texts
                .iter()
                .zip(vectors)
                .map(|(text, v)| IndexEntry::new(chunk(text), v))
                .collect(),
        )
        .await
        .expect("add");
    index
}

#[tokio::test]
async fn empty_index_fails_without_embedding() {
    let provider = KeywordEmbedder::new();
    let index = MemoryIndex::new(Similarity::Cosine);

    let err = retrieve("What is this about?", &index, &provider, 3)
        .await
        .expect_err("empty index");

    assert!(matches!(err, RagError::EmptyIndex));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn returns_most_relevant_chunks_first() {
    let provider = KeywordEmbedder::new();
    let index = index_of(
        &[
            "Python scripting basics",
            "Rust ownership and borrowing in Rust",
            "Fourier transform applications",
        ],
        &provider,
    )
    .await;
    let before = provider.calls.load(Ordering::SeqCst);

    let result = retrieve("Tell me about Rust", &index, &provider, 2)
        .await
        .expect("retrieve");

    assert_eq!(provider.calls.load(Ordering::SeqCst), before + 1, "one embed call");
    assert_eq!(result.len(), 2);
    assert_eq!(result.hits()[0].chunk.text, "Rust ownership and borrowing in Rust");
    assert!(result.hits().windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn zero_k_is_rejected() {
    let provider = KeywordEmbedder::new();
    let index = index_of(&["rust"], &provider).await;

    let err = retrieve("rust?", &index, &provider, 0).await.expect_err("k = 0");

    assert!(matches!(err, RagError::InvalidQuery(_)));
}
