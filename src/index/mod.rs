
pub mod lancedb;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;

use crate::Result;
use crate::chunking::Chunk;

pub use self::lancedb::LanceIndex;
pub use self::memory::{MemoryIndex, Similarity};

/// A chunk paired with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

impl IndexEntry {
    #[inline]
    pub fn new(chunk: Chunk, embedding: Vec<f32>) -> Self {
        Self { chunk, embedding }
    }
}

/// A chunk returned by a query; higher scores are more relevant
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
    /// Position of the entry in insertion order, used to break score ties
    pub ordinal: usize,
}

/// Query hits ordered by descending score, ties in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    hits: Vec<ScoredChunk>,
}

impl RetrievalResult {
    /// Rank hits by descending score (insertion order among equal scores) and keep the best `k`
    #[inline]
    pub fn ranked(mut hits: Vec<ScoredChunk>, k: usize) -> Self {
        hits.sort_by(|a, b| match b.score.total_cmp(&a.score) {
            Ordering::Equal => a.ordinal.cmp(&b.ordinal),
            other => other,
        });
        hits.truncate(k);
        Self { hits }
    }

    #[inline]
    pub fn hits(&self) -> &[ScoredChunk] {
        &self.hits
    }

    #[inline]
    pub fn into_hits(self) -> Vec<ScoredChunk> {
        self.hits
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, ScoredChunk> {
        self.hits.iter()
    }
}

impl<'a> IntoIterator for &'a RetrievalResult {
    type Item = &'a ScoredChunk;
    type IntoIter = std::slice::Iter<'a, ScoredChunk>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}

/// Nearest-neighbour store of embedded chunks
///
/// All embeddings in one index share a dimension; adding or querying with a
/// vector of another dimension fails with [`crate::RagError::Index`].
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Append entries; either every entry is stored or none is
    async fn add(&mut self, entries: Vec<IndexEntry>) -> Result<()>;

    /// The `k` entries most similar to `vector`
    async fn query(&self, vector: &[f32], k: usize) -> Result<RetrievalResult>;

    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Write the index durably to `path`, replacing whatever was there
    async fn persist(&self, path: &Path) -> Result<()>;
}
