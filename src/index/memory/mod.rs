
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{IndexEntry, RetrievalResult, ScoredChunk, VectorIndex};
use crate::{RagError, Result};

const FORMAT_VERSION: u32 = 1;

/// Scoring function of the in-memory index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Similarity {
    #[default]
    Cosine,
    Dot,
}

impl Similarity {
    #[inline]
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        match self {
            Self::Dot => dot,
            Self::Cosine => {
                let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    0.0
                } else {
                    dot / (norm_a * norm_b)
                }
            }
        }
    }
}

/// Brute-force index held entirely in memory, persisted as a JSON file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryIndex {
    version: u32,
    similarity: Similarity,
    dimension: Option<usize>,
    entries: Vec<IndexEntry>,
}

impl MemoryIndex {
    #[inline]
    pub fn new(similarity: Similarity) -> Self {
        Self {
            version: FORMAT_VERSION,
            similarity,
            dimension: None,
            entries: Vec::new(),
        }
    }

    /// Read an index previously written with [`VectorIndex::persist`]
    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            RagError::Index(format!("Failed to read index {}: {}", path.display(), e))
        })?;
        let index: Self = serde_json::from_str(&content).map_err(|e| {
            RagError::Index(format!("Failed to parse index {}: {}", path.display(), e))
        })?;

        if index.version != FORMAT_VERSION {
            return Err(RagError::Index(format!(
                "Unsupported index format version {} in {}",
                index.version,
                path.display()
            )));
        }
        if let Some(dimension) = index.dimension {
            if index.entries.iter().any(|e| e.embedding.len() != dimension) {
                return Err(RagError::Index(format!(
                    "Index {} mixes embedding dimensions",
                    path.display()
                )));
            }
        }

        info!(
            "Loaded index with {} entries from {}",
            index.entries.len(),
            path.display()
        );
        Ok(index)
    }

    #[inline]
    pub fn similarity(&self) -> Similarity {
        self.similarity
    }

    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    #[inline]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    fn check_dimension(&self, expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(RagError::Index(format!(
                "Embedding dimension mismatch: index holds {}-dimensional vectors, got {}",
                expected, actual
            )))
        }
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn add(&mut self, entries: Vec<IndexEntry>) -> Result<()> {
        let Some(first) = entries.first() else {
            return Ok(());
        };

        let dimension = self.dimension.unwrap_or(first.embedding.len());
        if dimension == 0 {
            return Err(RagError::Index("Embeddings must not be empty".to_string()));
        }
        for entry in &entries {
            self.check_dimension(dimension, entry.embedding.len())?;
        }

        debug!("Adding {} entries to in-memory index", entries.len());
        self.dimension = Some(dimension);
        self.entries.extend(entries);
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<RetrievalResult> {
        let Some(dimension) = self.dimension else {
            return Ok(RetrievalResult::default());
        };
        self.check_dimension(dimension, vector.len())?;

        let hits = self
            .entries
            .iter()
            .enumerate()
            .map(|(ordinal, entry)| ScoredChunk {
                chunk: entry.chunk.clone(),
                score: self.similarity.score(&entry.embedding, vector),
                ordinal,
            })
            .collect();

        Ok(RetrievalResult::ranked(hits, k))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.len())
    }

    async fn persist(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        // The temporary file is deleted on drop, so every early return cleans up
        let mut file = NamedTempFile::new_in(parent)?;
        serde_json::to_writer(&mut file, self)
            .map_err(|e| RagError::Index(format!("Failed to serialize index: {}", e)))?;
        file.flush()?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| {
            RagError::Index(format!(
                "Failed to move index into place at {}: {}",
                path.display(),
                e.error
            ))
        })?;

        info!(
            "Persisted index with {} entries to {}",
            self.entries.len(),
            path.display()
        );
        Ok(())
    }
}
