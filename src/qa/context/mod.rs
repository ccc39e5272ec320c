
use crate::index::{RetrievalResult, ScoredChunk};

/// Placed between chunks in the assembled context
pub const CHUNK_SEPARATOR: &str = "\n\n";

/// Join the first `max_chunks` hits, each hard-cut to `max_chars_per_chunk` characters
///
/// The output never exceeds `max_chunks * max_chars_per_chunk + (max_chunks - 1) * 2`
/// characters.
#[inline]
pub fn assemble(results: &RetrievalResult, max_chunks: usize, max_chars_per_chunk: usize) -> String {
    context_chunks(results, max_chunks)
        .iter()
        .map(|hit| hit.chunk.text.chars().take(max_chars_per_chunk).collect::<String>())
        .collect::<Vec<_>>()
        .join(CHUNK_SEPARATOR)
}

/// The hits [`assemble`] uses, in result order
#[inline]
pub fn context_chunks(results: &RetrievalResult, max_chunks: usize) -> &[ScoredChunk] {
    let hits = results.hits();
    &hits[..hits.len().min(max_chunks)]
}
