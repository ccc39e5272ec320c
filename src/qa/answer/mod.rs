#[cfg(test)]
mod tests;

use crate::index::ScoredChunk;

use super::QaConfig;

/// Appended to answers cut at `max_answer_chars`
pub const TRUNCATION_MARKER: &str = "... (response truncated)";

/// Where a piece of the answer context came from
#[derive(Debug, Clone, PartialEq)]
pub struct Citation {
    pub source_id: String,
    pub page_number: Option<u32>,
    pub last_page_number: Option<u32>,
    pub score: f32,
    pub preview: String,
}

impl Citation {
    /// "manual.pdf p. 3", or just the source when the page is unknown
    #[inline]
    pub fn label(&self) -> String {
        let page = match (self.page_number, self.last_page_number) {
            (Some(first), Some(last)) if last > first => format!(" pp. {}-{}", first, last),
            (Some(first), _) => format!(" p. {}", first),
            (None, _) => String::new(),
        };
        format!("{}{}", self.source_id, page)
    }
}

/// The answer shown to the user
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerResult {
    pub answer: String,
    pub truncated: bool,
    pub citations: Vec<Citation>,
    /// Chunks that went into the prompt context
    pub chunks_used: usize,
}

/// Trim the raw answer and cut it to `max_chars` characters plus [`TRUNCATION_MARKER`]
#[inline]
pub fn truncate_answer(raw: &str, max_chars: usize) -> (String, bool) {
    let trimmed = raw.trim();
    if trimmed.chars().nth(max_chars).is_none() {
        return (trimmed.to_string(), false);
    }
    let mut answer: String = trimmed.chars().take(max_chars).collect();
    answer.push_str(TRUNCATION_MARKER);
    (answer, true)
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Build the final answer from the generator output and the chunks placed in the context
#[inline]
pub fn post_process(raw: &str, context_chunks: &[ScoredChunk], config: &QaConfig) -> AnswerResult {
    let (answer, truncated) = truncate_answer(raw, config.max_answer_chars);

    let citations = context_chunks
        .iter()
        .take(config.max_citations)
        .map(|hit| Citation {
            source_id: hit.chunk.source_id.clone(),
            page_number: hit.chunk.page_number,
            last_page_number: hit.chunk.last_page_number,
            score: hit.score,
            preview: preview(&hit.chunk.text, config.citation_preview_chars),
        })
        .collect();

    AnswerResult {
        answer,
        truncated,
        citations,
        chunks_used: context_chunks.len(),
    }
}
