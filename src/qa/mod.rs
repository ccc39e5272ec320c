//! Question answering over an indexed document
//!
//! A [`Session`] ties the pieces together: [`retrieve`] finds the chunks most
//! similar to a question, [`assemble`] turns them into a bounded context, an
//! [`AnswerGenerator`](crate::generation::AnswerGenerator) answers, and
//! [`post_process`] trims the answer and attaches citations.

pub mod answer;
pub mod context;
pub mod history;
pub mod query_log;
pub mod retriever;
pub mod session;

use serde::{Deserialize, Serialize};

pub use answer::{AnswerResult, Citation, TRUNCATION_MARKER, post_process};
pub use context::{CHUNK_SEPARATOR, assemble, context_chunks};
pub use history::{ConversationHistory, ConversationTurn, Role};
pub use query_log::QueryLog;
pub use retriever::retrieve;
pub use session::{BuildSummary, Session, SessionState};

/// Retrieval and answer limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    /// Chunks fetched from the index per question
    pub top_k: usize,
    /// Retrieved chunks placed in the prompt
    pub max_context_chunks: usize,
    /// Characters kept from each context chunk
    pub max_chars_per_chunk: usize,
    pub max_answer_chars: usize,
    pub max_citations: usize,
    pub citation_preview_chars: usize,
    /// Trimmed questions shorter than this are rejected
    pub min_question_chars: usize,
    /// Turns shown when displaying the conversation
    pub history_display_turns: usize,
}

impl Default for QaConfig {
    #[inline]
    fn default() -> Self {
        Self {
            top_k: 3,
            max_context_chunks: 3,
            max_chars_per_chunk: 300,
            max_answer_chars: 800,
            max_citations: 3,
            citation_preview_chars: 200,
            min_question_chars: 5,
            history_display_turns: 6,
        }
    }
}
