
use tracing::{debug, error, info, warn};

use super::{
    AnswerResult, ConversationHistory, ConversationTurn, QaConfig, QueryLog, assemble,
    context_chunks, post_process, retrieve,
};
use crate::chunking::{Chunk, ChunkingConfig, split_with_config};
use crate::document::Document;
use crate::embeddings::EmbeddingProvider;
use crate::generation::{AnswerGenerator, Prompt};
use crate::index::{IndexEntry, VectorIndex};
use crate::{RagError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No index yet
    Idle,
    Ready,
    /// A question is being answered
    Answering,
}

/// Outcome of a successful [`Session::build_index`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub source_id: String,
    pub pages: usize,
    pub chunks: usize,
}

/// One conversation about one indexed document
///
/// Methods take `&mut self`, so a session answers one question at a time.
/// Independent sessions share nothing.
pub struct Session {
    provider: Box<dyn EmbeddingProvider>,
    generator: Box<dyn AnswerGenerator>,
    index: Option<Box<dyn VectorIndex>>,
    source_id: Option<String>,
    history: ConversationHistory,
    config: QaConfig,
    max_tokens: u32,
    query_log: Option<QueryLog>,
    state: SessionState,
}

impl std::fmt::Debug for Session {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("generator", &self.generator.model())
            .field("source_id", &self.source_id)
            .field("history", &self.history.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Session {
    #[inline]
    pub fn new(
        provider: Box<dyn EmbeddingProvider>,
        generator: Box<dyn AnswerGenerator>,
        config: QaConfig,
        max_tokens: u32,
    ) -> Self {
        Self {
            provider,
            generator,
            index: None,
            source_id: None,
            history: ConversationHistory::new(),
            config,
            max_tokens,
            query_log: None,
            state: SessionState::Idle,
        }
    }

    #[inline]
    pub fn with_query_log(mut self, log: QueryLog) -> Self {
        self.query_log = Some(log);
        self
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// The turns shown to the user, per `history_display_turns`
    #[inline]
    pub fn recent_turns(&self) -> &[ConversationTurn] {
        self.history.last(self.config.history_display_turns)
    }

    #[inline]
    pub fn index(&self) -> Option<&dyn VectorIndex> {
        self.index.as_deref()
    }

    /// Take the current index out, returning the session to `Idle`
    #[inline]
    pub fn take_index(&mut self) -> Option<Box<dyn VectorIndex>> {
        self.state = SessionState::Idle;
        self.source_id = None;
        self.index.take()
    }

    #[inline]
    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    #[inline]
    pub fn config(&self) -> &QaConfig {
        &self.config
    }

    /// Chunk and embed `document` into `fresh_index`, then make it the current index
    ///
    /// On success the conversation starts over. On failure the previous index,
    /// history and state are left untouched.
    #[inline]
    pub async fn build_index(
        &mut self,
        document: &Document,
        chunking: &ChunkingConfig,
        mut fresh_index: Box<dyn VectorIndex>,
    ) -> Result<BuildSummary> {
        let chunks: Vec<Chunk> = split_with_config(document, chunking)?.collect();
        info!(
            "Indexing {} ({} pages, {} chunks)",
            document.source_id,
            document.page_count(),
            chunks.len()
        );

        if chunks.is_empty() {
            warn!(
                "{} has no extractable text; questions will report an empty index",
                document.source_id
            );
        } else {
            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            let vectors = self.provider.embed(&texts).await.map_err(|e| {
                error!("Failed to embed chunks of {}: {}", document.source_id, e);
                e
            })?;
            if vectors.len() != chunks.len() {
                return Err(RagError::Provider(format!(
                    "expected {} embeddings, got {}",
                    chunks.len(),
                    vectors.len()
                )));
            }

            let entries = chunks
                .iter()
                .cloned()
                .zip(vectors)
                .map(|(chunk, vector)| IndexEntry::new(chunk, vector))
                .collect();
            fresh_index.add(entries).await?;
        }

        self.index = Some(fresh_index);
        self.source_id = Some(document.source_id.clone());
        self.history.clear();
        self.state = SessionState::Ready;

        Ok(BuildSummary {
            source_id: document.source_id.clone(),
            pages: document.page_count(),
            chunks: chunks.len(),
        })
    }

    /// Adopt an index built earlier, e.g. one loaded from disk
    #[inline]
    pub fn attach_index(&mut self, index: Box<dyn VectorIndex>, source_id: Option<String>) {
        self.index = Some(index);
        self.source_id = source_id;
        self.history.clear();
        self.state = SessionState::Ready;
    }

    /// Answer a question about the current document
    ///
    /// Every question that reaches the session is recorded as a user turn except
    /// when no document is loaded. Failures after validation are recorded as an
    /// assistant turn starting with `Error:`.
    #[inline]
    pub async fn answer(&mut self, question: &str) -> Result<AnswerResult> {
        if self.state == SessionState::Idle || self.index.is_none() {
            return Err(RagError::NotReady);
        }

        let question = question.trim();
        self.history.push_user(question);

        if question.chars().count() < self.config.min_question_chars {
            return Err(RagError::InvalidQuery(format!(
                "please ask a more specific question ({}+ characters)",
                self.config.min_question_chars
            )));
        }

        if let Some(log) = &self.query_log {
            if let Err(e) = log.record(question) {
                warn!("Failed to write query log {}: {}", log.path().display(), e);
            }
        }

        self.state = SessionState::Answering;
        let outcome = self.run_pipeline(question).await;
        self.state = SessionState::Ready;

        match outcome {
            Ok(result) => {
                self.history.push_assistant(result.answer.clone());
                Ok(result)
            }
            Err(err) => {
                let (err, message) = match err {
                    RagError::EmptyIndex => {
                        let message = RagError::EmptyIndex.to_string();
                        (RagError::EmptyIndex, message)
                    }
                    RagError::Provider(message)
                    | RagError::Index(message)
                    | RagError::Generation(message) => {
                        (RagError::Generation(message.clone()), message)
                    }
                    other => {
                        let message = other.to_string();
                        (RagError::Generation(message.clone()), message)
                    }
                };
                error!("Failed to answer question: {}", message);
                self.history.push_assistant(format!("Error: {}", message));
                Err(err)
            }
        }
    }

    async fn run_pipeline(&self, question: &str) -> Result<AnswerResult> {
        let index = self.index.as_deref().ok_or(RagError::NotReady)?;

        let results = retrieve(question, index, self.provider.as_ref(), self.config.top_k).await?;
        let used = context_chunks(&results, self.config.max_context_chunks);
        let context = assemble(
            &results,
            self.config.max_context_chunks,
            self.config.max_chars_per_chunk,
        );
        debug!(
            "Assembled {} characters of context from {} chunks",
            context.chars().count(),
            used.len()
        );

        let prompt = Prompt::new(context, question);
        let raw = self.generator.generate(&prompt, self.max_tokens).await?;

        Ok(post_process(&raw, used, &self.config))
    }
}
