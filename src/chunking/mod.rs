
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::{Document, PAGE_SEPARATOR};
use crate::{RagError, Result};

/// Break points tried in order when a window has to be cut, before falling
/// back to a hard cut at the window edge
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Configuration for document chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkingConfig {
    #[inline]
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// A bounded, contiguous piece of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_id: String,
    /// Page the chunk starts on
    pub page_number: Option<u32>,
    /// Page the chunk ends on, equal to `page_number` unless it crosses a page break
    pub last_page_number: Option<u32>,
    /// Character offset of the chunk start within the flattened document text
    pub offset: usize,
}

impl Chunk {
    #[inline]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Human readable page reference, e.g. "p. 3" or "pp. 3-4"
    #[inline]
    pub fn page_label(&self) -> Option<String> {
        match (self.page_number, self.last_page_number) {
            (Some(first), Some(last)) if last > first => Some(format!("pp. {}-{}", first, last)),
            (Some(first), _) => Some(format!("p. {}", first)),
            (None, _) => None,
        }
    }
}

/// Split a document into overlapping chunks of at most `chunk_size` characters
///
/// Fails with [`RagError::Config`] unless `0 < chunk_size` and `chunk_overlap < chunk_size`.
#[inline]
pub fn split(document: &Document, chunk_size: usize, chunk_overlap: usize) -> Result<Chunks> {
    let config = ChunkingConfig::new(chunk_size, chunk_overlap);
    split_with_config(document, &config)
}

#[inline]
pub fn split_with_config(document: &Document, config: &ChunkingConfig) -> Result<Chunks> {
    config.validate()?;
    Ok(Chunks::new(document, config))
}

/// Single-pass iterator over the chunks of one document
///
/// Each window covers `chunk_size` characters. Its end is pulled back to the last
/// separator in the window when one exists far enough from the window start, and
/// the next window starts exactly `chunk_overlap` characters before that end.
#[derive(Debug)]
pub struct Chunks {
    source_id: String,
    chars: Vec<char>,
    /// (offset of the page's first character, page number), ascending by offset
    page_starts: Vec<(usize, u32)>,
    chunk_size: usize,
    chunk_overlap: usize,
    start: usize,
    finished: bool,
    produced: usize,
}

impl Chunks {
    fn new(document: &Document, config: &ChunkingConfig) -> Self {
        let separator_len = PAGE_SEPARATOR.chars().count();
        let mut page_starts = Vec::with_capacity(document.pages.len());
        let mut offset = 0;
        for page in &document.pages {
            page_starts.push((offset, page.page_number));
            offset += page.text.chars().count() + separator_len;
        }

        let chars: Vec<char> = if document.is_blank() {
            Vec::new()
        } else {
            document.flattened_text().chars().collect()
        };

        debug!(
            "Chunking {} ({} characters, size {}, overlap {})",
            document.source_id,
            chars.len(),
            config.chunk_size,
            config.chunk_overlap
        );

        Self {
            source_id: document.source_id.clone(),
            finished: chars.is_empty(),
            chars,
            page_starts,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            start: 0,
            produced: 0,
        }
    }

    fn page_at(&self, offset: usize) -> Option<u32> {
        let idx = self
            .page_starts
            .partition_point(|&(start, _)| start <= offset);
        idx.checked_sub(1).map(|i| self.page_starts[i].1)
    }

    /// End of the chunk starting at `self.start` when the text continues past `window_end`
    fn find_break(&self, window_end: usize) -> usize {
        // A cut at or before this point would not move the next window forward
        let min_end = self.start + self.chunk_overlap + 1;

        for separator in SEPARATORS {
            let pattern: Vec<char> = separator.chars().collect();
            if let Some(end) = self.last_cut_after(&pattern, min_end, window_end) {
                return end;
            }
        }

        window_end
    }

    /// Latest position in `[min_end, window_end]` directly after an occurrence of `pattern`
    fn last_cut_after(&self, pattern: &[char], min_end: usize, window_end: usize) -> Option<usize> {
        (min_end.max(self.start + pattern.len())..=window_end)
            .rev()
            .find(|&end| self.chars[end - pattern.len()..end] == *pattern)
    }
}

impl Iterator for Chunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let len = self.chars.len();
        let window_end = (self.start + self.chunk_size).min(len);
        let end = if window_end == len {
            len
        } else {
            self.find_break(window_end)
        };

        let chunk = Chunk {
            text: self.chars[self.start..end].iter().collect(),
            source_id: self.source_id.clone(),
            page_number: self.page_at(self.start),
            last_page_number: self.page_at(end - 1),
            offset: self.start,
        };
        self.produced += 1;

        if end == len {
            self.finished = true;
            debug!("Produced {} chunks for {}", self.produced, self.source_id);
        } else {
            self.start = end - self.chunk_overlap;
        }

        Some(chunk)
    }
}

impl std::iter::FusedIterator for Chunks {}
