// Document loading module
// Turns PDFs, text files and web pages into page-structured documents ready for chunking


pub mod pdf;
pub mod web;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::{RagError, Result};

pub use pdf::load_pdf;
pub use web::load_url;

/// Separator placed between pages when a document is flattened for chunking
pub const PAGE_SEPARATOR: &str = "\n\n";

/// A single page of extracted text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub text: String,
    /// 1-based page number
    pub page_number: u32,
    pub source_id: String,
}

/// An ordered sequence of pages from one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub source_id: String,
    pub pages: Vec<Page>,
}

impl Document {
    /// Build a document from page texts in reading order, numbering pages from 1
    #[inline]
    pub fn from_page_texts<I, S>(source_id: &str, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pages = texts
            .into_iter()
            .zip(1..)
            .map(|(text, page_number)| Page {
                text: text.into(),
                page_number,
                source_id: source_id.to_string(),
            })
            .collect();

        Self {
            source_id: source_id.to_string(),
            pages,
        }
    }

    /// Single-page document
    #[inline]
    pub fn from_text(source_id: &str, text: impl Into<String>) -> Self {
        Self::from_page_texts(source_id, std::iter::once(text.into()))
    }

    #[inline]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// True when no page carries any non-whitespace text
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|page| page.text.trim().is_empty())
    }

    /// Page texts joined with [`PAGE_SEPARATOR`], the text the chunker walks over
    #[inline]
    pub fn flattened_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.text.as_str())
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR)
    }

    /// Character count of the flattened text the chunker sees
    #[inline]
    pub fn char_count(&self) -> usize {
        let separators = self.pages.len().saturating_sub(1) * PAGE_SEPARATOR.chars().count();
        self.pages
            .iter()
            .map(|page| page.text.chars().count())
            .sum::<usize>()
            + separators
    }
}

/// Load a document from disk, picking the loader from the file extension
#[inline]
pub fn load_path(path: &Path) -> Result<Document> {
    let source_id = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());

    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    debug!("Loading document {} (type: {:?})", path.display(), extension);

    match extension.as_str() {
        "pdf" => {
            let bytes = fs::read(path)?;
            load_pdf(&bytes, &source_id)
        }
        "txt" | "md" | "markdown" | "text" => {
            let text = fs::read_to_string(path)?;
            Ok(Document::from_text(&source_id, normalize_text(&text)))
        }
        _ => Err(RagError::Config(format!(
            "Unsupported document type for {}: expected .pdf, .txt or .md",
            path.display()
        ))),
    }
}

/// Normalize line endings and strip control characters other than newlines and tabs
pub(crate) fn normalize_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect::<String>()
        .trim()
        .to_string()
}
