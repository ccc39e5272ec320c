use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unreadable PDF: {0}")]
    UnreadablePdf(String),

    #[error("The index contains no chunks; process a document with extractable text first")]
    EmptyIndex,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("No document has been processed yet")]
    NotReady,

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<config::ConfigError> for RagError {
    #[inline]
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub mod chunking;
pub mod commands;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod generation;
pub mod index;
pub mod qa;
