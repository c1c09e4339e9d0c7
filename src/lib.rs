use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Index not found at {}. Upload a document or run `tutor-rag ingest` first.", .0.display())]
    IndexNotFound(PathBuf),

    #[error("Corrupt index at {}: {message}", .path.display())]
    CorruptIndex { path: PathBuf, message: String },

    #[error("Index was built with embedding model '{built_with}' but '{configured}' is configured")]
    IndexMismatch {
        built_with: String,
        configured: String,
    },

    #[error("Invalid index data: {0}")]
    InvalidIndex(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod documents;
pub mod embeddings;
pub mod generation;
pub mod index;
pub mod indexer;
pub mod retrieval;
pub mod server;
pub mod service;

#[cfg(test)]
mod test_support;
