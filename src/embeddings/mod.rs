// Embeddings module
// Sentence-embedding backends and fixed-window content chunking

pub mod chunking;
pub mod ollama;

use anyhow::Result;

pub use chunking::{ChunkingConfig, ChunkingError, TextChunks, chunk_text};
pub use ollama::OllamaClient;

/// Maps text to fixed-dimension vectors.
///
/// A single instance must serve both ingestion and querying: vectors produced by
/// different models do not live in the same space.
pub trait Embedder: Send + Sync {
    /// Identifier of the model producing the vectors, recorded in the persisted index
    fn model(&self) -> &str;

    /// Embed `texts`, returning exactly one vector per input, all of the same dimension
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text
    #[inline]
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Embedder returned no vector for a single input"))
    }
}
