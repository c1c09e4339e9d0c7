// Retrieval module
// Nearest-chunk lookup for a question against the current index snapshot


use anyhow::{Context, Result};
use tracing::debug;

use crate::embeddings::Embedder;
use crate::index::{ChunkMeta, IndexSnapshot};

/// A chunk selected as context for a question
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub text: String,
    pub meta: ChunkMeta,
    /// Squared L2 distance to the question embedding
    pub distance: f32,
}

impl RetrievedChunk {
    /// Source reference shown to the user, e.g. `notes.pdf#chunk3`
    #[inline]
    pub fn source_label(&self) -> String {
        format!("{}#chunk{}", self.meta.source, self.meta.chunk_id)
    }
}

/// Return up to `k` chunks nearest to `question`, nearest first.
///
/// No snapshot means nothing has been ingested yet; that yields no chunks rather than
/// an error.
#[inline]
pub fn retrieve(
    embedder: &dyn Embedder,
    snapshot: Option<&IndexSnapshot>,
    question: &str,
    k: usize,
) -> Result<Vec<RetrievedChunk>> {
    let Some(snapshot) = snapshot else {
        debug!("No index available, retrieving nothing");
        return Ok(Vec::new());
    };

    if snapshot.is_empty() || k == 0 {
        return Ok(Vec::new());
    }

    let query = embedder
        .embed_one(question)
        .context("Failed to embed question")?;

    let neighbors = snapshot
        .index()
        .search(&query, k)
        .context("Index search failed")?;

    let chunks: Vec<RetrievedChunk> = neighbors
        .into_iter()
        .filter_map(|neighbor| {
            let (text, meta) = snapshot.chunk(neighbor.position)?;
            Some(RetrievedChunk {
                text: text.to_string(),
                meta: meta.clone(),
                distance: neighbor.distance,
            })
        })
        .collect();

    debug!("Retrieved {} chunks (k = {})", chunks.len(), k);
    Ok(chunks)
}
