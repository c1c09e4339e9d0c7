// Flat vector index module
// Exact L2 nearest-neighbour search over chunk embeddings, paired with chunk text and metadata


pub mod store;

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{RagError, Result};

pub use store::{INDEX_FILE_NAME, IndexManifest, IndexStore, METADATA_FILE_NAME};

/// Where a chunk came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMeta {
    /// File name of the source document inside the uploads directory
    pub source: String,
    /// Position of the chunk within its document, starting at 0
    pub chunk_id: usize,
}

/// A search hit: position in the index and squared L2 distance to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub position: usize,
    pub distance: f32,
}

/// Brute-force index storing vectors row-major.
///
/// Distances are squared Euclidean distances, as reported by FAISS `IndexFlatL2`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Build an index from all vectors at once. Every vector must share one non-zero dimension.
    #[inline]
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let dimension = vectors.first().map_or(0, Vec::len);
        if dimension == 0 {
            return Err(RagError::InvalidIndex(
                "cannot build an index from zero-dimensional or no vectors".to_string(),
            ));
        }

        let mut data = Vec::with_capacity(dimension * vectors.len());
        for (position, vector) in vectors.into_iter().enumerate() {
            if vector.len() != dimension {
                return Err(RagError::InvalidIndex(format!(
                    "vector {} has dimension {}, expected {}",
                    position,
                    vector.len(),
                    dimension
                )));
            }
            data.extend(vector);
        }

        Ok(Self { dimension, data })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over the stored vectors in position order
    #[inline]
    pub fn vectors(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimension)
    }

    /// Return the `k` nearest vectors to `query`, nearest first.
    ///
    /// `k` is capped at the number of stored vectors. Equal distances keep position order.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension {
            return Err(RagError::InvalidIndex(format!(
                "query has dimension {}, index has dimension {}",
                query.len(),
                self.dimension
            )));
        }

        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut neighbors: Vec<Neighbor> = self
            .vectors()
            .enumerate()
            .map(|(position, vector)| Neighbor {
                position,
                distance: squared_l2(query, vector),
            })
            .collect();

        let by_distance = |a: &Neighbor, b: &Neighbor| -> Ordering {
            a.distance
                .total_cmp(&b.distance)
                .then(a.position.cmp(&b.position))
        };

        if k < neighbors.len() {
            neighbors.select_nth_unstable_by(k - 1, by_distance);
            neighbors.truncate(k);
        }
        neighbors.sort_unstable_by(by_distance);

        Ok(neighbors)
    }
}

#[inline]
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// An immutable, fully built index together with its aligned chunk texts and metadata.
///
/// Position `i` of `texts` and `metas` describes vector `i` of `index`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSnapshot {
    index: FlatIndex,
    texts: Vec<String>,
    metas: Vec<ChunkMeta>,
    model: String,
}

impl IndexSnapshot {
    #[inline]
    pub fn new(
        index: FlatIndex,
        texts: Vec<String>,
        metas: Vec<ChunkMeta>,
        model: impl Into<String>,
    ) -> Result<Self> {
        if texts.len() != metas.len() || texts.len() != index.len() {
            return Err(RagError::InvalidIndex(format!(
                "misaligned index: {} vectors, {} texts, {} metadata entries",
                index.len(),
                texts.len(),
                metas.len()
            )));
        }

        Ok(Self {
            index,
            texts,
            metas,
            model: model.into(),
        })
    }

    #[inline]
    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    #[inline]
    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    #[inline]
    pub fn metas(&self) -> &[ChunkMeta] {
        &self.metas
    }

    /// Embedding model the vectors were produced with
    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Text and metadata stored at `position`
    #[inline]
    pub fn chunk(&self, position: usize) -> Option<(&str, &ChunkMeta)> {
        let text = self.texts.get(position)?;
        let meta = self.metas.get(position)?;
        Some((text.as_str(), meta))
    }
}
