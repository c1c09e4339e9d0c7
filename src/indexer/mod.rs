// Indexer module
// Turns the documents in the uploads directory into a persisted, searchable index


use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::RagError;
use crate::config::Config;
use crate::documents::{DocumentKind, load_document};
use crate::embeddings::{ChunkingConfig, Embedder, chunk_text};
use crate::index::{ChunkMeta, FlatIndex, IndexSnapshot, IndexStore};

/// A file the pipeline did not index, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub file_name: String,
    pub reason: String,
}

/// Summary of one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Documents that loaded successfully
    pub documents: usize,
    pub chunks: usize,
    pub skipped: Vec<SkippedFile>,
}

/// Result of [`Indexer::build_index`]
#[derive(Debug)]
pub enum IngestOutcome {
    /// Nothing to index; any previously persisted index was left untouched
    Empty(IngestReport),
    Built {
        snapshot: IndexSnapshot,
        report: IngestReport,
    },
}

impl IngestOutcome {
    #[inline]
    pub fn report(&self) -> &IngestReport {
        match self {
            Self::Empty(report) | Self::Built { report, .. } => report,
        }
    }

    #[inline]
    pub fn into_report(self) -> IngestReport {
        match self {
            Self::Empty(report) | Self::Built { report, .. } => report,
        }
    }
}

/// Chunk texts and their metadata, aligned by position
#[derive(Debug, Clone, Default)]
pub struct CollectedChunks {
    pub texts: Vec<String>,
    pub metas: Vec<ChunkMeta>,
    pub report: IngestReport,
}

/// Full-rebuild ingestion pipeline: scan, load, chunk, embed, index, persist
pub struct Indexer {
    uploads_dir: PathBuf,
    store: IndexStore,
    chunking: ChunkingConfig,
    embedder: Arc<dyn Embedder>,
}

impl Indexer {
    #[inline]
    pub fn new(config: &Config, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            uploads_dir: config.uploads_dir(),
            store: IndexStore::new(config.index_dir()),
            chunking: config.chunking,
            embedder,
        }
    }

    #[inline]
    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    #[inline]
    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Load and chunk every supported document in the uploads directory.
    ///
    /// Files are visited in file-name order; hidden files are ignored. A file that fails
    /// to load is recorded in the report and skipped; it never aborts the batch.
    #[inline]
    pub fn collect_chunks(&self) -> Result<CollectedChunks> {
        let mut collected = CollectedChunks::default();

        for path in self.list_files()? {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            let Some(kind) = DocumentKind::from_path(&path) else {
                debug!("Skipping unsupported file: {}", file_name);
                collected.report.skipped.push(SkippedFile {
                    file_name,
                    reason: "unsupported file type".to_string(),
                });
                continue;
            };

            let text = match load_document(&path, kind) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Skipping {}: {:#}", file_name, e);
                    collected.report.skipped.push(SkippedFile {
                        file_name,
                        reason: format!("{:#}", e),
                    });
                    continue;
                }
            };

            let chunks = chunk_text(&text, &self.chunking)
                .with_context(|| format!("Failed to chunk {}", file_name))?;

            let count = chunks.len();
            if count == 0 {
                warn!("No text extracted from {}", file_name);
            } else {
                debug!("{}: {} chunks", file_name, count);
            }

            for (chunk_id, chunk) in chunks.enumerate() {
                collected.texts.push(chunk.to_string());
                collected.metas.push(ChunkMeta {
                    source: file_name.clone(),
                    chunk_id,
                });
            }

            collected.report.documents += 1;
            collected.report.chunks += count;
        }

        Ok(collected)
    }

    fn list_files(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.uploads_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(
                    "Uploads directory {} does not exist yet, nothing to index",
                    self.uploads_dir.display()
                );
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "Failed to read uploads directory: {}",
                        self.uploads_dir.display()
                    )
                });
            }
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .with_context(|| {
                    format!(
                        "Failed to read uploads directory: {}",
                        self.uploads_dir.display()
                    )
                })?
                .path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        Ok(files)
    }

    /// Rebuild the whole index from the uploads directory and persist it.
    ///
    /// When no chunks are produced the persisted index is left as it was.
    #[inline]
    pub fn build_index(&self) -> Result<IngestOutcome> {
        let CollectedChunks {
            texts,
            metas,
            report,
        } = self.collect_chunks()?;

        if texts.is_empty() {
            info!(
                "No chunks produced from {} ({} files skipped); index not rebuilt",
                self.uploads_dir.display(),
                report.skipped.len()
            );
            return Ok(IngestOutcome::Empty(report));
        }

        info!(
            "Embedding {} chunks from {} documents with {}",
            texts.len(),
            report.documents,
            self.embedder.model()
        );

        let vectors = self
            .embedder
            .embed(&texts)
            .context("Failed to embed chunks")?;
        if vectors.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                texts.len()
            ))
            .into());
        }

        let index = FlatIndex::build(vectors).context("Failed to build index")?;
        let snapshot = IndexSnapshot::new(index, texts, metas, self.embedder.model())?;

        let manifest = self
            .store
            .save(&snapshot)
            .context("Failed to persist index")?;

        info!(
            "Index build {} complete: {} documents, {} chunks",
            manifest.build_id, report.documents, report.chunks
        );

        Ok(IngestOutcome::Built { snapshot, report })
    }
}
