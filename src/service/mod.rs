// Service module
// Shared question-answering state: the current index snapshot and the model clients


use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task;
use tracing::{debug, error, info, warn};

use crate::RagError;
use crate::config::Config;
use crate::embeddings::Embedder;
use crate::generation::{GenerationError, Generator, build_prompt, placeholder_answer};
use crate::index::{IndexSnapshot, IndexStore};
use crate::indexer::{IngestOutcome, IngestReport, Indexer};
use crate::retrieval::{self, RetrievedChunk};

type SnapshotSlot = RwLock<Option<Arc<IndexSnapshot>>>;

/// Answer shown when the chat message is blank
pub const EMPTY_QUESTION_REPLY: &str = "Please type a question.";

/// Reply to a chat message, serialized as the `/chat` response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    pub ok: bool,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

impl ChatReply {
    #[inline]
    pub fn empty_question() -> Self {
        Self {
            ok: false,
            answer: EMPTY_QUESTION_REPLY.to_string(),
            sources: None,
        }
    }
}

/// Retrieval-augmented question answering over the uploaded documents.
///
/// Queries read the current snapshot without blocking on rebuilds. A rebuild publishes
/// its snapshot only once it is complete, so a query sees either the old index or the
/// new one.
pub struct RagService {
    config: Config,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    snapshot: Arc<SnapshotSlot>,
    rebuild_lock: Arc<Mutex<()>>,
}

impl RagService {
    #[inline]
    pub fn new(config: Config, embedder: Arc<dyn Embedder>, generator: Arc<dyn Generator>) -> Self {
        Self {
            config,
            embedder,
            generator,
            snapshot: Arc::new(RwLock::new(None)),
            rebuild_lock: Arc::new(Mutex::new(())),
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load the persisted index, if any, as the current snapshot.
    ///
    /// Returns whether an index was loaded. Missing, unreadable or incompatible indexes
    /// leave the service without one.
    #[inline]
    pub async fn open(&self) -> bool {
        let store = IndexStore::new(self.config.index_dir());
        let loaded = match task::spawn_blocking(move || store.load()).await {
            Ok(result) => result,
            Err(e) => {
                error!("Index load task failed: {}", e);
                return false;
            }
        };

        match loaded {
            Ok(snapshot) if snapshot.model() != self.embedder.model() => {
                let mismatch = RagError::IndexMismatch {
                    built_with: snapshot.model().to_string(),
                    configured: self.embedder.model().to_string(),
                };
                warn!("{}; re-ingest the uploads to use it", mismatch);
                false
            }
            Ok(snapshot) => {
                info!(
                    "Loaded index with {} chunks from {}",
                    snapshot.len(),
                    self.config.index_dir().display()
                );
                publish(&self.snapshot, Arc::new(snapshot));
                true
            }
            Err(RagError::IndexNotFound(dir)) => {
                info!("No index at {} yet", dir.display());
                false
            }
            Err(e) => {
                warn!("Ignoring persisted index: {}", e);
                false
            }
        }
    }

    /// The index queries currently run against
    #[inline]
    pub fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-ingest every upload and publish the resulting index.
    ///
    /// Rebuilds run one at a time; a caller arriving mid-rebuild waits and then runs its
    /// own, so files saved before the call are always included. Once started, a rebuild
    /// holds the lock and publishes its snapshot even if the returned future is dropped.
    #[inline]
    pub async fn rebuild(&self) -> Result<IngestReport> {
        let guard = Arc::clone(&self.rebuild_lock).lock_owned().await;
        let indexer = Indexer::new(&self.config, Arc::clone(&self.embedder));
        let slot = Arc::clone(&self.snapshot);

        task::spawn_blocking(move || -> Result<IngestReport> {
            let _guard = guard;
            let outcome = indexer
                .build_index()
                .inspect_err(|e| error!("Index rebuild failed: {:#}", e))?;

            Ok(match outcome {
                IngestOutcome::Built { snapshot, report } => {
                    publish(&slot, Arc::new(snapshot));
                    info!(
                        "Published index: {} documents, {} chunks, {} skipped",
                        report.documents,
                        report.chunks,
                        report.skipped.len()
                    );
                    report
                }
                outcome @ IngestOutcome::Empty(_) => outcome.into_report(),
            })
        })
        .await
        .context("Index rebuild task failed")?
    }

    /// Up to `k` chunks relevant to `question`. Failures yield no context.
    #[inline]
    pub async fn retrieve(&self, question: &str, k: usize) -> Vec<RetrievedChunk> {
        let snapshot = self.snapshot();
        let embedder = Arc::clone(&self.embedder);
        let question = question.to_string();

        let result = task::spawn_blocking(move || {
            retrieval::retrieve(embedder.as_ref(), snapshot.as_deref(), &question, k)
        })
        .await;

        match result {
            Ok(Ok(chunks)) => chunks,
            Ok(Err(e)) => {
                warn!("Retrieval failed, answering without context: {:#}", e);
                Vec::new()
            }
            Err(e) => {
                error!("Retrieval task failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Ask the generative model about `question`, grounded on `contexts`
    #[inline]
    pub async fn answer(
        &self,
        question: &str,
        contexts: &[String],
    ) -> Result<String, GenerationError> {
        let prompt = build_prompt(question, contexts);
        let generator = Arc::clone(&self.generator);

        task::spawn_blocking(move || generator.generate(&prompt))
            .await
            .map_err(|e| GenerationError::Transport(format!("generation task failed: {}", e)))?
    }

    /// Handle one chat message end to end. Never fails: errors become the answer text.
    #[inline]
    pub async fn chat(&self, message: &str) -> ChatReply {
        let question = message.trim();
        if question.is_empty() {
            return ChatReply::empty_question();
        }

        let chunks = self
            .retrieve(question, self.config.retrieval.top_k)
            .await;
        debug!("Answering with {} context chunks", chunks.len());

        let sources = chunks.iter().map(RetrievedChunk::source_label).collect();
        let contexts: Vec<String> = chunks.into_iter().map(|chunk| chunk.text).collect();

        let answer = match self.answer(question, &contexts).await {
            Ok(answer) => answer,
            Err(e) => {
                error!("Generation failed: {}", e);
                placeholder_answer(&e)
            }
        };

        ChatReply {
            ok: true,
            answer,
            sources: Some(sources),
        }
    }
}

fn publish(slot: &SnapshotSlot, snapshot: Arc<IndexSnapshot>) {
    *slot.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
}
