//! In-memory semantic index
//!
//! Every corpus entry is embedded once and stored next to its vector.
//! Search is exact (brute force) over the metric the index was built with.
//! A build either produces a complete index or nothing at all.

use crate::corpus::CorpusEntry;
use policylens_common::config::EmbeddingConfig;
use policylens_common::errors::{AppError, Result};
use policylens_common::{metrics, Embedder, SimilarityMetric};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Index build options
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Similarity metric, reused at query time
    pub metric: SimilarityMetric,

    /// Entries per `embed_batch` call
    pub batch_size: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            metric: SimilarityMetric::Cosine,
            batch_size: 100,
        }
    }
}

impl From<&EmbeddingConfig> for IndexOptions {
    fn from(config: &EmbeddingConfig) -> Self {
        Self {
            metric: config.metric,
            batch_size: config.batch_size,
        }
    }
}

/// A corpus entry with its embedding
#[derive(Debug)]
struct IndexedEntry {
    entry: Arc<CorpusEntry>,
    vector: Vec<f32>,
}

/// Fully built index. Never mutated after construction.
#[derive(Debug)]
pub struct SemanticIndex {
    entries: Vec<IndexedEntry>,
    model: String,
    dimension: usize,
    metric: SimilarityMetric,
}

/// Either a complete index or the explicit absence of one
#[derive(Debug, Clone)]
pub enum IndexState {
    Built(Arc<SemanticIndex>),
    Empty,
}

impl IndexState {
    /// Number of indexed entries (0 when empty)
    pub fn len(&self) -> usize {
        match self {
            IndexState::Built(index) => index.len(),
            IndexState::Empty => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, IndexState::Empty)
    }
}

impl SemanticIndex {
    /// Embed `entries` and build an index.
    ///
    /// Returns `IndexState::Empty` without touching the provider when there
    /// is nothing to index. Any provider or consistency failure discards all
    /// vectors embedded so far.
    pub async fn build(
        entries: Vec<CorpusEntry>,
        embedder: &dyn Embedder,
        options: &IndexOptions,
    ) -> Result<IndexState> {
        if entries.is_empty() {
            warn!("No corpus entries to index, semantic index is empty");
            metrics::record_index_size(0);
            return Ok(IndexState::Empty);
        }

        let started = Instant::now();
        let dimension = embedder.dimension();
        let texts: Vec<String> = entries.iter().map(|e| e.text.clone()).collect();
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());

        for batch in texts.chunks(options.batch_size.max(1)) {
            let embedded = embedder.embed_batch(batch).await?;
            if embedded.len() != batch.len() {
                return Err(AppError::provider(
                    embedder.model_name(),
                    format!("expected {} embeddings, received {}", batch.len(), embedded.len()),
                ));
            }
            if let Some(bad) = embedded.iter().find(|v| v.len() != dimension) {
                return Err(AppError::DimensionMismatch {
                    expected: dimension,
                    actual: bad.len(),
                });
            }
            vectors.extend(embedded);
        }

        let entries: Vec<IndexedEntry> = entries
            .into_iter()
            .zip(vectors)
            .map(|(entry, vector)| IndexedEntry {
                entry: Arc::new(entry),
                vector,
            })
            .collect();

        info!(
            entries = entries.len(),
            model = embedder.model_name(),
            dimension,
            metric = options.metric.as_str(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Semantic index built"
        );
        metrics::record_index_size(entries.len());

        Ok(IndexState::Built(Arc::new(SemanticIndex {
            entries,
            model: embedder.model_name().to_string(),
            dimension,
            metric: options.metric,
        })))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True only for an index built from no entries, which `build` never produces
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Embedding model the index was built with
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    /// Entries in corpus insertion order
    pub fn entries(&self) -> impl Iterator<Item = &Arc<CorpusEntry>> {
        self.entries.iter().map(|e| &e.entry)
    }

    /// Score every entry against `query`, in corpus insertion order.
    pub(crate) fn score_all(&self, query: &[f32]) -> Vec<(Arc<CorpusEntry>, f32)> {
        self.entries
            .iter()
            .map(|e| (Arc::clone(&e.entry), self.metric.score(&e.vector, query)))
            .collect()
    }
}

/// Shared, swappable reference to the active index.
///
/// Readers take a snapshot `Arc` and never observe a partially built index;
/// `rebuild` builds outside the lock and swaps only on success.
pub struct IndexHandle {
    state: RwLock<Arc<IndexState>>,
}

impl IndexHandle {
    pub fn new(state: IndexState) -> Self {
        Self {
            state: RwLock::new(Arc::new(state)),
        }
    }

    /// Current index
    pub async fn snapshot(&self) -> Arc<IndexState> {
        Arc::clone(&*self.state.read().await)
    }

    /// Build a new index from `entries` and atomically replace the current one.
    ///
    /// On failure the previous index stays active and the error is returned.
    pub async fn rebuild(
        &self,
        entries: Vec<CorpusEntry>,
        embedder: &dyn Embedder,
        options: &IndexOptions,
    ) -> Result<usize> {
        let next = match SemanticIndex::build(entries, embedder, options).await {
            Ok(next) => next,
            Err(e) => {
                warn!(error = %e, "Index rebuild failed, keeping previous index");
                return Err(e);
            }
        };

        let size = next.len();
        *self.state.write().await = Arc::new(next);
        info!(entries = size, "Semantic index swapped");
        Ok(size)
    }
}
