//! Top-K retrieval over the semantic index
//!
//! The query is embedded with the same provider that built the index and
//! scored against every stored vector. Results are ordered by descending
//! similarity; equal scores keep corpus insertion order.

use crate::corpus::CorpusEntry;
use crate::index::IndexState;
use policylens_common::errors::{AppError, Result};
use policylens_common::{metrics, Embedder};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Retrieved entry with its similarity score
#[derive(Debug, Clone)]
pub struct RetrievedEntry {
    pub entry: Arc<CorpusEntry>,
    pub score: f32,
}

/// Ordered retrieval hits, best first
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    hits: Vec<RetrievedEntry>,
}

impl RetrievalResult {
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn hits(&self) -> &[RetrievedEntry] {
        &self.hits
    }

    /// Identifiers in result order
    pub fn ids(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.entry.id.as_str()).collect()
    }
}

impl FromIterator<RetrievedEntry> for RetrievalResult {
    fn from_iter<I: IntoIterator<Item = RetrievedEntry>>(iter: I) -> Self {
        Self {
            hits: iter.into_iter().collect(),
        }
    }
}

/// Embeds queries and ranks index entries
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Return up to `k` entries most similar to `query`.
    ///
    /// An empty index yields an empty result, not an error.
    pub async fn retrieve(&self, state: &IndexState, query: &str, k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(AppError::input_rejected("k", "retrieval depth must be greater than zero"));
        }
        if query.trim().is_empty() {
            return Err(AppError::input_rejected("query", "query must not be empty"));
        }

        let index = match state {
            IndexState::Built(index) => index,
            IndexState::Empty => {
                debug!("Retrieval against empty index");
                return Ok(RetrievalResult::default());
            }
        };

        if self.embedder.model_name() != index.model() {
            return Err(AppError::ModelMismatch {
                index_model: index.model().to_string(),
                query_model: self.embedder.model_name().to_string(),
            });
        }

        let started = Instant::now();
        let query_vector = self.embedder.embed(query).await?;
        if query_vector.len() != index.dimension() {
            return Err(AppError::DimensionMismatch {
                expected: index.dimension(),
                actual: query_vector.len(),
            });
        }

        let mut scored = index.score_all(&query_vector);
        for (_, score) in &mut scored {
            if score.is_nan() {
                *score = f32::NEG_INFINITY;
            }
        }
        // sort_by is stable: ties keep insertion order. -0.0 and 0.0 tie.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        let result: RetrievalResult = scored
            .into_iter()
            .map(|(entry, score)| RetrievedEntry { entry, score })
            .collect();

        metrics::record_retrieval(started.elapsed().as_secs_f64(), k, result.len());
        debug!(
            k,
            returned = result.len(),
            top_score = result.hits().first().map(|h| h.score),
            "Retrieval complete"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{normalize_corpus, PolicyTag, RawPolicyRecord};
    use crate::index::{IndexOptions, SemanticIndex};
    use crate::test_support::{entry, FailingEmbedder, FixedEmbedder, KeywordEmbedder};
    use policylens_common::SimilarityMetric;
    use policylens_common::embeddings::HashingEmbedder;

    const VOCAB: &[&str] = &["solar", "carbon", "tax", "renewable", "incentives", "wind", "energy"];

    async fn build(embedder: &KeywordEmbedder, entries: Vec<CorpusEntry>) -> IndexState {
        SemanticIndex::build(entries, embedder, &IndexOptions::default())
            .await
            .unwrap()
    }

    fn policy(id: &str, title: &str, tag: PolicyTag) -> RawPolicyRecord {
        RawPolicyRecord {
            id: Some(id.to_string()),
            title: Some(title.to_string()),
            country: Some("Denmark".to_string()),
            year: Some("2020".to_string()),
            category: Some("Climate".to_string()),
            policy_type: Some("Law".to_string()),
            summary: Some("National measure.".to_string()),
            effectiveness: Some("70".to_string()),
            ..RawPolicyRecord::default()
        }
        .with_tag(tag)
    }

    #[tokio::test]
    async fn test_renewable_query_finds_solar_subsidy() {
        let corpus = normalize_corpus(vec![
            policy("1", "Solar Subsidy", PolicyTag::RenewableEnergy),
            policy("2", "Carbon Tax", PolicyTag::CarbonPricing),
        ]);
        let embedder = Arc::new(KeywordEmbedder::new(VOCAB));
        let state = build(&embedder, corpus.entries).await;
        let retriever = Retriever::new(embedder);

        let result = retriever.retrieve(&state, "renewable incentives", 1).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.ids(), vec!["1"]);
    }

    #[tokio::test]
    async fn test_empty_index_returns_empty_result() {
        let embedder = Arc::new(KeywordEmbedder::new(VOCAB));
        let retriever = Retriever::new(embedder.clone());

        let result = retriever.retrieve(&IndexState::Empty, "anything", 5).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(embedder.query_calls(), 0);
    }

    #[tokio::test]
    async fn test_length_bounded_by_k_and_index_size() {
        let embedder = Arc::new(KeywordEmbedder::new(VOCAB));
        let state = build(
            &embedder,
            vec![entry("a", "solar"), entry("b", "wind"), entry("c", "carbon tax")],
        )
        .await;
        let retriever = Retriever::new(embedder);

        assert_eq!(retriever.retrieve(&state, "solar", 2).await.unwrap().len(), 2);
        assert_eq!(retriever.retrieve(&state, "solar", 15).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_scores_non_increasing() {
        let embedder = Arc::new(KeywordEmbedder::new(VOCAB));
        let state = build(
            &embedder,
            vec![
                entry("a", "wind"),
                entry("b", "solar energy"),
                entry("c", "solar solar energy incentives"),
                entry("d", "carbon"),
            ],
        )
        .await;
        let retriever = Retriever::new(embedder);

        let result = retriever.retrieve(&state, "solar energy incentives", 4).await.unwrap();
        for pair in result.hits().windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(result.ids()[0], "c");
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let embedder = Arc::new(KeywordEmbedder::new(VOCAB));
        let state = build(
            &embedder,
            vec![entry("x", "wind"), entry("y", "wind"), entry("z", "wind")],
        )
        .await;
        let retriever = Retriever::new(embedder);

        let result = retriever.retrieve(&state, "wind", 3).await.unwrap();
        assert_eq!(result.ids(), vec!["x", "y", "z"]);
    }

    #[tokio::test]
    async fn test_rejects_bad_input_before_embedding() {
        let embedder = Arc::new(KeywordEmbedder::new(VOCAB));
        let state = build(&embedder, vec![entry("a", "solar")]).await;
        let retriever = Retriever::new(embedder.clone());

        let err = retriever.retrieve(&state, "solar", 0).await.unwrap_err();
        assert!(matches!(err, AppError::InputRejected { .. }));

        let err = retriever.retrieve(&state, "   ", 3).await.unwrap_err();
        assert!(matches!(err, AppError::InputRejected { .. }));

        assert_eq!(embedder.query_calls(), 0);
    }

    #[tokio::test]
    async fn test_signed_zero_scores_tie_in_insertion_order() {
        let embedder = Arc::new(FixedEmbedder::new(&[("neg", vec![-1.0]), ("pos", vec![1.0])]));
        let options = IndexOptions {
            metric: SimilarityMetric::InnerProduct,
            ..IndexOptions::default()
        };
        let state = SemanticIndex::build(
            vec![entry("first", "neg"), entry("second", "pos")],
            embedder.as_ref(),
            &options,
        )
        .await
        .unwrap();
        let retriever = Retriever::new(embedder);

        // unknown text embeds to the zero vector
        let result = retriever.retrieve(&state, "origin", 2).await.unwrap();
        assert_eq!(result.ids(), vec!["first", "second"]);
        assert_eq!(result.hits()[0].score, result.hits()[1].score);
    }

    #[tokio::test]
    async fn test_query_embedding_failure_is_typed() {
        let embedder = Arc::new(FailingEmbedder::after_batches(1));
        let state = SemanticIndex::build(vec![entry("a", "solar")], embedder.as_ref(), &IndexOptions::default())
            .await
            .unwrap();
        let retriever = Retriever::new(embedder);

        let err = retriever.retrieve(&state, "solar", 1).await.unwrap_err();
        assert!(matches!(&err, AppError::Provider { provider, .. } if provider == "test/failing"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_rejects_mixed_providers() {
        let keyword = Arc::new(KeywordEmbedder::new(VOCAB));
        let state = build(&keyword, vec![entry("a", "solar")]).await;
        let retriever = Retriever::new(Arc::new(HashingEmbedder::new(VOCAB.len())));

        let err = retriever.retrieve(&state, "solar", 1).await.unwrap_err();
        assert!(matches!(err, AppError::ModelMismatch { .. }));
    }
}
