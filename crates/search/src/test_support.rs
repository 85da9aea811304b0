//! Deterministic embedding doubles shared by the unit tests

use crate::corpus::CorpusEntry;
use async_trait::async_trait;
use policylens_common::embeddings::tokenize;
use policylens_common::errors::{AppError, Result};
use policylens_common::Embedder;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn entry(id: &str, text: &str) -> CorpusEntry {
    let mut metadata = BTreeMap::new();
    metadata.insert("id".to_string(), id.to_string());
    CorpusEntry {
        id: id.to_string(),
        text: text.to_string(),
        metadata,
    }
}

/// Counts occurrences of a fixed vocabulary: relevance is monotone in keyword overlap.
pub struct KeywordEmbedder {
    vocabulary: Vec<String>,
    batch_calls: AtomicUsize,
    query_calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub const MODEL_NAME: &'static str = "test/keyword";

    pub fn new(vocabulary: &[&str]) -> Self {
        Self {
            vocabulary: vocabulary.iter().map(|w| w.to_string()).collect(),
            batch_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
        }
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let tokens: Vec<String> = tokenize(text).collect();
        self.vocabulary
            .iter()
            .map(|word| tokens.iter().filter(|t| *t == word).count() as f32)
            .collect()
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn model_name(&self) -> &str {
        Self::MODEL_NAME
    }

    fn dimension(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Succeeds for `ok_batches` batch calls, then fails every call.
pub struct FailingEmbedder {
    ok_batches: usize,
    calls: AtomicUsize,
}

impl FailingEmbedder {
    pub fn after_batches(ok_batches: usize) -> Self {
        Self {
            ok_batches,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(AppError::provider("test/failing", "connection refused"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.ok_batches {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        } else {
            Err(AppError::provider("test/failing", "connection refused"))
        }
    }

    fn model_name(&self) -> &str {
        "test/failing"
    }

    fn dimension(&self) -> usize {
        2
    }
}

/// Returns a preset vector per exact text; any other text embeds to zeros.
pub struct FixedEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    dimension: usize,
}

impl FixedEmbedder {
    pub fn new(vectors: &[(&str, Vec<f32>)]) -> Self {
        let dimension = vectors.first().map_or(1, |(_, v)| v.len());
        Self {
            vectors: vectors
                .iter()
                .map(|(text, v)| (text.to_string(), v.clone()))
                .collect(),
            dimension,
        }
    }

    fn lookup(&self, text: &str) -> Vec<f32> {
        self.vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.dimension])
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.lookup(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.lookup(t)).collect())
    }

    fn model_name(&self) -> &str {
        "test/fixed"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
