//! PolicyLens Search
//!
//! Retrieval half of the grounded-generation engine:
//! - Corpus normalization (raw policy records to canonical text)
//! - In-memory semantic index with staged rebuilds
//! - Top-K similarity retrieval

pub mod corpus;
pub mod index;
pub mod retrieval;

#[cfg(test)]
mod test_support;

pub use corpus::{normalize_corpus, CorpusEntry, NormalizedCorpus, PolicyRecord, PolicyTag, RawPolicyRecord};
pub use index::{IndexHandle, IndexOptions, IndexState, SemanticIndex};
pub use retrieval::{RetrievalResult, RetrievedEntry, Retriever};
