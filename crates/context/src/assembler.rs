//! Context Assembler - joins retrieved entries into one context string
//!
//! Canonical texts are concatenated in retrieval order, separated by a blank
//! line. The identifier list mirrors exactly the blocks that were written.
//! No truncation happens here; budgets are the caller's concern.

use policylens_search::RetrievalResult;
use serde::Serialize;
use std::collections::HashSet;

/// Separator between canonical text blocks
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Context string plus the identifiers whose text it contains
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssembledContext {
    pub text: String,
    pub sources: Vec<String>,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Number of canonical text blocks in `text`
    pub fn block_count(&self) -> usize {
        self.sources.len()
    }
}

/// Assemble the context for one generation call.
///
/// A repeated identifier contributes neither text nor a second source entry.
pub fn assemble(result: &RetrievalResult) -> AssembledContext {
    let mut seen = HashSet::new();
    let mut blocks = Vec::with_capacity(result.len());
    let mut sources = Vec::with_capacity(result.len());

    for hit in result.hits() {
        if !seen.insert(hit.entry.id.as_str()) {
            continue;
        }
        blocks.push(hit.entry.text.as_str());
        sources.push(hit.entry.id.clone());
    }

    AssembledContext {
        text: blocks.join(BLOCK_SEPARATOR),
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use policylens_search::{CorpusEntry, RetrievedEntry};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn hit(id: &str, text: &str, score: f32) -> RetrievedEntry {
        RetrievedEntry {
            entry: Arc::new(CorpusEntry {
                id: id.to_string(),
                text: text.to_string(),
                metadata: BTreeMap::new(),
            }),
            score,
        }
    }

    #[test]
    fn test_blocks_and_sources_in_retrieval_order() {
        let result: RetrievalResult = vec![
            hit("2", "policy title: Carbon Tax", 0.9),
            hit("1", "policy title: Solar Subsidy", 0.4),
        ]
        .into_iter()
        .collect();

        let context = assemble(&result);
        assert_eq!(
            context.text,
            "policy title: Carbon Tax\n\npolicy title: Solar Subsidy"
        );
        assert_eq!(context.sources, vec!["2", "1"]);
        assert_eq!(context.block_count(), 2);
        assert_eq!(context.text.split(BLOCK_SEPARATOR).count(), 2);
    }

    #[test]
    fn test_duplicates_removed_from_text_and_sources() {
        let result: RetrievalResult = vec![
            hit("1", "alpha", 0.9),
            hit("1", "alpha", 0.9),
            hit("3", "gamma", 0.1),
        ]
        .into_iter()
        .collect();

        let context = assemble(&result);
        assert_eq!(context.text, "alpha\n\ngamma");
        assert_eq!(context.sources, vec!["1", "3"]);
    }

    #[test]
    fn test_empty_result_gives_empty_context() {
        let context = assemble(&RetrievalResult::default());
        assert!(context.is_empty());
        assert_eq!(context.text, "");
    }

    #[test]
    fn test_assemble_is_idempotent() {
        let result: RetrievalResult = vec![hit("a", "one", 0.5), hit("b", "two", 0.5)]
            .into_iter()
            .collect();
        assert_eq!(assemble(&result), assemble(&result));
    }
}
