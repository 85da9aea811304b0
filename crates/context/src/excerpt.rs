//! Character budgets for externally supplied text
//!
//! Every place that shortens caller text before a provider call goes through
//! `excerpt`, with one named budget per use site.

use policylens_common::config::BudgetConfig;

/// Budget for the excerpt embedded as a retrieval query
pub const RETRIEVAL_EXCERPT_CHARS: usize = 2000;

/// Budget for the excerpt placed in a generation prompt
pub const GENERATION_EXCERPT_CHARS: usize = 4000;

/// Per-use-site excerpt budgets, in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExcerptBudgets {
    pub retrieval: usize,
    pub generation: usize,
}

impl Default for ExcerptBudgets {
    fn default() -> Self {
        Self {
            retrieval: RETRIEVAL_EXCERPT_CHARS,
            generation: GENERATION_EXCERPT_CHARS,
        }
    }
}

impl From<&BudgetConfig> for ExcerptBudgets {
    fn from(config: &BudgetConfig) -> Self {
        Self {
            retrieval: config.retrieval_excerpt_chars,
            generation: config.generation_excerpt_chars,
        }
    }
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
