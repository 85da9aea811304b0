//! Interaction modes over the grounded-generation pipeline
//!
//! Every mode follows the same path: take an index snapshot, retrieve,
//! assemble, generate once. An empty index short-circuits to a fixed
//! per-mode reply with no sources and no provider calls.

use crate::assembler::assemble;
use crate::excerpt::{excerpt, ExcerptBudgets};
use crate::generator::GroundedGenerator;
use crate::telemetry::TelemetrySnapshot;
use policylens_common::config::RetrievalConfig;
use policylens_common::embeddings::create_embedder;
use policylens_common::errors::{AppError, Result};
use policylens_common::generation::create_generator;
use policylens_common::metrics::{self, Outcome};
use policylens_common::{AppConfig, Embedder, Generator};
use policylens_search::{
    normalize_corpus, IndexHandle, IndexOptions, IndexState, RawPolicyRecord, Retriever,
    SemanticIndex,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Reply to `ask` when no index is available
pub const NO_DATA_ANSWER: &str = "I have no data to answer that.";

/// Reply to `analyze` when no index is available
pub const OFFLINE_ANALYSIS: &str = "System offline.";

/// Reply to `brief` when no index is available
pub const OFFLINE_REPORT: &str = "# Error\nThe AI engine is offline. Cannot generate report.";

/// Prepended to the document excerpt used as the analysis retrieval query
pub const SIMILARITY_QUERY_PREFIX: &str = "find environmental policies similar to these mechanisms: ";

/// Generated text plus the identifiers of every policy in its context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundedAnswer {
    pub answer: String,
    pub sources: Vec<String>,
}

impl GroundedAnswer {
    fn unavailable(reply: &str) -> Self {
        Self {
            answer: reply.to_string(),
            sources: Vec::new(),
        }
    }
}

/// Retrieval depths and excerpt budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub ask_k: usize,
    pub analyze_k: usize,
    pub budgets: ExcerptBudgets,
}

impl Default for EngineSettings {
    fn default() -> Self {
        let retrieval = RetrievalConfig::default();
        Self {
            ask_k: retrieval.ask_k,
            analyze_k: retrieval.analyze_k,
            budgets: ExcerptBudgets::default(),
        }
    }
}

impl From<&AppConfig> for EngineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            ask_k: config.retrieval.ask_k,
            analyze_k: config.retrieval.analyze_k,
            budgets: ExcerptBudgets::from(&config.budgets),
        }
    }
}

pub struct PolicyEngine {
    index: IndexHandle,
    retriever: Retriever,
    generator: GroundedGenerator,
    embedder: Arc<dyn Embedder>,
    index_options: IndexOptions,
    settings: EngineSettings,
}

impl PolicyEngine {
    /// Wire an engine around an already built index state
    pub fn new(
        state: IndexState,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        settings: EngineSettings,
        index_options: IndexOptions,
    ) -> Self {
        Self {
            index: IndexHandle::new(state),
            retriever: Retriever::new(Arc::clone(&embedder)),
            generator: GroundedGenerator::new(generator),
            embedder,
            index_options,
            settings,
        }
    }

    /// Normalize `records` and build the initial index.
    ///
    /// A failed build leaves the engine running on an empty index so every
    /// mode answers with its fixed fallback.
    pub async fn bootstrap(
        records: Vec<RawPolicyRecord>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        settings: EngineSettings,
        index_options: IndexOptions,
    ) -> Self {
        let corpus = normalize_corpus(records);
        let state = match SemanticIndex::build(corpus.entries, embedder.as_ref(), &index_options).await {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, code = e.code().as_code(), "Initial index build failed, starting with empty index");
                metrics::record_index_size(0);
                IndexState::Empty
            }
        };

        info!(
            entries = state.len(),
            skipped = corpus.skipped.len(),
            embedding_model = embedder.model_name(),
            generation_model = generator.model_name(),
            "Policy engine ready"
        );
        Self::new(state, embedder, generator, settings, index_options)
    }

    /// Build providers from configuration, then bootstrap
    pub async fn from_config(config: &AppConfig, records: Vec<RawPolicyRecord>) -> Result<Self> {
        config.validate()?;
        let embedder = create_embedder(&config.embedding)?;
        let generator = create_generator(&config.generation)?;

        Ok(Self::bootstrap(
            records,
            embedder,
            generator,
            EngineSettings::from(config),
            IndexOptions::from(&config.embedding),
        )
        .await)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Entries in the active index
    pub async fn index_size(&self) -> usize {
        self.index.snapshot().await.len()
    }

    /// Re-normalize `records` and swap in a fresh index.
    ///
    /// In-flight calls finish on the index they started with. If the new
    /// corpus has no valid records or the build fails, the current index stays.
    pub async fn rebuild(&self, records: Vec<RawPolicyRecord>) -> Result<usize> {
        let corpus = normalize_corpus(records);
        if corpus.entries.is_empty() {
            return Err(AppError::IndexUnavailable {
                message: format!(
                    "rebuild corpus has no valid records ({} skipped)",
                    corpus.skipped.len()
                ),
            });
        }
        self.index
            .rebuild(corpus.entries, self.embedder.as_ref(), &self.index_options)
            .await
    }

    /// Answer a question from the policies most similar to it.
    #[instrument(skip(self, query), fields(query_chars = query.chars().count()))]
    pub async fn ask(&self, query: &str) -> Result<GroundedAnswer> {
        let state = self.index.snapshot().await;
        let result = self.answer_question(&state, query).await;
        observe("ask", result)
    }

    /// Compare an external policy document against the corpus.
    #[instrument(skip(self, document), fields(document_chars = document.chars().count()))]
    pub async fn analyze(&self, document: &str) -> Result<GroundedAnswer> {
        let state = self.index.snapshot().await;
        let result = self.analyze_document(&state, document).await;
        observe("analyze", result)
    }

    /// Produce a structured markdown policy brief for `subject`.
    ///
    /// `snapshot` is the rendered telemetry for the subject; a blank snapshot
    /// is replaced by an explicit no-data notice.
    #[instrument(skip(self, snapshot))]
    pub async fn brief(&self, subject: &str, snapshot: &str) -> Result<GroundedAnswer> {
        let state = self.index.snapshot().await;
        let result = self.synthesize_brief(&state, subject, snapshot).await;
        observe("brief", result)
    }

    async fn answer_question(&self, state: &IndexState, query: &str) -> Result<GroundedAnswer> {
        if state.is_empty() {
            return Ok(GroundedAnswer::unavailable(NO_DATA_ANSWER));
        }
        self.grounded(state, query, self.settings.ask_k, query).await
    }

    async fn analyze_document(&self, state: &IndexState, document: &str) -> Result<GroundedAnswer> {
        if state.is_empty() {
            return Ok(GroundedAnswer::unavailable(OFFLINE_ANALYSIS));
        }
        if document.trim().is_empty() {
            return Err(AppError::input_rejected("document", "document text must not be empty"));
        }

        let budgets = self.settings.budgets;
        let search_query = format!(
            "{}{}",
            SIMILARITY_QUERY_PREFIX,
            excerpt(document, budgets.retrieval)
        );
        let prompt = analysis_prompt(excerpt(document, budgets.generation));

        self.grounded(state, &search_query, self.settings.analyze_k, &prompt)
            .await
    }

    async fn synthesize_brief(
        &self,
        state: &IndexState,
        subject: &str,
        snapshot: &str,
    ) -> Result<GroundedAnswer> {
        if state.is_empty() {
            return Ok(GroundedAnswer::unavailable(OFFLINE_REPORT));
        }
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(AppError::input_rejected("subject", "report subject must not be empty"));
        }

        let snapshot = if snapshot.trim().is_empty() {
            TelemetrySnapshot::unavailable(subject).to_string()
        } else {
            snapshot.trim_end().to_string()
        };
        let query = report_prompt(subject, &snapshot);

        self.answer_question(state, &query).await
    }

    /// retrieve -> assemble -> generate. Sources are exactly the ids whose
    /// text went into the generation context.
    async fn grounded(
        &self,
        state: &IndexState,
        retrieval_query: &str,
        k: usize,
        input: &str,
    ) -> Result<GroundedAnswer> {
        let retrieved = self.retriever.retrieve(state, retrieval_query, k).await?;
        let context = assemble(&retrieved);
        let answer = self.generator.generate(&context.text, input).await?;

        Ok(GroundedAnswer {
            answer,
            sources: context.sources,
        })
    }
}

fn observe(mode: &'static str, result: Result<GroundedAnswer>) -> Result<GroundedAnswer> {
    match &result {
        Ok(answer) if answer.sources.is_empty() => {
            metrics::record_interaction(mode, Outcome::Fallback);
        }
        Ok(answer) => {
            metrics::record_interaction(mode, Outcome::Answered);
            info!(mode, sources = answer.sources.len(), "Grounded answer produced");
        }
        Err(e) => {
            metrics::record_interaction(mode, Outcome::Error);
            warn!(mode, error = %e, code = e.code().as_code(), "Interaction failed");
        }
    }
    result
}

fn analysis_prompt(draft: &str) -> String {
    format!(
        "I am providing the text of a draft policy. The existing global environmental \
policies are in the context.\n\n\
draft policy text:\n{draft}\n\n\
Please provide exactly this format:\n\
### Document Summary\n\
A 3-bullet summary of the draft policy.\n\n\
### Similarity Match\n\
A comparison identifying the closest existing policy from the context and explaining why they overlap.\n\n\
### Actionable Recommendations\n\
Recommendations on how to improve the draft based on the historical successes or failures of the matched policy."
    )
}

fn report_prompt(subject: &str, snapshot: &str) -> String {
    format!(
        "Write a formal 'Environmental Policy Brief' for {subject}. \
Use the following recent metrics as a baseline context:\n{snapshot}\n\n\
You must structure the report exactly with these markdown headers:\n\
# Executive Summary\n\
## Policy Efficacy Analysis\n\
## Data-Policy Correlation\n\
## Strategic Recommendations\n\n\
Be concise, highly professional, and cite specific environmental policies from the context."
    )
}
