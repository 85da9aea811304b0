//! Metrics and observability utilities
//!
//! Records provider, retrieval and interaction metrics through the `metrics`
//! facade. Installing an exporter is left to the embedding application.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// Metrics prefix for all PolicyLens metrics
pub const METRICS_PREFIX: &str = "policylens";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API requests"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding request latency in seconds"
    );

    describe_counter!(
        format!("{}_embedding_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API errors"
    );

    describe_counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total generation API requests"
    );

    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Generation request latency in seconds"
    );

    describe_counter!(
        format!("{}_retrieval_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total retrieval queries"
    );

    describe_histogram!(
        format!("{}_retrieval_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Retrieval latency in seconds, including the query embedding"
    );

    describe_gauge!(
        format!("{}_retrieval_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of entries returned by the last retrieval"
    );

    describe_gauge!(
        format!("{}_index_entries", METRICS_PREFIX),
        Unit::Count,
        "Entries in the active semantic index"
    );

    describe_counter!(
        format!("{}_interactions_total", METRICS_PREFIX),
        Unit::Count,
        "Interaction mode invocations by outcome"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record embedding metrics
pub fn record_embedding(duration_secs: f64, model: &str, batch_size: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string(),
            "batch" => batch_bucket(batch_size)
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_embedding_errors_total", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .increment(1);
    }
}

/// Helper to record generation metrics
pub fn record_generation(duration_secs: f64, model: &str, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        "model" => model.to_string()
    )
    .record(duration_secs);
}

/// Helper to record retrieval metrics
pub fn record_retrieval(duration_secs: f64, k: usize, result_count: usize) {
    counter!(format!("{}_retrieval_queries_total", METRICS_PREFIX)).increment(1);

    histogram!(
        format!("{}_retrieval_duration_seconds", METRICS_PREFIX),
        "k" => k.to_string()
    )
    .record(duration_secs);

    gauge!(format!("{}_retrieval_results_count", METRICS_PREFIX)).set(result_count as f64);
}

/// Helper to record the size of the active index
pub fn record_index_size(entries: usize) {
    gauge!(format!("{}_index_entries", METRICS_PREFIX)).set(entries as f64);
}

/// Interaction outcome label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Answered,
    Fallback,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Answered => "answered",
            Outcome::Fallback => "fallback",
            Outcome::Error => "error",
        }
    }
}

/// Helper to record an interaction mode invocation
pub fn record_interaction(mode: &str, outcome: Outcome) {
    counter!(
        format!("{}_interactions_total", METRICS_PREFIX),
        "mode" => mode.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

fn batch_bucket(batch_size: usize) -> &'static str {
    match batch_size {
        0..=1 => "1",
        2..=16 => "2-16",
        17..=64 => "17-64",
        _ => "65+",
    }
}
