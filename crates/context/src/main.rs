//! PolicyLens command-line driver
//!
//! Loads configuration and the policy corpus, builds the engine and runs a
//! single interaction mode, printing the grounded answer as JSON:
//!
//! ```text
//! policylens ask <question>
//! policylens analyze <document-file>
//! policylens brief <subject> [telemetry-snapshot]
//! ```

use policylens_common::{config::AppConfig, errors::AppError, metrics, VERSION};
use policylens_context::PolicyEngine;
use policylens_search::RawPolicyRecord;
use std::io::ErrorKind;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: policylens <ask <question> | analyze <file> | brief <subject> [snapshot]>";

enum Command {
    Ask(String),
    Analyze(String),
    Brief { subject: String, snapshot: String },
}

impl Command {
    fn parse(args: &[String]) -> Option<Self> {
        match args {
            [mode, question @ ..] if mode == "ask" && !question.is_empty() => {
                Some(Command::Ask(question.join(" ")))
            }
            [mode, path] if mode == "analyze" => Some(Command::Analyze(path.clone())),
            [mode, subject] if mode == "brief" => Some(Command::Brief {
                subject: subject.clone(),
                snapshot: String::new(),
            }),
            [mode, subject, snapshot] if mode == "brief" => Some(Command::Brief {
                subject: subject.clone(),
                snapshot: snapshot.clone(),
            }),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config);

    info!("Starting PolicyLens v{}", VERSION);
    metrics::register_metrics();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = Command::parse(&args) else {
        eprintln!("{}", USAGE);
        return Err(AppError::input_rejected("command", "unrecognized command line").into());
    };

    let records = load_corpus(&config.corpus.path).await?;
    let engine = PolicyEngine::from_config(&config, records).await?;

    let answer = match command {
        Command::Ask(question) => engine.ask(&question).await?,
        Command::Analyze(path) => {
            let document = tokio::fs::read_to_string(&path).await?;
            engine.analyze(&document).await?
        }
        Command::Brief { subject, snapshot } => engine.brief(&subject, &snapshot).await?,
    };

    println!("{}", serde_json::to_string_pretty(&answer)?);
    Ok(())
}

/// Logs go to stderr so stdout carries only the answer.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Read the corpus file. A missing file yields an empty corpus.
async fn load_corpus(path: &str) -> Result<Vec<RawPolicyRecord>, AppError> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => parse_corpus(&raw),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path, "Corpus file not found, starting with an empty corpus");
            Ok(Vec::new())
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_corpus(raw: &str) -> Result<Vec<RawPolicyRecord>, AppError> {
    Ok(serde_json::from_str(raw)?)
}
