//! PolicyLens Context Engine
//!
//! Grounded generation over the environmental policy corpus:
//! - Excerpt budgets for caller-supplied text
//! - Context assembly from retrieval results
//! - Single-call grounded generation
//! - Interaction modes (ask, analyze, brief)
//! - Telemetry snapshots for policy briefs

pub mod assembler;
pub mod engine;
pub mod excerpt;
pub mod generator;
pub mod telemetry;

pub use assembler::{assemble, AssembledContext};
pub use engine::{EngineSettings, GroundedAnswer, PolicyEngine};
pub use excerpt::{excerpt, ExcerptBudgets};
pub use generator::GroundedGenerator;
pub use telemetry::TelemetrySnapshot;
