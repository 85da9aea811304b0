//! Grounded Generator - one generation call constrained to retrieved context
//!
//! Grounding is a prompt-level contract: the fixed instruction tells the model
//! to answer only from the context, and the reply is returned verbatim.
//! Callers must treat output as best-effort grounded.

use policylens_common::errors::{AppError, Result};
use policylens_common::Generator;
use std::sync::Arc;
use tracing::debug;

/// Fixed system instruction for every grounded call
pub const GROUNDING_INSTRUCTION: &str = "You are an expert environmental policy analyst. \
Use only the provided context to answer; do not invent facts outside it.";

pub struct GroundedGenerator {
    provider: Arc<dyn Generator>,
    instruction: String,
}

impl GroundedGenerator {
    pub fn new(provider: Arc<dyn Generator>) -> Self {
        Self {
            provider,
            instruction: GROUNDING_INSTRUCTION.to_string(),
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    /// Issue exactly one provider call. No retry, no streaming, no validation
    /// of the reply.
    pub async fn generate(&self, context: &str, input: &str) -> Result<String> {
        if input.trim().is_empty() {
            return Err(AppError::input_rejected("input", "generation input must not be empty"));
        }

        debug!(
            model = self.provider.model_name(),
            context_chars = context.chars().count(),
            input_chars = input.chars().count(),
            "Issuing grounded generation call"
        );
        self.provider.complete(&self.instruction, context, input).await
    }
}
