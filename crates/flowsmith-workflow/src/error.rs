//! Workflow error types.
//!
//! All workflow subsystems surface errors through [`WorkflowError`].  Callers
//! that present failures to users should go through
//! [`WorkflowError::user_message`], which separates "the model produced bad
//! data" from every other failure class.

use crate::solution::SolutionStrategy;

/// Message shown to users when the model's output could not be turned into a
/// solution.
pub const MALFORMED_USER_MESSAGE: &str =
    "The AI model returned an invalid data structure. Please try again.";

/// How much of a raw model answer is echoed in error messages.
const SNIPPET_CHARS: usize = 200;

/// Unified error type for the workflow core.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    // -- Input errors ----------------------------------------------------------
    /// The caller's request cannot be sent to the model.
    #[error("invalid request: {reason}")]
    InvalidInput { reason: String },

    // -- Salvage / normalization -----------------------------------------------
    /// No salvage strategy recovered structured data from the model text.
    /// `raw` holds the untouched text for diagnostics.
    #[error("model returned malformed JSON: {}", snippet(raw))]
    MalformedResponse { raw: String },

    /// Structured data was recovered but lacks a required solution field or
    /// has the wrong shape.
    #[error("solution is missing required data: {reason}")]
    IncompleteSolution { reason: String },

    // -- Orchestration ---------------------------------------------------------
    /// One of the two strategy pipelines failed, so no pair was produced.
    #[error("{strategy} solution failed: {source}")]
    PairGenerationFailure {
        strategy: SolutionStrategy,
        source: Box<WorkflowError>,
    },

    // -- Upstream crate errors -------------------------------------------------
    /// The model call itself failed.
    #[error("llm error: {0}")]
    Llm(#[from] flowsmith_llm::LlmError),

    // -- Generic ---------------------------------------------------------------
    /// Catch-all for unexpected internal errors.
    #[error("internal workflow error: {0}")]
    Internal(String),
}

impl WorkflowError {
    /// Whether this failure means the model produced unusable data, as
    /// opposed to a transport, configuration, or internal failure.
    pub fn is_malformed(&self) -> bool {
        match self {
            Self::MalformedResponse { .. } | Self::IncompleteSolution { .. } => true,
            Self::PairGenerationFailure { source, .. } => source.is_malformed(),
            _ => false,
        }
    }

    /// The strategy whose pipeline failed, if this is a pair failure.
    pub fn failed_strategy(&self) -> Option<SolutionStrategy> {
        match self {
            Self::PairGenerationFailure { strategy, .. } => Some(*strategy),
            _ => None,
        }
    }

    /// A single descriptive message suitable for end users.
    pub fn user_message(&self) -> String {
        if self.is_malformed() {
            MALFORMED_USER_MESSAGE.to_owned()
        } else {
            self.to_string()
        }
    }
}

/// Leading part of `raw`, cut on a char boundary.
fn snippet(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_owned(),
    }
}

/// Convenience alias used throughout the workflow crate.
pub type Result<T> = std::result::Result<T, WorkflowError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
