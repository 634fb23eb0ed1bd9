use serde::{Deserialize, Serialize};

use crate::llm_client::LlmError;

/// Shown in place of a reaction when generation fails.
pub const FAILURE_PLACEHOLDER: &str =
    "An error occurred while generating the reaction. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    InvalidInput,
    NotConfigured,
    Timeout,
    RateLimited,
    ContentBlocked,
    EmptyResponse,
    Upstream,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationFailure {
    pub reason: FailureReason,
    /// Human-readable cause, including any safety feedback from the model.
    pub detail: Option<String>,
}

impl GenerationFailure {
    pub fn new(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: Some(detail.into()),
        }
    }
}

impl From<LlmError> for GenerationFailure {
    fn from(err: LlmError) -> Self {
        let reason = match &err {
            LlmError::MissingApiKey => FailureReason::NotConfigured,
            LlmError::Timeout(_) => FailureReason::Timeout,
            LlmError::RateLimited { .. } => FailureReason::RateLimited,
            LlmError::Api { status: 429, .. } => FailureReason::RateLimited,
            LlmError::Blocked { .. } => FailureReason::ContentBlocked,
            LlmError::EmptyContent => FailureReason::EmptyResponse,
            LlmError::Http(_) | LlmError::Api { .. } | LlmError::Parse(_) => {
                FailureReason::Upstream
            }
        };
        Self::new(reason, err.to_string())
    }
}

/// Outcome of one (speech, voter) generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReactionResult {
    Reaction { text: String },
    GenerationFailed(GenerationFailure),
}

impl ReactionResult {
    pub fn reaction(text: impl Into<String>) -> Self {
        ReactionResult::Reaction { text: text.into() }
    }

    pub fn failed(reason: FailureReason, detail: impl Into<String>) -> Self {
        ReactionResult::GenerationFailed(GenerationFailure::new(reason, detail))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ReactionResult::GenerationFailed(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ReactionResult::Reaction { text } => Some(text),
            ReactionResult::GenerationFailed(_) => None,
        }
    }

    /// What an end user sees: the reaction, or a visible placeholder.
    pub fn display_text(&self) -> &str {
        self.text().unwrap_or(FAILURE_PLACEHOLDER)
    }
}
