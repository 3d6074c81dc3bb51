use serde::Serialize;
use utoipa::ToSchema;

/// Structured error response returned by every Melvis HTTP endpoint.
/// Carries enough context for a client to show the problem and fix its request.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// Machine-readable error code (e.g. "validation_failed", "not_found", "conflict")
    pub error: String,
    /// Human-readable description of what went wrong
    pub message: String,
    /// Which field caused the error (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// The value that was received (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<serde_json::Value>,
    /// Request ID for tracing and debugging
    pub request_id: String,
    /// Hint about what the correct usage looks like
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

/// Error codes used across the API
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const CONFIGURATION_ERROR: &str = "configuration_error";
    pub const NOT_FOUND: &str = "not_found";
    pub const CONFLICT: &str = "conflict";
    pub const INTERNAL_ERROR: &str = "internal_error";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const RATE_LIMITED: &str = "rate_limited";
}

/// Failure raised while recording answers or scoring an attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssessmentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Malformed respondent input. Not retryable: the caller must change the input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("question {question_id} is not part of this assessment")]
    UnknownQuestion { question_id: u32 },
    #[error(
        "option {option_index} is out of range for question {question_id} ({option_count} options)"
    )]
    OptionOutOfRange {
        question_id: u32,
        option_index: usize,
        option_count: usize,
    },
    #[error("assessment is incomplete: unanswered questions {missing:?}")]
    Incomplete { missing: Vec<u32> },
    #[error("there is no question to answer")]
    NoCurrentQuestion,
}

/// The question bank or scoring policy cannot produce a score.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("question bank is empty")]
    EmptyBank,
    #[error("question ids must be positive")]
    ZeroQuestionId,
    #[error("question {question_id} appears more than once in the bank")]
    DuplicateQuestion { question_id: u32 },
    #[error("question {question_id} has {option_count} options, at least 2 are required")]
    TooFewOptions {
        question_id: u32,
        option_count: usize,
    },
    #[error("maximum option index must be positive")]
    ZeroMaxOptionIndex,
}

impl ValidationError {
    /// Request field the error refers to, for structured error bodies.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::UnknownQuestion { .. } => "question_id",
            ValidationError::OptionOutOfRange { .. } => "option_index",
            ValidationError::Incomplete { .. } => "answers",
            ValidationError::NoCurrentQuestion => "position",
        }
    }
}
