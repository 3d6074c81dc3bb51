use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use melvis_core::auth::CredentialError;
use melvis_core::error::{self, ApiError};
use melvis_core::{AssessmentError, ConfigurationError, ValidationError};

use crate::store::StoreError;

/// Internal error type that converts to structured API responses
#[derive(Debug)]
pub enum AppError {
    /// Validation error (400)
    Validation {
        message: String,
        field: Option<String>,
        received: Option<serde_json::Value>,
        docs_hint: Option<String>,
    },
    /// Question bank or scoring policy cannot produce a score (500)
    Configuration(ConfigurationError),
    /// Missing, malformed or expired credentials (401)
    Unauthorized {
        message: String,
        docs_hint: Option<String>,
    },
    /// Resource missing or owned by someone else (404)
    NotFound { resource: String },
    /// Unique constraint violated, e.g. email already registered (409)
    Conflict {
        message: String,
        field: Option<String>,
    },
    /// Internal error (500)
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>, field: &str) -> Self {
        AppError::Validation {
            message: message.into(),
            field: Some(field.to_string()),
            received: None,
            docs_hint: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::now_v7().to_string();

        let (status, api_error) = match self {
            AppError::Validation {
                message,
                field,
                received,
                docs_hint,
            } => (
                StatusCode::BAD_REQUEST,
                ApiError {
                    error: error::codes::VALIDATION_FAILED.to_string(),
                    message,
                    field,
                    received,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::Configuration(err) => {
                tracing::error!(error = %err, "assessment configuration error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError {
                        error: error::codes::CONFIGURATION_ERROR.to_string(),
                        message: err.to_string(),
                        field: None,
                        received: None,
                        request_id,
                        docs_hint: Some(
                            "The server's question bank or scoring policy is misconfigured."
                                .to_string(),
                        ),
                    },
                )
            }
            AppError::Unauthorized { message, docs_hint } => (
                StatusCode::UNAUTHORIZED,
                ApiError {
                    error: error::codes::UNAUTHORIZED.to_string(),
                    message,
                    field: None,
                    received: None,
                    request_id,
                    docs_hint,
                },
            ),
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                ApiError {
                    error: error::codes::NOT_FOUND.to_string(),
                    message: format!("{resource} not found"),
                    field: None,
                    received: None,
                    request_id,
                    docs_hint: None,
                },
            ),
            AppError::Conflict { message, field } => (
                StatusCode::CONFLICT,
                ApiError {
                    error: error::codes::CONFLICT.to_string(),
                    message,
                    field,
                    received: None,
                    request_id,
                    docs_hint: None,
                },
            ),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError {
                        error: error::codes::INTERNAL_ERROR.to_string(),
                        message: "An internal error occurred".to_string(),
                        field: None,
                        received: None,
                        request_id,
                        docs_hint: None,
                    },
                )
            }
        };

        (status, Json(api_error)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        let received = match &err {
            ValidationError::UnknownQuestion { question_id } => {
                Some(serde_json::json!(question_id))
            }
            ValidationError::OptionOutOfRange { option_index, .. } => {
                Some(serde_json::json!(option_index))
            }
            ValidationError::Incomplete { missing } => Some(serde_json::json!(missing)),
            ValidationError::NoCurrentQuestion => None,
        };
        let docs_hint = match &err {
            ValidationError::Incomplete { .. } => Some(
                "Answer every question before scoring. GET the attempt to see what is missing."
                    .to_string(),
            ),
            ValidationError::OptionOutOfRange { option_count, .. } => Some(format!(
                "option_index must be between 0 and {}",
                option_count.saturating_sub(1)
            )),
            _ => None,
        };
        AppError::Validation {
            message: err.to_string(),
            field: Some(err.field().to_string()),
            received,
            docs_hint,
        }
    }
}

impl From<AssessmentError> for AppError {
    fn from(err: AssessmentError) -> Self {
        match err {
            AssessmentError::Validation(err) => err.into(),
            AssessmentError::Configuration(err) => AppError::Configuration(err),
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmailTaken(_) => AppError::Conflict {
                message: err.to_string(),
                field: Some("email".to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn out_of_range_maps_to_bad_request() {
        let err: AppError = AssessmentError::from(ValidationError::OptionOutOfRange {
            question_id: 2,
            option_index: 9,
            option_count: 4,
        })
        .into();
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_failed");
        assert_eq!(body["field"], "option_index");
        assert_eq!(body["received"], 9);
        assert_eq!(body["docs_hint"], "option_index must be between 0 and 3");
    }

    #[tokio::test]
    async fn incomplete_lists_missing_ids() {
        let err: AppError = ValidationError::Incomplete {
            missing: vec![3, 5],
        }
        .into();
        let (_, body) = body_of(err).await;
        assert_eq!(body["received"], serde_json::json!([3, 5]));
    }

    #[tokio::test]
    async fn configuration_maps_to_server_error() {
        let err: AppError = AssessmentError::from(ConfigurationError::EmptyBank).into();
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "configuration_error");
    }

    #[tokio::test]
    async fn email_taken_maps_to_conflict() {
        let err: AppError = StoreError::EmailTaken("a@b.c".into()).into();
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["field"], "email");
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let (status, body) = body_of(AppError::Internal("boom".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "An internal error occurred");
        assert!(body["request_id"].is_string());
    }
}
