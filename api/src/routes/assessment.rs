use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use melvis_core::{Advance, AnswerSet, Question, ResponseCollector, ValidationError};

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;
use crate::store::{AssessmentRecord, AttemptEntry};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/assessment/questions", get(list_questions))
        .route("/v1/assessment/attempts", post(start_attempt))
        .route(
            "/v1/assessment/attempts/{attempt_id}",
            get(get_attempt).delete(abandon_attempt),
        )
        .route(
            "/v1/assessment/attempts/{attempt_id}/answers",
            put(record_answer),
        )
        .route(
            "/v1/assessment/attempts/{attempt_id}/advance",
            post(advance_attempt),
        )
        .route(
            "/v1/assessment/attempts/{attempt_id}/retreat",
            post(retreat_attempt),
        )
        .route(
            "/v1/assessment/attempts/{attempt_id}/score",
            post(score_attempt),
        )
        .route("/v1/assessment/history", get(list_history))
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct QuestionsResponse {
    pub questions: Vec<Question>,
    pub total: usize,
}

/// Where an attempt stands: cursor, progress and the question on screen.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AttemptView {
    pub attempt_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Zero-based cursor into the question bank
    pub position: usize,
    pub total: usize,
    pub progress_percent: f64,
    pub current_question: Option<Question>,
    /// Option index recorded for the current question, if any
    pub current_answer: Option<usize>,
    /// Selected option index keyed by question id
    #[schema(value_type = Object)]
    pub answers: AnswerSet,
}

impl AttemptView {
    fn of(attempt_id: Uuid, entry: &AttemptEntry) -> Self {
        let collector: &ResponseCollector = &entry.collector;
        let current_question = collector.current_question().cloned();
        let current_answer = current_question
            .as_ref()
            .and_then(|q| collector.current_answer(q.id));
        Self {
            attempt_id,
            started_at: entry.started_at,
            position: collector.position(),
            total: collector.total(),
            progress_percent: collector.progress_percent(),
            current_question,
            current_answer,
            answers: collector.answers().clone(),
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RecordAnswerRequest {
    pub question_id: u32,
    pub option_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceStatus {
    Moved,
    ReadyToScore,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AdvanceResponse {
    pub status: AdvanceStatus,
    pub attempt: AttemptView,
}

/// Records returned when `limit` is absent.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const MAX_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct HistoryQuery {
    /// Newest records to return, 1 to 100 (default 10)
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HistoryResponse {
    pub assessments: Vec<AssessmentRecord>,
}

fn attempt_not_found(attempt_id: Uuid) -> AppError {
    AppError::NotFound {
        resource: format!("Assessment attempt '{attempt_id}'"),
    }
}

#[utoipa::path(
    get,
    path = "/v1/assessment/questions",
    responses(
        (status = 200, description = "The question bank in presentation order", body = QuestionsResponse),
        (status = 401, description = "Not authenticated", body = melvis_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "assessment"
)]
pub async fn list_questions(
    State(state): State<AppState>,
    _auth: AuthenticatedUser,
) -> Json<QuestionsResponse> {
    Json(QuestionsResponse {
        questions: state.bank.questions().to_vec(),
        total: state.bank.len(),
    })
}

#[utoipa::path(
    post,
    path = "/v1/assessment/attempts",
    responses(
        (status = 201, description = "Attempt started on the first question", body = AttemptView),
        (status = 401, description = "Not authenticated", body = melvis_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "assessment"
)]
pub async fn start_attempt(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let owner = auth.user.id;
    let collector = ResponseCollector::new(state.bank.clone());
    let attempt_id = state.store.insert_attempt(owner, collector).await;
    tracing::info!(user_id = %owner, attempt_id = %attempt_id, "assessment attempt started");

    let view = state
        .store
        .with_attempt(owner, attempt_id, |entry| AttemptView::of(attempt_id, entry))
        .await
        .ok_or_else(|| {
            AppError::Internal(format!("attempt {attempt_id} vanished after insert"))
        })?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    get,
    path = "/v1/assessment/attempts/{attempt_id}",
    params(("attempt_id" = Uuid, Path, description = "Attempt id")),
    responses(
        (status = 200, description = "Current state of the attempt", body = AttemptView),
        (status = 404, description = "No such attempt for this user", body = melvis_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "assessment"
)]
pub async fn get_attempt(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(attempt_id): Path<Uuid>,
) -> Result<Json<AttemptView>, AppError> {
    state
        .store
        .with_attempt(auth.user.id, attempt_id, |entry| {
            AttemptView::of(attempt_id, entry)
        })
        .await
        .map(Json)
        .ok_or_else(|| attempt_not_found(attempt_id))
}

#[utoipa::path(
    put,
    path = "/v1/assessment/attempts/{attempt_id}/answers",
    params(("attempt_id" = Uuid, Path, description = "Attempt id")),
    request_body = RecordAnswerRequest,
    responses(
        (status = 200, description = "Answer recorded (last write wins)", body = AttemptView),
        (status = 400, description = "Unknown question or option out of range", body = melvis_core::error::ApiError),
        (status = 404, description = "No such attempt for this user", body = melvis_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "assessment"
)]
pub async fn record_answer(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(attempt_id): Path<Uuid>,
    AppJson(req): AppJson<RecordAnswerRequest>,
) -> Result<Json<AttemptView>, AppError> {
    let view = state
        .store
        .with_attempt(auth.user.id, attempt_id, |entry| {
            entry
                .collector
                .record_answer(req.question_id, req.option_index)?;
            Ok::<_, ValidationError>(AttemptView::of(attempt_id, entry))
        })
        .await
        .ok_or_else(|| attempt_not_found(attempt_id))??;
    tracing::debug!(
        user_id = %auth.user.id,
        attempt_id = %attempt_id,
        question_id = req.question_id,
        "answer recorded"
    );
    Ok(Json(view))
}

#[utoipa::path(
    post,
    path = "/v1/assessment/attempts/{attempt_id}/advance",
    params(("attempt_id" = Uuid, Path, description = "Attempt id")),
    responses(
        (status = 200, description = "Moved to the next question, or ready to score on the last one", body = AdvanceResponse),
        (status = 404, description = "No such attempt for this user", body = melvis_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "assessment"
)]
pub async fn advance_attempt(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(attempt_id): Path<Uuid>,
) -> Result<Json<AdvanceResponse>, AppError> {
    state
        .store
        .with_attempt(auth.user.id, attempt_id, |entry| {
            let status = match entry.collector.advance() {
                Advance::Moved { .. } => AdvanceStatus::Moved,
                Advance::ReadyToScore => AdvanceStatus::ReadyToScore,
            };
            AdvanceResponse {
                status,
                attempt: AttemptView::of(attempt_id, entry),
            }
        })
        .await
        .map(Json)
        .ok_or_else(|| attempt_not_found(attempt_id))
}

#[utoipa::path(
    post,
    path = "/v1/assessment/attempts/{attempt_id}/retreat",
    params(("attempt_id" = Uuid, Path, description = "Attempt id")),
    responses(
        (status = 200, description = "Moved back one question (stays put on the first)", body = AttemptView),
        (status = 404, description = "No such attempt for this user", body = melvis_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "assessment"
)]
pub async fn retreat_attempt(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(attempt_id): Path<Uuid>,
) -> Result<Json<AttemptView>, AppError> {
    state
        .store
        .with_attempt(auth.user.id, attempt_id, |entry| {
            entry.collector.retreat();
            AttemptView::of(attempt_id, entry)
        })
        .await
        .map(Json)
        .ok_or_else(|| attempt_not_found(attempt_id))
}

#[utoipa::path(
    post,
    path = "/v1/assessment/attempts/{attempt_id}/score",
    params(("attempt_id" = Uuid, Path, description = "Attempt id")),
    responses(
        (status = 200, description = "Scored and added to history; the attempt is closed", body = AssessmentRecord),
        (status = 400, description = "Attempt incomplete under the server's scoring policy", body = melvis_core::error::ApiError),
        (status = 404, description = "No such attempt for this user", body = melvis_core::error::ApiError),
        (status = 500, description = "Question bank cannot be scored", body = melvis_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "assessment"
)]
pub async fn score_attempt(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(attempt_id): Path<Uuid>,
) -> Result<Json<AssessmentRecord>, AppError> {
    let record = state
        .store
        .finish_attempt(auth.user.id, attempt_id, &state.policy)
        .await
        .ok_or_else(|| attempt_not_found(attempt_id))??;
    tracing::info!(
        user_id = %auth.user.id,
        attempt_id = %attempt_id,
        tier = record.result.tier.as_str(),
        percentage = record.result.percentage,
        "assessment scored"
    );
    Ok(Json(record))
}

#[utoipa::path(
    delete,
    path = "/v1/assessment/attempts/{attempt_id}",
    params(("attempt_id" = Uuid, Path, description = "Attempt id")),
    responses(
        (status = 204, description = "Attempt abandoned; nothing is recorded"),
        (status = 404, description = "No such attempt for this user", body = melvis_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "assessment"
)]
pub async fn abandon_attempt(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    Path(attempt_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.store.remove_attempt(auth.user.id, attempt_id).await {
        return Err(attempt_not_found(attempt_id));
    }
    tracing::info!(
        user_id = %auth.user.id,
        attempt_id = %attempt_id,
        "assessment attempt abandoned"
    );
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/v1/assessment/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Most recent completed assessments, newest first", body = HistoryResponse),
        (status = 400, description = "limit is not a number", body = melvis_core::error::ApiError),
        (status = 401, description = "Not authenticated", body = melvis_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "assessment"
)]
pub async fn list_history(
    State(state): State<AppState>,
    auth: AuthenticatedUser,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistoryResponse>, AppError> {
    let Query(query) = query.map_err(|rejection| {
        AppError::validation(
            format!("limit must be a whole number: {}", rejection.body_text()),
            "limit",
        )
    })?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    Ok(Json(HistoryResponse {
        assessments: state.store.history(auth.user.id, limit).await,
    }))
}
