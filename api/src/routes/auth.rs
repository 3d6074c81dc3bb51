use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use melvis_core::auth::{self, MIN_PASSWORD_LEN};
use melvis_core::session::{IssuedSession, UserProfile};

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

pub fn signup_router() -> Router<AppState> {
    Router::new().route("/v1/auth/signup", post(signup))
}

pub fn login_router() -> Router<AppState> {
    Router::new().route("/v1/auth/login", post(login))
}

/// Routes that require a live session.
pub fn session_router() -> Router<AppState> {
    Router::new()
        .route("/v1/auth/logout", post(logout))
        .route("/v1/auth/me", get(me))
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SignupRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Issued on signup and login. `access_token` is shown only here.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SessionResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

impl From<IssuedSession> for SessionResponse {
    fn from(issued: IssuedSession) -> Self {
        Self {
            access_token: issued.access_token,
            token_type: "bearer".to_string(),
            expires_at: issued.session.expires_at,
            user: issued.session.user,
        }
    }
}

fn validate_signup(req: &SignupRequest) -> Result<(), AppError> {
    if req.full_name.trim().is_empty() {
        return Err(AppError::validation("full_name must not be empty", "full_name"));
    }
    let email = req.email.trim();
    if email.is_empty() {
        return Err(AppError::validation("email must not be empty", "email"));
    }
    if !email.contains('@') {
        return Err(AppError::Validation {
            message: "email must be a valid email address".to_string(),
            field: Some("email".to_string()),
            received: Some(serde_json::Value::String(email.to_string())),
            docs_hint: None,
        });
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            format!("password must be at least {MIN_PASSWORD_LEN} characters"),
            "password",
        ));
    }
    if req.password != req.confirm_password {
        return Err(AppError::validation(
            "passwords do not match",
            "confirm_password",
        ));
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created and session opened", body = SessionResponse),
        (status = 400, description = "Validation error", body = melvis_core::error::ApiError),
        (status = 409, description = "Email already registered", body = melvis_core::error::ApiError),
        (status = 429, description = "Too many signups from this address", body = melvis_core::error::ApiError)
    ),
    tag = "auth"
)]
pub async fn signup(
    State(state): State<AppState>,
    AppJson(req): AppJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_signup(&req)?;

    let password_hash = auth::hash_password(&req.password)?;
    let user = state
        .store
        .create_account(&req.full_name, &req.email, password_hash)
        .await?;
    tracing::info!(user_id = %user.id, "account created");

    let issued = state.store.open_session(user).await;
    Ok((StatusCode::CREATED, Json(SessionResponse::from(issued))))
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened", body = SessionResponse),
        (status = 401, description = "Invalid credentials", body = melvis_core::error::ApiError),
        (status = 429, description = "Too many attempts from this address", body = melvis_core::error::ApiError)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let invalid = || AppError::Unauthorized {
        message: "Invalid email or password".to_string(),
        docs_hint: None,
    };

    let Some(account) = state.store.find_account(&req.email).await else {
        auth::verify_against_dummy(&req.password);
        tracing::info!(decision = "deny", reason = "unknown_email", "login attempt");
        return Err(invalid());
    };

    if !auth::verify_password(&req.password, &account.password_hash)? {
        tracing::info!(
            user_id = %account.profile.id,
            decision = "deny",
            reason = "bad_password",
            "login attempt"
        );
        return Err(invalid());
    }

    tracing::info!(user_id = %account.profile.id, decision = "allow", "login attempt");
    let issued = state.store.open_session(account.profile).await;
    Ok(Json(SessionResponse::from(issued)))
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session closed"),
        (status = 401, description = "Not authenticated", body = melvis_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn logout(State(state): State<AppState>, auth: AuthenticatedUser) -> StatusCode {
    state.store.close_session(&auth.access_token).await;
    tracing::info!(user_id = %auth.user.id, "session closed");
    StatusCode::NO_CONTENT
}

#[utoipa::path(
    get,
    path = "/v1/auth/me",
    responses(
        (status = 200, description = "The signed-in user", body = UserProfile),
        (status = 401, description = "Not authenticated", body = melvis_core::error::ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me(auth: AuthenticatedUser) -> Json<UserProfile> {
    Json(auth.user)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::app::testing;

    fn signup_body(email: &str, password: &str, confirm: &str) -> serde_json::Value {
        json!({
            "full_name": "Sam Rivera",
            "email": email,
            "password": password,
            "confirm_password": confirm,
        })
    }

    #[tokio::test]
    async fn signup_opens_a_session() {
        let app = testing::app();
        let (status, body) = testing::send(
            &app,
            "POST",
            "/v1/auth/signup",
            None,
            Some(signup_body("Sam@Example.com", "long_enough", "long_enough")),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["token_type"], "bearer");
        assert_eq!(body["user"]["email"], "sam@example.com");
        let token = body["access_token"].as_str().unwrap();
        assert!(token.starts_with("melvis_at_"));

        let (status, me) = testing::send(&app, "GET", "/v1/auth/me", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["full_name"], "Sam Rivera");
    }

    #[tokio::test]
    async fn signup_rejects_bad_input() {
        let app = testing::app();
        let cases = [
            (signup_body("", "long_enough", "long_enough"), "email"),
            (signup_body("no-at-sign", "long_enough", "long_enough"), "email"),
            (signup_body("a@b.c", "short", "short"), "password"),
            (signup_body("a@b.c", "long_enough", "different1"), "confirm_password"),
        ];
        for (body, field) in cases {
            let (status, err) =
                testing::send(&app, "POST", "/v1/auth/signup", None, Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(err["field"], field);
        }
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let app = testing::app();
        testing::signup(&app, "dup@example.com").await;
        let (status, body) = testing::send(
            &app,
            "POST",
            "/v1/auth/signup",
            None,
            Some(signup_body("DUP@example.com", "long_enough", "long_enough")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "conflict");
    }

    #[tokio::test]
    async fn login_checks_password() {
        let app = testing::app();
        testing::signup(&app, "kim@example.com").await;

        let (status, _) = testing::send(
            &app,
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({"email": "kim@example.com", "password": "wrong_password"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = testing::send(
            &app,
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({"email": "nobody@example.com", "password": testing::PASSWORD})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = testing::send(
            &app,
            "POST",
            "/v1/auth/login",
            None,
            Some(json!({"email": " KIM@example.com", "password": testing::PASSWORD})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["expires_at"].is_string());
    }

    #[tokio::test]
    async fn logout_revokes_token() {
        let app = testing::app();
        let token = testing::signup(&app, "lee@example.com").await;

        let (status, _) =
            testing::send(&app, "POST", "/v1/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = testing::send(&app, "GET", "/v1/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");
    }

    #[tokio::test]
    async fn me_requires_bearer_token() {
        let app = testing::app();
        let (status, _) = testing::send(&app, "GET", "/v1/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) =
            testing::send(&app, "GET", "/v1/auth/me", Some("not-a-melvis-token"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid token format");
    }
}
