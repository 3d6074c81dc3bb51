use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use melvis_core::auth::ACCESS_TOKEN_PREFIX;
use melvis_core::session::UserProfile;

use crate::error::AppError;
use crate::state::AppState;

/// Caller resolved from the `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: UserProfile,
    pub access_token: String,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized {
                message: "Missing Authorization header".to_string(),
                docs_hint: Some(
                    "Include 'Authorization: Bearer <token>' with the access token from POST /v1/auth/login."
                        .to_string(),
                ),
            })?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized {
                message: "Authorization header must use Bearer scheme".to_string(),
                docs_hint: Some("Format: 'Authorization: Bearer <token>'".to_string()),
            })?;

        if !token.starts_with(ACCESS_TOKEN_PREFIX) {
            return Err(AppError::Unauthorized {
                message: "Invalid token format".to_string(),
                docs_hint: Some(format!("Token must start with '{ACCESS_TOKEN_PREFIX}'.")),
            });
        }

        let session = state
            .store
            .resolve_session(token)
            .await
            .ok_or_else(|| AppError::Unauthorized {
                message: "Invalid or expired access token".to_string(),
                docs_hint: Some("Log in again via POST /v1/auth/login.".to_string()),
            })?;

        Ok(AuthenticatedUser {
            user: session.user,
            access_token: token.to_string(),
        })
    }
}
