use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware;
use crate::routes;
use crate::state::AppState;

/// Assemble the full router. `rate_limits` attaches the per-IP limiters to
/// signup and login; they key on the peer address, so the server must be
/// started with connect info.
pub fn build_router(state: AppState, cors_origins: &[String], rate_limits: bool) -> Router {
    let mut signup = routes::auth::signup_router();
    let mut login = routes::auth::login_router();
    if rate_limits {
        signup = signup.layer(middleware::rate_limit::signup_layer());
        login = login.layer(middleware::rate_limit::login_layer());
    }

    Router::new()
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", crate::ApiDoc::openapi()),
        )
        .merge(routes::health::router())
        .merge(signup)
        .merge(login)
        .merge(routes::auth::session_router())
        .merge(routes::assessment::router())
        .layer(axum::middleware::from_fn(middleware::security_headers::apply))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::cors::build_cors_layer(cors_origins)),
        )
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::testing;

    #[tokio::test]
    async fn serves_openapi_document() {
        let app = testing::app();
        let (status, doc) = testing::send(&app, "GET", "/api-doc/openapi.json", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(doc["paths"]["/v1/assessment/attempts/{attempt_id}/score"].is_object());
        assert!(doc["components"]["securitySchemes"]["bearer_auth"].is_object());
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = testing::app();
        let (status, _) = testing::send(&app, "GET", "/v1/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
