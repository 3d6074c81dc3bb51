use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::CorsLayer;

/// Build a CORS layer for the configured browser origins
/// (`MELVIS_CORS_ORIGINS`, see `ApiConfig`).
///
/// - Methods: GET, POST, PUT, DELETE, OPTIONS
/// - Headers: Authorization, Content-Type
/// - Credentials: allowed
/// - Max age: 3600s
pub fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            HeaderName::from_static("authorization"),
            HeaderName::from_static("content-type"),
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use tower::ServiceExt;

    use super::*;

    async fn ok() -> StatusCode {
        StatusCode::OK
    }

    async fn allow_origin_for(origin: &str) -> Option<String> {
        let app = Router::new().route("/health", get(ok)).layer(build_cors_layer(&[
            "http://localhost:5173".to_string(),
            "not a header\n".to_string(),
        ]));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("origin", origin)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        response
            .headers()
            .get("access-control-allow-origin")
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn configured_origin_is_allowed() {
        assert_eq!(
            allow_origin_for("http://localhost:5173").await.as_deref(),
            Some("http://localhost:5173")
        );
    }

    #[tokio::test]
    async fn unknown_origin_gets_no_allow_header() {
        assert_eq!(allow_origin_for("https://evil.example").await, None);
    }
}
