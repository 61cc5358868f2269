// API router composition
// Decision: Every /api route sits behind one guard; public routes are opted out via the allow-list

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::auth::{
    self, require_auth, routes::PUBLIC_AUTH_PATTERN, AllowListEntry, AuthConfig, AuthState,
};

pub const HEALTH_PATH: &str = "/api/health";

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    auth_configured: bool,
}

/// State for health endpoint
#[derive(Clone)]
struct HealthState {
    auth_configured: bool,
}

async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        auth_configured: state.auth_configured,
    })
}

/// Routes reachable without a session.
pub fn allow_list(config: &AuthConfig) -> Result<Vec<AllowListEntry>, regex::Error> {
    let mut entries = vec![
        AllowListEntry::exact(HEALTH_PATH),
        AllowListEntry::pattern(PUBLIC_AUTH_PATTERN)?,
    ];
    entries.extend(config.public_paths.iter().cloned().map(AllowListEntry::PathExact));
    Ok(entries)
}

/// Build the API router with the auth guard installed.
pub fn router(state: AuthState) -> Result<Router, regex::Error> {
    let guard = state.composed_guard(allow_list(&state.config)?);
    let health_state = HealthState {
        auth_configured: state.is_provider_configured(),
    };

    Ok(Router::new()
        .route(HEALTH_PATH, get(health).with_state(health_state))
        .merge(auth::routes(state))
        .layer(from_fn_with_state(guard, require_auth)))
}

/// CORS for the browser front-end; credentials are required for the session cookies.
pub fn cors_layer(frontend_origin: &str) -> Option<CorsLayer> {
    let origin: HeaderValue = match frontend_origin.parse() {
        Ok(origin) => origin,
        Err(e) => {
            tracing::warn!(
                origin = %frontend_origin,
                error = %e,
                "Invalid FRONTEND_ORIGIN; CORS disabled"
            );
            return None;
        }
    };

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::CONTENT_TYPE,
                header::AUTHORIZATION,
                header::ACCEPT,
                header::ORIGIN,
                header::CACHE_CONTROL,
            ])
            .allow_credentials(true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::cookies::set_cookie_headers;
    use crate::auth::testing::{identity, session, StubProvider};
    use axum::{body::Body, http::Request, http::StatusCode};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn unconfigured_app() -> Router {
        router(AuthState::new(AuthConfig::default())).unwrap()
    }

    fn configured_app() -> (Router, Arc<StubProvider>) {
        let stub = Arc::new(
            StubProvider::new()
                .accept_access("good", identity("u1"))
                .account("u1@example.com", "pw", session("a", "r", "u1")),
        );
        let state = AuthState::with_provider(AuthConfig::default(), stub.clone());
        (router(state).unwrap(), stub)
    }

    fn post_json(uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = unconfigured_app()
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["auth_configured"], false);
    }

    #[tokio::test]
    async fn test_guarded_route_without_provider_is_unavailable() {
        let response = unconfigured_app()
            .oneshot(
                Request::builder()
                    .uri("/api/auth/session")
                    .header("authorization", "Bearer tok")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_sign_in_without_provider_is_unavailable() {
        let response = unconfigured_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/sign-in")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"email":"a@b.c","password":"pw"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_public_auth_routes_skip_guard() {
        let (app, stub) = configured_app();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/auth/sign-in",
                r#"{"email":"u1@example.com","password":"pw"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(set_cookie_headers(&response).len(), 3);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/auth/sign-up",
                r#"{"email":"new@example.com","password":"pw"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/sign-out")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        assert_eq!(stub.validate_calls(), 0);
    }

    #[tokio::test]
    async fn test_session_route_is_guarded() {
        let (app, stub) = configured_app();

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/auth/session").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "no credential presented");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/auth/session")
                    .header("authorization", "Bearer good")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["user"]["id"], "u1");
        assert_eq!(json["method"], "access_token");
        assert_eq!(stub.validate_calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_path_is_guarded() {
        let (app, _) = configured_app();
        let response = app
            .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = unconfigured_app()
            .oneshot(Request::builder().uri("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unknown_path_with_valid_token_is_not_found() {
        let (app, _) = configured_app();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/nope")
                    .header("authorization", "Bearer good")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_allow_list_includes_configured_paths() {
        let config = AuthConfig {
            public_paths: vec!["/api/status".to_string()],
            ..AuthConfig::default()
        };
        let entries = allow_list(&config).unwrap();
        assert_eq!(entries.len(), 3);

        let request = Request::builder().uri("/api/status").body(Body::empty()).unwrap();
        assert!(entries.iter().any(|e| e.matches(&request)));
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let app = unconfigured_app().layer(cors_layer("http://localhost:5173").unwrap());

        let response = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/auth/session")
                    .header("origin", "http://localhost:5173")
                    .header("access-control-request-method", "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:5173"
        );
        assert_eq!(
            response.headers().get("access-control-allow-credentials").unwrap(),
            "true"
        );
    }

    #[test]
    fn test_invalid_cors_origin() {
        assert!(cors_layer("bad\norigin").is_none());
    }
}
