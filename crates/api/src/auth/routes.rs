// Authentication HTTP routes
// Decision: Use /api/auth/* for all auth endpoints
// Decision: Tokens travel only in httpOnly cookies; JSON bodies carry the user, never tokens

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use super::{
    error::AuthError,
    extractor::extract_token,
    middleware::{AuthMethod, AuthState, AuthUser},
    provider::{Identity, ProviderError},
};

/// Paths under this router that must bypass the guard
pub const PUBLIC_AUTH_PATTERN: &str = r"^/api/auth/sign-(in|up|out)$";

/// Sign-in request
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
    /// Keep the session across browser restarts
    #[serde(default)]
    pub remember_me: bool,
}

/// Sign-up request
#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
}

/// User info response
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: Identity,
}

/// Sign-up response
#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub user: Identity,
    /// The provider wants the address confirmed before a session is issued
    pub confirmation_required: bool,
}

/// Current session response
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: Identity,
    pub method: AuthMethod,
}

/// Create auth routes
pub fn routes(state: AuthState) -> Router {
    Router::new()
        // Public routes
        .route("/api/auth/sign-in", post(sign_in))
        .route("/api/auth/sign-up", post(sign_up))
        .route("/api/auth/sign-out", post(sign_out))
        // Protected routes
        .route("/api/auth/session", get(current_session))
        .with_state(state)
}

fn require_fields(email: &str, password: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() {
        return Err(AuthError::BadRequest("email is required".to_string()));
    }
    if password.is_empty() {
        return Err(AuthError::BadRequest("password is required".to_string()));
    }
    Ok(())
}

/// POST /api/auth/sign-in - Password sign-in
pub async fn sign_in(
    State(state): State<AuthState>,
    jar: CookieJar,
    Json(req): Json<SignInRequest>,
) -> Result<(CookieJar, Json<UserResponse>), AuthError> {
    require_fields(&req.email, &req.password)?;
    let provider = state.provider.resolve().await?;

    let session = provider
        .sign_in(req.email.trim(), &req.password)
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, "Sign-in rejected");
            AuthError::from(e)
        })?;

    if !session.is_complete() {
        tracing::warn!("Provider returned an incomplete session on sign-in");
        return Err(AuthError::invalid_credential());
    }

    tracing::info!(user_id = %session.user.id, remember_me = req.remember_me, "User signed in");
    let jar = state
        .cookies
        .set_session_cookies(jar, &session, req.remember_me);

    Ok((jar, Json(UserResponse { user: session.user })))
}

/// POST /api/auth/sign-up - Register a new account
pub async fn sign_up(
    State(state): State<AuthState>,
    jar: CookieJar,
    Json(req): Json<SignUpRequest>,
) -> Result<(StatusCode, CookieJar, Json<SignUpResponse>), AuthError> {
    require_fields(&req.email, &req.password)?;
    let provider = state.provider.resolve().await?;

    let outcome = provider
        .sign_up(req.email.trim(), &req.password)
        .await
        .map_err(|e| match e {
            ProviderError::Rejected { status, message } => {
                tracing::info!(status, message = %message, "Sign-up rejected");
                AuthError::BadRequest("Sign up failed".to_string())
            }
            other => AuthError::from(other),
        })?;

    let (jar, confirmation_required) = match outcome.session.as_ref() {
        Some(session) if session.is_complete() => {
            (state.cookies.set_session_cookies(jar, session, false), false)
        }
        _ => (jar, true),
    };

    tracing::info!(user_id = %outcome.user.id, confirmation_required, "User signed up");
    Ok((
        StatusCode::CREATED,
        jar,
        Json(SignUpResponse {
            user: outcome.user,
            confirmation_required,
        }),
    ))
}

/// POST /api/auth/sign-out - Revoke the session and clear cookies
pub async fn sign_out(
    State(state): State<AuthState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> (StatusCode, CookieJar) {
    if let Some(token) = extract_token(&headers) {
        match state.provider.resolve().await {
            Ok(provider) => {
                if let Err(e) = provider.sign_out(&token).await {
                    tracing::warn!(error = %e, "Provider sign-out failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Skipping provider sign-out"),
        }
    }

    (
        StatusCode::NO_CONTENT,
        state.cookies.clear_session_cookies(jar),
    )
}

/// GET /api/auth/session - Get the current user
pub async fn current_session(user: AuthUser) -> Json<SessionResponse> {
    Json(SessionResponse {
        user: user.identity,
        method: user.method,
    })
}
