// Authentication error taxonomy
// Decision: "Your login is invalid" (401) and "auth is misconfigured or down" (503) are
// separate variants so callers cannot conflate them
// Decision: 401 bodies carry only a fixed reason, never tokens or provider messages

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Why a request was refused with 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnauthorizedReason {
    /// No bearer header and no access cookie.
    MissingCredential,
    /// Token rejected and no usable refresh token.
    InvalidCredential,
}

impl UnauthorizedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnauthorizedReason::MissingCredential => "no credential presented",
            UnauthorizedReason::InvalidCredential => "invalid or expired credential",
        }
    }
}

impl std::fmt::Display for UnauthorizedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authentication error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Unauthorized: {0}")]
    Unauthorized(UnauthorizedReason),

    /// Operator-facing detail; not sent to clients.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AuthError {
    pub fn missing_credential() -> Self {
        AuthError::Unauthorized(UnauthorizedReason::MissingCredential)
    }

    pub fn invalid_credential() -> Self {
        AuthError::Unauthorized(UnauthorizedReason::InvalidCredential)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AuthError::Unauthorized(reason) => reason.as_str().to_string(),
            AuthError::ServiceUnavailable(detail) => {
                tracing::error!(detail = %detail, "Authentication service unavailable");
                "Authentication service unavailable".to_string()
            }
            AuthError::BadRequest(msg) => msg.clone(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
