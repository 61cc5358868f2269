// Per-request authentication state machine
// Decision: One silent refresh attempt per request; no retries beyond that
// Decision: Cookies are cleared only when a refresh was attempted and the provider refused it
// Decision: Provider outages surface as 503 and never burn the caller's cookies

use axum::http::HeaderMap;
use axum_extra::extract::CookieJar;
use std::sync::Arc;

use super::cookies::{is_persistent, SessionCookies, REFRESH_COOKIE};
use super::error::AuthError;
use super::extractor::extract_token;
use super::middleware::{AuthMethod, AuthUser};
use super::provider::{ProviderError, ProviderHandle};

/// Decides whether a request carries a valid identity, renewing the session
/// from the refresh cookie when the access token is no longer accepted.
///
/// Holds no per-request state; cloning is cheap.
#[derive(Clone)]
pub struct AuthGuard {
    provider: Arc<ProviderHandle>,
    cookies: SessionCookies,
}

impl AuthGuard {
    pub fn new(provider: Arc<ProviderHandle>, cookies: SessionCookies) -> Self {
        Self { provider, cookies }
    }

    /// Authenticate a request from its headers.
    ///
    /// The returned jar carries any cookie changes (renewed session or
    /// removals) and must be applied to the response in both outcomes.
    pub async fn authenticate(
        &self,
        headers: &HeaderMap,
    ) -> (CookieJar, Result<AuthUser, AuthError>) {
        let jar = CookieJar::from_headers(headers);

        let Some(access_token) = extract_token(headers) else {
            tracing::debug!("No credential presented");
            return (jar, Err(AuthError::missing_credential()));
        };

        let provider = match self.provider.resolve().await {
            Ok(provider) => provider,
            Err(e) => return (jar, Err(e)),
        };

        match provider.validate_access_token(&access_token).await {
            Ok(identity) => {
                tracing::debug!(user_id = %identity.id, "Access token accepted");
                return (
                    jar,
                    Ok(AuthUser {
                        identity,
                        method: AuthMethod::AccessToken,
                    }),
                );
            }
            Err(e) if e.is_unavailable() => {
                tracing::warn!(error = %e, "Identity provider unavailable during validation");
                return (jar, Err(e.into()));
            }
            Err(e) => tracing::debug!(error = %e, "Access token rejected"),
        }

        let Some(refresh_token) = jar
            .get(REFRESH_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
        else {
            tracing::debug!("No refresh token; rejecting");
            return (jar, Err(AuthError::invalid_credential()));
        };

        match provider.refresh_session(&refresh_token).await {
            Ok(session) if session.is_complete() => {
                let persistent = is_persistent(&jar);
                tracing::info!(
                    user_id = %session.user.id,
                    persistent,
                    "Session renewed from refresh token"
                );
                let jar = self.cookies.set_session_cookies(jar, &session, persistent);
                (
                    jar,
                    Ok(AuthUser {
                        identity: session.user,
                        method: AuthMethod::Refreshed,
                    }),
                )
            }
            Ok(_) => self.burn(jar, &ProviderError::IncompleteSession),
            Err(e) if e.is_unavailable() => {
                tracing::warn!(error = %e, "Identity provider unavailable during refresh");
                (jar, Err(e.into()))
            }
            Err(e) => self.burn(jar, &e),
        }
    }

    /// Refresh token refused: drop every session cookie.
    fn burn(
        &self,
        jar: CookieJar,
        reason: &ProviderError,
    ) -> (CookieJar, Result<AuthUser, AuthError>) {
        tracing::info!(error = %reason, "Refresh failed; clearing session cookies");
        (
            self.cookies.clear_session_cookies(jar),
            Err(AuthError::invalid_credential()),
        )
    }
}
